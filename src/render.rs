use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::artifacts::{self, ArtifactStore, PDF_CONTENT_TYPE, Persisted};
use crate::error::Error;
use crate::fonts::FontBook;
use crate::model::DocumentKind;
use crate::pdf::{self, ComposeContext};
use crate::store::DataSource;
use crate::theme::{Issuer, Theme};

pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(10);

/// Whether the caller wants to display the file or save it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    #[default]
    View,
    Download,
}

impl Action {
    fn disposition(self) -> &'static str {
        match self {
            Action::View => "inline",
            Action::Download => "attachment",
        }
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "view" => Ok(Action::View),
            "download" => Ok(Action::Download),
            other => Err(Error::Validation(format!("unknown action '{other}'"))),
        }
    }
}

/// Raw request parameters, as they arrive on the query string.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RenderParams {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub action: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderRequest {
    pub kind: DocumentKind,
    pub id: String,
    pub action: Action,
}

impl RenderRequest {
    pub fn new(kind: DocumentKind, id: impl Into<String>, action: Action) -> Self {
        RenderRequest {
            kind,
            id: id.into(),
            action,
        }
    }

    /// `type` defaults to an invoice and `action` to viewing; `id` is required.
    pub fn from_params(params: &RenderParams) -> Result<Self, Error> {
        let id = params
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::Validation("missing document id".into()))?;
        let kind = match params.kind.as_deref().map(str::trim) {
            None | Some("") => DocumentKind::Invoice,
            Some(kind) => kind.parse()?,
        };
        let action = match params.action.as_deref().map(str::trim) {
            None | Some("") => Action::View,
            Some(action) => action.parse()?,
        };
        Ok(RenderRequest::new(kind, id, action))
    }
}

/// Presentation settings shared by every render.
pub struct RenderOptions {
    pub theme: Theme,
    pub issuer: Issuer,
    pub fonts: FontBook,
    /// Upper bound for one whole render.
    pub deadline: Duration,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            theme: Theme::default(),
            issuer: Issuer::default(),
            fonts: FontBook::builtin(),
            deadline: DEFAULT_DEADLINE,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RenderResponse {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub action: Action,
    pub page_count: usize,
    /// `None` when no artifact store is configured or storing failed.
    pub artifact: Option<Persisted>,
}

impl RenderResponse {
    pub fn content_type(&self) -> &'static str {
        PDF_CONTENT_TYPE
    }

    pub fn content_disposition(&self) -> String {
        format!(
            "{}; filename=\"{}\"",
            self.action.disposition(),
            self.file_name
        )
    }

    pub fn cache_control(&self) -> &'static str {
        "no-store"
    }
}

/// Resolves, lays out, serializes and stores documents.
///
/// Cheap to clone; every clone shares the same collaborators.
#[derive(Clone)]
pub struct Renderer {
    source: Arc<dyn DataSource>,
    artifacts: Option<Arc<dyn ArtifactStore>>,
    options: Arc<RenderOptions>,
}

impl Renderer {
    pub fn new(source: Arc<dyn DataSource>, options: RenderOptions) -> Self {
        Renderer {
            source,
            artifacts: None,
            options: Arc::new(options),
        }
    }

    pub fn with_artifacts(mut self, store: Arc<dyn ArtifactStore>) -> Self {
        self.artifacts = Some(store);
        self
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn render(&self, request: &RenderRequest) -> Result<RenderResponse, Error> {
        self.render_until(request, Instant::now() + self.options.deadline)
    }

    /// Render against a cut-off fixed by the caller. Every phase, the artifact
    /// upload included, starts only while `cutoff` is still ahead.
    pub fn render_until(
        &self,
        request: &RenderRequest,
        cutoff: Instant,
    ) -> Result<RenderResponse, Error> {
        let t0 = Instant::now();
        let deadline = self.options.deadline;
        check_deadline(cutoff, deadline, "start")?;

        let record = self.source.resolve_document(request.kind, &request.id)?;
        let t_resolve = t0.elapsed();
        check_deadline(cutoff, deadline, "resolve")?;

        let ctx = ComposeContext {
            theme: &self.options.theme,
            issuer: &self.options.issuer,
            fonts: &self.options.fonts,
        };
        let layout = pdf::compose(&record, ctx)?;
        let t_layout = t0.elapsed();
        check_deadline(cutoff, deadline, "layout")?;

        let bytes = pdf::write(&layout, &self.options.fonts)?;
        let t_write = t0.elapsed();
        check_deadline(cutoff, deadline, "write")?;

        let artifact = self
            .artifacts
            .as_deref()
            .and_then(|store| artifacts::persist(store, &record.document, &bytes));
        let t_total = t0.elapsed();

        log::info!(
            "Timing: resolve={:.1}ms, layout={:.1}ms, write={:.1}ms, persist={:.1}ms, total={:.1}ms ({} {}, {} page(s), {} bytes)",
            t_resolve.as_secs_f64() * 1000.0,
            (t_layout - t_resolve).as_secs_f64() * 1000.0,
            (t_write - t_layout).as_secs_f64() * 1000.0,
            (t_total - t_write).as_secs_f64() * 1000.0,
            t_total.as_secs_f64() * 1000.0,
            request.kind,
            record.document.number,
            layout.page_count(),
            bytes.len(),
        );

        Ok(RenderResponse {
            file_name: file_name(request.kind, &record.document.number),
            action: request.action,
            page_count: layout.page_count(),
            artifact,
            bytes,
        })
    }
}

fn check_deadline(cutoff: Instant, deadline: Duration, phase: &str) -> Result<(), Error> {
    let now = Instant::now();
    if now > cutoff {
        log::warn!(
            "render exceeded {deadline:?} after {phase} ({:?} late)",
            now - cutoff
        );
        return Err(Error::Timeout(deadline));
    }
    Ok(())
}

/// `{KIND}_{number}.pdf`, restricted to characters safe in a header value.
pub fn file_name(kind: DocumentKind, number: &str) -> String {
    let number: String = number
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}_{number}.pdf", kind.label())
}

pub mod artifacts;
pub mod config;
pub mod documents;
mod error;
mod fonts;
mod format;
mod model;
pub mod numbering;
pub mod pdf;
mod render;
#[cfg(feature = "server")]
pub mod server;
pub mod store;
mod theme;

pub use artifacts::{ArtifactStore, FsArtifactStore, Persisted, artifact_path};
pub use config::AppConfig;
pub use error::Error;
pub use fonts::{FontBook, FontSet, FontWeight};
pub use format::{MoneyFormat, format_date, format_money, format_quantity};
pub use model::{
    Client, Document, DocumentKind, DocumentRecord, DocumentStatus, DraftDocument, LineItem,
};
pub use numbering::{NumberingConfig, NumberingScheme};
pub use pdf::{ComposeContext, Layout, RenderedDocument, wrap};
pub use render::{
    Action, RenderOptions, RenderParams, RenderRequest, RenderResponse, Renderer, file_name,
};
pub use store::{DataSource, DocumentStore, JsonStore};
pub use theme::{Geometry, Issuer, Labels, Palette, Rgb, Theme, ThemeVariant};

use std::path::Path;
use std::time::Instant;

/// Render `record` with the default theme and built-in fonts and write it to `output`.
pub fn render_to_file(
    record: &DocumentRecord,
    issuer: &Issuer,
    output: &Path,
) -> Result<RenderedDocument, Error> {
    let t0 = Instant::now();

    let theme = Theme::default();
    let fonts = FontBook::builtin();
    let rendered = pdf::render(
        record,
        ComposeContext {
            theme: &theme,
            issuer,
            fonts: &fonts,
        },
    )?;
    let t_render = t0.elapsed();

    std::fs::write(output, &rendered.bytes).map_err(Error::Io)?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: render={:.1}ms, write={:.1}ms, total={:.1}ms (output {} bytes)",
        t_render.as_secs_f64() * 1000.0,
        (t_total - t_render).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        rendered.bytes.len(),
    );

    Ok(rendered)
}

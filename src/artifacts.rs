use std::path::PathBuf;

use chrono::Datelike;

use crate::error::Error;
use crate::model::Document;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Where rendered files are kept. Writing to an existing path overwrites it.
pub trait ArtifactStore: Send + Sync {
    fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<(), Error>;

    fn public_url(&self, path: &str) -> Option<String>;
}

/// Artifact written by `persist`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Persisted {
    pub path: String,
    pub url: Option<String>,
}

/// `{yyyy}/{mm}/{KIND}_{number}_{id}.pdf`, from the document date.
pub fn artifact_path(document: &Document) -> String {
    format!(
        "{:04}/{:02}/{}_{}_{}.pdf",
        document.date.year(),
        document.date.month(),
        document.kind.label(),
        path_segment(&document.number),
        path_segment(&document.id)
    )
}

fn path_segment(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '/' | '\\' => '-',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Store `bytes` at the document's artifact path.
///
/// A store failure is logged and reported as `None`: the caller still has
/// the bytes and the render counts as successful.
pub fn persist(store: &dyn ArtifactStore, document: &Document, bytes: &[u8]) -> Option<Persisted> {
    let path = artifact_path(document);
    match store.put(&path, bytes, PDF_CONTENT_TYPE) {
        Ok(()) => {
            log::debug!("stored {path} ({} bytes)", bytes.len());
            Some(Persisted {
                url: store.public_url(&path),
                path,
            })
        }
        Err(e) => {
            log::warn!("could not store {path}: {e}");
            None
        }
    }
}

/// Artifacts as plain files under a root directory.
pub struct FsArtifactStore {
    root: PathBuf,
    base_url: Option<String>,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsArtifactStore {
            root: root.into(),
            base_url: None,
        }
    }

    /// Public URLs become `{base_url}/{path}`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }
}

impl ArtifactStore for FsArtifactStore {
    fn put(&self, path: &str, bytes: &[u8], _content_type: &str) -> Result<(), Error> {
        if path.split('/').any(|seg| seg == ".." || seg.is_empty()) {
            return Err(Error::Storage(format!("refusing artifact path '{path}'")));
        }
        let target = self.root.join(path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Storage(format!("{}: {e}", parent.display())))?;
        }
        // Readers see either the old file or the new one, never a partial write.
        let tmp = target.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
        std::fs::write(&tmp, bytes).map_err(|e| Error::Storage(format!("{}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &target).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            Error::Storage(format!("{}: {e}", target.display()))
        })
    }

    fn public_url(&self, path: &str) -> Option<String> {
        self.base_url.as_ref().map(|base| format!("{base}/{path}"))
    }
}

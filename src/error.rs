use std::time::Duration;

use thiserror::Error;

/// Every failure the renderer, the numbering allocator and the stores can report.
#[derive(Error, Debug)]
pub enum Error {
    /// Document or client absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// Missing or malformed caller input (identifier, kind, submitted line items).
    #[error("invalid input: {0}")]
    Validation(String),

    /// The data collaborator could not be reached, answered with an error or
    /// returned a record that cannot be rendered.
    #[error("data source failure: {0}")]
    Upstream(String),

    /// A layout invariant was violated while composing pages.
    #[error("render failure: {0}")]
    Render(String),

    #[error("render did not finish within {0:?}")]
    Timeout(Duration),

    /// The document number is already taken within its kind.
    #[error("document number {0} is already assigned")]
    Conflict(String),

    /// Artifact store failure. Never surfaced by a render: persistence errors are logged.
    #[error("artifact store failure: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// HTTP status equivalent of the failure.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::NotFound(_) => 404,
            Error::Validation(_) => 400,
            Error::Conflict(_) => 409,
            Error::Upstream(_)
            | Error::Render(_)
            | Error::Timeout(_)
            | Error::Storage(_)
            | Error::Config(_)
            | Error::Io(_) => 500,
        }
    }

    /// Message safe to hand to a caller: internal detail stays in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Error::NotFound(_) | Error::Validation(_) | Error::Conflict(_) => self.to_string(),
            Error::Timeout(_) => "render timed out".to_string(),
            _ => "internal server error".to_string(),
        }
    }
}

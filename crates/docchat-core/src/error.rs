use std::path::PathBuf;
use thiserror::Error;

/// Failure of a backend request.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("backend returned {status}")]
    Status { status: u16, detail: Option<String> },
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("could not read {}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("request task ended unexpectedly: {0}")]
    Interrupted(String),
}

impl ApiError {
    /// The part of the error worth showing to the user, if there is one.
    ///
    /// Only the backend's structured `detail` and local file problems
    /// qualify; transport failures fall back to the caller's generic text.
    pub fn detail(&self) -> Option<String> {
        match self {
            ApiError::Status { detail, .. } => detail.clone(),
            ApiError::File { .. } => Some(self.to_string()),
            ApiError::Http(_) | ApiError::Interrupted(_) => None,
        }
    }
}

/// Failure of one clipboard tier, or of all of them.
#[derive(Debug, Error)]
pub enum CopyError {
    #[error("clipboard tier not available")]
    Unavailable,
    #[error("clipboard: {0}")]
    Clipboard(#[from] arboard::Error),
    #[error("clipboard helper: {0}")]
    Helper(#[from] std::io::Error),
    #[error("no clipboard helper could be started")]
    NoHelper,
    #[error("every clipboard tier failed")]
    Exhausted,
}

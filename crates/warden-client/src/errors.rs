// Classified snapshot-fetch failures. The classification is terminal state:
// the fetcher never retries on its own; callers re-invoke at a higher level.
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("project not found on control plane")]
    NotFound,
    #[error("control plane unavailable")]
    Unavailable,
    #[error("snapshot request timed out after {0:?}")]
    Timeout(Duration),
    #[error("malformed snapshot response: {0}")]
    Malformed(String),
    #[error("snapshot request failed with status {0}")]
    Status(u16),
    #[error("snapshot request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl FetchError {
    /// Whether re-fetching cannot succeed until the control plane itself
    /// changes (the project does not exist there).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

pub type FetchResult<T> = Result<T, FetchError>;

//! Request and error types carried through the dispatch pipeline.

use bytes::Bytes;

/// A single call entering the dispatch pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    /// `resource/operation/arg0/...`, without the API prefix.
    pub path: String,
    /// Raw request body; empty when the caller sent none.
    pub body: Bytes,
}

impl CallRequest {
    #[must_use]
    pub fn new(path: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            path: path.into(),
            body: body.into(),
        }
    }

    /// First non-empty path segment, used as a low-cardinality label.
    #[must_use]
    pub fn resource_segment(&self) -> &str {
        self.path.split('/').find(|s| !s.is_empty()).unwrap_or("")
    }
}

/// Failures of the pipeline itself, as opposed to failed calls (which are
/// reported through an unsuccessful [`Reply`](switchboard_core::Reply)).
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("dispatch task panicked: {0}")]
    Panicked(String),
    #[error("dispatch task was cancelled")]
    Cancelled,
}

impl From<tokio::task::JoinError> for ServiceError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            return Self::Cancelled;
        }
        Self::Panicked(err.to_string())
    }
}

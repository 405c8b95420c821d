use thiserror::Error;

use crate::api::ApiError;
use crate::core::recorder::RecorderError;

/// Why a user action did not complete. Every variant is recoverable: the
/// message is shown inline and the action can simply be tried again.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// A local precondition failed; no request was issued.
    #[error("{0}")]
    ValidationSkipped(String),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Recorder(#[from] RecorderError),
}

impl ClientError {
    pub fn skipped(reason: impl Into<String>) -> Self {
        ClientError::ValidationSkipped(reason.into())
    }
}

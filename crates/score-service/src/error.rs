use platform_core::ErrorCode;
use score_store::ScoreStoreError;
use thiserror::Error;

/// What callers can distinguish: a malformed request, a request that is
/// not from who it claims, and a failure worth retrying later.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidRequest(_) => ErrorCode::RequestInvalid,
            Self::Unauthorized => ErrorCode::Unauthorized,
            Self::Unavailable(_) => ErrorCode::StoreUnavailable,
            Self::Internal(_) => ErrorCode::InternalError,
        }
    }
}

impl From<ScoreStoreError> for ServiceError {
    fn from(err: ScoreStoreError) -> Self {
        if err.is_corruption() {
            Self::Internal(err.to_string())
        } else {
            Self::Unavailable(err.to_string())
        }
    }
}

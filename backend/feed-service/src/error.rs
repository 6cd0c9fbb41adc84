/// Error types for feed-service
///
/// Store failures are classified once, at the repository boundary, so handlers
/// and services only reason about the business taxonomy below.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use thiserror::Error;
use wide_column::StoreError;

/// Result type for feed-service operations
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Post already liked")]
    AlreadyLiked,

    #[error("Post not liked")]
    NotLiked,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Store timeout or partial outage; the caller may retry.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            AppError::Conflict(_) | AppError::AlreadyLiked | AppError::NotLiked
        )
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Unavailable(_))
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConditionFailed | StoreError::TransactionCanceled { .. } => {
                AppError::Conflict(err.to_string())
            }
            StoreError::Unavailable(msg) => AppError::Unavailable(msg),
            StoreError::InvalidToken(msg) => {
                AppError::InvalidInput(format!("invalid pagination token: {}", msg))
            }
            StoreError::InvalidInput(msg) => AppError::InvalidInput(msg),
            StoreError::Decode(msg) => AppError::Internal(format!("corrupt record: {}", msg)),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) | AppError::AlreadyLiked | AppError::NotLiked => {
                StatusCode::CONFLICT
            }
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error_msg = match self {
            // Don't leak store internals to clients
            AppError::Internal(_) => "Internal error".to_string(),
            other => other.to_string(),
        };

        HttpResponse::build(status).json(serde_json::json!({
            "error": error_msg,
            "status": status.as_u16(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_business_taxonomy() {
        assert!(AppError::from(StoreError::ConditionFailed).is_conflict());
        assert!(AppError::from(StoreError::Unavailable("timeout".into())).is_retryable());
        assert!(matches!(
            AppError::from(StoreError::InvalidToken("bad".into())),
            AppError::InvalidInput(_)
        ));
        assert!(matches!(
            AppError::from(StoreError::Decode("ttl".into())),
            AppError::Internal(_)
        ));
    }

    #[test]
    fn like_conflicts_are_http_409() {
        assert_eq!(AppError::AlreadyLiked.status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::NotLiked.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::Unavailable("x".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}

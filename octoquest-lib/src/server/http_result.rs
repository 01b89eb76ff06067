use std::time::Duration;

use http::StatusCode;
use thiserror::Error;

use crate::telemetry::metrics::values;

/// Result of handling one API request
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Describes things that can go wrong while answering an API request.
/// The display text becomes the `error` field of the response body.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Rate limit exceeded")]
    RateLimited { limit: u64, reset_after: Duration },

    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Rate limiter unavailable")]
    LimiterUnavailable,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Failed to generate response: {0}")]
    Response(String),
}

impl ApiError {
    /// Label used for the `error_type` metric
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::Validation(_) | ApiError::MethodNotAllowed => values::ERROR_VALIDATION,
            ApiError::RateLimited { .. } => values::ERROR_RATE_LIMITED,
            ApiError::Upstream(_) | ApiError::Response(_) => values::ERROR_UPSTREAM,
            ApiError::NotFound(_) => values::ERROR_NOT_FOUND,
            ApiError::LimiterUnavailable => values::ERROR_LIMITER_UNAVAILABLE,
        }
    }
}

impl From<&ApiError> for StatusCode {
    fn from(e: &ApiError) -> StatusCode {
        match e {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::LimiterUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Response(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ApiError> for StatusCode {
    fn from(e: ApiError) -> StatusCode {
        StatusCode::from(&e)
    }
}

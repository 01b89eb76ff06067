use http::header::{HeaderName, HeaderValue, CONTENT_TYPE, RETRY_AFTER};
use http::StatusCode;
use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::body::Bytes;
use hyper::Response;
use serde::Serialize;
use serde_json::json;
use tracing::error;

use crate::error::{Result, ServiceError};
use crate::security::RateLimitResult;
use crate::server::http_result::ApiError;

pub type RespBody = BoxBody<Bytes, hyper::Error>;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

pub fn full_body(data: impl Into<Bytes>) -> RespBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

/// Serialize `value` as the JSON body of a `status` response
pub fn json_response<T: Serialize + ?Sized>(
    status: StatusCode,
    value: &T,
) -> Result<Response<RespBody>> {
    let body = serde_json::to_vec(value)
        .map_err(|e| ServiceError::Http(format!("Failed to serialize response: {e}")))?;

    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(full_body(body))
        .map_err(|e| ServiceError::Http(format!("Failed to build response: {e}")))
}

/// Plain text response, used where building JSON is what just failed
pub fn text_response(status: StatusCode, text: &'static str) -> Response<RespBody> {
    let mut resp = Response::new(full_body(text));
    *resp.status_mut() = status;
    resp
}

/// `{ "error": "<message>" }` with the status of `err`
pub fn error_response(err: &ApiError) -> Response<RespBody> {
    let status = StatusCode::from(err);
    let mut resp = match json_response(status, &json!({ "error": err.to_string() })) {
        Ok(resp) => resp,
        Err(e) => {
            error!(error = %e, "failed to build error response");
            text_response(status, "Internal Server Error")
        }
    };

    if let ApiError::RateLimited { limit, reset_after } = err {
        let reset_secs = reset_after.as_secs_f64().ceil() as u64;
        let headers = resp.headers_mut();
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(*limit));
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from_static("0"));
        headers.insert(X_RATELIMIT_RESET, HeaderValue::from(reset_secs));
        headers.insert(RETRY_AFTER, HeaderValue::from(reset_secs));
    }

    resp
}

/// Attach the quota left after an admitted request
pub fn with_rate_limit_headers(
    mut resp: Response<RespBody>,
    decision: Option<&RateLimitResult>,
) -> Response<RespBody> {
    if let Some(RateLimitResult::Allowed { limit, remaining }) = decision {
        let headers = resp.headers_mut();
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(*limit));
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(*remaining));
    }
    resp
}

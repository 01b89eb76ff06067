use hyper::Response;
use hyper::StatusCode;
use serde_json::json;

use crate::error::Result;
use crate::server::response::{json_response, RespBody};

/// Health check response - always returns 200 if process is running
pub fn health_check_response() -> Result<Response<RespBody>> {
    json_response(StatusCode::OK, &json!({"status": "healthy"}))
}

/// Readiness check
///
/// Unauthenticated GitHub access is limited to 60 requests per hour, far
/// below what one leaderboard needs, so the service only reports ready once
/// a token is configured.
pub fn ready_check_response(token_configured: bool) -> Result<Response<RespBody>> {
    if token_configured {
        json_response(StatusCode::OK, &json!({"status": "ready"}))
    } else {
        json_response(
            StatusCode::SERVICE_UNAVAILABLE,
            &json!({
                "status": "not_ready",
                "reason": "github_token_missing"
            }),
        )
    }
}

/// Liveness check - always returns 200 if process is running
pub fn live_check_response() -> Result<Response<RespBody>> {
    json_response(StatusCode::OK, &json!({"status": "alive"}))
}

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::debug;

use crate::security::{client_key, RateLimitManager, RateLimitResult};
use crate::server::http_result::{ApiError, ApiResult};
use crate::telemetry::Metrics;

/// Check rate limiting for an incoming request.
///
/// Returns:
/// - `Ok(None)` if rate limiting is disabled
/// - `Ok(Some(decision))` if the request is allowed to proceed
/// - `Err(RateLimited)` if the caller exceeded its quota
/// - `Err(LimiterUnavailable)` if the store failed and the policy is `deny`
pub async fn check_rate_limit(
    rate_limit_manager: Option<&Arc<RateLimitManager>>,
    route: &str,
    peer: Option<SocketAddr>,
    headers: &http::HeaderMap,
    metrics: Option<&Arc<Metrics>>,
) -> ApiResult<Option<RateLimitResult>> {
    let Some(manager) = rate_limit_manager else {
        return Ok(None);
    };

    let key = client_key(headers, peer);
    let backend = manager.backend_name();
    if let Some(m) = metrics {
        m.record_rate_limit_request(backend, route);
    }

    let decision = manager.check(&key).await.map_err(|e| {
        debug!(error = %e, "rate limit store rejected request");
        ApiError::LimiterUnavailable
    })?;

    match decision {
        RateLimitResult::Limited { limit, reset_after } => {
            debug!(client = %key, route, "rate limit exceeded");
            if let Some(m) = metrics {
                m.record_rate_limit_rejection(backend, route);
            }
            Err(ApiError::RateLimited { limit, reset_after })
        }
        RateLimitResult::Allowed { limit, remaining } => {
            debug!(limit, remaining, "Rate limit check passed");
            if let Some(m) = metrics {
                m.record_rate_limit_allowed(backend, route);
            }
            Ok(Some(decision))
        }
    }
}

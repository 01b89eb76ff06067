use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use http::request::Parts;
use http::{Method, StatusCode};
use hyper::{Request, Response};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::github::UpstreamError;
use crate::leaderboard::{aggregate_top_users, contribution_days, UserStats};
use crate::server::context::AppContext;
use crate::server::handler::query::required_username;
use crate::server::handler::rate_limit_validation::check_rate_limit;
use crate::server::http_result::{ApiError, ApiResult};
use crate::server::response::{error_response, json_response, with_rate_limit_headers, RespBody};

/// Events page size for the activity lookup (GitHub's maximum)
const EVENTS_PER_PAGE: u8 = 100;

/// The API surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    TopUsers,
    UserDetails,
    UserStats,
    CommitData,
}

impl Route {
    pub fn from_path(path: &str) -> Option<Self> {
        match path.trim_end_matches('/') {
            "/top-users" => Some(Route::TopUsers),
            "/user-details" => Some(Route::UserDetails),
            "/user-stats" => Some(Route::UserStats),
            "/commit-data" => Some(Route::CommitData),
            _ => None,
        }
    }

    /// Metric label; the path itself for known routes
    pub fn label(route: Option<Self>) -> &'static str {
        match route {
            Some(Route::TopUsers) => "/top-users",
            Some(Route::UserDetails) => "/user-details",
            Some(Route::UserStats) => "/user-stats",
            Some(Route::CommitData) => "/commit-data",
            None => "unmatched",
        }
    }
}

/// Handle one API request.
///
/// Never fails: every error becomes a `{ "error": ... }` response with the
/// matching status.
pub async fn handle_request<B>(
    req: Request<B>,
    ctx: Arc<AppContext>,
    peer: Option<SocketAddr>,
) -> Response<RespBody> {
    let start = Instant::now();
    // every endpoint is a GET; the body is never read
    let (parts, body) = req.into_parts();
    drop(body);
    let method = parts.method.clone();
    let route = Route::from_path(parts.uri.path());
    let label = Route::label(route);

    let resp = match dispatch(&parts, route, &ctx, peer).await {
        Ok(resp) => resp,
        Err(e) => {
            if let Some(m) = &ctx.metrics {
                m.record_error(e.error_type());
            }
            error_response(&e)
        }
    };

    let status = resp.status();
    debug!(%method, route = label, status = status.as_u16(), "request handled");
    if let Some(m) = &ctx.metrics {
        m.record_request(method.as_str(), status.as_u16(), label, start.elapsed().as_secs_f64());
    }
    resp
}

async fn dispatch(
    req: &Parts,
    route: Option<Route>,
    ctx: &AppContext,
    peer: Option<SocketAddr>,
) -> ApiResult<Response<RespBody>> {
    let route = route.ok_or_else(|| ApiError::NotFound("Not found".to_string()))?;
    if req.method != Method::GET {
        return Err(ApiError::MethodNotAllowed);
    }

    let decision = check_rate_limit(
        ctx.rate_limiter.as_ref(),
        Route::label(Some(route)),
        peer,
        &req.headers,
        ctx.metrics.as_ref(),
    )
    .await?;

    let query = req.uri.query();
    let resp = match route {
        Route::TopUsers => top_users(ctx).await?,
        Route::UserDetails => user_details(ctx, &required_username(query)?).await?,
        Route::UserStats => user_stats(ctx, &required_username(query)?).await?,
        Route::CommitData => commit_data(ctx, &required_username(query)?).await?,
    };

    Ok(with_rate_limit_headers(resp, decision.as_ref()))
}

async fn top_users(ctx: &AppContext) -> ApiResult<Response<RespBody>> {
    let top = aggregate_top_users(&ctx.github, &ctx.aggregate, ctx.metrics.as_ref())
        .await
        .map_err(|e| {
            warn!(error = %e, "Error fetching top users");
            ApiError::Upstream("Failed to fetch top users".to_string())
        })?;
    ok_json(&top)
}

async fn user_details(ctx: &AppContext, username: &str) -> ApiResult<Response<RespBody>> {
    let started = std::time::Instant::now();
    let profile = ctx.github.user_profile_raw(username).await;
    record_upstream(ctx, "users/{login}", started, &profile);
    let profile = profile.map_err(|e| lookup_error(e, username, "Failed to fetch user details"))?;
    ok_json(&profile)
}

async fn user_stats(ctx: &AppContext, username: &str) -> ApiResult<Response<RespBody>> {
    let started = std::time::Instant::now();
    let profile = ctx.github.user_profile(username).await;
    record_upstream(ctx, "users/{login}", started, &profile);
    let profile = profile.map_err(|e| lookup_error(e, username, "Failed to fetch user stats"))?;
    ok_json(&UserStats::from(profile))
}

async fn commit_data(ctx: &AppContext, username: &str) -> ApiResult<Response<RespBody>> {
    let started = std::time::Instant::now();
    let events = ctx.github.user_events(username, EVENTS_PER_PAGE).await;
    record_upstream(ctx, "users/{login}/events", started, &events);
    let events = events.map_err(|e| lookup_error(e, username, "Failed to fetch commit data"))?;

    let lookback = ChronoDuration::days(i64::from(ctx.github_config.activity_lookback_days));
    let since = Utc::now() - lookback;
    ok_json(&contribution_days(&events, since))
}

fn record_upstream<T>(
    ctx: &AppContext,
    endpoint: &str,
    started: std::time::Instant,
    result: &Result<T, UpstreamError>,
) {
    if let Some(m) = &ctx.metrics {
        m.record_upstream(endpoint, started, result);
    }
}

fn lookup_error(e: UpstreamError, username: &str, message: &str) -> ApiError {
    match e {
        UpstreamError::NotFound { .. } => ApiError::NotFound("User not found".to_string()),
        other => {
            warn!(username, error = %other, "{message}");
            ApiError::Upstream(message.to_string())
        }
    }
}

fn ok_json<T: serde::Serialize + ?Sized>(value: &T) -> ApiResult<Response<RespBody>> {
    json_response(StatusCode::OK, value).map_err(|e| ApiError::Response(e.to_string()))
}

use crate::error::Result;
use crate::server::response::{text_response, RespBody};
use crate::server::shutdown_signal;
use crate::telemetry::{
    handle_metrics, health_check_response, live_check_response, ready_check_response,
};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use prometheus::Registry;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Serve operational endpoints on their own port until SIGTERM or SIGINT:
/// - `/metrics` - Prometheus metrics
/// - `/health` - process is up
/// - `/ready` - a GitHub token is configured
/// - `/live` - liveness probe
pub async fn start_observability_server(
    port: u16,
    registry: Registry,
    token_configured: bool,
) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let registry = Arc::new(registry);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    let shutdown = shutdown_signal()?;
    tokio::pin!(shutdown);

    info!(?addr, "observability server listening");

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            result = listener.accept() => {
                let (stream, peer) = match result {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!(error = %e, "observability accept error");
                        continue;
                    }
                };

                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    let svc = hyper::service::service_fn(move |req: Request<Incoming>| {
                        let resp = route(req.uri().path(), &registry, token_configured);
                        async move { Ok::<_, hyper::Error>(resp) }
                    });

                    let builder = ConnBuilder::new(TokioExecutor::new());
                    if let Err(e) = builder.serve_connection(TokioIo::new(stream), svc).await {
                        warn!(?peer, error = %e, "observability connection error");
                    }
                });
            }
        }
    }

    info!("observability server stopped");
    Ok(())
}

fn route(path: &str, registry: &Registry, token_configured: bool) -> Response<RespBody> {
    let result = match path {
        "/health" => health_check_response(),
        "/ready" => ready_check_response(token_configured),
        "/live" => live_check_response(),
        "/metrics" => handle_metrics(registry),
        _ => return text_response(StatusCode::NOT_FOUND, "Not Found"),
    };
    or_internal_error(result)
}

fn or_internal_error(result: Result<Response<RespBody>>) -> Response<RespBody> {
    result.unwrap_or_else(|e| {
        warn!(error = %e, "failed to build observability response");
        text_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_paths_are_not_found() {
        let resp = route("/admin", &Registry::new(), true);
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn ready_tracks_token() {
        let registry = Registry::new();
        assert_eq!(route("/ready", &registry, true).status(), StatusCode::OK);
        assert_eq!(route("/ready", &registry, false).status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(route("/metrics", &registry, false).status(), StatusCode::OK);
    }
}

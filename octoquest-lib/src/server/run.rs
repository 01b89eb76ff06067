use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use hyper::body::Incoming;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::{Config, TimeoutConfig};
use crate::error::{Result, ServiceError};
use crate::security::RateLimitManager;
use crate::server::connection::{serve_with_timeout, ConnectionGuard};
use crate::server::context::AppContext;
use crate::server::handler::handle_request;
use crate::telemetry::Metrics;

/// Bind the configured address and serve the API until SIGTERM or SIGINT.
pub async fn run(config: Arc<Config>, metrics: Option<Arc<Metrics>>) -> Result<()> {
    let ctx = Arc::new(build_context(&config, metrics).await?);

    let listener = TcpListener::bind(config.listen).await.map_err(ServiceError::Io)?;
    info!(addr = ?config.listen, "starting OctoQuest API");

    serve(listener, ctx, shutdown_signal()?, &config.timeout).await
}

/// Shared request state: GitHub client plus the rate limiter, if enabled.
pub async fn build_context(config: &Config, metrics: Option<Arc<Metrics>>) -> Result<AppContext> {
    let rate_limiter = RateLimitManager::from_config(&config.rate_limit)
        .await?
        .map(|m| Arc::new(m.with_metrics(metrics.clone())));
    if rate_limiter.is_none() {
        warn!("rate limiting disabled");
    }
    if !config.github.has_token() {
        warn!("no GitHub token configured, upstream requests are unauthenticated");
    }

    AppContext::new(config.github.clone(), rate_limiter, metrics)
}

/// Resolves on the first SIGTERM or SIGINT
pub fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate()).map_err(|e| {
        ServiceError::Io(std::io::Error::other(format!("Failed to setup SIGTERM handler: {e}")))
    })?;
    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt()).map_err(|e| {
        ServiceError::Io(std::io::Error::other(format!("Failed to setup SIGINT handler: {e}")))
    })?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown"),
            _ = sigint.recv() => info!("Received SIGINT, initiating graceful shutdown"),
        }
    })
}

/// Accept connections on `listener` until `shutdown` resolves, then wait for
/// active connections to finish (bounded by `timeouts.shutdown_secs`).
pub async fn serve<F>(
    listener: TcpListener,
    ctx: Arc<AppContext>,
    shutdown: F,
    timeouts: &TimeoutConfig,
) -> Result<()>
where
    F: Future<Output = ()>,
{
    let builder = ConnBuilder::new(TokioExecutor::new());
    let connection_timeout = Duration::from_secs(timeouts.connection_handling_secs);

    // Track active connections for graceful shutdown
    let active_connections = Arc::new(AtomicUsize::new(0));
    let (idle_tx, mut idle_rx) = watch::channel(());

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            result = listener.accept() => {
                let (stream, peer) = match result {
                    Ok((stream, peer)) => (stream, peer),
                    Err(e) => {
                        warn!(error = %e, "accept error");
                        continue;
                    }
                };

                if let Some(m) = &ctx.metrics {
                    m.connections_total.add(1, &[]);
                }
                let guard = ConnectionGuard::new(
                    Arc::clone(&active_connections),
                    idle_tx.clone(),
                    ctx.metrics.as_ref().map(|m| m.connections_active.clone()),
                );

                let builder = builder.clone();
                let ctx = Arc::clone(&ctx);

                tokio::spawn(async move {
                    let _guard = guard;
                    let metrics = ctx.metrics.clone();
                    let svc = hyper::service::service_fn(move |req: Request<Incoming>| {
                        let ctx = Arc::clone(&ctx);
                        async move {
                            Ok::<_, hyper::Error>(handle_request(req, ctx, Some(peer)).await)
                        }
                    });

                    serve_with_timeout(
                        builder.serve_connection(TokioIo::new(stream), svc),
                        connection_timeout,
                        metrics.as_ref(),
                        peer,
                    )
                    .await;
                });
            }
        }
    }

    let shutdown_timeout = Duration::from_secs(timeouts.shutdown_secs);
    info!(
        "Waiting for active connections to finish (timeout: {}s)",
        timeouts.shutdown_secs
    );
    let start = Instant::now();

    while active_connections.load(Ordering::Relaxed) > 0 {
        let Some(left) = shutdown_timeout.checked_sub(start.elapsed()) else {
            break;
        };
        if tokio::time::timeout(left, idle_rx.changed()).await.is_err() {
            break;
        }
    }

    let active = active_connections.load(Ordering::Relaxed);
    if active == 0 {
        info!("All connections closed, shutdown complete");
    } else {
        warn!(
            active_connections = active,
            "Shutdown timeout reached, {} connections still active", active
        );
    }

    info!("API server stopped");
    Ok(())
}

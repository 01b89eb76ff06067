use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use opentelemetry::metrics::UpDownCounter;
use tokio::sync::watch;
use tracing::warn;

use crate::telemetry::metrics::values;
use crate::telemetry::Metrics;

/// Guard to decrement active connections counter when dropped
/// Also notifies when the last connection closes (for graceful shutdown)
pub struct ConnectionGuard {
    counter: Arc<AtomicUsize>,
    notifier: watch::Sender<()>,
    connections_active: Option<UpDownCounter<i64>>,
}

impl ConnectionGuard {
    /// Count one more active connection until the guard is dropped.
    pub fn new(
        counter: Arc<AtomicUsize>,
        notifier: watch::Sender<()>,
        connections_active: Option<UpDownCounter<i64>>,
    ) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        if let Some(ref c) = connections_active {
            c.add(1, &[]);
        }
        Self { counter, notifier, connections_active }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let remaining = self.counter.fetch_sub(1, Ordering::Relaxed);
        if let Some(ref counter) = self.connections_active {
            counter.add(-1, &[]);
        }
        if remaining == 1 {
            let _ = self.notifier.send(());
        }
    }
}

/// Serve one connection, dropping it when `timeout_duration` elapses.
pub async fn serve_with_timeout<F, E>(
    serve_fut: F,
    timeout_duration: Duration,
    metrics: Option<&Arc<Metrics>>,
    peer: SocketAddr,
) where
    F: std::future::Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    match tokio::time::timeout(timeout_duration, serve_fut).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            warn!(?peer, error = %e, "serve_connection error");
        }
        Err(_) => {
            warn!(?peer, "connection handling timeout");
            if let Some(m) = metrics {
                m.record_error(values::ERROR_TIMEOUT);
            }
        }
    }
}

use opentelemetry::global;
use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter, UpDownCounter};
use opentelemetry::KeyValue;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::Registry;
use std::sync::Arc;
use std::time::Instant;

use crate::github::UpstreamError;

pub mod labels {
    pub const ERROR_TYPE: &str = "error_type";
    pub const ROUTE: &str = "route";
    pub const STATUS_CODE: &str = "status_code";
    pub const METHOD: &str = "method";
    pub const BACKEND: &str = "backend";
    pub const ENDPOINT: &str = "endpoint";
    pub const REASON: &str = "reason";
    pub const VERSION: &str = "version";
    pub const RUST_VERSION: &str = "rust_version";
}

pub mod values {
    pub const ERROR_RATE_LIMITED: &str = "rate_limited";
    pub const ERROR_VALIDATION: &str = "validation";
    pub const ERROR_UPSTREAM: &str = "upstream";
    pub const ERROR_NOT_FOUND: &str = "not_found";
    pub const ERROR_LIMITER_UNAVAILABLE: &str = "limiter_unavailable";
    pub const ERROR_TIMEOUT: &str = "timeout";
}

#[derive(Clone)]
pub struct Metrics {
    pub connections_total: Counter<u64>,
    pub connections_active: UpDownCounter<i64>,

    pub requests_total: Counter<u64>,
    pub requests_duration_seconds: Histogram<f64>,

    // GitHub API calls
    pub upstream_requests_total: Counter<u64>,
    pub upstream_errors_total: Counter<u64>,
    pub upstream_duration_seconds: Histogram<f64>,

    // Leaderboard assembly
    pub enrichment_failures_total: Counter<u64>,
    pub leaderboard_size: Histogram<u64>,

    pub errors_total: Counter<u64>,

    // Rate limiting metrics
    pub rate_limit_requests_total: Counter<u64>,
    pub rate_limit_allowed_total: Counter<u64>,
    pub rate_limit_rejected_total: Counter<u64>,
    pub rate_limit_store_errors_total: Counter<u64>,

    // Build info
    pub build_info: Gauge<u64>,
}

impl Metrics {
    fn new(meter: Meter) -> Self {
        Self {
            connections_total: meter
                .u64_counter("octoquest_connections_total")
                .with_description("Total number of connections accepted")
                .build(),
            connections_active: meter
                .i64_up_down_counter("octoquest_connections_active")
                .with_description("Number of active connections")
                .build(),

            requests_total: meter
                .u64_counter("octoquest_requests_total")
                .with_description("Total number of API requests processed")
                .build(),
            requests_duration_seconds: meter
                .f64_histogram("octoquest_requests_duration_seconds")
                .with_description("API request duration in seconds")
                .build(),

            upstream_requests_total: meter
                .u64_counter("octoquest_upstream_requests_total")
                .with_description("Total number of requests sent to the GitHub API")
                .build(),
            upstream_errors_total: meter
                .u64_counter("octoquest_upstream_errors_total")
                .with_description("Total number of failed GitHub API requests")
                .build(),
            upstream_duration_seconds: meter
                .f64_histogram("octoquest_upstream_duration_seconds")
                .with_description("GitHub API request duration in seconds")
                .build(),

            enrichment_failures_total: meter
                .u64_counter("octoquest_enrichment_failures_total")
                .with_description("Leaderboard records returned without profile counts")
                .build(),
            leaderboard_size: meter
                .u64_histogram("octoquest_leaderboard_size")
                .with_description("Number of records in each leaderboard response")
                .build(),

            errors_total: meter
                .u64_counter("octoquest_errors_total")
                .with_description("Total number of error responses by type")
                .build(),

            rate_limit_requests_total: meter
                .u64_counter("octoquest_rate_limit_requests_total")
                .with_description("Total number of requests evaluated by rate limiter")
                .build(),
            rate_limit_allowed_total: meter
                .u64_counter("octoquest_rate_limit_allowed_total")
                .with_description("Total number of requests allowed by rate limiter")
                .build(),
            rate_limit_rejected_total: meter
                .u64_counter("octoquest_rate_limit_rejected_total")
                .with_description("Total number of requests rejected by rate limiter (429)")
                .build(),
            rate_limit_store_errors_total: meter
                .u64_counter("octoquest_rate_limit_store_errors_total")
                .with_description("Total number of rate limit store failures")
                .build(),

            build_info: meter
                .u64_gauge("octoquest_build_info")
                .with_description("Build information (version, rust version)")
                .build(),
        }
    }

    /// Set build info metric with version labels
    pub fn set_build_info(&self) {
        let version = env!("CARGO_PKG_VERSION");
        let rust_version = env!("CARGO_PKG_RUST_VERSION");

        self.build_info.record(
            1,
            &[
                KeyValue::new(labels::VERSION, version),
                KeyValue::new(labels::RUST_VERSION, rust_version),
            ],
        );
    }

    pub fn record_rate_limit_request(&self, backend: &str, route: &str) {
        self.rate_limit_requests_total.add(
            1,
            &[
                KeyValue::new(labels::BACKEND, backend.to_string()),
                KeyValue::new(labels::ROUTE, route.to_string()),
            ],
        );
    }

    pub fn record_rate_limit_allowed(&self, backend: &str, route: &str) {
        self.rate_limit_allowed_total.add(
            1,
            &[
                KeyValue::new(labels::BACKEND, backend.to_string()),
                KeyValue::new(labels::ROUTE, route.to_string()),
            ],
        );
    }

    pub fn record_rate_limit_rejection(&self, backend: &str, route: &str) {
        self.rate_limit_rejected_total.add(
            1,
            &[
                KeyValue::new(labels::BACKEND, backend.to_string()),
                KeyValue::new(labels::ROUTE, route.to_string()),
            ],
        );
    }

    pub fn record_rate_limit_store_error(&self, backend: &str) {
        self.rate_limit_store_errors_total
            .add(1, &[KeyValue::new(labels::BACKEND, backend.to_string())]);
    }

    pub fn record_upstream_request(&self, endpoint: &str, duration: f64) {
        let attrs = &[KeyValue::new(labels::ENDPOINT, endpoint.to_string())];
        self.upstream_requests_total.add(1, attrs);
        self.upstream_duration_seconds.record(duration, attrs);
    }

    pub fn record_upstream_error(&self, endpoint: &str, reason: &str) {
        self.upstream_errors_total.add(
            1,
            &[
                KeyValue::new(labels::ENDPOINT, endpoint.to_string()),
                KeyValue::new(labels::REASON, reason.to_string()),
            ],
        );
    }

    /// Record one finished GitHub call, successful or not.
    pub fn record_upstream<T>(
        &self,
        endpoint: &str,
        started: Instant,
        result: &std::result::Result<T, UpstreamError>,
    ) {
        self.record_upstream_request(endpoint, started.elapsed().as_secs_f64());
        if let Err(e) = result {
            self.record_upstream_error(endpoint, e.kind());
        }
    }

    pub fn record_leaderboard(&self, size: usize, failed: usize) {
        self.leaderboard_size.record(size as u64, &[]);
        if failed > 0 {
            self.enrichment_failures_total.add(failed as u64, &[]);
        }
    }

    pub fn record_request(&self, method: &str, status_code: u16, route: &str, duration: f64) {
        let attrs = &[
            KeyValue::new(labels::METHOD, method.to_string()),
            KeyValue::new(labels::STATUS_CODE, status_code.to_string()),
            KeyValue::new(labels::ROUTE, route.to_string()),
        ];
        self.requests_total.add(1, attrs);
        self.requests_duration_seconds.record(duration, attrs);
    }

    pub fn record_error(&self, error_type: &str) {
        self.errors_total
            .add(1, &[KeyValue::new(labels::ERROR_TYPE, error_type.to_string())]);
    }
}

pub fn init_metrics() -> Result<(Arc<Metrics>, Registry), Box<dyn std::error::Error + Send + Sync>>
{
    let registry = Registry::default();

    let exporter = opentelemetry_prometheus::exporter()
        .with_registry(registry.clone())
        .build()?;

    let meter_provider = SdkMeterProvider::builder().with_reader(exporter).build();

    global::set_meter_provider(meter_provider);

    let meter = global::meter("octoquest");
    let metrics = Arc::new(Metrics::new(meter));

    metrics.set_build_info();

    Ok((metrics, registry))
}

//! Prometheus metrics & middleware helper.

use actix_web_prom::{PrometheusMetrics, PrometheusMetricsBuilder};

pub const ENDPOINT: &str = "/metrics";

/// Request counters and latency histograms, served at [`ENDPOINT`].
///
/// Each call owns a fresh registry, so tests can build as many apps as they like.
pub fn middleware() -> std::io::Result<PrometheusMetrics> {
    PrometheusMetricsBuilder::new("mycricmate")
        .endpoint(ENDPOINT)
        .build()
        .map_err(std::io::Error::other)
}

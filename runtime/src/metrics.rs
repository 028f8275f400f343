//! Prometheus metrics for the complaint lifecycle.
//!
//! Recording goes through the `metrics` facade, so it is a no-op until a
//! recorder is installed. [`MetricsServer::start`] installs the Prometheus
//! recorder; the server binary exposes [`MetricsServer::render`] over HTTP.
//!
//! # Example
//!
//! ```rust,no_run
//! use complaint_desk_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//! let body = server.render().unwrap_or_default();
//! # Ok(())
//! # }
//! ```

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus recorder plus the address it should be scraped on.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a metrics server for `addr` (e.g. `0.0.0.0:9090`).
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Address the exporter should be served on.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Describe all metrics and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed. A recorder
    /// that is already installed is tolerated and leaves the handle empty.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!(addr = %self.addr, "Metrics recorder installed");
                Ok(())
            },
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            },
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus text format.
    ///
    /// Returns `None` if the recorder was not installed by this server.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        "complaint_transitions_applied_total",
        "Status changes persisted, labelled by the new status"
    );
    describe_counter!(
        "complaint_transitions_rejected_total",
        "Status changes refused by the transition engine, labelled by reason"
    );
    describe_counter!(
        "complaint_store_conflicts_total",
        "Optimistic concurrency conflicts seen while saving a restaurant"
    );
    describe_counter!("complaints_filed_total", "Complaints filed");
    describe_histogram!(
        "complaint_status_update_duration_seconds",
        "Time taken by a status update, retries included"
    );

    describe_counter!(
        "side_effects_dispatched_total",
        "Best-effort side effects started, labelled by kind"
    );
    describe_counter!(
        "side_effects_failed_total",
        "Side effects whose collaborator returned an error"
    );
    describe_counter!(
        "side_effects_timed_out_total",
        "Side effects abandoned after the dispatch timeout"
    );
}

/// Lifecycle metrics recorder.
pub struct LifecycleMetrics;

impl LifecycleMetrics {
    /// Record a persisted status change.
    pub fn record_applied(status: &'static str, duration: Duration) {
        counter!("complaint_transitions_applied_total", "status" => status).increment(1);
        histogram!("complaint_status_update_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a refused status change.
    pub fn record_rejected(reason: &'static str) {
        counter!("complaint_transitions_rejected_total", "reason" => reason).increment(1);
    }

    /// Record an optimistic concurrency conflict.
    pub fn record_conflict() {
        counter!("complaint_store_conflicts_total").increment(1);
    }

    /// Record a filed complaint.
    pub fn record_filed() {
        counter!("complaints_filed_total").increment(1);
    }
}

/// Side-effect metrics recorder.
pub struct SideEffectMetrics;

impl SideEffectMetrics {
    /// Record a dispatched side effect.
    pub fn record_dispatched(kind: &'static str) {
        counter!("side_effects_dispatched_total", "kind" => kind).increment(1);
    }

    /// Record a failed side effect.
    pub fn record_failure(kind: &'static str) {
        counter!("side_effects_failed_total", "kind" => kind).increment(1);
    }

    /// Record a timed-out side effect.
    pub fn record_timeout(kind: &'static str) {
        counter!("side_effects_timed_out_total", "kind" => kind).increment(1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn metrics_server_starts_without_handle() {
        let server = MetricsServer::new("127.0.0.1:0".parse().unwrap());
        assert!(server.handle().is_none());
        assert!(server.render().is_none());
    }

    #[test]
    fn recording_without_recorder_is_a_no_op() {
        LifecycleMetrics::record_applied("Resolved", Duration::from_millis(3));
        LifecycleMetrics::record_rejected("remark_required");
        SideEffectMetrics::record_timeout("broadcast");
    }

    #[test]
    fn started_server_renders_recorded_counters() {
        let mut server = MetricsServer::new("127.0.0.1:0".parse().unwrap());
        server.start().unwrap();
        LifecycleMetrics::record_filed();

        if let Some(body) = server.render() {
            assert!(body.contains("complaints_filed_total"));
        }
    }
}

//! Prometheus metrics for observability and monitoring.
//!
//! The runtime records reducer and effect metrics itself. Other crates record
//! their own metrics through the `metrics` facade and register descriptions
//! with [`MetricsExporter::describe`].
//!
//! # Example
//!
//! ```rust,no_run
//! use whop_embed_runtime::metrics::MetricsExporter;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut exporter = MetricsExporter::new();
//! exporter.install()?;
//!
//! // Later, e.g. from a diagnostics endpoint
//! let text = exporter.render().unwrap_or_default();
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, gauge, histogram};

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

/// Prometheus recorder installed as the global `metrics` recorder.
#[derive(Default)]
pub struct MetricsExporter {
    handle: Option<PrometheusHandle>,
}

impl MetricsExporter {
    /// Create an exporter that has not been installed yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Register an additional set of metric descriptions.
    ///
    /// Crates built on the runtime expose a `describe_metrics` function for this.
    pub fn describe(describe_fn: fn()) {
        describe_fn();
    }

    /// Register runtime metric descriptions and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// If a recorder is already installed (e.g., by another test), installation is
    /// skipped with a warning and [`render`](Self::render) returns `None`.
    pub fn install(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!("Prometheus metrics recorder installed");
                Ok(())
            },
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            },
        }
    }

    /// Render current metrics in Prometheus text format.
    ///
    /// Returns `None` if this exporter did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register runtime metric descriptions.
fn register_metrics() {
    describe_counter!(
        "store_actions_total",
        "Total number of actions processed by store reducers"
    );
    describe_histogram!(
        "store_reducer_duration_seconds",
        "Time taken to execute reducers"
    );
    describe_counter!(
        "store_effects_executed_total",
        "Total number of effects executed, by effect type"
    );
}

/// Store metrics recorder.
pub struct StoreMetrics;

impl StoreMetrics {
    /// Record one reducer run.
    pub fn record_action(duration: Duration) {
        counter!("store_actions_total").increment(1);
        histogram!("store_reducer_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record one executed effect.
    pub fn record_effect(kind: &'static str) {
        counter!("store_effects_executed_total", "type" => kind).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exporter_starts_uninstalled() {
        let exporter = MetricsExporter::new();
        assert!(exporter.render().is_none());
    }

    #[test]
    fn test_exporter_renders_store_metrics() {
        let mut exporter = MetricsExporter::new();
        assert!(exporter.install().is_ok());

        StoreMetrics::record_action(Duration::from_millis(2));
        StoreMetrics::record_effect("future");

        // Another test in this binary may already own the global recorder.
        if let Some(rendered) = exporter.render() {
            assert!(rendered.contains("store_actions_total"));
            assert!(rendered.contains("store_effects_executed_total"));
        }
    }
}

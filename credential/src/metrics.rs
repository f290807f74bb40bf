//! Prometheus metrics for credential operations.
//!
//! Operations record through [`CredentialMetrics`] using the `metrics`
//! facade; without an installed recorder the calls are no-ops.
//! [`MetricsRecorder`] installs the Prometheus recorder and renders the text
//! exposition format.

use crate::error::ErrorKind;
use crate::proof::TransitionKind;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
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

/// Installed Prometheus recorder.
pub struct MetricsRecorder {
    handle: Option<PrometheusHandle>,
}

impl MetricsRecorder {
    /// Register metric descriptions and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// A recorder can only be installed once per process. If one already is,
    /// this logs a warning and returns a recorder that renders nothing.
    pub fn install() -> Result<Self, MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => Ok(Self {
                handle: Some(handle),
            }),
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(Self { handle: None })
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if this recorder was not the one installed.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        "credential_operations_total",
        "Accepted credential operations, by operation"
    );
    describe_counter!(
        "credential_rejections_total",
        "Rejected credential operations, by operation and error kind"
    );
    describe_counter!(
        "credential_actions_folded_total",
        "Total number of log actions folded into aggregates"
    );
    describe_counter!(
        "credential_corrupt_logs_total",
        "Total number of times a corrupt action log was detected"
    );
    describe_histogram!(
        "credential_fold_duration_seconds",
        "Time taken to fold pending actions"
    );
}

/// Credential metrics recorder.
pub struct CredentialMetrics;

impl CredentialMetrics {
    /// Record an accepted operation.
    pub fn record_accepted(operation: TransitionKind) {
        counter!("credential_operations_total", "operation" => operation.as_str()).increment(1);
    }

    /// Record a rejected operation.
    pub fn record_rejected(operation: TransitionKind, kind: ErrorKind) {
        counter!(
            "credential_rejections_total",
            "operation" => operation.as_str(),
            "kind" => kind.as_str()
        )
        .increment(1);
        if kind == ErrorKind::CorruptActionLog {
            counter!("credential_corrupt_logs_total").increment(1);
        }
    }

    /// Record a completed fold.
    pub fn record_fold(folded: usize, duration: Duration) {
        counter!("credential_actions_folded_total").increment(u64::try_from(folded).unwrap_or(u64::MAX));
        histogram!("credential_fold_duration_seconds").record(duration.as_secs_f64());
    }
}

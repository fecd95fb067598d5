//! Prometheus metrics exposition
//!
//! - `step_up_requests_total` (counter): label `outcome`
//! - `step_up_downstream_duration_seconds` (histogram)
//! - `consent_callbacks_total` (counter): labels `outcome`, `correlated`

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

const DOWNSTREAM_DURATION: &str = "step_up_downstream_duration_seconds";

const DURATION_BUCKETS: &[f64] = &[
    0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
];

fn builder() -> PrometheusBuilder {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(DOWNSTREAM_DURATION.to_string()), DURATION_BUCKETS)
        .expect("histogram buckets are non-empty")
}

/// Install the global Prometheus recorder and return a handle for rendering.
pub fn install_recorder() -> PrometheusHandle {
    builder()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Handle backed by a recorder that is not installed globally.
///
/// Lets router tests build an `AppState` without fighting over the
/// process-wide recorder slot.
#[cfg(test)]
pub fn detached_handle() -> PrometheusHandle {
    builder().build_recorder().handle()
}

/// Count one finished step-up request.
pub fn record_step_up(outcome: &'static str) {
    metrics::counter!("step_up_requests_total", "outcome" => outcome).increment(1);
}

/// Time spent waiting on the downstream capability.
pub fn record_downstream_duration(duration_secs: f64) {
    metrics::histogram!(DOWNSTREAM_DURATION).record(duration_secs);
}

/// Count one identity-provider redirect.
pub fn record_callback(outcome: &'static str, correlated: bool) {
    let correlated = if correlated { "true" } else { "false" };
    metrics::counter!("consent_callbacks_total", "outcome" => outcome, "correlated" => correlated)
        .increment(1);
}

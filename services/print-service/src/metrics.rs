//! Prometheus metrics exposition
//!
//! The component crates record these counters through the `metrics` facade:
//!
//! - `portal_sign_in_total` (counter): labels `path`, `outcome`
//! - `oauth_token_refresh_total` (counter): label `outcome`
//! - `cloudprint_poll_attempts_total` (counter)
//! - `cloudprint_jobs_total` (counter): label `outcome`
//!
//! Nothing is exported unless the host installs a recorder.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
///
/// The handle's `render()` method produces the Prometheus text exposition
/// format for a `/metrics` endpoint.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe();
    Ok(handle)
}

/// Attach help text to every counter on the current recorder.
pub fn describe() {
    metrics::describe_counter!(
        "portal_sign_in_total",
        "Portal sign-in attempts by sub-path and outcome"
    );
    metrics::describe_counter!(
        "oauth_token_refresh_total",
        "Access token refreshes by outcome"
    );
    metrics::describe_counter!(
        "cloudprint_poll_attempts_total",
        "Job history polls while awaiting completion"
    );
    metrics::describe_counter!(
        "cloudprint_jobs_total",
        "Submitted print jobs by final outcome"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_does_not_panic_without_recorder() {
        describe();
    }

    #[test]
    fn descriptions_render_as_help_lines() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            describe();
            metrics::counter!("cloudprint_jobs_total", "outcome" => "done").increment(2);
        });

        let rendered = handle.render();
        assert!(
            rendered.contains("# HELP cloudprint_jobs_total Submitted print jobs by final outcome"),
            "missing help line:\n{rendered}"
        );
        assert!(
            rendered.contains(r#"cloudprint_jobs_total{outcome="done"} 2"#),
            "missing sample:\n{rendered}"
        );
    }
}

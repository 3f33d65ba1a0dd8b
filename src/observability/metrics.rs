//! Metrics collection for `CyberLabs`.
//!
//! Prometheus-compatible metrics with label cardinality protection and
//! typed helpers for recording measurements.

use std::sync::atomic::{AtomicBool, Ordering};

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::CyberLabsError;
use crate::terminal::interpreter::{BUILTINS, KNOWN_TOOLS, MatchSource};

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Binaries that appear in the built-in scenarios but are neither builtins
/// nor whitelisted tools.
const SCENARIO_BINARIES: [&str; 9] = [
    "whoami", "id", "ifconfig", "ip", "sudo", "uname", "sqlmap", "./script.sh", "alert(\"XSS\")",
];

/// Sanitizes a typed binary name for use as a metrics label.
///
/// Learners type arbitrary text; anything outside the known set is bucketed
/// as `"__unknown__"`.
#[must_use]
pub fn sanitize_binary_label(binary: &str) -> &str {
    if BUILTINS.contains(&binary)
        || KNOWN_TOOLS.contains(&binary)
        || SCENARIO_BINARIES.contains(&binary)
    {
        binary
    } else {
        "__unknown__"
    }
}

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`. When `None`, the recorder is installed without an
/// HTTP endpoint.
///
/// # Errors
///
/// Returns `CyberLabsError::Io` if the recorder or HTTP listener cannot be
/// installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), CyberLabsError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| CyberLabsError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

fn describe_metrics() {
    describe_counter!(
        "cyberlabs_commands_total",
        "Commands answered by the simulated terminal"
    );
    describe_counter!(
        "cyberlabs_answers_total",
        "Step answers evaluated, by outcome"
    );
    describe_counter!("cyberlabs_awards_total", "Award attempts, by status");
    describe_counter!("cyberlabs_points_awarded_total", "Points credited");
    describe_counter!("cyberlabs_labs_opened_total", "Lab sessions opened");
    describe_gauge!("cyberlabs_active_sessions", "Lab sessions currently open");
}

/// Records one interpreted command.
pub fn record_command(binary: &str, source: MatchSource) {
    counter!(
        "cyberlabs_commands_total",
        "binary" => sanitize_binary_label(binary).to_owned(),
        "source" => source.as_str(),
    )
    .increment(1);
}

/// Records one evaluated answer.
pub fn record_answer(correct: bool) {
    let outcome = if correct { "correct" } else { "incorrect" };
    counter!("cyberlabs_answers_total", "outcome" => outcome).increment(1);
}

/// Records an award attempt and the points it credited.
pub fn record_award(status: &'static str, points: u64) {
    counter!("cyberlabs_awards_total", "status" => status).increment(1);
    if points > 0 {
        counter!("cyberlabs_points_awarded_total").increment(points);
    }
}

/// Records a lab session opening.
pub fn record_lab_opened() {
    counter!("cyberlabs_labs_opened_total").increment(1);
    gauge!("cyberlabs_active_sessions").increment(1.0);
}

/// Records a lab session closing.
pub fn record_lab_closed() {
    gauge!("cyberlabs_active_sessions").decrement(1.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_binaries_keep_their_label() {
        for binary in ["ls", "nmap", "whoami", "sudo"] {
            assert_eq!(sanitize_binary_label(binary), binary);
        }
    }

    #[test]
    fn unknown_binaries_are_bucketed() {
        assert_eq!(sanitize_binary_label("rm"), "__unknown__");
        assert_eq!(sanitize_binary_label(""), "__unknown__");
        assert_eq!(sanitize_binary_label(&"x".repeat(10_000)), "__unknown__");
    }

    #[test]
    fn record_functions_do_not_panic_without_recorder() {
        record_command("ls", MatchSource::Builtin);
        record_command("rm", MatchSource::NotFound);
        record_answer(true);
        record_answer(false);
        record_award("awarded", 100);
        record_award("already_solved", 0);
        record_lab_opened();
        record_lab_closed();
    }
}

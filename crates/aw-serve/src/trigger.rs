use crate::AppState;
use aw_core::alerts::Alert;
use aw_core::analysis::run_analyzer;
use chrono::Utc;
use tracing::{info, warn};

/// Hand an alert to the external analyzer without blocking the caller.
///
/// Consults the throttle first; either way the trigger timestamp is
/// recorded so the cool-down window tracks the most recent attempt. The
/// analyzer runs on a blocking task and its outcome goes to the log only —
/// nothing propagates back to the HTTP handler or poll cycle that asked.
pub fn spawn_analysis(state: &AppState, alert: Alert) {
    let now = Utc::now();
    let throttled = state.throttle.should_throttle(&alert.service, now);
    state.throttle.record_trigger(&alert.service, now);
    if throttled {
        info!(
            service = %alert.service,
            alert = %alert.alert_name,
            "analysis throttled; skipping"
        );
        return;
    }

    let config = state.analyzer.clone();
    tokio::task::spawn_blocking(move || {
        info!(
            service = %alert.service,
            alert_id = %alert.alert_id,
            error_count = alert.error_count,
            "invoking error analyzer"
        );
        match run_analyzer(&config, &alert) {
            Ok(outcome) => {
                info!(
                    service = %alert.service,
                    total_errors = outcome.analysis.total_errors,
                    patterns = outcome.analysis.patterns.len(),
                    root_cause = outcome.analysis.root_cause.as_deref().unwrap_or("unknown"),
                    "error analysis complete"
                );
                if let Some(issue) = outcome.linear_issue {
                    info!(
                        issue = %issue.identifier,
                        url = outcome.linear_issue_url.as_deref().unwrap_or(""),
                        "analyzer filed issue"
                    );
                } else if outcome.linear_issue_data.is_some() {
                    info!(service = %alert.service, "analyzer produced an issue draft");
                }
                for action in outcome.actions_taken {
                    info!(service = %alert.service, action = %action, "analyzer action");
                }
            }
            Err(err) => {
                warn!(service = %alert.service, error = %err, "error analysis failed");
            }
        }
    });
}

use crate::alerts::Alert;
use crate::error::AnalysisError;
use serde::Deserialize;
use serde_json::Value;
use std::io::Read as _;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

const OUTPUT_LIMIT: usize = 64 * 1024;

pub const DEFAULT_ANALYZER_COMMAND: &str = "python3 scripts/analyze_errors.py";
pub const DEFAULT_ANALYZER_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Program plus leading arguments, shell-style. The JSON-encoded alert
    /// and `--output-format json` are appended at invocation time.
    pub command: String,
    pub timeout: Duration,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_ANALYZER_COMMAND.to_string(),
            timeout: Duration::from_secs(DEFAULT_ANALYZER_TIMEOUT_SECS),
        }
    }
}

/// Parsed analyzer stdout. Unknown fields are ignored; the contract only
/// promises the `analysis` object and the optional issue references.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisOutcome {
    #[serde(default)]
    pub analysis: AnalysisSummary,
    pub linear_issue: Option<LinearIssue>,
    pub linear_issue_url: Option<String>,
    pub linear_issue_data: Option<Value>,
    #[serde(default)]
    pub actions_taken: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisSummary {
    #[serde(default)]
    pub total_errors: i64,
    #[serde(default)]
    pub patterns: Vec<Value>,
    pub root_cause: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinearIssue {
    pub identifier: String,
}

/// Run the external analyzer to completion and interpret its output.
///
/// Blocking: callers on the async runtime wrap this in `spawn_blocking`.
/// The child is killed once the configured timeout elapses.
pub fn run_analyzer(
    config: &AnalyzerConfig,
    alert: &Alert,
) -> Result<AnalysisOutcome, AnalysisError> {
    let argv = shell_words::split(&config.command).map_err(|err| AnalysisError::Spawn {
        message: err.to_string(),
    })?;
    let (program, args) = argv.split_first().ok_or_else(|| AnalysisError::Spawn {
        message: "analyzer command empty".to_string(),
    })?;
    let alert_json = serde_json::to_string(alert).map_err(|err| AnalysisError::Spawn {
        message: err.to_string(),
    })?;

    let mut command = Command::new(program);
    command
        .args(args)
        .arg(alert_json)
        .arg("--output-format")
        .arg("json")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command.spawn().map_err(|err| AnalysisError::Spawn {
        message: err.to_string(),
    })?;

    let deadline = Instant::now() + config.timeout;
    let mut timed_out = false;
    loop {
        if child
            .try_wait()
            .map_err(|err| AnalysisError::Spawn {
                message: err.to_string(),
            })?
            .is_some()
        {
            break;
        }
        if Instant::now() >= deadline {
            timed_out = true;
            let _ = child.kill();
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    let output = child
        .wait_with_output()
        .map_err(|err| AnalysisError::Spawn {
            message: err.to_string(),
        })?;

    if timed_out {
        return Err(AnalysisError::Timeout {
            seconds: config.timeout.as_secs(),
        });
    }

    let stdout = limit_output(output.stdout);
    let stderr = limit_output(output.stderr);
    match output.status.code() {
        Some(0) => serde_json::from_str(&stdout).map_err(|err| AnalysisError::InvalidOutput {
            message: err.to_string(),
        }),
        code => Err(AnalysisError::Failed { code, stderr }),
    }
}

fn limit_output(data: Vec<u8>) -> String {
    let mut sliced = data;
    if sliced.len() > OUTPUT_LIMIT {
        sliced.truncate(OUTPUT_LIMIT);
    }
    let mut out = String::new();
    let mut reader = &sliced[..];
    let _ = reader.read_to_string(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_alert() -> Alert {
        Alert {
            alert_id: "a1".to_string(),
            alert_name: "Critical spike".to_string(),
            service: "resume-agent".to_string(),
            error_count: 17,
            severity: "high".to_string(),
            timestamp: Utc::now(),
            time_range: Some("last 5m".to_string()),
            query_context: None,
        }
    }

    fn config(command: &str, timeout: Duration) -> AnalyzerConfig {
        AnalyzerConfig {
            command: command.to_string(),
            timeout,
        }
    }

    #[test]
    fn exit_zero_with_json_parses() {
        // `sh -c` ignores the appended alert/flag arguments.
        let outcome = run_analyzer(
            &config(
                r#"sh -c 'echo "{\"analysis\":{\"total_errors\":17,\"patterns\":[],\"root_cause\":\"db timeout\"},\"actions_taken\":[\"queried logs\"]}"'"#,
                Duration::from_secs(5),
            ),
            &test_alert(),
        )
        .unwrap();
        assert_eq!(outcome.analysis.total_errors, 17);
        assert_eq!(outcome.analysis.root_cause.as_deref(), Some("db timeout"));
        assert_eq!(outcome.actions_taken, vec!["queried logs".to_string()]);
        assert!(outcome.linear_issue.is_none());
    }

    #[test]
    fn nonzero_exit_maps_to_failed_with_stderr() {
        let err = run_analyzer(
            &config("sh -c 'echo boom >&2; exit 3'", Duration::from_secs(5)),
            &test_alert(),
        )
        .unwrap_err();
        match err {
            AnalysisError::Failed { code, stderr } => {
                assert_eq!(code, Some(3));
                assert!(stderr.contains("boom"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn non_json_stdout_maps_to_invalid_output() {
        let err = run_analyzer(
            &config("sh -c 'echo not-json'", Duration::from_secs(5)),
            &test_alert(),
        )
        .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidOutput { .. }));
    }

    #[test]
    fn hung_analyzer_is_killed_at_the_deadline() {
        let err = run_analyzer(
            &config("sh -c 'sleep 5'", Duration::from_millis(200)),
            &test_alert(),
        )
        .unwrap_err();
        assert!(matches!(err, AnalysisError::Timeout { .. }));
    }

    #[test]
    fn missing_program_maps_to_spawn_error() {
        let err = run_analyzer(
            &config("definitely-not-a-real-binary-aw", Duration::from_secs(1)),
            &test_alert(),
        )
        .unwrap_err();
        assert!(matches!(err, AnalysisError::Spawn { .. }));
    }

    #[test]
    fn issue_reference_is_extracted_when_present() {
        let outcome = run_analyzer(
            &config(
                r#"sh -c 'echo "{\"analysis\":{\"total_errors\":2},\"linear_issue\":{\"identifier\":\"OBS-12\"},\"linear_issue_url\":\"https://linear.app/obs/issue/OBS-12\"}"'"#,
                Duration::from_secs(5),
            ),
            &test_alert(),
        )
        .unwrap();
        assert_eq!(
            outcome.linear_issue.map(|issue| issue.identifier),
            Some("OBS-12".to_string())
        );
        assert!(outcome.linear_issue_url.is_some());
    }
}

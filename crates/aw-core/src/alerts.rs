use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

pub const ANALYSIS_ERROR_COUNT_THRESHOLD: i64 = 10;

/// Normalized alert handed to the analysis subprocess, whether it came in
/// over the webhook or was raised by the error-rate poller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Alert {
    pub alert_id: String,
    pub alert_name: String,
    pub service: String,
    pub error_count: i64,
    pub severity: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_context: Option<Value>,
}

impl Alert {
    /// Build an alert from an external webhook body. Every field is
    /// optional on the wire; missing ones get neutral defaults and an
    /// `alert_id` is synthesized when absent.
    pub fn from_webhook(body: &Value, now: DateTime<Utc>) -> Self {
        let str_field = |key: &str| body.get(key).and_then(Value::as_str).map(str::to_string);
        let service = str_field("service").unwrap_or_else(|| "unknown".to_string());
        Self {
            alert_id: str_field("alert_id")
                .unwrap_or_else(|| format!("alert-{}", now.timestamp_millis())),
            alert_name: str_field("alert_name").unwrap_or_else(|| "External Alert".to_string()),
            error_count: body.get("error_count").and_then(Value::as_i64).unwrap_or(0),
            severity: str_field("severity").unwrap_or_else(|| "unknown".to_string()),
            timestamp: str_field("timestamp")
                .and_then(|value| DateTime::parse_from_rfc3339(&value).ok())
                .map_or(now, |parsed| parsed.with_timezone(&Utc)),
            time_range: str_field("time_range"),
            query_context: body.get("query_context").cloned(),
            service,
        }
    }

    /// Build the alert raised when the poller sees `error_count` errors for
    /// `service` within the lookback window.
    pub fn from_polling(
        service: &str,
        error_count: i64,
        threshold: i64,
        time_window: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            alert_id: format!("poll-{service}-{}", now.timestamp_millis()),
            alert_name: format!("High error rate on {service}"),
            service: service.to_string(),
            error_count,
            severity: if error_count >= threshold * 2 {
                "high".to_string()
            } else {
                "medium".to_string()
            },
            timestamp: now,
            time_range: Some(format!("last {time_window}")),
            query_context: None,
        }
    }
}

/// Webhook decision rule: analysis runs when severity is "high", the error
/// count is past the fixed threshold, or the alert name contains "Critical"
/// (case-sensitive).
pub fn should_analyze(alert: &Alert) -> bool {
    alert.severity == "high"
        || alert.error_count > ANALYSIS_ERROR_COUNT_THRESHOLD
        || alert.alert_name.contains("Critical")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_alert() -> Alert {
        Alert {
            alert_id: "a1".to_string(),
            alert_name: "DB errors".to_string(),
            service: "resume-agent".to_string(),
            error_count: 3,
            severity: "low".to_string(),
            timestamp: Utc::now(),
            time_range: None,
            query_context: None,
        }
    }

    #[test]
    fn low_severity_low_count_plain_name_is_skipped() {
        assert!(!should_analyze(&base_alert()));
    }

    #[test]
    fn high_severity_alone_qualifies() {
        let mut alert = base_alert();
        alert.severity = "high".to_string();
        assert!(should_analyze(&alert));
    }

    #[test]
    fn count_above_threshold_qualifies() {
        let mut alert = base_alert();
        alert.error_count = 11;
        assert!(should_analyze(&alert));
        alert.error_count = 10;
        assert!(!should_analyze(&alert));
    }

    #[test]
    fn critical_name_qualifies_even_when_everything_else_is_calm() {
        let mut alert = base_alert();
        alert.alert_name = "Critical DB errors".to_string();
        assert!(should_analyze(&alert));
        // Case-sensitive match.
        alert.alert_name = "critical DB errors".to_string();
        assert!(!should_analyze(&alert));
    }

    #[test]
    fn webhook_defaults_fill_missing_fields() {
        let now = Utc::now();
        let alert = Alert::from_webhook(&json!({"service": "resume-agent"}), now);
        assert_eq!(alert.service, "resume-agent");
        assert_eq!(alert.error_count, 0);
        assert_eq!(alert.severity, "unknown");
        assert!(alert.alert_id.starts_with("alert-"));
        assert_eq!(alert.timestamp, now);
    }

    #[test]
    fn webhook_passthrough_fields_are_kept() {
        let alert = Alert::from_webhook(
            &json!({
                "alert_id": "es-42",
                "alert_name": "Critical spike",
                "service": "job-analyzer",
                "error_count": 17,
                "severity": "high",
                "query_context": {"index": "logs-*"}
            }),
            Utc::now(),
        );
        assert_eq!(alert.alert_id, "es-42");
        assert_eq!(alert.error_count, 17);
        assert_eq!(alert.query_context, Some(json!({"index": "logs-*"})));
        assert!(should_analyze(&alert));
    }

    #[test]
    fn polling_alert_severity_scales_with_count() {
        let now = Utc::now();
        let medium = Alert::from_polling("resume-agent", 12, 10, "5m", now);
        assert_eq!(medium.severity, "medium");
        assert!(medium.alert_id.starts_with("poll-resume-agent-"));
        let high = Alert::from_polling("resume-agent", 20, 10, "5m", now);
        assert_eq!(high.severity, "high");
        assert_eq!(high.time_range.as_deref(), Some("last 5m"));
    }
}

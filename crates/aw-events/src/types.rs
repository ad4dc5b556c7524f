use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// A persisted record of something that happened in a monitored agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EventRecord {
    pub id: i64,
    pub source_app: String,
    pub session_id: String,
    pub hook_event_type: String,
    pub payload: Value,
    #[serde(rename = "humanInTheLoop", skip_serializing_if = "Option::is_none")]
    pub human_in_the_loop: Option<HumanInTheLoop>,
    pub timestamp: DateTime<Utc>,
}

/// A pending or resolved request for human judgment attached to an event.
///
/// `responded_at` is set by the server at response time; a client-supplied
/// value is never trusted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HumanInTheLoop {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_web_socket_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responded_at: Option<DateTime<Utc>>,
}

impl HumanInTheLoop {
    pub fn is_responded(&self) -> bool {
        self.responded_at.is_some()
    }
}

/// Ingestion shape: an event before the store assigns id and timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewEvent {
    pub source_app: String,
    pub session_id: String,
    pub hook_event_type: String,
    pub payload: Value,
    #[serde(rename = "humanInTheLoop", skip_serializing_if = "Option::is_none")]
    pub human_in_the_loop: Option<HumanInTheLoop>,
}

/// Distinct values present for each filterable dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FilterOptions {
    pub source_apps: Vec<String>,
    pub session_ids: Vec<String>,
    pub hook_event_types: Vec<String>,
}

/// Wire envelope pushed to dashboard WebSocket clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum StreamMessage {
    Initial(Vec<EventRecord>),
    Event(EventRecord),
    Alert(EventRecord),
    PollingAlert(EventRecord),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_message_envelope_shape() {
        let record = EventRecord {
            id: 7,
            source_app: "resume-agent".to_string(),
            session_id: "s1".to_string(),
            hook_event_type: "PreToolUse".to_string(),
            payload: serde_json::json!({}),
            human_in_the_loop: None,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(StreamMessage::Event(record)).unwrap();
        assert_eq!(json["type"], "event");
        assert_eq!(json["data"]["id"], 7);

        let json = serde_json::to_value(StreamMessage::Initial(Vec::new())).unwrap();
        assert_eq!(json["type"], "initial");
        assert!(json["data"].as_array().unwrap().is_empty());
    }

    #[test]
    fn hitl_serializes_camel_case() {
        let hitl = HumanInTheLoop {
            response_web_socket_url: Some("ws://localhost:9090/agent".to_string()),
            request: None,
            response: Some(serde_json::json!({"decision": "approve"})),
            responded_at: Some(Utc::now()),
        };
        let json = serde_json::to_value(&hitl).unwrap();
        assert!(json.get("responseWebSocketUrl").is_some());
        assert!(json.get("respondedAt").is_some());
        assert!(json.get("request").is_none());
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A backend-announced run step, carried by `start` and terminal events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStep {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: String,
}

/// Payload shared by the `final` and `end` terminal events.
///
/// `final` carries the richer metadata; minimal backends send only `end`
/// with the same shape, so both map here and UI code handles one type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalPayload {
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<RunStep>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_messages: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<Value>>,
}

/// Enumerates supported `StreamEvent` values.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Start { steps: Vec<RunStep> },
    Status { stage: String },
    StepUpdate { step_id: String, status: String },
    Delta { text: String },
    Chunk { cumulative_text: String },
    Final(TerminalPayload),
    End(TerminalPayload),
    Error { message: String },
}

impl StreamEvent {
    /// Returns true for the events that end a stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Final(_) | Self::End(_))
    }

    /// Maps an effective wire event name plus decoded payload to a typed
    /// event. Unknown names return `None` and are skipped by the decoder.
    pub(crate) fn from_wire(name: &str, payload: &Value) -> Option<Self> {
        match name {
            "start" => Some(Self::Start {
                steps: parse_steps(payload.get("steps")),
            }),
            "status" => Some(Self::Status {
                stage: string_field(payload, &["stage", "status"]),
            }),
            "step_update" => Some(Self::StepUpdate {
                step_id: string_field(payload, &["stepId", "id"]),
                status: string_field(payload, &["status"]),
            }),
            "delta" => Some(Self::Delta {
                text: string_field(payload, &["text", "content"]),
            }),
            "chunk" => Some(Self::Chunk {
                cumulative_text: string_field(payload, &["content", "text"]),
            }),
            "final" => Some(Self::Final(terminal_payload(payload))),
            "end" => Some(Self::End(terminal_payload(payload))),
            "error" => Some(Self::Error {
                message: error_message(payload),
            }),
            _ => None,
        }
    }
}

fn parse_steps(raw: Option<&Value>) -> Vec<RunStep> {
    raw.cloned()
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default()
}

fn string_field(payload: &Value, candidates: &[&str]) -> String {
    candidates
        .iter()
        .find_map(|key| payload.get(key).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}

fn terminal_payload(payload: &Value) -> TerminalPayload {
    serde_json::from_value(payload.clone()).unwrap_or_else(|_| TerminalPayload {
        content: string_field(payload, &["content", "text"]),
        ..TerminalPayload::default()
    })
}

fn error_message(payload: &Value) -> String {
    if let Some(message) = payload.get("message").and_then(Value::as_str) {
        return message.to_string();
    }
    match payload.get("error") {
        Some(Value::String(message)) => message.clone(),
        Some(Value::Object(object)) => object
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("stream returned error event")
            .to_string(),
        _ => "stream returned error event".to_string(),
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;

use atrium_stream::RunStep;

/// Body for both the synchronous and the streaming chat call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub tenant_id: String,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirm: Option<bool>,
}

impl ChatRequest {
    pub fn new(
        tenant_id: impl Into<String>,
        session_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            session_id: session_id.into(),
            channel: None,
            message: message.into(),
            metadata: None,
            confirm: None,
        }
    }
}

/// Parsed response of the synchronous chat call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub tenant_id: String,
    pub session_id: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<RunStep>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_messages: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<Value>>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ChatRequest, ChatResponse};

    #[test]
    fn request_serializes_camel_case_and_omits_absent_options() {
        let body = serde_json::to_value(ChatRequest::new("t1", "s1", "hello")).expect("serialize");
        assert_eq!(
            body,
            json!({ "tenantId": "t1", "sessionId": "s1", "message": "hello" })
        );
    }

    #[test]
    fn response_tolerates_minimal_payloads() {
        let response: ChatResponse = serde_json::from_value(json!({
            "tenantId": "t1",
            "sessionId": "s1",
        }))
        .expect("deserialize");
        assert_eq!(response.content, "");
        assert!(response.steps.is_none());
    }
}

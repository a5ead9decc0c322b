use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Backend-reported run state. Transitions only move forward; `Running` is
/// the only state a poll may repeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    NeedsInput,
    Failed,
    Completed,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::Completed)
    }
}

/// Identifies one submitted run and its last observed state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunHandle {
    pub run_id: String,
    pub status: RunStatus,
}

/// Body for run submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSubmitRequest {
    pub tenant_id: String,
    pub action_id: String,
    pub context: Value,
}

/// Shape shared by run submission and poll-by-id responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatusResponse {
    pub run_id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub missing_fields: Vec<String>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunStatusResponse {
    pub fn handle(&self) -> RunHandle {
        RunHandle {
            run_id: self.run_id.clone(),
            status: self.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{RunStatus, RunStatusResponse};

    #[test]
    fn run_status_parses_wire_names() {
        let response: RunStatusResponse = serde_json::from_value(json!({
            "runId": "run_1",
            "status": "needs_input",
            "missingFields": ["thread_id"],
        }))
        .expect("deserialize");
        assert_eq!(response.status, RunStatus::NeedsInput);
        assert_eq!(response.missing_fields, vec!["thread_id".to_string()]);
        assert!(!response.status.is_terminal());
    }

    #[test]
    fn terminal_states_are_failed_and_completed() {
        assert!(RunStatus::Failed.is_terminal());
        assert!(RunStatus::Completed.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
        assert!(!RunStatus::NeedsInput.is_terminal());
    }
}

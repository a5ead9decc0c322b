use serde_json::Value;
use thiserror::Error;

/// Status reported for connectivity failures, where no backend status
/// exists.
pub const CONNECTIVITY_STATUS: u16 = 503;

/// Enumerates supported `GatewayError` values.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request never reached the backend (DNS, refused, transport
    /// timeout). Distinct from an error response: callers can branch on
    /// "never got a response" vs "got an error response".
    #[error("backend unreachable: {message}; check that the gateway service is available")]
    Connectivity { message: String },
    /// The backend answered with a non-2xx status. `body` is the backend's
    /// structured error when it parses, the raw text otherwise.
    #[error("gateway returned status {status}: {message}")]
    Status {
        status: u16,
        message: String,
        body: Value,
    },
    #[error("request cancelled")]
    Cancelled,
    #[error("gateway client configuration invalid: {0}")]
    Configuration(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl GatewayError {
    /// Effective HTTP status for branching: the backend's own status for
    /// application errors, 503 for connectivity failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Connectivity { .. } => Some(CONNECTIVITY_STATUS),
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity { .. })
    }

    /// Translates a non-2xx response body into a typed error.
    pub fn from_error_body(status: u16, raw: &str) -> Self {
        let trimmed = raw.trim();
        match serde_json::from_str::<Value>(trimmed) {
            Ok(body) => {
                let message = body
                    .get("message")
                    .and_then(Value::as_str)
                    .or_else(|| body.get("error").and_then(Value::as_str))
                    .unwrap_or("gateway request failed")
                    .to_string();
                Self::Status {
                    status,
                    message,
                    body,
                }
            }
            Err(_) => {
                let message = if trimmed.is_empty() {
                    "gateway request failed with empty body".to_string()
                } else {
                    trimmed.to_string()
                };
                Self::Status {
                    status,
                    message,
                    body: Value::String(trimmed.to_string()),
                }
            }
        }
    }
}

use thiserror::Error;

use atrium_gateway::GatewayError;

use crate::output::OutputShapeError;

/// Enumerates supported `ActionError` values.
#[derive(Debug, Error)]
pub enum ActionError {
    /// Unknown action id, or a target domain outside the action's
    /// definition. Detected locally; no network call is made.
    #[error("unsupported action '{action_id}': {detail}")]
    UnsupportedAction { action_id: String, detail: String },
    /// The domain fallback chain produced no usable target identifier.
    #[error("no usable target identifier for domain {domain}")]
    MissingTarget { domain: String },
    /// Poll budget exhausted while the backend still reported running.
    /// Retryable with backoff, unlike `RunFailed`.
    #[error("run {run_id} still running after {attempts} poll attempts")]
    RunTimeout { run_id: String, attempts: usize },
    /// Explicit failure status from the backend.
    #[error("run {run_id} failed: {message}")]
    RunFailed { run_id: String, message: String },
    #[error("action run cancelled")]
    Cancelled,
    /// A completed run whose result failed structural validation. Hard
    /// failure; never silently coerced.
    #[error(transparent)]
    OutputShape(#[from] OutputShapeError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

//! The action run state machine: submit, interrupt, bounded poll,
//! validate. Stateless across calls; side effects leave through the audit
//! log and an optional notification channel, never through the return path.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::sleep;

use atrium_core::{current_unix_timestamp_ms, CooperativeCancellationToken};
use atrium_gateway::{
    GatewayClient, GatewayError, RunHandle, RunStatus, RunStatusResponse, RunSubmitRequest,
};

use crate::audit::{AuditEntry, AuditLog, AuditOutcome};
use crate::catalog::{ActionDomain, ActionId};
use crate::context::build_context;
use crate::error::ActionError;
use crate::output::{validate_output, ActionOutput};
use crate::target::ActionTargetRef;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_200;
pub const DEFAULT_MAX_POLL_ATTEMPTS: usize = 25;

/// Public struct `RunnerConfig` used across Atrium components.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub poll_interval_ms: u64,
    pub max_poll_attempts: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }
}

/// Options for one action invocation.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub tenant_id: String,
    pub target: ActionTargetRef,
    pub module_context: Value,
    pub ui_context: Value,
    pub cancel: Option<CooperativeCancellationToken>,
}

impl RunOptions {
    pub fn new(tenant_id: impl Into<String>, target: ActionTargetRef) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            target,
            module_context: Value::Object(serde_json::Map::new()),
            ui_context: Value::Object(serde_json::Map::new()),
            cancel: None,
        }
    }
}

/// Outcome of one completed call.
///
/// Needs-input is terminal for this call but resumable: the caller
/// re-invokes with a context that supplies the missing fields. The runner
/// holds no state between calls.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionRunOutcome {
    Completed {
        handle: RunHandle,
        output: ActionOutput,
    },
    NeedsInput {
        handle: RunHandle,
        missing_fields: Vec<String>,
        errors: Vec<String>,
        reason_code: Option<String>,
    },
}

/// Notification emitted by the runner. Delivery (toasts, activity feed) is
/// a separate task's concern; the runner only sends.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionNotification {
    pub action_id: String,
    pub domain: ActionDomain,
    pub target_id: Option<String>,
    pub outcome: AuditOutcome,
    pub message: String,
}

/// Orchestrates one action execution end-to-end.
pub struct ActionRunner {
    gateway: Arc<GatewayClient>,
    config: RunnerConfig,
    audit: AuditLog,
    notifications: Option<mpsc::UnboundedSender<ActionNotification>>,
}

impl ActionRunner {
    pub fn new(gateway: Arc<GatewayClient>, config: RunnerConfig) -> Self {
        Self {
            gateway,
            config,
            audit: AuditLog::new(),
            notifications: None,
        }
    }

    /// Routes completion/failure notifications into `sender`. Sends are
    /// fire-and-forget; a dropped receiver never fails a run.
    pub fn with_notifications(mut self, sender: mpsc::UnboundedSender<ActionNotification>) -> Self {
        self.notifications = Some(sender);
        self
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Runs one action against one target: build context, submit, handle
    /// the needs-input interrupt, poll to completion or timeout, validate.
    pub async fn run(
        &self,
        action_id: &str,
        options: RunOptions,
    ) -> Result<ActionRunOutcome, ActionError> {
        let action = ActionId::parse(action_id).ok_or_else(|| ActionError::UnsupportedAction {
            action_id: action_id.to_string(),
            detail: "unknown action id".to_string(),
        })?;
        let definition = action.definition();
        if !definition.supports_domain(options.target.domain) {
            return Err(ActionError::UnsupportedAction {
                action_id: action.as_str().to_string(),
                detail: format!(
                    "domain {} not supported by this action",
                    options.target.domain.as_str()
                ),
            });
        }

        let context = build_context(
            &options.target,
            &options.module_context,
            options.ui_context.clone(),
        );
        let Some(target_id) = context.target_id().map(str::to_string) else {
            return Err(ActionError::MissingTarget {
                domain: options.target.domain.as_str().to_string(),
            });
        };

        let submit = RunSubmitRequest {
            tenant_id: options.tenant_id.clone(),
            action_id: action.as_str().to_string(),
            context: serde_json::to_value(&context).map_err(GatewayError::from)?,
        };
        let response = self
            .gateway
            .submit_run(&submit, options.cancel.as_ref())
            .await?;
        tracing::debug!(
            action = action.as_str(),
            run_id = %response.run_id,
            status = ?response.status,
            "action run submitted"
        );

        match response.status {
            RunStatus::NeedsInput => Ok(needs_input_outcome(response)),
            RunStatus::Failed => Err(self.report_failure(action, &options.target, &target_id, response)),
            RunStatus::Completed => self.finish_completed(action, &options.target, &target_id, response),
            RunStatus::Running => {
                self.poll_to_completion(action, &options, &target_id, response)
                    .await
            }
        }
    }

    /// Strictly sequential sleep-then-poll with a fixed interval and a
    /// bounded attempt count. Cancellation is checked between iterations; a
    /// sleep already in progress runs to completion.
    async fn poll_to_completion(
        &self,
        action: ActionId,
        options: &RunOptions,
        target_id: &str,
        submitted: RunStatusResponse,
    ) -> Result<ActionRunOutcome, ActionError> {
        let run_id = submitted.run_id.clone();

        for _attempt in 0..self.config.max_poll_attempts {
            if let Some(cancel) = &options.cancel {
                if cancel.is_cancelled() {
                    return Err(ActionError::Cancelled);
                }
            }

            sleep(Duration::from_millis(self.config.poll_interval_ms)).await;
            let polled = self.gateway.poll_run(&run_id, &options.tenant_id).await?;
            match polled.status {
                RunStatus::Running => continue,
                RunStatus::NeedsInput => return Ok(needs_input_outcome(polled)),
                RunStatus::Failed => {
                    return Err(self.report_failure(action, &options.target, target_id, polled))
                }
                RunStatus::Completed => {
                    return self.finish_completed(action, &options.target, target_id, polled)
                }
            }
        }

        tracing::warn!(
            action = action.as_str(),
            run_id = %run_id,
            attempts = self.config.max_poll_attempts,
            "action run timed out while still running"
        );
        self.emit(
            action,
            &options.target,
            Some(target_id),
            Some(&run_id),
            AuditOutcome::TimedOut,
            format!(
                "still running after {} poll attempts",
                self.config.max_poll_attempts
            ),
        );
        Err(ActionError::RunTimeout {
            run_id,
            attempts: self.config.max_poll_attempts,
        })
    }

    fn finish_completed(
        &self,
        action: ActionId,
        target: &ActionTargetRef,
        target_id: &str,
        response: RunStatusResponse,
    ) -> Result<ActionRunOutcome, ActionError> {
        let handle = response.handle();
        let raw = response.result.unwrap_or(Value::Null);
        match validate_output(action.definition().output, raw) {
            Ok(output) => {
                self.emit(
                    action,
                    target,
                    Some(target_id),
                    Some(&handle.run_id),
                    AuditOutcome::Completed,
                    "completed".to_string(),
                );
                Ok(ActionRunOutcome::Completed { handle, output })
            }
            Err(error) => {
                self.emit(
                    action,
                    target,
                    Some(target_id),
                    Some(&handle.run_id),
                    AuditOutcome::Failed,
                    format!("output rejected: {error}"),
                );
                Err(ActionError::OutputShape(error))
            }
        }
    }

    fn report_failure(
        &self,
        action: ActionId,
        target: &ActionTargetRef,
        target_id: &str,
        response: RunStatusResponse,
    ) -> ActionError {
        let message = response
            .error
            .clone()
            .or_else(|| response.errors.first().cloned())
            .unwrap_or_else(|| "action run failed".to_string());
        self.emit(
            action,
            target,
            Some(target_id),
            Some(&response.run_id),
            AuditOutcome::Failed,
            message.clone(),
        );
        ActionError::RunFailed {
            run_id: response.run_id,
            message,
        }
    }

    /// Best-effort side effects. Neither the audit append nor the
    /// notification send is allowed to fail the call.
    fn emit(
        &self,
        action: ActionId,
        target: &ActionTargetRef,
        target_id: Option<&str>,
        run_id: Option<&str>,
        outcome: AuditOutcome,
        detail: String,
    ) {
        self.audit.append(AuditEntry {
            timestamp_ms: current_unix_timestamp_ms(),
            action_id: action.as_str().to_string(),
            domain: target.domain.as_str().to_string(),
            target_id: target_id.map(str::to_string),
            run_id: run_id.map(str::to_string),
            outcome,
            detail: detail.clone(),
        });

        if let Some(sender) = &self.notifications {
            let _ = sender.send(ActionNotification {
                action_id: action.as_str().to_string(),
                domain: target.domain,
                target_id: target_id.map(str::to_string),
                outcome,
                message: detail,
            });
        }
    }
}

fn needs_input_outcome(response: RunStatusResponse) -> ActionRunOutcome {
    let handle = response.handle();
    ActionRunOutcome::NeedsInput {
        handle,
        missing_fields: response.missing_fields,
        errors: response.errors,
        reason_code: response.reason_code,
    }
}

#[cfg(test)]
mod tests {
    use atrium_gateway::{RunStatus, RunStatusResponse};

    use super::{needs_input_outcome, ActionRunOutcome};

    #[test]
    fn needs_input_keeps_the_interrupt_fields_unchanged() {
        let outcome = needs_input_outcome(RunStatusResponse {
            run_id: "run_1".to_string(),
            status: RunStatus::NeedsInput,
            missing_fields: vec!["thread_id".to_string()],
            errors: vec!["thread_id is required".to_string()],
            reason_code: Some("missing_required_input".to_string()),
            result: None,
            error: None,
        });

        match outcome {
            ActionRunOutcome::NeedsInput {
                handle,
                missing_fields,
                errors,
                reason_code,
            } => {
                assert_eq!(handle.run_id, "run_1");
                assert_eq!(handle.status, RunStatus::NeedsInput);
                assert_eq!(missing_fields, vec!["thread_id".to_string()]);
                assert_eq!(errors, vec!["thread_id is required".to_string()]);
                assert_eq!(reason_code.as_deref(), Some("missing_required_input"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}

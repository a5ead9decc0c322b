//! Action execution layer for the Atrium assistant.
//!
//! Holds the closed action catalogue, the per-domain context builders with
//! PII redaction, the run state machine (submit, interrupt, bounded poll,
//! validate), and the output schema validator that stands between the
//! backend and UI code.

mod audit;
mod catalog;
mod context;
mod error;
mod output;
mod redact;
mod runner;
mod target;

pub use audit::{AuditEntry, AuditLog, AuditOutcome};
pub use catalog::{
    actions_for_domain, ActionDefinition, ActionDomain, ActionId, OutputKind, UiPlacement,
};
pub use context::{build_context, ActionContext, ContextTarget};
pub use error::ActionError;
pub use output::{
    validate_output, ActionOutput, ExtractedField, OutputShapeError, MAX_EXTRACTION_KEYS,
    MAX_PLAN_STEPS, MAX_RISK_FLAG_ITEMS, MAX_TAG_ITEMS, MAX_TASK_ITEMS, MAX_TEXT_LEN,
};
pub use redact::{redact_text, redact_value, EMAIL_MASK, PHONE_MASK};
pub use runner::{
    ActionNotification, ActionRunOutcome, ActionRunner, RunOptions, RunnerConfig,
    DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL_MS,
};
pub use target::ActionTargetRef;

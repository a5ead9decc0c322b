//! Per-domain context builders. Pure functions: they shape a target ref
//! plus a free-form module context into the envelope the backend routes on,
//! redacting free text on the way. Missing optional fields are fine; only
//! the runner turns "no identifier at all" into an error.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::catalog::ActionDomain;
use crate::redact::{redact_text, redact_value};
use crate::target::ActionTargetRef;

/// Canonical target block inside every action context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextTarget {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: Option<String>,
}

/// Domain-shaped payload submitted with an action run.
///
/// The `module`/`target`/`moduleContext`/`uiContext` envelope is always
/// present so the backend can route regardless of domain; `extra` carries
/// the bounded per-domain convenience fields at the top level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionContext {
    pub module: String,
    pub target: ContextTarget,
    pub module_context: Value,
    pub ui_context: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ActionContext {
    pub fn target_id(&self) -> Option<&str> {
        self.target.id.as_deref().filter(|id| !id.trim().is_empty())
    }
}

/// Identifier fallback priority and copied fields for one domain.
struct DomainShape {
    module: &'static str,
    default_kind: &'static str,
    id_fields: &'static [&'static str],
    copy_fields: &'static [&'static str],
}

/// Builds the context for the target's domain.
pub fn build_context(
    target: &ActionTargetRef,
    module_context: &Value,
    ui_context: Value,
) -> ActionContext {
    let shape = match target.domain {
        ActionDomain::Inbox => inbox_shape(),
        ActionDomain::Customers => customers_shape(),
        ActionDomain::Documents => documents_shape(),
        ActionDomain::Storage => storage_shape(),
        ActionDomain::Growth => growth_shape(),
        ActionDomain::Crm => crm_shape(),
        ActionDomain::Reviews => reviews_shape(),
    };
    assemble(shape, target, module_context, ui_context)
}

fn inbox_shape() -> &'static DomainShape {
    &DomainShape {
        module: "inbox",
        default_kind: "thread",
        id_fields: &["threadId", "messageId"],
        copy_fields: &["channel", "subject", "unread"],
    }
}

fn customers_shape() -> &'static DomainShape {
    &DomainShape {
        module: "customers",
        default_kind: "customer",
        id_fields: &["customerId", "contactId"],
        copy_fields: &["segment", "lifecycleStage", "company"],
    }
}

fn documents_shape() -> &'static DomainShape {
    &DomainShape {
        module: "documents",
        default_kind: "document",
        id_fields: &["documentId", "fileId"],
        copy_fields: &["fileName", "mimeType", "pageCount"],
    }
}

fn storage_shape() -> &'static DomainShape {
    &DomainShape {
        module: "storage",
        default_kind: "file",
        id_fields: &["fileId", "objectKey"],
        copy_fields: &["folder", "mimeType", "sizeBytes"],
    }
}

fn growth_shape() -> &'static DomainShape {
    &DomainShape {
        module: "growth",
        default_kind: "campaign",
        id_fields: &["campaignId", "audienceId"],
        copy_fields: &["channel", "audienceSize", "goal"],
    }
}

fn crm_shape() -> &'static DomainShape {
    &DomainShape {
        module: "crm",
        default_kind: "deal",
        id_fields: &["dealId", "opportunityId"],
        copy_fields: &["stage", "amount", "currency"],
    }
}

fn reviews_shape() -> &'static DomainShape {
    &DomainShape {
        module: "reviews",
        default_kind: "review",
        id_fields: &["reviewId"],
        copy_fields: &["rating", "source", "excerpt"],
    }
}

fn assemble(
    shape: &DomainShape,
    target: &ActionTargetRef,
    module_context: &Value,
    ui_context: Value,
) -> ActionContext {
    let mut module_context = module_context.clone();
    redact_value(&mut module_context);

    let id = first_string(&module_context, shape.id_fields)
        .or_else(|| non_empty(target.target_id.as_deref()));

    let mut extra = Map::new();
    copy_present_fields(&mut extra, &module_context, shape.copy_fields);
    if let Some(channel) = non_empty(target.channel.as_deref()) {
        extra.entry("channel".to_string()).or_insert(Value::String(channel));
    }

    ActionContext {
        module: shape.module.to_string(),
        target: ContextTarget {
            id,
            kind: non_empty(target.subtype.as_deref())
                .unwrap_or_else(|| shape.default_kind.to_string()),
            title: non_empty(target.title.as_deref()).map(|title| redact_text(&title)),
        },
        module_context,
        ui_context,
        extra,
    }
}

fn first_string(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        value
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|found| !found.is_empty())
            .map(str::to_string)
    })
}

fn copy_present_fields(dst: &mut Map<String, Value>, src: &Value, keys: &[&str]) {
    for key in keys {
        if let Some(found) = src.get(*key) {
            dst.insert((*key).to_string(), found.clone());
        }
    }
}

fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

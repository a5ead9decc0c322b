//! Output schema validation. Every completed run's raw result passes
//! through `validate_output` before UI code may see it; nothing else in the
//! process is permitted to fabricate an `ActionOutput`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::catalog::OutputKind;

pub const MAX_TEXT_LEN: usize = 20_000;
pub const MAX_TASK_ITEMS: usize = 20;
pub const MAX_TAG_ITEMS: usize = 12;
pub const MAX_RISK_FLAG_ITEMS: usize = 12;
pub const MAX_EXTRACTION_KEYS: usize = 12;
pub const MAX_PLAN_STEPS: usize = 32;

/// Enumerates supported `OutputShapeError` values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OutputShapeError {
    #[error("output payload must be an object, got {got}")]
    NotAnObject { got: &'static str },
    #[error("output kind mismatch: expected {expected}, got {got}")]
    KindMismatch { expected: &'static str, got: String },
    #[error("{kind} output invalid: {detail}")]
    Invalid { kind: &'static str, detail: String },
}

/// One extracted field of an `extraction` output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedField {
    pub name: String,
    pub value: String,
}

/// Validated, normalized action output. Constructed only by
/// `validate_output`; one variant per output kind, and the match in the
/// validator is exhaustive, so a new kind cannot ship without its contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionOutput {
    Summary { text: String },
    Draft { text: String },
    Reply { text: String },
    Tasks { items: Vec<String> },
    Tags { items: Vec<String> },
    RiskFlags { items: Vec<String> },
    Extraction { fields: Vec<ExtractedField> },
    Classification { label: String, confidence: Option<f64> },
    Plan { title: Option<String>, steps: Vec<String> },
    Notification { title: String, body: Option<String> },
}

/// Validates and normalizes one raw run result against the expected kind.
///
/// A raw value without a discriminant gets one injected from `kind`
/// (minimal backends omit the tag); a conflicting discriminant is a shape
/// violation. Unknown extra fields are tolerated, never a reason to reject.
pub fn validate_output(kind: OutputKind, raw: Value) -> Result<ActionOutput, OutputShapeError> {
    let object = match raw {
        Value::Object(object) => object,
        other => {
            return Err(OutputShapeError::NotAnObject {
                got: value_type_name(&other),
            })
        }
    };

    if let Some(declared) = object.get("kind").and_then(Value::as_str) {
        if !kind.matches_wire_name(declared) {
            return Err(OutputShapeError::KindMismatch {
                expected: kind.as_str(),
                got: declared.to_string(),
            });
        }
    }

    match kind {
        OutputKind::Summary => {
            text_output(&object, kind).map(|text| ActionOutput::Summary { text })
        }
        OutputKind::Draft => text_output(&object, kind).map(|text| ActionOutput::Draft { text }),
        OutputKind::Reply => text_output(&object, kind).map(|text| ActionOutput::Reply { text }),
        OutputKind::Tasks => list_output(&object, kind, &["items", "tasks"], MAX_TASK_ITEMS)
            .map(|items| ActionOutput::Tasks { items }),
        OutputKind::Tags => list_output(&object, kind, &["items", "tags"], MAX_TAG_ITEMS)
            .map(|items| ActionOutput::Tags { items }),
        OutputKind::RiskFlags => {
            list_output(&object, kind, &["items", "flags"], MAX_RISK_FLAG_ITEMS)
                .map(|items| ActionOutput::RiskFlags { items })
        }
        OutputKind::Extraction => extraction_output(&object),
        OutputKind::Classification => classification_output(&object),
        OutputKind::Plan => plan_output(&object),
        OutputKind::Notification => notification_output(&object),
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn text_output(object: &Map<String, Value>, kind: OutputKind) -> Result<String, OutputShapeError> {
    let raw = object
        .get("text")
        .or_else(|| object.get("content"))
        .and_then(Value::as_str)
        .ok_or_else(|| invalid(kind, "missing text field"))?;
    let text = raw.trim();
    if text.is_empty() {
        return Err(invalid(kind, "text must not be empty"));
    }
    if text.chars().count() > MAX_TEXT_LEN {
        return Err(invalid(
            kind,
            format!("text exceeds {MAX_TEXT_LEN} characters"),
        ));
    }
    Ok(text.to_string())
}

/// Trims, drops empties, and caps at `max` — deterministic and
/// order-preserving, and a no-op on already-normalized input.
fn list_output(
    object: &Map<String, Value>,
    kind: OutputKind,
    keys: &[&str],
    max: usize,
) -> Result<Vec<String>, OutputShapeError> {
    let raw = keys
        .iter()
        .find_map(|key| object.get(*key))
        .and_then(Value::as_array)
        .ok_or_else(|| invalid(kind, "missing list field"))?;

    let mut items = Vec::new();
    for item in raw {
        let text = item
            .as_str()
            .ok_or_else(|| invalid(kind, "list items must be strings"))?;
        let text = text.trim();
        if !text.is_empty() {
            items.push(text.to_string());
        }
    }
    if items.is_empty() {
        return Err(invalid(kind, "list must contain at least one item"));
    }
    items.truncate(max);
    Ok(items)
}

fn extraction_output(object: &Map<String, Value>) -> Result<ActionOutput, OutputShapeError> {
    let kind = OutputKind::Extraction;
    let raw = object
        .get("fields")
        .ok_or_else(|| invalid(kind, "missing fields"))?;

    let fields = match raw {
        // The backend's mapping form; insertion order is input order.
        Value::Object(mapping) => {
            let mut fields = Vec::new();
            for (name, value) in mapping {
                let value = value
                    .as_str()
                    .ok_or_else(|| invalid(kind, "field values must be strings"))?;
                fields.push(ExtractedField {
                    name: name.trim().to_string(),
                    value: value.trim().to_string(),
                });
            }
            fields
        }
        // Our own normalized form, accepted for idempotent re-validation.
        Value::Array(_) => serde_json::from_value(raw.clone())
            .map_err(|_| invalid(kind, "field entries must carry name and value"))?,
        _ => return Err(invalid(kind, "fields must be a mapping")),
    };

    let mut fields = fields;
    fields.truncate(MAX_EXTRACTION_KEYS);
    Ok(ActionOutput::Extraction { fields })
}

fn classification_output(object: &Map<String, Value>) -> Result<ActionOutput, OutputShapeError> {
    let kind = OutputKind::Classification;
    let label = object
        .get("label")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .ok_or_else(|| invalid(kind, "missing label"))?
        .to_string();

    let confidence = match object.get("confidence") {
        None | Some(Value::Null) => None,
        Some(raw) => {
            let confidence = raw
                .as_f64()
                .ok_or_else(|| invalid(kind, "confidence must be a number"))?;
            if !(0.0..=1.0).contains(&confidence) {
                return Err(invalid(kind, "confidence must be within [0, 1]"));
            }
            Some(confidence)
        }
    };

    Ok(ActionOutput::Classification { label, confidence })
}

fn plan_output(object: &Map<String, Value>) -> Result<ActionOutput, OutputShapeError> {
    let kind = OutputKind::Plan;
    let title = object
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(str::to_string);
    let steps = list_output(object, kind, &["steps"], MAX_PLAN_STEPS)?;
    Ok(ActionOutput::Plan { title, steps })
}

fn notification_output(object: &Map<String, Value>) -> Result<ActionOutput, OutputShapeError> {
    let kind = OutputKind::Notification;
    let title = object
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .ok_or_else(|| invalid(kind, "missing title"))?
        .to_string();
    let body = object
        .get("body")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|body| !body.is_empty())
        .map(str::to_string);
    Ok(ActionOutput::Notification { title, body })
}

fn invalid(kind: OutputKind, detail: impl Into<String>) -> OutputShapeError {
    OutputShapeError::Invalid {
        kind: kind.as_str(),
        detail: detail.into(),
    }
}

use serde::{Deserialize, Serialize};

use crate::catalog::ActionDomain;

/// Identifies what an action acts on. Created by UI code, passed by value,
/// never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionTargetRef {
    pub domain: ActionDomain,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

impl ActionTargetRef {
    pub fn new(domain: ActionDomain) -> Self {
        Self {
            domain,
            target_id: None,
            title: None,
            subtype: None,
            channel: None,
        }
    }

    pub fn with_id(domain: ActionDomain, target_id: impl Into<String>) -> Self {
        Self {
            target_id: Some(target_id.into()),
            ..Self::new(domain)
        }
    }
}

//! Static action catalogue. Loaded once at process start, never mutated;
//! unknown ids and unsupported domains are rejected here, at the boundary,
//! rather than deep in the call chain.

use serde::{Deserialize, Serialize};

/// Enumerates supported `ActionDomain` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionDomain {
    Inbox,
    Customers,
    Documents,
    Storage,
    Growth,
    Crm,
    Reviews,
}

impl ActionDomain {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inbox => "inbox",
            Self::Customers => "customers",
            Self::Documents => "documents",
            Self::Storage => "storage",
            Self::Growth => "growth",
            Self::Crm => "crm",
            Self::Reviews => "reviews",
        }
    }
}

/// Enumerates supported `OutputKind` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    Summary,
    Draft,
    Tasks,
    Plan,
    Tags,
    Extraction,
    Classification,
    Reply,
    RiskFlags,
    Notification,
}

impl OutputKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Draft => "draft",
            Self::Tasks => "tasks",
            Self::Plan => "plan",
            Self::Tags => "tags",
            Self::Extraction => "extraction",
            Self::Classification => "classification",
            Self::Reply => "reply",
            Self::RiskFlags => "risk_flags",
            Self::Notification => "notification",
        }
    }

    /// Accepts both our snake_case name and the camelCase spelling some
    /// backend revisions emit.
    pub fn matches_wire_name(self, raw: &str) -> bool {
        raw == self.as_str() || (self == Self::RiskFlags && raw == "riskFlags")
    }
}

/// Where the UI prefers to surface an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiPlacement {
    Toolbar,
    ContextMenu,
    Composer,
    Background,
}

/// Static catalogue entry for one action.
#[derive(Debug, Clone, Copy)]
pub struct ActionDefinition {
    pub id: ActionId,
    pub domains: &'static [ActionDomain],
    pub output: OutputKind,
    pub requires_approval: bool,
    pub placement: UiPlacement,
}

impl ActionDefinition {
    pub fn supports_domain(&self, domain: ActionDomain) -> bool {
        self.domains.contains(&domain)
    }
}

/// Enumerates supported `ActionId` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionId {
    SummarizeThread,
    DraftReply,
    SuggestReply,
    ExtractTasks,
    PlanFollowUp,
    TagCustomer,
    ExtractFields,
    ClassifyDocument,
    FlagRisks,
    NotifyTeam,
    SummarizeDocument,
    DraftCampaign,
}

impl ActionId {
    pub const ALL: &'static [ActionId] = &[
        Self::SummarizeThread,
        Self::DraftReply,
        Self::SuggestReply,
        Self::ExtractTasks,
        Self::PlanFollowUp,
        Self::TagCustomer,
        Self::ExtractFields,
        Self::ClassifyDocument,
        Self::FlagRisks,
        Self::NotifyTeam,
        Self::SummarizeDocument,
        Self::DraftCampaign,
    ];

    /// Parses a wire id. Unknown ids yield `None`; callers surface that as
    /// an unsupported-action error without any network call.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "summarize_thread" => Some(Self::SummarizeThread),
            "draft_reply" => Some(Self::DraftReply),
            "suggest_reply" => Some(Self::SuggestReply),
            "extract_tasks" => Some(Self::ExtractTasks),
            "plan_follow_up" => Some(Self::PlanFollowUp),
            "tag_customer" => Some(Self::TagCustomer),
            "extract_fields" => Some(Self::ExtractFields),
            "classify_document" => Some(Self::ClassifyDocument),
            "flag_risks" => Some(Self::FlagRisks),
            "notify_team" => Some(Self::NotifyTeam),
            "summarize_document" => Some(Self::SummarizeDocument),
            "draft_campaign" => Some(Self::DraftCampaign),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SummarizeThread => "summarize_thread",
            Self::DraftReply => "draft_reply",
            Self::SuggestReply => "suggest_reply",
            Self::ExtractTasks => "extract_tasks",
            Self::PlanFollowUp => "plan_follow_up",
            Self::TagCustomer => "tag_customer",
            Self::ExtractFields => "extract_fields",
            Self::ClassifyDocument => "classify_document",
            Self::FlagRisks => "flag_risks",
            Self::NotifyTeam => "notify_team",
            Self::SummarizeDocument => "summarize_document",
            Self::DraftCampaign => "draft_campaign",
        }
    }

    /// Total mapping from id to catalogue entry.
    pub fn definition(self) -> &'static ActionDefinition {
        match self {
            Self::SummarizeThread => &ActionDefinition {
                id: Self::SummarizeThread,
                domains: &[ActionDomain::Inbox, ActionDomain::Reviews],
                output: OutputKind::Summary,
                requires_approval: false,
                placement: UiPlacement::Toolbar,
            },
            Self::DraftReply => &ActionDefinition {
                id: Self::DraftReply,
                domains: &[ActionDomain::Inbox],
                output: OutputKind::Draft,
                requires_approval: true,
                placement: UiPlacement::Composer,
            },
            Self::SuggestReply => &ActionDefinition {
                id: Self::SuggestReply,
                domains: &[ActionDomain::Inbox, ActionDomain::Reviews],
                output: OutputKind::Reply,
                requires_approval: false,
                placement: UiPlacement::Composer,
            },
            Self::ExtractTasks => &ActionDefinition {
                id: Self::ExtractTasks,
                domains: &[ActionDomain::Inbox, ActionDomain::Documents],
                output: OutputKind::Tasks,
                requires_approval: false,
                placement: UiPlacement::Toolbar,
            },
            Self::PlanFollowUp => &ActionDefinition {
                id: Self::PlanFollowUp,
                domains: &[ActionDomain::Customers, ActionDomain::Crm],
                output: OutputKind::Plan,
                requires_approval: true,
                placement: UiPlacement::ContextMenu,
            },
            Self::TagCustomer => &ActionDefinition {
                id: Self::TagCustomer,
                domains: &[ActionDomain::Customers, ActionDomain::Crm],
                output: OutputKind::Tags,
                requires_approval: false,
                placement: UiPlacement::ContextMenu,
            },
            Self::ExtractFields => &ActionDefinition {
                id: Self::ExtractFields,
                domains: &[ActionDomain::Documents, ActionDomain::Storage],
                output: OutputKind::Extraction,
                requires_approval: false,
                placement: UiPlacement::Toolbar,
            },
            Self::ClassifyDocument => &ActionDefinition {
                id: Self::ClassifyDocument,
                domains: &[ActionDomain::Documents, ActionDomain::Storage],
                output: OutputKind::Classification,
                requires_approval: false,
                placement: UiPlacement::Background,
            },
            Self::FlagRisks => &ActionDefinition {
                id: Self::FlagRisks,
                domains: &[
                    ActionDomain::Customers,
                    ActionDomain::Growth,
                    ActionDomain::Crm,
                ],
                output: OutputKind::RiskFlags,
                requires_approval: false,
                placement: UiPlacement::Toolbar,
            },
            Self::NotifyTeam => &ActionDefinition {
                id: Self::NotifyTeam,
                domains: &[
                    ActionDomain::Inbox,
                    ActionDomain::Customers,
                    ActionDomain::Growth,
                ],
                output: OutputKind::Notification,
                requires_approval: true,
                placement: UiPlacement::ContextMenu,
            },
            Self::SummarizeDocument => &ActionDefinition {
                id: Self::SummarizeDocument,
                domains: &[ActionDomain::Documents, ActionDomain::Storage],
                output: OutputKind::Summary,
                requires_approval: false,
                placement: UiPlacement::Toolbar,
            },
            Self::DraftCampaign => &ActionDefinition {
                id: Self::DraftCampaign,
                domains: &[ActionDomain::Growth],
                output: OutputKind::Draft,
                requires_approval: true,
                placement: UiPlacement::Composer,
            },
        }
    }
}

/// Catalogue entries whose definition supports `domain`, in catalogue
/// order. UI placement decisions start here.
pub fn actions_for_domain(domain: ActionDomain) -> Vec<&'static ActionDefinition> {
    ActionId::ALL
        .iter()
        .map(|id| id.definition())
        .filter(|definition| definition.supports_domain(domain))
        .collect()
}

use crate::targeting::Targeting;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Conversation Messages ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    Function,
    System,
}

/// Structured payload attached to a chat message, tagging the widget the
/// surrounding UI should render for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "widget", rename_all = "snake_case")]
pub enum WidgetPayload {
    CreativePicker(CreativeWizard),
    InterestPicker { query: String },
    LocationPicker { query: String },
    CampaignCreated { campaign_id: String, strategy: BudgetStrategy },
    MissingFields { fields: Vec<String> },
}

/// A single chat message. Append-only within a session; never mutated after
/// creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget: Option<WidgetPayload>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            widget: None,
            created_at: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn with_widget(mut self, widget: WidgetPayload) -> Self {
        self.widget = Some(widget);
        self
    }

    pub fn is_campaign_created(&self) -> bool {
        matches!(self.widget, Some(WidgetPayload::CampaignCreated { .. }))
    }
}

// ─── Draft Campaign ─────────────────────────────────────────────────────

/// Where the spend cap is authoritative: campaign level (CBO) or ad-set
/// level (ABO). Exactly one budget figure is meaningful per strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BudgetStrategy {
    Cbo,
    Abo,
}

impl BudgetStrategy {
    /// Case-normalizes an explicit strategy string. Anything unrecognized
    /// is treated as absent so inference can take over.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "CBO" => Some(Self::Cbo),
            "ABO" => Some(Self::Abo),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Cbo => "CBO",
            Self::Abo => "ABO",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Objective {
    Sales,
    Leads,
    Traffic,
    Awareness,
    Engagement,
    AppPromotion,
}

impl Objective {
    /// Maps the loose objective strings the completion service produces
    /// onto the canonical enum. Unknown values default to `Sales`.
    pub fn parse(value: Option<&str>) -> Self {
        let Some(value) = value else {
            return Self::Sales;
        };
        let v = value.trim().to_ascii_lowercase();
        if v.contains("lead") {
            Self::Leads
        } else if v.contains("traffic") || v.contains("trafego") || v.contains("tráfego") {
            Self::Traffic
        } else if v.contains("awareness") || v.contains("reconhecimento") {
            Self::Awareness
        } else if v.contains("engagement") || v.contains("engajamento") {
            Self::Engagement
        } else if v.contains("app") {
            Self::AppPromotion
        } else {
            // "sales", "conversions", "vendas", OUTCOME_SALES and friends.
            Self::Sales
        }
    }

    /// Conversion-tracking objectives require a resolvable pixel.
    pub fn requires_pixel(&self) -> bool {
        matches!(self, Self::Sales | Self::Leads)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Sales => "Sales",
            Self::Leads => "Leads",
            Self::Traffic => "Traffic",
            Self::Awareness => "Awareness",
            Self::Engagement => "Engagement",
            Self::AppPromotion => "App Promotion",
        }
    }

    pub fn as_outcome(&self) -> &'static str {
        match self {
            Self::Sales => "OUTCOME_SALES",
            Self::Leads => "OUTCOME_LEADS",
            Self::Traffic => "OUTCOME_TRAFFIC",
            Self::Awareness => "OUTCOME_AWARENESS",
            Self::Engagement => "OUTCOME_ENGAGEMENT",
            Self::AppPromotion => "OUTCOME_APP_PROMOTION",
        }
    }
}

/// Lifecycle status. The drafting engine only ever produces `Draft`;
/// published entities live on the ad platform, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DraftStatus {
    Draft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AdStatus {
    Draft,
    /// Waiting on a creative from the selection sub-flow.
    Placeholder,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftCampaign {
    pub id: String,
    pub name: String,
    pub objective: Objective,
    pub budget: f64,
    pub budget_strategy: BudgetStrategy,
    pub ad_sets: Vec<DraftAdSet>,
    pub status: DraftStatus,
    pub created_at: DateTime<Utc>,
    pub bid_strategy: String,
    pub buying_type: String,
    pub special_ad_categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_catalog_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftAdSet {
    pub id: String,
    pub campaign_id: String,
    /// Unique within the campaign; synthesized when the source name is
    /// empty or a duplicate placeholder.
    pub name: String,
    pub targeting: Targeting,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promoted_object: Option<PromotedObject>,
    pub ads: Vec<DraftAd>,
    /// Only meaningful under ABO.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_budget: Option<f64>,
    pub optimization_goal: String,
    pub billing_event: String,
}

/// Conversion-tracking reference attached to an ad-set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotedObject {
    pub pixel_id: String,
    pub custom_event_type: String,
}

impl PromotedObject {
    pub fn purchase(pixel_id: impl Into<String>) -> Self {
        Self {
            pixel_id: pixel_id.into(),
            custom_event_type: "PURCHASE".to_string(),
        }
    }
}

/// Creative reference: hash for an image, distinct id for a video.
/// Mutually exclusive on a single ad.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreativeRef {
    ImageHash(String),
    VideoId(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdCopy {
    pub primary_text: String,
    pub headline: String,
    pub description: String,
    pub call_to_action: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftAd {
    pub id: String,
    pub ad_set_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creative: Option<CreativeRef>,
    pub copy: AdCopy,
    pub destination_url: String,
    pub page_id: String,
    pub page_name: String,
    pub pixel_id: String,
    pub instagram_actor_id: String,
    pub status: AdStatus,
}

// ─── Creatives ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreativeKind {
    Image,
    Video,
}

/// A selectable creative asset from the account's library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreativeDescriptor {
    pub id: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub url: String,
    pub kind: CreativeKind,
    #[serde(default)]
    pub name: String,
}

impl CreativeDescriptor {
    pub fn as_creative_ref(&self) -> CreativeRef {
        match self.kind {
            CreativeKind::Video => CreativeRef::VideoId(self.id.clone()),
            CreativeKind::Image => CreativeRef::ImageHash(self.hash.clone()),
        }
    }
}

/// Binds one creative to one ad slot. Ephemeral; consumed exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreativeAssignment {
    pub ad_id: String,
    pub ad_set_id: String,
    pub creative: CreativeDescriptor,
}

// ─── Creative Selection Wizard ──────────────────────────────────────────

/// Descriptor for the interactive creative-selection widget, sized exactly
/// to the required ad-slot count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreativeWizard {
    pub campaign_name: String,
    pub ad_sets: Vec<CreativeWizardSet>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreativeWizardSet {
    pub ad_set_id: String,
    pub name: String,
    pub ads: Vec<CreativeWizardSlot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreativeWizardSlot {
    pub ad_id: String,
}

impl CreativeWizard {
    pub fn slot_count(&self) -> usize {
        self.ad_sets.iter().map(|s| s.ads.len()).sum()
    }
}

// ─── Account Defaults ───────────────────────────────────────────────────

/// Read-mostly defaults for the active ad account. Never mutated by the
/// drafting engine; only read as the last fallback tier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountDefaults {
    pub account_id: String,
    pub page_id: String,
    pub page_name: String,
    pub pixel_id: String,
    pub instagram_actor_id: String,
    pub domain: String,
}

// ─── Deterministic slot ids ─────────────────────────────────────────────

pub fn ad_set_slot_id(set_index: usize) -> String {
    format!("draft-adset-{}", set_index)
}

pub fn ad_slot_id(set_index: usize, ad_index: usize) -> String {
    format!("draft-ad-{}-{}", set_index, ad_index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_strategy_parse_case_insensitive() {
        assert_eq!(BudgetStrategy::parse("cbo"), Some(BudgetStrategy::Cbo));
        assert_eq!(BudgetStrategy::parse(" ABO "), Some(BudgetStrategy::Abo));
        assert_eq!(BudgetStrategy::parse("auto"), None);
    }

    #[test]
    fn test_objective_parse() {
        assert_eq!(Objective::parse(Some("OUTCOME_SALES")), Objective::Sales);
        assert_eq!(Objective::parse(Some("lead generation")), Objective::Leads);
        assert_eq!(Objective::parse(Some("tráfego")), Objective::Traffic);
        assert_eq!(Objective::parse(None), Objective::Sales);
        assert!(Objective::Sales.requires_pixel());
        assert!(!Objective::Traffic.requires_pixel());
    }

    #[test]
    fn test_creative_ref_is_exclusive_per_kind() {
        let video = CreativeDescriptor {
            id: "vid-1".to_string(),
            hash: "should-be-ignored".to_string(),
            url: String::new(),
            kind: CreativeKind::Video,
            name: String::new(),
        };
        assert_eq!(
            video.as_creative_ref(),
            CreativeRef::VideoId("vid-1".to_string())
        );

        let image = CreativeDescriptor {
            id: "img-1".to_string(),
            hash: "abc123".to_string(),
            url: String::new(),
            kind: CreativeKind::Image,
            name: String::new(),
        };
        assert_eq!(
            image.as_creative_ref(),
            CreativeRef::ImageHash("abc123".to_string())
        );
    }

    #[test]
    fn test_slot_ids_are_deterministic() {
        assert_eq!(ad_slot_id(0, 0), "draft-ad-0-0");
        assert_eq!(ad_slot_id(2, 1), "draft-ad-2-1");
        assert_eq!(ad_set_slot_id(3), "draft-adset-3");
    }
}

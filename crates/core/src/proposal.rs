//! Loose proposal shapes received from the completion service.
//!
//! These are the boundary types: every field is optional and tolerant of
//! the half-filled object graphs a model emits. They are deserialized once
//! at the function-call boundary and never propagated past the structure
//! synthesizer, which materializes them into the strict draft schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw campaign proposal as supplied by `propose_campaign_structure`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CampaignProposal {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub objective: Option<String>,
    /// Compact "C-S-A" structure token.
    #[serde(default, alias = "structure")]
    pub campaign_structure: Option<String>,
    #[serde(default)]
    pub budget: Option<f64>,
    #[serde(default)]
    pub budget_strategy: Option<String>,
    #[serde(default)]
    pub bid_strategy: Option<String>,
    #[serde(default)]
    pub buying_type: Option<String>,
    #[serde(default)]
    pub special_ad_categories: Option<Vec<String>>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub product_catalog_id: Option<String>,
    /// Campaign-level default geography, merged into ad-set slots whose own
    /// geography is empty.
    #[serde(default)]
    pub targeting: Option<serde_json::Value>,
    #[serde(default)]
    pub ad_sets: Vec<AdSetFragment>,
    // Campaign-level fallback copy and identities.
    #[serde(default)]
    pub primary_text: Option<String>,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub call_to_action: Option<String>,
    #[serde(default)]
    pub destination_url: Option<String>,
    #[serde(default)]
    pub page_id: Option<String>,
    #[serde(default)]
    pub page_name: Option<String>,
    #[serde(default)]
    pub pixel_id: Option<String>,
    #[serde(default)]
    pub instagram_actor_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdSetFragment {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub daily_budget: Option<f64>,
    #[serde(default)]
    pub targeting: Option<serde_json::Value>,
    #[serde(default)]
    pub promoted_object: Option<PromotedObjectFragment>,
    #[serde(default)]
    pub optimization_goal: Option<String>,
    #[serde(default)]
    pub billing_event: Option<String>,
    #[serde(default)]
    pub ads: Vec<AdFragment>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromotedObjectFragment {
    #[serde(default)]
    pub pixel_id: Option<String>,
    #[serde(default)]
    pub custom_event_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdFragment {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub primary_text: Option<String>,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub call_to_action: Option<String>,
    #[serde(default)]
    pub destination_url: Option<String>,
    #[serde(default)]
    pub page_id: Option<String>,
    #[serde(default)]
    pub page_name: Option<String>,
    #[serde(default)]
    pub pixel_id: Option<String>,
    #[serde(default)]
    pub instagram_actor_id: Option<String>,
    #[serde(default)]
    pub image_hash: Option<String>,
    #[serde(default)]
    pub video_id: Option<String>,
}

impl AdFragment {
    /// True when the fragment references any creative directly.
    pub fn has_creative(&self) -> bool {
        self.image_hash.as_deref().is_some_and(|h| !h.is_empty())
            || self.video_id.as_deref().is_some_and(|v| !v.is_empty())
    }
}

impl CampaignProposal {
    pub fn has_any_creative(&self) -> bool {
        self.ad_sets
            .iter()
            .flat_map(|s| s.ads.iter())
            .any(AdFragment::has_creative)
    }
}

/// A proposal parked while the engine waits on creative selection or on a
/// creative-listing function result. At most one exists at a time; a new
/// proposal always supersedes the old one. Cleared the instant a draft is
/// materialized from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingCampaignProposal {
    pub proposal: CampaignProposal,
    pub ad_set_count: usize,
    pub ads_per_set: usize,
    pub stored_at: DateTime<Utc>,
}

impl PendingCampaignProposal {
    pub fn new(proposal: CampaignProposal, ad_set_count: usize, ads_per_set: usize) -> Self {
        Self {
            proposal,
            ad_set_count,
            ads_per_set,
            stored_at: Utc::now(),
        }
    }

    pub fn required_slots(&self) -> usize {
        self.ad_set_count * self.ads_per_set
    }
}

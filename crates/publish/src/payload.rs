//! Hierarchical creation payload sent to the ad-platform RPC.
//!
//! Field placement for budget depends on the resolved strategy:
//! campaign-level under CBO, ad-set-level under ABO, never both. Every
//! entity is submitted paused as a safety default.

use draftdesk_core::targeting::Targeting;
use draftdesk_core::types::{
    AccountDefaults, AdCopy, BudgetStrategy, CreativeRef, DraftAd, DraftCampaign, PromotedObject,
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

pub const ENTITY_STATUS_PAUSED: &str = "PAUSED";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCampaignPayload {
    #[serde(rename = "accountId")]
    pub account_id: String,
    pub name: String,
    pub mode: String,
    pub campaign: CampaignSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignSpec {
    pub name: String,
    pub objective: String,
    pub special_ad_categories: Vec<String>,
    #[serde(rename = "budgetStrategy")]
    pub budget_strategy: BudgetStrategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_budget: Option<f64>,
    pub bid_strategy: String,
    #[serde(rename = "startTime", default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(rename = "buyingType")]
    pub buying_type: String,
    #[serde(rename = "adSets")]
    pub ad_sets: Vec<AdSetSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdSetSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_budget: Option<f64>,
    pub status: String,
    pub targeting: Targeting,
    pub optimization_goal: String,
    pub billing_event: String,
    pub bid_strategy: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promoted_object: Option<PromotedObject>,
    pub ads: Vec<AdSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdSpec {
    pub name: String,
    pub status: String,
    pub page_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creative_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    pub destination_url: String,
    pub copy: AdCopy,
}

/// Builds the creation payload from a finalized draft.
pub fn build_payload(draft: &DraftCampaign, defaults: &AccountDefaults) -> CreateCampaignPayload {
    let is_cbo = draft.budget_strategy == BudgetStrategy::Cbo;

    let ad_sets = draft
        .ad_sets
        .iter()
        .map(|set| AdSetSpec {
            name: set.name.clone(),
            daily_budget: if is_cbo { None } else { set.daily_budget },
            status: ENTITY_STATUS_PAUSED.to_string(),
            targeting: set.targeting.clone(),
            optimization_goal: set.optimization_goal.clone(),
            billing_event: set.billing_event.clone(),
            bid_strategy: draft.bid_strategy.clone(),
            promoted_object: set.promoted_object.clone(),
            ads: set.ads.iter().map(|ad| build_ad(ad, defaults)).collect(),
        })
        .collect();

    CreateCampaignPayload {
        account_id: defaults.account_id.clone(),
        name: draft.name.clone(),
        mode: "hierarchical".to_string(),
        campaign: CampaignSpec {
            name: draft.name.clone(),
            objective: draft.objective.as_outcome().to_string(),
            special_ad_categories: draft.special_ad_categories.clone(),
            budget_strategy: draft.budget_strategy,
            daily_budget: is_cbo.then_some(draft.budget).filter(|b| *b > 0.0),
            bid_strategy: draft.bid_strategy.clone(),
            start_time: draft.start_time.map(|t| t.to_rfc3339()),
            buying_type: draft.buying_type.clone(),
            ad_sets,
        },
    }
}

fn build_ad(ad: &DraftAd, defaults: &AccountDefaults) -> AdSpec {
    let (creative_hash, video_id) = match &ad.creative {
        Some(CreativeRef::ImageHash(hash)) => (Some(hash.clone()), None),
        Some(CreativeRef::VideoId(id)) => (None, Some(id.clone())),
        None => (None, None),
    };

    AdSpec {
        name: ad.name.clone(),
        status: ENTITY_STATUS_PAUSED.to_string(),
        page_id: ad.page_id.clone(),
        creative_hash,
        video_id,
        destination_url: sanitize_destination(&ad.destination_url, defaults),
        copy: ad.copy.clone(),
    }
}

/// Destination URLs must parse. An unparseable value falls back to the
/// account domain when one exists; the draft itself is left untouched.
fn sanitize_destination(destination: &str, defaults: &AccountDefaults) -> String {
    if !destination.is_empty() && Url::parse(destination).is_ok() {
        return destination.to_string();
    }
    if !defaults.domain.is_empty() {
        let fallback = format!("https://{}", defaults.domain);
        if Url::parse(&fallback).is_ok() {
            if !destination.is_empty() {
                warn!(destination, fallback = %fallback, "Replaced unparseable destination URL");
            }
            return fallback;
        }
    }
    destination.to_string()
}

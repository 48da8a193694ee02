//! Function-call surface consumed from the completion service.
//!
//! Call names are contract. Payloads arrive as loose JSON and are parsed
//! into typed calls here; draft mutations are applied copy-on-write so a
//! failed update leaves the prior draft untouched.

use draftdesk_core::config::DraftingConfig;
use draftdesk_core::proposal::CampaignProposal;
use draftdesk_core::types::{ad_set_slot_id, ad_slot_id, BudgetStrategy, DraftCampaign};
use draftdesk_core::{DraftError, DraftResult};
use draftdesk_drafting::budget;
use draftdesk_drafting::structure::MAX_SLOTS;
use draftdesk_targeting::normalize;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A parsed function call from the completion service.
#[derive(Debug, Clone)]
pub enum FunctionCall {
    ProposeCampaignStructure(CampaignProposal),
    UpdateDraftCard(DraftCardUpdate),
    RequestInterestSelection { query: String },
    ListPixels,
    ListIdentities,
    ListCreatives,
    SearchGeo { query: String },
    SearchInterests { query: String },
    ListCollections,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOperation {
    UpdateAllAds,
    UpdateSpecificAd,
    UpdateAllAdsets,
    UpdateSpecificAdset,
    UpdateCampaign,
    AddAdsets,
    AddAds,
    AddPrimaryTexts,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DraftCardUpdate {
    pub operation: UpdateOperation,
    #[serde(default)]
    pub ad_set_index: Option<usize>,
    #[serde(default)]
    pub ad_index: Option<usize>,
    #[serde(default)]
    pub fields: Value,
}

/// Dispatches a function call by name.
pub fn parse_function_call(name: &str, arguments: Value) -> DraftResult<FunctionCall> {
    match name {
        "propose_campaign_structure" | "createCampaignDraft" => {
            let proposal: CampaignProposal = serde_json::from_value(arguments)?;
            Ok(FunctionCall::ProposeCampaignStructure(proposal))
        }
        "updateDraftCard" => {
            let update: DraftCardUpdate = serde_json::from_value(arguments)?;
            Ok(FunctionCall::UpdateDraftCard(update))
        }
        "request_interest_selection" => Ok(FunctionCall::RequestInterestSelection {
            query: string_arg(&arguments, "query"),
        }),
        "list_pixels" => Ok(FunctionCall::ListPixels),
        "list_identities" => Ok(FunctionCall::ListIdentities),
        "list_creatives" => Ok(FunctionCall::ListCreatives),
        "search_geo" => Ok(FunctionCall::SearchGeo {
            query: string_arg(&arguments, "query"),
        }),
        "search_interests" => Ok(FunctionCall::SearchInterests {
            query: string_arg(&arguments, "query"),
        }),
        "list_collections" => Ok(FunctionCall::ListCollections),
        other => Err(DraftError::Proposal(format!(
            "unknown function call: {}",
            other
        ))),
    }
}

fn string_arg(arguments: &Value, key: &str) -> String {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

// ─── Draft card updates ─────────────────────────────────────────────────

/// Applies an update operation to a copy of the draft. Either the whole
/// operation lands or the original draft stays authoritative.
pub fn apply_update(
    draft: &DraftCampaign,
    update: &DraftCardUpdate,
    cfg: &DraftingConfig,
) -> DraftResult<DraftCampaign> {
    let mut next = draft.clone();
    let fields = &update.fields;

    match update.operation {
        UpdateOperation::UpdateAllAds => {
            for set in &mut next.ad_sets {
                for ad in &mut set.ads {
                    apply_ad_fields(ad, fields);
                }
            }
        }
        UpdateOperation::UpdateSpecificAd => {
            let si = update.ad_set_index.unwrap_or(0);
            let ai = update.ad_index.unwrap_or(0);
            let ad = next
                .ad_sets
                .get_mut(si)
                .and_then(|s| s.ads.get_mut(ai))
                .ok_or_else(|| {
                    DraftError::Proposal(format!("no ad at ad-set {} / ad {}", si, ai))
                })?;
            apply_ad_fields(ad, fields);
        }
        UpdateOperation::UpdateAllAdsets => {
            for set in &mut next.ad_sets {
                apply_ad_set_fields(set, fields, cfg);
            }
        }
        UpdateOperation::UpdateSpecificAdset => {
            let si = update.ad_set_index.unwrap_or(0);
            let set = next
                .ad_sets
                .get_mut(si)
                .ok_or_else(|| DraftError::Proposal(format!("no ad-set at index {}", si)))?;
            apply_ad_set_fields(set, fields, cfg);
        }
        UpdateOperation::UpdateCampaign => {
            if let Some(name) = fields.get("name").and_then(Value::as_str) {
                next.name = name.to_string();
            }
            if let Some(budget) = fields.get("budget").and_then(Value::as_f64) {
                next.budget = budget;
            }
            if let Some(strategy) = fields
                .get("budget_strategy")
                .and_then(Value::as_str)
                .and_then(BudgetStrategy::parse)
            {
                next.budget_strategy = strategy;
            }
            if let Some(bid) = fields.get("bid_strategy").and_then(Value::as_str) {
                next.bid_strategy = bid.to_string();
            }
        }
        UpdateOperation::AddAdsets => {
            let count = fields.get("count").and_then(Value::as_u64).unwrap_or(1) as usize;
            let template = next
                .ad_sets
                .last()
                .cloned()
                .ok_or_else(|| DraftError::Proposal("draft has no ad-set to template".into()))?;
            for _ in 0..count {
                if next.ad_sets.len() >= MAX_SLOTS {
                    break;
                }
                let index = next.ad_sets.len();
                let mut set = template.clone();
                set.id = ad_set_slot_id(index);
                set.name = format!("{} (copy {})", template.name, index + 1);
                for (ai, ad) in set.ads.iter_mut().enumerate() {
                    ad.id = ad_slot_id(index, ai);
                    ad.ad_set_id = set.id.clone();
                }
                apply_ad_set_fields(&mut set, fields, cfg);
                next.ad_sets.push(set);
            }
        }
        UpdateOperation::AddAds => {
            let count = fields.get("count").and_then(Value::as_u64).unwrap_or(1) as usize;
            let targets: Vec<usize> = match update.ad_set_index {
                Some(si) => vec![si],
                None => (0..next.ad_sets.len()).collect(),
            };
            for si in targets {
                let set = next
                    .ad_sets
                    .get_mut(si)
                    .ok_or_else(|| DraftError::Proposal(format!("no ad-set at index {}", si)))?;
                let template = set.ads.last().cloned().ok_or_else(|| {
                    DraftError::Proposal(format!("ad-set {} has no ad to template", si))
                })?;
                for _ in 0..count {
                    if set.ads.len() >= MAX_SLOTS {
                        break;
                    }
                    let ai = set.ads.len();
                    let mut ad = template.clone();
                    ad.id = ad_slot_id(si, ai);
                    ad.name = format!("{} - Ad {}", set.name, ai + 1);
                    apply_ad_fields(&mut ad, fields);
                    set.ads.push(ad);
                }
            }
        }
        UpdateOperation::AddPrimaryTexts => {
            let texts: Vec<String> = fields
                .get("primary_texts")
                .or_else(|| fields.get("texts"))
                .and_then(Value::as_array)
                .map(|a| {
                    a.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            if texts.is_empty() {
                return Err(DraftError::Proposal(
                    "add_primary_texts requires a non-empty text list".into(),
                ));
            }
            // Variations are distributed across every ad in order.
            let mut i = 0;
            for set in &mut next.ad_sets {
                for ad in &mut set.ads {
                    ad.copy.primary_text = texts[i % texts.len()].clone();
                    i += 1;
                }
            }
        }
    }

    // Budget placement stays consistent with the (possibly changed)
    // strategy.
    budget::apply(&mut next);
    Ok(next)
}

fn apply_ad_fields(ad: &mut draftdesk_core::types::DraftAd, fields: &Value) {
    let text = |key: &str| fields.get(key).and_then(Value::as_str).map(str::to_string);
    if let Some(v) = text("name") {
        ad.name = v;
    }
    if let Some(v) = text("primary_text") {
        ad.copy.primary_text = v;
    }
    if let Some(v) = text("headline") {
        ad.copy.headline = v;
    }
    if let Some(v) = text("description") {
        ad.copy.description = v;
    }
    if let Some(v) = text("call_to_action") {
        ad.copy.call_to_action = v;
    }
    if let Some(v) = text("destination_url") {
        ad.destination_url = v;
    }
}

fn apply_ad_set_fields(
    set: &mut draftdesk_core::types::DraftAdSet,
    fields: &Value,
    cfg: &DraftingConfig,
) {
    if let Some(name) = fields.get("name").and_then(Value::as_str) {
        set.name = name.to_string();
    }
    if let Some(budget) = fields.get("daily_budget").and_then(Value::as_f64) {
        set.daily_budget = Some(budget);
    }
    if let Some(goal) = fields.get("optimization_goal").and_then(Value::as_str) {
        set.optimization_goal = goal.to_string();
    }
    if let Some(event) = fields.get("billing_event").and_then(Value::as_str) {
        set.billing_event = event.to_string();
    }
    if let Some(targeting) = fields.get("targeting") {
        set.targeting = normalize(targeting, cfg);
    }
}

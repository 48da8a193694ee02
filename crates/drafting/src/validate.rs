//! Validation gate: checks that objective-required fields are resolvable
//! from AI input plus account defaults before any interactive sub-flow is
//! opened. Evaluated exactly once per proposal, never per ad-set.

use draftdesk_core::proposal::CampaignProposal;
use draftdesk_core::types::{AccountDefaults, Message, Objective, WidgetPayload};
use draftdesk_targeting::has_geography_signal;
use tracing::warn;

/// Returns the list of unresolvable required fields for this proposal, in
/// stable order. Empty means the proposal may proceed.
pub fn missing_fields(proposal: &CampaignProposal, defaults: &AccountDefaults) -> Vec<String> {
    let mut missing = Vec::new();
    let objective = Objective::parse(proposal.objective.as_deref());

    if objective.requires_pixel() && !pixel_resolvable(proposal, defaults) {
        missing.push("pixel".to_string());
    }
    if !page_resolvable(proposal, defaults) {
        missing.push("page".to_string());
    }
    if !has_any_geography(proposal) {
        missing.push("geography".to_string());
    }
    if !budget_present(proposal) {
        missing.push("budget".to_string());
    }

    if !missing.is_empty() {
        warn!(missing = ?missing, "Proposal blocked by validation gate");
    }
    missing
}

/// The single assistant-facing message enumerating the missing items.
pub fn missing_fields_message(missing: &[String]) -> Message {
    let listed = missing.join(", ");
    Message::assistant(format!(
        "I can't build this campaign yet. I still need: {}. \
         Tell me the missing values (or pick them in your account settings) and I'll continue.",
        listed
    ))
    .with_widget(WidgetPayload::MissingFields {
        fields: missing.to_vec(),
    })
}

fn pixel_resolvable(proposal: &CampaignProposal, defaults: &AccountDefaults) -> bool {
    let from_sets = proposal.ad_sets.iter().any(|s| {
        s.promoted_object
            .as_ref()
            .and_then(|p| p.pixel_id.as_deref())
            .is_some_and(|p| !p.is_empty())
    });
    let from_ads = proposal
        .ad_sets
        .iter()
        .flat_map(|s| s.ads.iter())
        .any(|a| a.pixel_id.as_deref().is_some_and(|p| !p.is_empty()));
    from_sets
        || from_ads
        || proposal.pixel_id.as_deref().is_some_and(|p| !p.is_empty())
        || !defaults.pixel_id.is_empty()
}

fn page_resolvable(proposal: &CampaignProposal, defaults: &AccountDefaults) -> bool {
    let from_ads = proposal
        .ad_sets
        .iter()
        .flat_map(|s| s.ads.iter())
        .any(|a| a.page_id.as_deref().is_some_and(|p| !p.is_empty()));
    from_ads
        || proposal.page_id.as_deref().is_some_and(|p| !p.is_empty())
        || !defaults.page_id.is_empty()
}

fn has_any_geography(proposal: &CampaignProposal) -> bool {
    proposal
        .targeting
        .as_ref()
        .is_some_and(has_geography_signal)
        || proposal
            .ad_sets
            .iter()
            .filter_map(|s| s.targeting.as_ref())
            .any(has_geography_signal)
}

fn budget_present(proposal: &CampaignProposal) -> bool {
    proposal.budget.is_some_and(|b| b > 0.0)
        || proposal
            .ad_sets
            .iter()
            .any(|s| s.daily_budget.is_some_and(|b| b > 0.0))
}

//! Structure synthesizer — materializes a compact structure token and a
//! partial proposal graph into a complete campaign draft skeleton.

use std::collections::{HashMap, HashSet};

use draftdesk_core::config::DraftingConfig;
use draftdesk_core::proposal::{AdFragment, AdSetFragment, CampaignProposal};
use draftdesk_core::targeting::Targeting;
use draftdesk_core::types::{
    ad_set_slot_id, ad_slot_id, AdCopy, AdStatus, CreativeDescriptor, CreativeRef, DraftAd,
    DraftAdSet, DraftCampaign, DraftStatus, Objective, PromotedObject,
};
use draftdesk_core::DraftResult;
use draftdesk_targeting::{has_geography_signal, normalize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::budget;
use crate::fallback::{resolve_amount, resolve_text};

/// Slot counts are clamped to this range on parse.
pub const MIN_SLOTS: usize = 1;
pub const MAX_SLOTS: usize = 50;

/// Creatives already bound to ad slots, keyed by deterministic slot id.
pub type SlotAssignments = HashMap<String, CreativeDescriptor>;

/// Parsed "C-S-A" structure token. C is always 1 in this engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructureShape {
    pub ad_sets: usize,
    pub ads_per_set: usize,
}

impl StructureShape {
    /// Parses a `"C-S-A"` token. Malformed or missing tokens default to
    /// `1-1-1`; S and A are clamped to `[1, 50]`.
    pub fn parse(token: Option<&str>) -> Self {
        let fallback = Self {
            ad_sets: 1,
            ads_per_set: 1,
        };
        let Some(token) = token else {
            return fallback;
        };
        let parts: Vec<&str> = token.trim().split('-').map(str::trim).collect();
        if parts.len() != 3 {
            return fallback;
        }
        let (Ok(s), Ok(a)) = (parts[1].parse::<usize>(), parts[2].parse::<usize>()) else {
            return fallback;
        };
        Self {
            ad_sets: s.clamp(MIN_SLOTS, MAX_SLOTS),
            ads_per_set: a.clamp(MIN_SLOTS, MAX_SLOTS),
        }
    }

    pub fn required_slots(&self) -> usize {
        self.ad_sets * self.ads_per_set
    }
}

/// Materializes a proposal into a draft campaign.
///
/// The output always has exactly S ad-sets of exactly A ads: missing
/// fragments are templated from the first supplied one, surplus ads are
/// clamped. `assignments` binds creatives onto slots by slot id; slots
/// without a creative come out as placeholders.
pub fn synthesize(
    proposal: &CampaignProposal,
    defaults: &draftdesk_core::types::AccountDefaults,
    assignments: &SlotAssignments,
    cfg: &DraftingConfig,
) -> DraftResult<DraftCampaign> {
    let shape = StructureShape::parse(proposal.campaign_structure.as_deref());
    let objective = Objective::parse(proposal.objective.as_deref());
    let campaign_id = format!("draft-{}", Uuid::new_v4());

    let name = resolve_text(&[proposal.name.as_deref()]);
    let name = if name.is_empty() {
        format!("{} Campaign", objective.label())
    } else {
        name
    };

    let strategy =
        budget::resolve_strategy(proposal.budget_strategy.as_deref(), &proposal.ad_sets);
    let template = proposal.ad_sets.first();
    let empty_fragment = AdSetFragment::default();

    let mut used_names: HashSet<String> = HashSet::new();
    let mut ad_sets = Vec::with_capacity(shape.ad_sets);

    for s in 0..shape.ad_sets {
        // Reuse the first supplied ad-set as a template, never leave a slot
        // blank.
        let fragment = proposal
            .ad_sets
            .get(s)
            .or(template)
            .unwrap_or(&empty_fragment);

        let targeting = slot_targeting(fragment, proposal, cfg);
        let set_name = dedup_name(fragment.name.as_deref(), s, &targeting, &mut used_names);
        let promoted_object =
            resolve_promoted_object(fragment, template, defaults, objective);

        let ad_set_id = ad_set_slot_id(s);
        let template_ad = fragment.ads.first().or_else(|| {
            template.and_then(|t| t.ads.first())
        });

        let mut ads = Vec::with_capacity(shape.ads_per_set);
        for a in 0..shape.ads_per_set {
            // Surplus supplied ads beyond A are clamped here by never
            // indexing past ads_per_set.
            let ad_fragment = fragment.ads.get(a).or(template_ad);
            ads.push(build_ad(
                s,
                a,
                &ad_set_id,
                &set_name,
                ad_fragment,
                template_ad,
                proposal,
                defaults,
                assignments,
            ));
        }

        ad_sets.push(DraftAdSet {
            id: ad_set_id,
            campaign_id: campaign_id.clone(),
            name: set_name,
            targeting,
            promoted_object,
            ads,
            daily_budget: resolve_amount(&[fragment.daily_budget]),
            optimization_goal: resolve_text(&[
                fragment.optimization_goal.as_deref(),
                template.and_then(|t| t.optimization_goal.as_deref()),
                Some("OFFSITE_CONVERSIONS"),
            ]),
            billing_event: resolve_text(&[
                fragment.billing_event.as_deref(),
                template.and_then(|t| t.billing_event.as_deref()),
                Some("IMPRESSIONS"),
            ]),
        });
    }

    let mut campaign = DraftCampaign {
        id: campaign_id,
        name,
        objective,
        budget: proposal.budget.unwrap_or(0.0),
        budget_strategy: strategy,
        ad_sets,
        status: DraftStatus::Draft,
        created_at: chrono::Utc::now(),
        bid_strategy: resolve_text(&[
            proposal.bid_strategy.as_deref(),
            Some("LOWEST_COST_WITHOUT_CAP"),
        ]),
        buying_type: resolve_text(&[proposal.buying_type.as_deref(), Some("AUCTION")]),
        special_ad_categories: proposal.special_ad_categories.clone().unwrap_or_default(),
        start_time: proposal.start_time,
        product_catalog_id: proposal.product_catalog_id.clone(),
    };

    budget::apply(&mut campaign);

    debug!(
        campaign = %campaign.name,
        ad_sets = campaign.ad_sets.len(),
        ads_per_set = shape.ads_per_set,
        strategy = campaign.budget_strategy.label(),
        "Draft campaign synthesized"
    );

    Ok(campaign)
}

// ─── Targeting ──────────────────────────────────────────────────────────

/// Canonical targeting for one ad-set slot. A top-level default geography
/// is merged into a slot whose own geography is empty rather than
/// discarded.
fn slot_targeting(
    fragment: &AdSetFragment,
    proposal: &CampaignProposal,
    cfg: &DraftingConfig,
) -> Targeting {
    let slot_value = fragment
        .targeting
        .clone()
        .unwrap_or(Value::Object(Default::default()));
    let mut targeting = normalize(&slot_value, cfg);

    if !has_geography_signal(&slot_value) {
        if let Some(top) = &proposal.targeting {
            if has_geography_signal(top) {
                targeting.geo_locations = normalize(top, cfg).geo_locations;
            }
        }
    }
    targeting
}

// ─── Naming ─────────────────────────────────────────────────────────────

/// Placeholder prefixes the synthesizer refuses to keep: "Conjunto 2",
/// "Ad Set 1" and friends carry no audience information.
const GENERIC_NAME_PREFIXES: &[&str] = &[
    "conjunto de anuncios",
    "conjunto de anúncios",
    "conjunto",
    "ad set",
    "adset",
    "novo conjunto",
];

fn is_generic_name(name: &str) -> bool {
    let n = name.trim().to_lowercase();
    if n.is_empty() {
        return true;
    }
    GENERIC_NAME_PREFIXES.iter().any(|prefix| {
        n.strip_prefix(prefix)
            .map(|rest| rest.trim().chars().all(|c| c.is_ascii_digit()))
            .unwrap_or(false)
    })
}

/// Keeps a supplied name only when it is neither generic nor already used;
/// otherwise synthesizes a unique name from index + audience hints.
fn dedup_name(
    supplied: Option<&str>,
    index: usize,
    targeting: &Targeting,
    used: &mut HashSet<String>,
) -> String {
    let supplied = supplied.unwrap_or("").trim();
    if !is_generic_name(supplied) && !used.contains(supplied) {
        used.insert(supplied.to_string());
        return supplied.to_string();
    }

    let mut name = format!(
        "Ad Set {} - {} {}",
        index + 1,
        targeting.audience_mode.label(),
        targeting.gender_hint()
    );
    let mut suffix = 2;
    while used.contains(&name) {
        name = format!(
            "Ad Set {} - {} {} ({})",
            index + 1,
            targeting.audience_mode.label(),
            targeting.gender_hint(),
            suffix
        );
        suffix += 1;
    }
    used.insert(name.clone());
    name
}

// ─── Promoted object ────────────────────────────────────────────────────

/// Pixel resolution priority: this ad-set's own promoted object, then the
/// template ad-set's, then the account default pixel.
fn resolve_promoted_object(
    fragment: &AdSetFragment,
    template: Option<&AdSetFragment>,
    defaults: &draftdesk_core::types::AccountDefaults,
    objective: Objective,
) -> Option<PromotedObject> {
    let own = fragment.promoted_object.as_ref();
    let templated = template.and_then(|t| t.promoted_object.as_ref());

    let pixel_id = resolve_text(&[
        own.and_then(|p| p.pixel_id.as_deref()),
        templated.and_then(|p| p.pixel_id.as_deref()),
        Some(defaults.pixel_id.as_str()),
    ]);
    if pixel_id.is_empty() {
        return None;
    }
    if !objective.requires_pixel() && own.is_none() && templated.is_none() {
        return None;
    }

    let custom_event_type = resolve_text(&[
        own.and_then(|p| p.custom_event_type.as_deref()),
        templated.and_then(|p| p.custom_event_type.as_deref()),
        Some("PURCHASE"),
    ]);
    Some(PromotedObject {
        pixel_id,
        custom_event_type,
    })
}

// ─── Ads ────────────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
fn build_ad(
    set_index: usize,
    ad_index: usize,
    ad_set_id: &str,
    set_name: &str,
    fragment: Option<&AdFragment>,
    template_ad: Option<&AdFragment>,
    proposal: &CampaignProposal,
    defaults: &draftdesk_core::types::AccountDefaults,
    assignments: &SlotAssignments,
) -> DraftAd {
    let id = ad_slot_id(set_index, ad_index);
    let frag = |f: fn(&AdFragment) -> Option<&str>| fragment.and_then(f);
    let tmpl = |f: fn(&AdFragment) -> Option<&str>| template_ad.and_then(f);

    // Fixed fallback chain per field: this ad's explicit value → the
    // template ad's value → campaign-level value → account defaults →
    // empty string.
    let copy = AdCopy {
        primary_text: resolve_text(&[
            frag(|f| f.primary_text.as_deref()),
            tmpl(|f| f.primary_text.as_deref()),
            proposal.primary_text.as_deref(),
        ]),
        headline: resolve_text(&[
            frag(|f| f.headline.as_deref()),
            tmpl(|f| f.headline.as_deref()),
            proposal.headline.as_deref(),
        ]),
        description: resolve_text(&[
            frag(|f| f.description.as_deref()),
            tmpl(|f| f.description.as_deref()),
            proposal.description.as_deref(),
        ]),
        call_to_action: resolve_text(&[
            frag(|f| f.call_to_action.as_deref()),
            tmpl(|f| f.call_to_action.as_deref()),
            proposal.call_to_action.as_deref(),
        ]),
    };

    let domain_url = if defaults.domain.is_empty() {
        String::new()
    } else {
        format!("https://{}", defaults.domain)
    };
    let destination_url = resolve_text(&[
        frag(|f| f.destination_url.as_deref()),
        tmpl(|f| f.destination_url.as_deref()),
        proposal.destination_url.as_deref(),
        Some(domain_url.as_str()),
    ]);

    let page_id = resolve_text(&[
        frag(|f| f.page_id.as_deref()),
        tmpl(|f| f.page_id.as_deref()),
        proposal.page_id.as_deref(),
        Some(defaults.page_id.as_str()),
    ]);
    let page_name = resolve_text(&[
        frag(|f| f.page_name.as_deref()),
        tmpl(|f| f.page_name.as_deref()),
        proposal.page_name.as_deref(),
        Some(defaults.page_name.as_str()),
    ]);
    let pixel_id = resolve_text(&[
        frag(|f| f.pixel_id.as_deref()),
        tmpl(|f| f.pixel_id.as_deref()),
        proposal.pixel_id.as_deref(),
        Some(defaults.pixel_id.as_str()),
    ]);
    let instagram_actor_id = resolve_text(&[
        frag(|f| f.instagram_actor_id.as_deref()),
        tmpl(|f| f.instagram_actor_id.as_deref()),
        proposal.instagram_actor_id.as_deref(),
        Some(defaults.instagram_actor_id.as_str()),
    ]);

    let creative = assignments
        .get(&id)
        .map(CreativeDescriptor::as_creative_ref)
        .or_else(|| fragment.and_then(fragment_creative));

    let name = resolve_text(&[frag(|f| f.name.as_deref())]);
    let name = if name.is_empty() {
        format!("{} - Ad {}", set_name, ad_index + 1)
    } else {
        name
    };

    let status = if creative.is_some() {
        AdStatus::Draft
    } else {
        AdStatus::Placeholder
    };

    DraftAd {
        id,
        ad_set_id: ad_set_id.to_string(),
        name,
        creative,
        copy,
        destination_url,
        page_id,
        page_name,
        pixel_id,
        instagram_actor_id,
        status,
    }
}

/// Video id wins over image hash when a fragment carries both; they are
/// mutually exclusive on the materialized ad.
fn fragment_creative(fragment: &AdFragment) -> Option<CreativeRef> {
    if let Some(video_id) = fragment.video_id.as_deref().filter(|v| !v.is_empty()) {
        return Some(CreativeRef::VideoId(video_id.to_string()));
    }
    fragment
        .image_hash
        .as_deref()
        .filter(|h| !h.is_empty())
        .map(|h| CreativeRef::ImageHash(h.to_string()))
}

//! Creative assignment resolver.
//!
//! Decides whether pre-selected creatives can auto-complete a proposal,
//! otherwise opens the creative-selection wizard sized exactly to the
//! required slot count, and binds returned assignments back onto slots.
//! Re-entrancy is governed by an explicit transition table instead of
//! recursive re-invocation.

use std::fmt;

use draftdesk_core::config::DraftingConfig;
use draftdesk_core::proposal::{CampaignProposal, PendingCampaignProposal};
use draftdesk_core::types::{
    ad_set_slot_id, ad_slot_id, AccountDefaults, CreativeAssignment, CreativeDescriptor,
    CreativeWizard, CreativeWizardSet, CreativeWizardSlot, DraftCampaign,
};
use draftdesk_core::{DraftError, DraftResult};
use tracing::{debug, info};

use crate::store::ConversationState;
use crate::structure::{synthesize, SlotAssignments, StructureShape};
use crate::validate;

// ─── State machine ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverState {
    NoProposal,
    AwaitingCreativeCountCheck,
    WizardOpen,
    AssignmentsApplied,
}

impl fmt::Display for ResolverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NoProposal => "no_proposal",
            Self::AwaitingCreativeCountCheck => "awaiting_creative_count_check",
            Self::WizardOpen => "wizard_open",
            Self::AssignmentsApplied => "assignments_applied",
        };
        f.write_str(label)
    }
}

/// Describes a single valid transition of the resolver.
#[derive(Debug, Clone)]
pub struct StateTransition {
    pub from: ResolverState,
    pub to: ResolverState,
    pub trigger: &'static str,
}

/// Guards the creative-resolution lifecycle by enforcing a finite set of
/// valid state transitions.
#[derive(Debug, Clone)]
pub struct CreativeStateMachine {
    pub state: ResolverState,
    transitions: Vec<StateTransition>,
}

impl CreativeStateMachine {
    pub fn new() -> Self {
        use ResolverState::*;
        let transitions = vec![
            // A proposal can arrive in any state; it supersedes whatever
            // was in flight.
            StateTransition { from: NoProposal, to: AwaitingCreativeCountCheck, trigger: "proposal_received" },
            StateTransition { from: WizardOpen, to: AwaitingCreativeCountCheck, trigger: "proposal_received" },
            StateTransition { from: AssignmentsApplied, to: AwaitingCreativeCountCheck, trigger: "proposal_received" },
            // Count check outcomes.
            StateTransition { from: AwaitingCreativeCountCheck, to: NoProposal, trigger: "validation_failed" },
            StateTransition { from: AwaitingCreativeCountCheck, to: WizardOpen, trigger: "creatives_missing" },
            StateTransition { from: AwaitingCreativeCountCheck, to: AssignmentsApplied, trigger: "creatives_resolved" },
            // Wizard (or out-of-band creative listing) returned.
            StateTransition { from: WizardOpen, to: AssignmentsApplied, trigger: "assignments_bound" },
        ];
        Self {
            state: ResolverState::NoProposal,
            transitions,
        }
    }

    pub fn can_transition(&self, from: ResolverState, to: ResolverState) -> bool {
        self.transitions
            .iter()
            .any(|t| t.from == from && t.to == to)
    }

    pub fn transition(&mut self, to: ResolverState) -> DraftResult<()> {
        if self.can_transition(self.state, to) {
            self.state = to;
            Ok(())
        } else {
            Err(DraftError::InvalidTransition {
                from: self.state.to_string(),
                to: to.to_string(),
            })
        }
    }
}

impl Default for CreativeStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Proposal handling ──────────────────────────────────────────────────

/// What the resolver produced for a structure proposal.
#[derive(Debug, Clone)]
pub enum ProposalOutcome {
    /// Creatives resolved; the draft is materialized and ready to publish.
    Draft(DraftCampaign),
    /// Not enough creatives; the selection wizard must be shown.
    Wizard(CreativeWizard),
    /// The validation gate blocked the proposal.
    MissingFields(Vec<String>),
}

/// Handles a structure proposal. State mutation is all-or-nothing: on any
/// error the conversation state is left exactly as it was.
pub fn handle_proposal(
    state: &mut ConversationState,
    proposal: CampaignProposal,
    preselected: &mut Vec<CreativeDescriptor>,
    defaults: &AccountDefaults,
    cfg: &DraftingConfig,
) -> DraftResult<ProposalOutcome> {
    let mut machine = state.machine.clone();
    machine.transition(ResolverState::AwaitingCreativeCountCheck)?;

    let missing = validate::missing_fields(&proposal, defaults);
    if !missing.is_empty() {
        machine.transition(ResolverState::NoProposal)?;
        state.machine = machine;
        state.pending = None;
        // A blocked proposal resets the guard like any other new proposal.
        state.creatives_processed = false;
        return Ok(ProposalOutcome::MissingFields(missing));
    }

    let shape = StructureShape::parse(proposal.campaign_structure.as_deref());

    // The proposal already references creatives directly: materialize now.
    if proposal.has_any_creative() {
        let campaign = synthesize(&proposal, defaults, &SlotAssignments::new(), cfg)?;
        machine.transition(ResolverState::AssignmentsApplied)?;
        commit_draft(state, machine, campaign.clone());
        return Ok(ProposalOutcome::Draft(campaign));
    }

    let required = shape.required_slots();
    if preselected.len() >= required {
        let pool = std::mem::take(preselected);
        let mut assignments = SlotAssignments::new();
        for i in 0..required {
            let s = i / shape.ads_per_set;
            let a = i % shape.ads_per_set;
            assignments.insert(ad_slot_id(s, a), pool[i % pool.len()].clone());
        }
        let campaign = synthesize(&proposal, defaults, &assignments, cfg)?;
        machine.transition(ResolverState::AssignmentsApplied)?;
        commit_draft(state, machine, campaign.clone());
        info!(
            required,
            pool = pool.len(),
            "Pre-selected creatives covered every slot; wizard skipped"
        );
        return Ok(ProposalOutcome::Draft(campaign));
    }

    let wizard = build_wizard(&proposal, shape);
    machine.transition(ResolverState::WizardOpen)?;
    state.machine = machine;
    state.creatives_processed = false;
    state.pending = Some(PendingCampaignProposal::new(
        proposal,
        shape.ad_sets,
        shape.ads_per_set,
    ));
    debug!(
        slots = wizard.slot_count(),
        "Opened creative-selection wizard"
    );
    Ok(ProposalOutcome::Wizard(wizard))
}

/// Handles assignments returned by the wizard or by an out-of-band
/// creative-listing result while a pending proposal exists.
///
/// The resumed proposal fully replaces the in-flight draft: the stored
/// proposal is re-expanded to the exact S×A shape, assignments are bound
/// by exact slot id (positional modulo only when an exact id is absent),
/// and the whole resume is one logical transaction.
pub fn handle_assignments(
    state: &mut ConversationState,
    assignments: &[CreativeAssignment],
    defaults: &AccountDefaults,
    cfg: &DraftingConfig,
) -> DraftResult<Option<DraftCampaign>> {
    if state.creatives_processed {
        debug!("Creatives already resolved for this draft; ignoring assignments");
        return Ok(None);
    }
    let Some(pending) = state.pending.clone() else {
        debug!("No pending proposal; ignoring creative assignments");
        return Ok(None);
    };

    let shape = StructureShape {
        ad_sets: pending.ad_set_count,
        ads_per_set: pending.ads_per_set,
    };
    let bound = bind_assignments(assignments, shape);
    let campaign = synthesize(&pending.proposal, defaults, &bound, cfg)?;

    let mut machine = state.machine.clone();
    machine.transition(ResolverState::AssignmentsApplied)?;
    commit_draft(state, machine, campaign.clone());
    info!(
        campaign = %campaign.name,
        assignments = assignments.len(),
        "Pending proposal resumed with creative assignments"
    );
    Ok(Some(campaign))
}

fn commit_draft(
    state: &mut ConversationState,
    machine: CreativeStateMachine,
    campaign: DraftCampaign,
) {
    state.machine = machine;
    state.draft = Some(campaign);
    state.pending = None;
    state.creatives_processed = true;
}

/// Binds assignments onto the exact S×A slot grid. Exact ad-id matches win;
/// slots without one fall back to positional round-robin over the supplied
/// assignments.
pub fn bind_assignments(
    assignments: &[CreativeAssignment],
    shape: StructureShape,
) -> SlotAssignments {
    let mut bound = SlotAssignments::new();
    if assignments.is_empty() {
        return bound;
    }
    for s in 0..shape.ad_sets {
        for a in 0..shape.ads_per_set {
            let slot_id = ad_slot_id(s, a);
            let creative = assignments
                .iter()
                .find(|x| x.ad_id == slot_id)
                .map(|x| x.creative.clone())
                .unwrap_or_else(|| {
                    let index = s * shape.ads_per_set + a;
                    assignments[index % assignments.len()].creative.clone()
                });
            bound.insert(slot_id, creative);
        }
    }
    bound
}

/// Wizard descriptor with exactly S sets and, per set, exactly A ad
/// placeholders.
fn build_wizard(proposal: &CampaignProposal, shape: StructureShape) -> CreativeWizard {
    let campaign_name = proposal
        .name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| "New campaign".to_string());

    let ad_sets = (0..shape.ad_sets)
        .map(|s| {
            let name = proposal
                .ad_sets
                .get(s)
                .and_then(|f| f.name.clone())
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| format!("Ad Set {}", s + 1));
            CreativeWizardSet {
                ad_set_id: ad_set_slot_id(s),
                name,
                ads: (0..shape.ads_per_set)
                    .map(|a| CreativeWizardSlot {
                        ad_id: ad_slot_id(s, a),
                    })
                    .collect(),
            }
        })
        .collect();

    CreativeWizard {
        campaign_name,
        ad_sets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use draftdesk_core::proposal::AdSetFragment;
    use draftdesk_core::types::{AdStatus, CreativeKind, CreativeRef};
    use serde_json::json;

    fn cfg() -> DraftingConfig {
        DraftingConfig::default()
    }

    fn defaults() -> AccountDefaults {
        AccountDefaults {
            account_id: "act_1".to_string(),
            page_id: "page_1".to_string(),
            page_name: "Page".to_string(),
            pixel_id: "pixel_1".to_string(),
            instagram_actor_id: "ig_1".to_string(),
            domain: "example.com".to_string(),
        }
    }

    fn proposal(structure: &str) -> CampaignProposal {
        CampaignProposal {
            name: Some("Launch".to_string()),
            objective: Some("sales".to_string()),
            campaign_structure: Some(structure.to_string()),
            budget: Some(90.0),
            targeting: Some(json!({ "countries": ["BR"] })),
            ad_sets: vec![AdSetFragment::default()],
            ..Default::default()
        }
    }

    fn image(id: &str) -> CreativeDescriptor {
        CreativeDescriptor {
            id: id.to_string(),
            hash: format!("hash-{}", id),
            url: String::new(),
            kind: CreativeKind::Image,
            name: id.to_string(),
        }
    }

    #[test]
    fn test_transition_table_rejects_invalid_moves() {
        let mut machine = CreativeStateMachine::new();
        assert!(machine.transition(ResolverState::WizardOpen).is_err());
        machine
            .transition(ResolverState::AwaitingCreativeCountCheck)
            .unwrap();
        machine.transition(ResolverState::WizardOpen).unwrap();
        assert!(machine
            .can_transition(ResolverState::WizardOpen, ResolverState::AssignmentsApplied));
    }

    #[test]
    fn test_enough_preselected_skips_wizard_and_consumes_pool() {
        let mut state = ConversationState::default();
        let mut pool = vec![image("a"), image("b"), image("c")];

        let outcome =
            handle_proposal(&mut state, proposal("1-3-1"), &mut pool, &defaults(), &cfg())
                .unwrap();

        let ProposalOutcome::Draft(campaign) = outcome else {
            panic!("expected draft outcome");
        };
        assert!(pool.is_empty());
        assert!(state.pending.is_none());
        assert!(state.creatives_processed);
        assert_eq!(state.machine.state, ResolverState::AssignmentsApplied);
        // Every slot covered exactly once.
        let creatives: Vec<_> = campaign
            .ad_sets
            .iter()
            .flat_map(|s| s.ads.iter())
            .map(|a| a.creative.clone().unwrap())
            .collect();
        assert_eq!(creatives.len(), 3);
        assert_eq!(
            creatives,
            vec![
                CreativeRef::ImageHash("hash-a".to_string()),
                CreativeRef::ImageHash("hash-b".to_string()),
                CreativeRef::ImageHash("hash-c".to_string()),
            ]
        );
    }

    #[test]
    fn test_insufficient_preselected_opens_exactly_sized_wizard() {
        let mut state = ConversationState::default();
        let mut pool = vec![image("a")];

        let outcome =
            handle_proposal(&mut state, proposal("1-2-3"), &mut pool, &defaults(), &cfg())
                .unwrap();

        let ProposalOutcome::Wizard(wizard) = outcome else {
            panic!("expected wizard outcome");
        };
        assert_eq!(wizard.ad_sets.len(), 2);
        assert_eq!(wizard.slot_count(), 6);
        assert_eq!(wizard.ad_sets[1].ads[2].ad_id, "draft-ad-1-2");
        // The pool is only consumed on auto-resolution.
        assert_eq!(pool.len(), 1);
        assert!(state.pending.is_some());
        assert_eq!(state.machine.state, ResolverState::WizardOpen);
        assert!(!state.creatives_processed);
    }

    #[test]
    fn test_validation_failure_leaves_no_state_behind() {
        let mut state = ConversationState::default();
        let mut pool = Vec::new();
        let mut bad = proposal("1-1-1");
        bad.budget = None;

        let outcome =
            handle_proposal(&mut state, bad, &mut pool, &defaults(), &cfg()).unwrap();
        assert!(matches!(outcome, ProposalOutcome::MissingFields(ref f) if f == &["budget"]));
        assert!(state.pending.is_none());
        assert!(state.draft.is_none());
        assert_eq!(state.machine.state, ResolverState::NoProposal);
    }

    #[test]
    fn test_assignments_bind_by_exact_id_then_modulo() {
        let shape = StructureShape {
            ad_sets: 2,
            ads_per_set: 1,
        };
        let assignments = vec![
            CreativeAssignment {
                ad_id: "draft-ad-1-0".to_string(),
                ad_set_id: "draft-adset-1".to_string(),
                creative: image("exact"),
            },
            CreativeAssignment {
                ad_id: "unknown-id".to_string(),
                ad_set_id: String::new(),
                creative: image("roundrobin"),
            },
        ];
        let bound = bind_assignments(&assignments, shape);
        // Exact match wins for slot 1-0.
        assert_eq!(bound["draft-ad-1-0"].id, "exact");
        // Slot 0-0 has no exact match: positional modulo picks index 0.
        assert_eq!(bound["draft-ad-0-0"].id, "exact");
    }

    #[test]
    fn test_resume_replaces_pending_and_sets_guard() {
        let mut state = ConversationState::default();
        let mut pool = Vec::new();
        handle_proposal(&mut state, proposal("1-2-1"), &mut pool, &defaults(), &cfg()).unwrap();
        assert!(state.pending.is_some());

        let assignments = vec![
            CreativeAssignment {
                ad_id: "draft-ad-0-0".to_string(),
                ad_set_id: "draft-adset-0".to_string(),
                creative: image("one"),
            },
            CreativeAssignment {
                ad_id: "draft-ad-1-0".to_string(),
                ad_set_id: "draft-adset-1".to_string(),
                creative: image("two"),
            },
        ];
        let campaign = handle_assignments(&mut state, &assignments, &defaults(), &cfg())
            .unwrap()
            .expect("draft should materialize");

        assert_eq!(campaign.ad_sets.len(), 2);
        assert!(campaign
            .ad_sets
            .iter()
            .all(|s| s.ads[0].status == AdStatus::Draft));
        assert!(state.pending.is_none());
        assert!(state.creatives_processed);

        // Second delivery is ignored: the guard holds.
        let again = handle_assignments(&mut state, &assignments, &defaults(), &cfg()).unwrap();
        assert!(again.is_none());
    }

    #[test]
    fn test_new_proposal_supersedes_pending_and_resets_guard() {
        let mut state = ConversationState::default();
        let mut pool = Vec::new();
        handle_proposal(&mut state, proposal("1-2-1"), &mut pool, &defaults(), &cfg()).unwrap();
        let first_pending = state.pending.clone().unwrap();

        let mut pool = vec![image("a"), image("b"), image("c")];
        handle_proposal(&mut state, proposal("1-3-1"), &mut pool, &defaults(), &cfg()).unwrap();
        assert!(state.creatives_processed);
        assert!(state.pending.is_none());
        assert_ne!(first_pending.ad_set_count, 3);

        // And a third proposal resets the processed guard again.
        let mut pool = Vec::new();
        let outcome =
            handle_proposal(&mut state, proposal("1-2-1"), &mut pool, &defaults(), &cfg())
                .unwrap();
        assert!(matches!(outcome, ProposalOutcome::Wizard(_)));
        assert!(!state.creatives_processed);
    }
}

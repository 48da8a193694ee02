//! Budget strategy resolution and distribution.

use draftdesk_core::proposal::AdSetFragment;
use draftdesk_core::types::{BudgetStrategy, DraftCampaign};
use tracing::info;

/// Decides CBO vs ABO. An explicit value always wins and is
/// case-normalized; otherwise ABO is inferred when any ad-set carries its
/// own budget, CBO when none does.
pub fn resolve_strategy(explicit: Option<&str>, ad_sets: &[AdSetFragment]) -> BudgetStrategy {
    if let Some(strategy) = explicit.and_then(BudgetStrategy::parse) {
        return strategy;
    }
    let any_set_budget = ad_sets
        .iter()
        .any(|s| s.daily_budget.is_some_and(|b| b > 0.0));
    if any_set_budget {
        BudgetStrategy::Abo
    } else {
        BudgetStrategy::Cbo
    }
}

/// Enforces the budget-authority invariant on a materialized draft: under
/// CBO the campaign figure is authoritative and per-set budgets are
/// dropped; under ABO with no per-set budgets the campaign total is split
/// evenly (cent-rounded) across all ad-sets.
///
/// The split is the only place budget is silently redistributed, so every
/// per-set amount is logged for auditability.
pub fn apply(campaign: &mut DraftCampaign) {
    match campaign.budget_strategy {
        BudgetStrategy::Cbo => {
            for set in &mut campaign.ad_sets {
                set.daily_budget = None;
            }
        }
        BudgetStrategy::Abo => {
            let has_set_budgets = campaign
                .ad_sets
                .iter()
                .any(|s| s.daily_budget.is_some_and(|b| b > 0.0));
            if has_set_budgets || campaign.budget <= 0.0 || campaign.ad_sets.is_empty() {
                return;
            }

            let count = campaign.ad_sets.len() as i64;
            let total_cents = (campaign.budget * 100.0).round() as i64;
            let base = total_cents / count;
            let remainder = total_cents % count;

            for (i, set) in campaign.ad_sets.iter_mut().enumerate() {
                let cents = base + i64::from((i as i64) < remainder);
                let amount = cents as f64 / 100.0;
                set.daily_budget = Some(amount);
                info!(
                    campaign = %campaign.name,
                    ad_set = %set.name,
                    amount,
                    "Distributed campaign budget to ad-set"
                );
            }
        }
    }
}

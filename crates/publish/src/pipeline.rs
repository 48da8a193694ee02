//! Publish orchestration: one finalized draft in, one RPC out, one chat
//! message back. Publish failures are terminal for the attempt but never
//! crash the session.

use std::sync::Arc;

use draftdesk_core::types::{AccountDefaults, DraftCampaign, Message, WidgetPayload};
use tracing::{error, info};

use crate::client::AdPlatformClient;
use crate::payload::build_payload;

pub struct PublishPipeline {
    client: Arc<dyn AdPlatformClient>,
}

impl PublishPipeline {
    pub fn new(client: Arc<dyn AdPlatformClient>) -> Self {
        Self { client }
    }

    /// Invokes the remote creation RPC exactly once for this draft and
    /// translates the outcome into a user-facing message.
    pub async fn publish(&self, draft: &DraftCampaign, defaults: &AccountDefaults) -> Message {
        let payload = build_payload(draft, defaults);
        info!(
            campaign = %draft.name,
            strategy = draft.budget_strategy.label(),
            ad_sets = draft.ad_sets.len(),
            "Publishing campaign draft"
        );

        match self.client.create_campaign(&payload).await {
            Ok(response) => {
                if let Some(err) = response.error.filter(|e| !e.is_empty()) {
                    error!(campaign = %draft.name, error = %err, "Ad platform rejected campaign");
                    return failure_message(&err);
                }
                let campaign_id = response.campaign_id.unwrap_or_default();
                info!(campaign_id = %campaign_id, "Campaign created");
                success_message(draft, campaign_id)
            }
            Err(e) => {
                error!(campaign = %draft.name, error = %e, "Campaign creation call failed");
                failure_message(&e.to_string())
            }
        }
    }
}

fn success_message(draft: &DraftCampaign, campaign_id: String) -> Message {
    let strategy = draft.budget_strategy;
    let summary = match strategy {
        draftdesk_core::types::BudgetStrategy::Cbo => format!(
            "budget of {:.2} managed at the campaign level (CBO)",
            draft.budget
        ),
        draftdesk_core::types::BudgetStrategy::Abo => format!(
            "budget managed per ad-set (ABO) across {} ad-set(s)",
            draft.ad_sets.len()
        ),
    };
    Message::assistant(format!(
        "Campaign \"{}\" was created in paused state with {} ad-set(s) and a {}. Review it in your ads manager before activating.",
        draft.name,
        draft.ad_sets.len(),
        summary
    ))
    .with_widget(WidgetPayload::CampaignCreated {
        campaign_id,
        strategy,
    })
}

fn failure_message(reason: &str) -> Message {
    Message::assistant(format!(
        "I couldn't publish the campaign: {}. The draft is still here; adjust it and ask me to try again.",
        reason
    ))
}

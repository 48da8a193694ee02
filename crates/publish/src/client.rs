//! Ad-platform client seam.
//!
//! The pipeline talks to the remote creation endpoint through this trait;
//! the concrete client translates the hierarchical payload into the
//! platform-specific API call.

use async_trait::async_trait;
use draftdesk_core::config::PublishConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::payload::CreateCampaignPayload;

/// Result of the remote creation RPC. A populated `error` field counts as
/// a failure even when transport succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCampaignResponse {
    #[serde(default)]
    pub campaign_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[async_trait]
pub trait AdPlatformClient: Send + Sync {
    async fn create_campaign(
        &self,
        payload: &CreateCampaignPayload,
    ) -> Result<CreateCampaignResponse, anyhow::Error>;
}

// ─── Meta Marketing API ─────────────────────────────────────────────────

pub struct MetaMarketingClient {
    _config: PublishConfig,
}

impl MetaMarketingClient {
    pub fn new(config: PublishConfig) -> Self {
        Self { _config: config }
    }
}

#[async_trait]
impl AdPlatformClient for MetaMarketingClient {
    async fn create_campaign(
        &self,
        payload: &CreateCampaignPayload,
    ) -> Result<CreateCampaignResponse, anyhow::Error> {
        debug!(
            account = %payload.account_id,
            campaign = %payload.name,
            ad_sets = payload.campaign.ad_sets.len(),
            "Sending hierarchical creation request to Meta Marketing API"
        );

        // In production: HTTP POST to the Marketing API campaign-creation
        // endpoint. For now: simulate a successful creation.
        Ok(CreateCampaignResponse {
            campaign_id: Some(format!("camp_{}", Uuid::new_v4().simple())),
            error: None,
        })
    }
}

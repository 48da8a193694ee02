//! Durable session persistence seam.
//!
//! In-memory state is always authoritative; writes through this trait are
//! best-effort and asynchronous. Failures are logged, never surfaced to the
//! user, and never block the conversation.

use crate::error::DraftResult;
use crate::types::{DraftCampaign, Message};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Everything persisted for one conversation. Namespaced per conversation
/// id and cleared together on reset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub has_active_draft: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft: Option<DraftCampaign>,
    pub creatives_processed: bool,
    #[serde(default)]
    pub chat_history: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_account_id: Option<String>,
}

#[async_trait]
pub trait DraftPersistence: Send + Sync {
    async fn save(&self, conversation_id: &str, snapshot: &SessionSnapshot) -> DraftResult<()>;
    async fn load(&self, conversation_id: &str) -> DraftResult<Option<SessionSnapshot>>;
    async fn clear(&self, conversation_id: &str) -> DraftResult<()>;
}

/// In-memory persistence backed by DashMap.
///
/// Production: replace with the remote backing store. This provides the
/// same API surface for development and testing.
#[derive(Default)]
pub struct InMemoryPersistence {
    snapshots: DashMap<String, SessionSnapshot>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DraftPersistence for InMemoryPersistence {
    async fn save(&self, conversation_id: &str, snapshot: &SessionSnapshot) -> DraftResult<()> {
        self.snapshots
            .insert(conversation_id.to_string(), snapshot.clone());
        Ok(())
    }

    async fn load(&self, conversation_id: &str) -> DraftResult<Option<SessionSnapshot>> {
        Ok(self.snapshots.get(conversation_id).map(|s| s.value().clone()))
    }

    async fn clear(&self, conversation_id: &str) -> DraftResult<()> {
        self.snapshots.remove(conversation_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_snapshot_roundtrip_and_clear() {
        let store = InMemoryPersistence::new();
        let snapshot = SessionSnapshot {
            has_active_draft: true,
            creatives_processed: true,
            last_account_id: Some("act_123".to_string()),
            ..Default::default()
        };

        store.save("conv-1", &snapshot).await.unwrap();
        let loaded = store.load("conv-1").await.unwrap().unwrap();
        assert!(loaded.has_active_draft);
        assert_eq!(loaded.last_account_id.as_deref(), Some("act_123"));

        store.clear("conv-1").await.unwrap();
        assert!(store.load("conv-1").await.unwrap().is_none());
    }
}

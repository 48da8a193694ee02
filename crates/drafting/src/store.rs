//! Draft state store — the authoritative in-memory representation of every
//! conversation's campaign draft, pending proposal, and re-entrancy flags.
//!
//! In-memory state is authoritative; durable writes happen best-effort and
//! asynchronously after the fact, and a failed write never blocks or
//! surfaces to the user.

use std::sync::Arc;

use dashmap::DashMap;
use draftdesk_core::persist::{DraftPersistence, SessionSnapshot};
use draftdesk_core::proposal::PendingCampaignProposal;
use draftdesk_core::types::{DraftCampaign, Message};
use draftdesk_core::DraftResult;
use tracing::{debug, info, warn};

use crate::creative::CreativeStateMachine;

/// Per-conversation drafting state.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    pub draft: Option<DraftCampaign>,
    pub pending: Option<PendingCampaignProposal>,
    pub creatives_processed: bool,
    pub machine: CreativeStateMachine,
    pub loading: bool,
    pub last_account_id: Option<String>,
}

/// Thread-safe store for conversation drafting state, keyed by
/// conversation id.
pub struct DraftStore {
    conversations: DashMap<String, ConversationState>,
    persistence: Option<Arc<dyn DraftPersistence>>,
}

impl DraftStore {
    pub fn new() -> Self {
        Self {
            conversations: DashMap::new(),
            persistence: None,
        }
    }

    pub fn with_persistence(persistence: Arc<dyn DraftPersistence>) -> Self {
        info!("Draft store initialized with durable persistence");
        Self {
            conversations: DashMap::new(),
            persistence: Some(persistence),
        }
    }

    /// Runs `f` against the conversation's state, creating it on first use.
    pub fn with_state<T>(
        &self,
        conversation_id: &str,
        f: impl FnOnce(&mut ConversationState) -> T,
    ) -> T {
        let mut entry = self
            .conversations
            .entry(conversation_id.to_string())
            .or_default();
        f(entry.value_mut())
    }

    pub fn snapshot(&self, conversation_id: &str) -> ConversationState {
        self.conversations
            .get(conversation_id)
            .map(|s| s.value().clone())
            .unwrap_or_default()
    }

    pub fn draft(&self, conversation_id: &str) -> Option<DraftCampaign> {
        self.conversations
            .get(conversation_id)
            .and_then(|s| s.value().draft.clone())
    }

    /// Marks a turn as started. Rejected while a prior turn is outstanding
    /// to avoid overlapping drafts.
    pub fn begin_turn(&self, conversation_id: &str) -> DraftResult<()> {
        self.with_state(conversation_id, |state| {
            if state.loading {
                Err(draftdesk_core::DraftError::Busy)
            } else {
                state.loading = true;
                Ok(())
            }
        })
    }

    pub fn end_turn(&self, conversation_id: &str) {
        self.with_state(conversation_id, |state| state.loading = false);
    }

    /// Clears the conversation's draft state entirely. Draft and message
    /// history are always cleared together by callers.
    pub fn clear(&self, conversation_id: &str) {
        self.conversations.remove(conversation_id);
        if let Some(persistence) = self.persistence.clone() {
            let conversation_id = conversation_id.to_string();
            tokio::spawn(async move {
                if let Err(e) = persistence.clear(&conversation_id).await {
                    warn!(error = %e, conversation = %conversation_id, "Failed to clear persisted session");
                }
            });
        }
        debug!(conversation = %conversation_id, "Draft state cleared");
    }

    /// Best-effort durable write of the conversation's session keys. The
    /// in-memory state is already authoritative when this runs.
    pub fn persist(&self, conversation_id: &str, chat_history: Vec<Message>) {
        let Some(persistence) = self.persistence.clone() else {
            return;
        };
        let state = self.snapshot(conversation_id);
        let snapshot = SessionSnapshot {
            has_active_draft: state.draft.is_some(),
            draft: state.draft,
            creatives_processed: state.creatives_processed,
            chat_history,
            last_account_id: state.last_account_id,
        };
        let conversation_id = conversation_id.to_string();
        tokio::spawn(async move {
            if let Err(e) = persistence.save(&conversation_id, &snapshot).await {
                warn!(error = %e, conversation = %conversation_id, "Failed to persist session snapshot");
            }
        });
    }
}

impl Default for DraftStore {
    fn default() -> Self {
        Self::new()
    }
}

//! Conversation engine — processes one user turn at a time: message in,
//! completion call out, function-call dispatch, draft mutation, and
//! automatic publish once a draft is complete.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use draftdesk_core::config::AppConfig;
use draftdesk_core::persist::DraftPersistence;
use draftdesk_core::types::{
    AccountDefaults, CreativeAssignment, CreativeDescriptor, DraftCampaign, Message,
    WidgetPayload,
};
use draftdesk_core::DraftResult;
use draftdesk_drafting::creative::{handle_assignments, handle_proposal, ProposalOutcome};
use draftdesk_drafting::{validate, ConversationState, DraftStore};
use draftdesk_publish::{AdPlatformClient, PublishPipeline};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::dispatch::{self, FunctionCall};
use crate::manager::SessionManager;
use crate::watchdog;

// ─── Collaborator seams ─────────────────────────────────────────────────

/// A function call extracted from a completion response.
#[derive(Debug, Clone)]
pub struct FunctionCallPayload {
    pub name: String,
    pub arguments: Value,
}

/// One completion-service reply: assistant text, a function call, or both.
#[derive(Debug, Clone, Default)]
pub struct AiReply {
    pub content: Option<String>,
    pub function_call: Option<FunctionCallPayload>,
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, messages: &[Message]) -> Result<AiReply, anyhow::Error>;
}

/// Account data lookups the completion service can request. Results are
/// returned as structured data directly, bypassing normal chat text.
#[async_trait]
pub trait AccountDataProvider: Send + Sync {
    async fn list_pixels(&self, account_id: &str) -> Result<Value, anyhow::Error>;
    async fn list_identities(&self, account_id: &str) -> Result<Value, anyhow::Error>;
    async fn list_creatives(
        &self,
        account_id: &str,
    ) -> Result<Vec<CreativeDescriptor>, anyhow::Error>;
    async fn search_geo(&self, query: &str) -> Result<Value, anyhow::Error>;
    async fn search_interests(&self, query: &str) -> Result<Value, anyhow::Error>;
    async fn list_collections(&self, account_id: &str) -> Result<Value, anyhow::Error>;
}

// ─── Engine ─────────────────────────────────────────────────────────────

pub struct ConversationEngine {
    sessions: Arc<SessionManager>,
    store: Arc<DraftStore>,
    completion: Arc<dyn CompletionClient>,
    data: Arc<dyn AccountDataProvider>,
    publisher: PublishPipeline,
    cfg: AppConfig,
}

impl ConversationEngine {
    pub fn new(
        cfg: AppConfig,
        completion: Arc<dyn CompletionClient>,
        data: Arc<dyn AccountDataProvider>,
        platform: Arc<dyn AdPlatformClient>,
    ) -> Self {
        Self {
            sessions: Arc::new(SessionManager::new(cfg.session.clone())),
            store: Arc::new(DraftStore::new()),
            completion,
            data,
            publisher: PublishPipeline::new(platform),
            cfg,
        }
    }

    pub fn with_persistence(
        cfg: AppConfig,
        completion: Arc<dyn CompletionClient>,
        data: Arc<dyn AccountDataProvider>,
        platform: Arc<dyn AdPlatformClient>,
        persistence: Arc<dyn DraftPersistence>,
    ) -> Self {
        Self {
            sessions: Arc::new(SessionManager::new(cfg.session.clone())),
            store: Arc::new(DraftStore::with_persistence(persistence)),
            completion,
            data,
            publisher: PublishPipeline::new(platform),
            cfg,
        }
    }

    pub fn history(&self, conversation_id: &str) -> Vec<Message> {
        self.sessions.history(conversation_id)
    }

    pub fn draft(&self, conversation_id: &str) -> Option<DraftCampaign> {
        self.store.draft(conversation_id)
    }

    /// Explicit reset: message history and draft state are cleared
    /// together.
    pub fn reset(&self, conversation_id: &str) {
        self.sessions.clear(conversation_id);
        self.store.clear(conversation_id);
    }

    /// Processes one user message. Rejected while a prior turn is
    /// outstanding. Returns the messages appended this turn.
    pub async fn send_message(
        &self,
        conversation_id: &str,
        text: &str,
        defaults: &AccountDefaults,
        preselected: Vec<CreativeDescriptor>,
    ) -> DraftResult<Vec<Message>> {
        self.store.begin_turn(conversation_id)?;
        let result = self
            .run_turn(conversation_id, text, defaults, preselected)
            .await;
        self.store.end_turn(conversation_id);
        self.store
            .persist(conversation_id, self.sessions.history(conversation_id));
        result
    }

    /// Applies creative assignments returned by the selection wizard. The
    /// pending proposal is resumed as a single transaction and, once the
    /// draft materializes, the publish pipeline fires automatically.
    pub async fn apply_creative_assignments(
        &self,
        conversation_id: &str,
        assignments: Vec<CreativeAssignment>,
        defaults: &AccountDefaults,
    ) -> DraftResult<Vec<Message>> {
        let campaign = self.store.with_state(conversation_id, |state| {
            handle_assignments(state, &assignments, defaults, &self.cfg.drafting)
        })?;

        let mut out = Vec::new();
        if let Some(campaign) = campaign {
            let message = self.publisher.publish(&campaign, defaults).await;
            self.sessions.append(conversation_id, message.clone());
            out.push(message);
        }
        self.store
            .persist(conversation_id, self.sessions.history(conversation_id));
        Ok(out)
    }

    async fn run_turn(
        &self,
        conversation_id: &str,
        text: &str,
        defaults: &AccountDefaults,
        mut preselected: Vec<CreativeDescriptor>,
    ) -> DraftResult<Vec<Message>> {
        let mut out = Vec::new();
        let user = Message::user(text);
        self.sessions.append(conversation_id, user.clone());
        out.push(user.clone());

        self.store.with_state(conversation_id, |st| {
            st.last_account_id = Some(defaults.account_id.clone());
        });

        let state = self.store.snapshot(conversation_id);
        let draft_active = state.draft.is_some() || state.pending.is_some();

        let context = if draft_active && self.sessions.is_new_campaign_intent(text) {
            self.store.with_state(conversation_id, |st| {
                *st = ConversationState {
                    last_account_id: st.last_account_id.clone(),
                    loading: st.loading,
                    ..Default::default()
                };
            });
            info!(conversation = %conversation_id, "New-campaign intent detected; draft state cleared");
            vec![
                Message::system(
                    "The operator discarded the previous campaign draft and wants to start a new one from scratch.",
                ),
                user,
            ]
        } else {
            self.sessions.context_window(conversation_id)
        };

        let watchdog_sessions = self.sessions.clone();
        let watchdog_conv = conversation_id.to_string();
        let guard = watchdog::arm(
            Duration::from_secs(self.cfg.session.watchdog_delay_secs),
            move || {
                warn!(conversation = %watchdog_conv, "Completion request still outstanding");
                watchdog_sessions.append(
                    &watchdog_conv,
                    Message::assistant(
                        "This is taking longer than usual. The request is still running, so you can keep waiting, or send your message again if nothing shows up.",
                    ),
                );
            },
        );

        let reply = self.completion.complete(&context).await;
        guard.disarm();

        let reply = match reply {
            Ok(reply) => reply,
            Err(e) => {
                error!(error = %e, "Completion call failed");
                let message = Message::assistant(
                    "I couldn't reach the assistant service just now. Nothing was changed, please send that again.",
                );
                self.sessions.append(conversation_id, message.clone());
                out.push(message);
                return Ok(out);
            }
        };

        if let Some(call) = reply.function_call {
            match dispatch::parse_function_call(&call.name, call.arguments) {
                Ok(parsed) => {
                    self.dispatch(conversation_id, parsed, defaults, &mut preselected, &mut out)
                        .await?;
                }
                Err(e) => {
                    warn!(function = %call.name, error = %e, "Unparseable function call");
                    let message = Message::assistant(
                        "I got a response I couldn't make sense of. Please try rephrasing your request.",
                    );
                    self.sessions.append(conversation_id, message.clone());
                    out.push(message);
                }
            }
        } else if let Some(content) = reply.content.filter(|c| !c.trim().is_empty()) {
            let message = Message::assistant(content);
            self.sessions.append(conversation_id, message.clone());
            out.push(message);
        }

        Ok(out)
    }

    async fn dispatch(
        &self,
        conversation_id: &str,
        call: FunctionCall,
        defaults: &AccountDefaults,
        preselected: &mut Vec<CreativeDescriptor>,
        out: &mut Vec<Message>,
    ) -> DraftResult<()> {
        match call {
            FunctionCall::ProposeCampaignStructure(proposal) => {
                let outcome = self.store.with_state(conversation_id, |state| {
                    handle_proposal(state, proposal, preselected, defaults, &self.cfg.drafting)
                })?;
                match outcome {
                    ProposalOutcome::MissingFields(missing) => {
                        self.push(conversation_id, validate::missing_fields_message(&missing), out);
                    }
                    ProposalOutcome::Wizard(wizard) => {
                        let message = Message::assistant(
                            "This campaign still needs creatives. Pick one for each ad slot below.",
                        )
                        .with_widget(WidgetPayload::CreativePicker(wizard));
                        self.push(conversation_id, message, out);
                    }
                    ProposalOutcome::Draft(campaign) => {
                        // Draft complete: publish fires automatically.
                        let message = self.publisher.publish(&campaign, defaults).await;
                        self.push(conversation_id, message, out);
                    }
                }
            }

            FunctionCall::UpdateDraftCard(update) => {
                let Some(draft) = self.store.draft(conversation_id) else {
                    self.push(
                        conversation_id,
                        Message::assistant(
                            "There's no campaign draft to update yet. Describe the campaign you want first.",
                        ),
                        out,
                    );
                    return Ok(());
                };
                match dispatch::apply_update(&draft, &update, &self.cfg.drafting) {
                    Ok(next) => {
                        self.store
                            .with_state(conversation_id, |state| state.draft = Some(next));
                        self.push(
                            conversation_id,
                            Message::assistant("Done, the draft card is updated."),
                            out,
                        );
                    }
                    Err(e) => {
                        warn!(error = %e, "Draft card update rejected");
                        self.push(
                            conversation_id,
                            Message::assistant(format!(
                                "I couldn't apply that change: {}. The draft is unchanged.",
                                e
                            )),
                            out,
                        );
                    }
                }
            }

            FunctionCall::RequestInterestSelection { query } => {
                let message = Message::assistant("Pick the interests you want to target.")
                    .with_widget(WidgetPayload::InterestPicker { query });
                self.push(conversation_id, message, out);
            }

            FunctionCall::ListCreatives => {
                match self.data.list_creatives(&defaults.account_id).await {
                    Ok(creatives) => {
                        let pending = self
                            .store
                            .snapshot(conversation_id)
                            .pending
                            .is_some();
                        if pending && !creatives.is_empty() {
                            // A creative listing arriving while a proposal is
                            // parked resumes it: listing order maps onto slots
                            // round-robin.
                            let assignments: Vec<CreativeAssignment> = creatives
                                .iter()
                                .map(|creative| CreativeAssignment {
                                    ad_id: String::new(),
                                    ad_set_id: String::new(),
                                    creative: creative.clone(),
                                })
                                .collect();
                            let campaign = self.store.with_state(conversation_id, |state| {
                                handle_assignments(
                                    state,
                                    &assignments,
                                    defaults,
                                    &self.cfg.drafting,
                                )
                            })?;
                            if let Some(campaign) = campaign {
                                let message = self.publisher.publish(&campaign, defaults).await;
                                self.push(conversation_id, message, out);
                                return Ok(());
                            }
                        }
                        self.push_data(conversation_id, serde_json::to_value(&creatives)?, out);
                    }
                    Err(e) => self.push_lookup_failure(conversation_id, "creatives", e, out),
                }
            }

            FunctionCall::ListPixels => {
                self.lookup(conversation_id, "pixels", self.data.list_pixels(&defaults.account_id).await, out);
            }
            FunctionCall::ListIdentities => {
                self.lookup(conversation_id, "identities", self.data.list_identities(&defaults.account_id).await, out);
            }
            FunctionCall::SearchGeo { query } => {
                self.lookup(conversation_id, "geo", self.data.search_geo(&query).await, out);
            }
            FunctionCall::SearchInterests { query } => {
                self.lookup(conversation_id, "interests", self.data.search_interests(&query).await, out);
            }
            FunctionCall::ListCollections => {
                self.lookup(conversation_id, "collections", self.data.list_collections(&defaults.account_id).await, out);
            }
        }
        Ok(())
    }

    fn lookup(
        &self,
        conversation_id: &str,
        what: &str,
        result: Result<Value, anyhow::Error>,
        out: &mut Vec<Message>,
    ) {
        match result {
            Ok(data) => self.push_data(conversation_id, data, out),
            Err(e) => self.push_lookup_failure(conversation_id, what, e, out),
        }
    }

    fn push(&self, conversation_id: &str, message: Message, out: &mut Vec<Message>) {
        self.sessions.append(conversation_id, message.clone());
        out.push(message);
    }

    fn push_data(&self, conversation_id: &str, data: Value, out: &mut Vec<Message>) {
        let message = Message::new(
            draftdesk_core::types::MessageRole::Function,
            data.to_string(),
        );
        self.push(conversation_id, message, out);
    }

    fn push_lookup_failure(
        &self,
        conversation_id: &str,
        what: &str,
        error: anyhow::Error,
        out: &mut Vec<Message>,
    ) {
        error!(error = %error, what, "Account data lookup failed");
        self.push(
            conversation_id,
            Message::assistant(format!(
                "I couldn't load your {} right now. Please try again in a moment.",
                what
            )),
            out,
        );
    }
}

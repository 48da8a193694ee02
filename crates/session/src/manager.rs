//! Conversation session manager.
//!
//! Owns per-conversation message history and the rules for what gets sent
//! upstream: a rolling window of the most recent messages, a per-message
//! content cap, and a "cut" at the last successful campaign-creation event.
//! The full history stays visible and persisted; only the upstream context
//! is pruned.

use dashmap::DashMap;
use draftdesk_core::config::SessionConfig;
use draftdesk_core::types::Message;
use tracing::debug;

/// Keyword heuristic for "the operator wants to start a new campaign".
const NEW_CAMPAIGN_KEYWORDS: &[&str] = &[
    "nova campanha",
    "outra campanha",
    "new campaign",
    "another campaign",
    "start over",
    "começar de novo",
    "comecar de novo",
];

pub struct SessionManager {
    history: DashMap<String, Vec<Message>>,
    cfg: SessionConfig,
}

impl SessionManager {
    pub fn new(cfg: SessionConfig) -> Self {
        Self {
            history: DashMap::new(),
            cfg,
        }
    }

    /// Appends a message to the conversation's visible history.
    pub fn append(&self, conversation_id: &str, message: Message) {
        self.history
            .entry(conversation_id.to_string())
            .or_default()
            .push(message);
    }

    /// The full, append-only visible history.
    pub fn history(&self, conversation_id: &str) -> Vec<Message> {
        self.history
            .get(conversation_id)
            .map(|h| h.value().clone())
            .unwrap_or_default()
    }

    /// The context sent upstream per turn: everything up to and including
    /// the last successful campaign-creation event is excluded, then the
    /// most recent N messages are kept with their content capped.
    pub fn context_window(&self, conversation_id: &str) -> Vec<Message> {
        let history = self.history(conversation_id);
        let cut = history.iter().rposition(Message::is_campaign_created);
        let visible: &[Message] = match cut {
            Some(i) => &history[i + 1..],
            None => &history,
        };
        let start = visible.len().saturating_sub(self.cfg.window_size);
        visible[start..]
            .iter()
            .map(|m| self.capped(m))
            .collect()
    }

    fn capped(&self, message: &Message) -> Message {
        if message.content.chars().count() <= self.cfg.max_message_chars {
            return message.clone();
        }
        let mut capped = message.clone();
        capped.content = message
            .content
            .chars()
            .take(self.cfg.max_message_chars)
            .collect();
        capped
    }

    /// True when the text matches the "new campaign" intent heuristic.
    pub fn is_new_campaign_intent(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        NEW_CAMPAIGN_KEYWORDS.iter().any(|k| lower.contains(k))
    }

    /// Clears the conversation's history. Callers clear the draft state in
    /// the same breath; the two are never reset independently.
    pub fn clear(&self, conversation_id: &str) {
        self.history.remove(conversation_id);
        debug!(conversation = %conversation_id, "Session history cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use draftdesk_core::types::{BudgetStrategy, WidgetPayload};

    fn manager() -> SessionManager {
        SessionManager::new(SessionConfig {
            window_size: 3,
            max_message_chars: 20,
            watchdog_delay_secs: 30,
        })
    }

    #[test]
    fn test_window_keeps_most_recent_n() {
        let m = manager();
        for i in 0..6 {
            m.append("c", Message::user(format!("message {}", i)));
        }
        let window = m.context_window("c");
        assert_eq!(window.len(), 3);
        assert_eq!(window[0].content, "message 3");
        assert_eq!(window[2].content, "message 5");
        // Visible history is untouched.
        assert_eq!(m.history("c").len(), 6);
    }

    #[test]
    fn test_cut_rule_excludes_through_last_creation_event() {
        let m = manager();
        m.append("c", Message::user("before"));
        m.append(
            "c",
            Message::assistant("created!").with_widget(WidgetPayload::CampaignCreated {
                campaign_id: "camp_1".to_string(),
                strategy: BudgetStrategy::Cbo,
            }),
        );
        m.append("c", Message::user("after"));

        let window = m.context_window("c");
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].content, "after");
        // Everything is still visible to the UI.
        assert_eq!(m.history("c").len(), 3);
    }

    #[test]
    fn test_content_cap_applies_only_upstream() {
        let m = manager();
        let long = "x".repeat(100);
        m.append("c", Message::user(long.clone()));
        let window = m.context_window("c");
        assert_eq!(window[0].content.chars().count(), 20);
        assert_eq!(m.history("c")[0].content, long);
    }

    #[test]
    fn test_new_campaign_intent_keywords() {
        let m = manager();
        assert!(m.is_new_campaign_intent("quero criar uma NOVA CAMPANHA agora"));
        assert!(m.is_new_campaign_intent("let's start over with another campaign"));
        assert!(!m.is_new_campaign_intent("change the budget to 50"));
    }
}

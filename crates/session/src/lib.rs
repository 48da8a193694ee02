//! Conversation session layer: message history, context windowing,
//! function-call dispatch, and the turn-processing engine.

pub mod dispatch;
pub mod engine;
pub mod manager;
pub mod watchdog;

pub use engine::{
    AccountDataProvider, AiReply, CompletionClient, ConversationEngine, FunctionCallPayload,
};
pub use manager::SessionManager;

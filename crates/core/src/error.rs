use thiserror::Error;

pub type DraftResult<T> = Result<T, DraftError>;

#[derive(Error, Debug)]
pub enum DraftError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("Invalid proposal: {0}")]
    Proposal(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Ad platform error: {0}")]
    Platform(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("A request is already in flight for this conversation")]
    Busy,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

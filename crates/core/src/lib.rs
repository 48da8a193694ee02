pub mod config;
pub mod error;
pub mod persist;
pub mod proposal;
pub mod targeting;
pub mod types;

pub use config::AppConfig;
pub use error::{DraftError, DraftResult};

//! Campaign-drafting engine: turns loose AI proposals into fully
//! materialized, internally consistent campaign drafts.

pub mod budget;
pub mod creative;
pub mod fallback;
pub mod store;
pub mod structure;
pub mod validate;

pub use creative::{handle_assignments, handle_proposal, ProposalOutcome, ResolverState};
pub use store::{ConversationState, DraftStore};
pub use structure::{synthesize, StructureShape};

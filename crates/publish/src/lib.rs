//! Publish pipeline — transforms a finalized draft into the hierarchical
//! creation payload and dispatches it to the ad platform.

pub mod client;
pub mod payload;
pub mod pipeline;

pub use client::{AdPlatformClient, CreateCampaignResponse, MetaMarketingClient};
pub use payload::build_payload;
pub use pipeline::PublishPipeline;

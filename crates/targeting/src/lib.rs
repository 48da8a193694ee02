//! Targeting normalizer — converts heterogeneous audience-targeting shapes
//! into the one canonical record the drafting engine works with.

pub mod normalizer;

pub use normalizer::{has_geography_signal, normalize};

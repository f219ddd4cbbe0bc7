//! Client side of the VPS provider API.
//!
//! Covers everything between the engine and the provider: multi-account
//! credential parsing, inventory discovery with per-account failure
//! isolation, the VM-to-account ownership index, the fetch-once spec cache,
//! raw metrics retrieval, and normalization of the sparse per-metric series
//! into aligned chart points.

pub mod accounts;
pub mod client;
pub mod discovery;
pub mod error;
pub mod metrics;
pub mod normalize;
pub mod ownership;
pub mod specs;

pub use client::{ProviderClient, VpsApi};
pub use ownership::OwnershipIndex;
pub use specs::SpecCache;

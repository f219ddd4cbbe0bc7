//! Shared plain-data types for the VPS monitoring engine.
//!
//! Everything here is I/O-free: provider wire shapes, cached VM
//! specifications, normalized chart points, and the alert template context
//! handed to the dispatcher.

pub mod types;

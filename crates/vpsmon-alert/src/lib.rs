//! Spike detection against configurable thresholds.
//!
//! Pure logic only: check-schedule parsing and lookback sizing, per-VM
//! threshold resolution, and evaluation of raw metric maxima inside a
//! window anchored to the freshest data point. Network access and alert
//! delivery live in the provider and notify crates.

pub mod schedule;
pub mod spike;
pub mod thresholds;
pub mod window;

#[cfg(test)]
mod tests;

//! The scheduled health-check engine and its runtime plumbing.
//!
//! Ties the other crates together: configuration loading, the per-run state
//! machine (discover, fetch, evaluate, dispatch, compute next run), the
//! minute-tick scheduler with its re-entrancy guard, and the bounded
//! ring-buffer log sink backing the dashboard log viewer. Dashboard-facing
//! data (VM overview, normalized metric points, raw specs) is exposed as
//! plain library calls on [`engine::HealthCheckEngine`].

pub mod config;
pub mod engine;
pub mod logbuf;
pub mod scheduler;

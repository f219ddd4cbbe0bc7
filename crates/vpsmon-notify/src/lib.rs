//! Alert delivery behind a narrow trait.
//!
//! The engine hands a finished subject, a human-readable plain-text body and
//! a template context to an [`AlertDispatcher`] and treats delivery as a
//! black box. The built-in implementation sends email over SMTP.

pub mod email;
pub mod error;
pub mod template;

use async_trait::async_trait;
use vpsmon_common::types::AlertContext;

/// Delivers one alert to its recipients.
#[async_trait]
pub trait AlertDispatcher: Send + Sync {
    /// `body` must be readable on its own even if no template rendering
    /// happens downstream; `context` feeds the optional HTML template.
    async fn send(
        &self,
        subject: &str,
        body: &str,
        context: &AlertContext,
    ) -> error::Result<()>;
}

/// Fallback dispatcher for deployments without SMTP configured: the alert is
/// already logged by the engine, so delivery reduces to a log line.
pub struct LogOnlyDispatcher;

#[async_trait]
impl AlertDispatcher for LogOnlyDispatcher {
    async fn send(
        &self,
        subject: &str,
        _body: &str,
        _context: &AlertContext,
    ) -> error::Result<()> {
        tracing::info!(subject, "Alert delivery skipped (no SMTP configured)");
        Ok(())
    }
}

/// Errors that can occur within the notification subsystem.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Dispatcher configuration is missing a required field or contains an
    /// invalid value.
    #[error("notify: invalid configuration: {0}")]
    InvalidConfig(String),

    /// A sender or recipient address failed to parse.
    #[error("notify: address error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// Building the email message failed.
    #[error("notify: message build error: {0}")]
    Message(#[from] lettre::error::Error),

    /// SMTP transport failure, after retries.
    #[error("notify: SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// Reading the HTML template from disk failed.
    #[error("notify: template read error: {0}")]
    TemplateRead(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, NotifyError>;

//! Alert delivery.

mod message;
mod smtp;

use std::future::Future;

pub use message::{AlertMessage, AlertTemplate};
pub use smtp::{Security, SmtpConfig, SmtpNotifier};

/// Errors that can occur while delivering an alert. All are fatal to the
/// invocation.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The mail server rejected the account credentials.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The mail server could not be reached or the secure session failed.
    #[error("Connection failed: {0}")]
    Transport(String),

    /// Submission failed for any other reason.
    #[error("Send failed: {0}")]
    Unknown(String),
}

/// Delivers an alert carrying a status text.
pub trait Notifier {
    /// Sends exactly one alert.
    fn notify(&self, status: &str) -> impl Future<Output = Result<(), NotifyError>> + Send;
}

//! Error types for SMTP operations.

use std::io;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Server returned an error reply.
    #[error("SMTP error {code}: {message}")]
    SmtpError {
        /// Reply code (e.g., 535).
        code: u16,
        /// Message text from the server.
        message: String,
    },

    /// Protocol error (malformed or unexpected reply).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Feature not advertised by the server.
    #[error("Server does not support {0}")]
    NotSupported(String),
}

impl Error {
    /// Creates an SMTP error from a reply code and message.
    #[must_use]
    pub fn smtp_error(code: u16, message: impl Into<String>) -> Self {
        Self::SmtpError {
            code,
            message: message.into(),
        }
    }

    /// Returns the server reply code, if this error carries one.
    #[must_use]
    pub const fn reply_code(&self) -> Option<u16> {
        match self {
            Self::SmtpError { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns true if the connection itself failed (I/O, TLS, or the server
    /// closed the connection mid-reply).
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Tls(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_code_only_for_server_errors() {
        assert_eq!(Error::smtp_error(535, "bad creds").reply_code(), Some(535));
        assert_eq!(Error::Protocol("x".into()).reply_code(), None);
    }

    #[test]
    fn io_is_connection_error() {
        let err = Error::from(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        assert!(err.is_connection_error());
        assert!(!Error::smtp_error(421, "busy").is_connection_error());
    }

    #[test]
    fn display_includes_code() {
        let err = Error::smtp_error(550, "mailbox unavailable");
        assert_eq!(err.to_string(), "SMTP error 550: mailbox unavailable");
    }
}

//! Page snapshot and decision types.

use serde::{Deserialize, Serialize};

/// Console line printed while the service is still offline.
pub const STILL_UNAVAILABLE_LINE: &str = "Still unavailable.";

/// Text body and final resolved URL of one page fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSnapshot {
    body: String,
    final_url: String,
}

impl PageSnapshot {
    /// Creates a snapshot from a response body and the URL it was served from.
    #[must_use]
    pub fn new(body: impl Into<String>, final_url: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            final_url: final_url.into(),
        }
    }

    /// Response body text.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// URL after redirects.
    #[must_use]
    pub fn final_url(&self) -> &str {
        &self.final_url
    }
}

/// Classifier outcome for a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Offline banner still present.
    StillUnavailable,
    /// Request ended on the login page, so the service is up.
    LoginRedirect,
    /// Booking form content recognized.
    BookingDetected,
    /// Offline banner gone but nothing recognizable replaced it.
    UnexpectedChange,
}

impl Decision {
    /// Status text used as the alert body suffix, if this decision alerts.
    #[must_use]
    pub const fn status(self) -> Option<&'static str> {
        match self {
            Self::StillUnavailable => None,
            Self::LoginRedirect => Some("Redirected to login (system live)"),
            Self::BookingDetected => Some("Booking form detected"),
            Self::UnexpectedChange => Some(
                "UNEXPECTED CHANGE - Page changed but not recognized as booking system. Manual check required.",
            ),
        }
    }

    /// The single action this decision calls for.
    #[must_use]
    pub const fn action(self) -> Action {
        match self.status() {
            Some(status) => Action::Notify(status),
            None => Action::Print(STILL_UNAVAILABLE_LINE),
        }
    }

    /// Returns true if this decision sends an alert.
    #[must_use]
    pub const fn should_notify(self) -> bool {
        self.status().is_some()
    }

    /// Stable identifier, matching the serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StillUnavailable => "still_unavailable",
            Self::LoginRedirect => "login_redirect",
            Self::BookingDetected => "booking_detected",
            Self::UnexpectedChange => "unexpected_change",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What one invocation does with a decision: print or notify, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Write a line to the operator console.
    Print(&'static str),
    /// Send an alert with this status text.
    Notify(&'static str),
}

//! Alert message rendering.

use chrono::{DateTime, Utc};

/// Subject and wording of the alert, independent of any one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertTemplate {
    /// Subject line.
    pub subject: String,
    /// Human name of the watched page, used in the body sentence.
    pub page_label: String,
    /// Link included at the end of the body.
    pub target_url: String,
}

impl Default for AlertTemplate {
    fn default() -> Self {
        Self {
            subject: "Warwick WRB 25/26 is LIVE!".to_string(),
            page_label: "Warwick WRB 25/26 booking page".to_string(),
            target_url: "https://abs.warwick.ac.uk/WRB2526/".to_string(),
        }
    }
}

impl AlertTemplate {
    /// Body text for a given status.
    #[must_use]
    pub fn body(&self, status: &str) -> String {
        format!(
            "The {} is now live (status: {status}).\n\n{}",
            self.page_label, self.target_url
        )
    }

    /// Renders a full message from `from` to `to`.
    #[must_use]
    pub fn render(&self, from: &str, to: &str, status: &str) -> AlertMessage {
        AlertMessage {
            from: from.to_string(),
            to: to.to_string(),
            subject: self.subject.clone(),
            body: self.body(status),
        }
    }
}

/// A single plain-text alert email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    /// Sender address.
    pub from: String,
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Plain text body.
    pub body: String,
}

impl AlertMessage {
    /// Builds the RFC 5322 message, dated `date`.
    #[must_use]
    pub fn to_rfc5322(&self, date: DateTime<Utc>) -> String {
        use std::fmt::Write;

        let mut message = String::new();

        let _ = write!(message, "From: {}\r\n", self.from);
        let _ = write!(message, "To: {}\r\n", self.to);
        let _ = write!(message, "Subject: {}\r\n", single_line(&self.subject));
        let _ = write!(message, "Date: {}\r\n", date.to_rfc2822());
        message.push_str("MIME-Version: 1.0\r\n");
        message.push_str("Content-Type: text/plain; charset=utf-8\r\n");
        message.push_str("Content-Transfer-Encoding: 8bit\r\n");

        // Empty line between headers and body
        message.push_str("\r\n");

        for line in self.body.lines() {
            message.push_str(line);
            message.push_str("\r\n");
        }

        message
    }
}

/// Folds a header value onto one line so it cannot inject headers.
fn single_line(value: &str) -> String {
    value.split(['\r', '\n']).filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ")
}

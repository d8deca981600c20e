//! Envelope address type.

use crate::error::{Error, Result};

/// Email address for the SMTP envelope (`MAIL FROM` / `RCPT TO`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Creates a new address, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] unless the address has exactly one
    /// `@` with non-empty local and domain parts and no angle brackets or
    /// line breaks.
    pub fn new(addr: impl AsRef<str>) -> Result<Self> {
        let addr = addr.as_ref().trim();

        if addr.is_empty() {
            return Err(Error::InvalidAddress("address cannot be empty".into()));
        }
        if addr.contains(['<', '>', '\r', '\n', ' ']) {
            return Err(Error::InvalidAddress(format!(
                "address contains forbidden characters: {addr:?}"
            )));
        }

        match addr.split_once('@') {
            Some((local, domain))
                if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
            {
                Ok(Self(addr.to_string()))
            }
            _ => Err(Error::InvalidAddress(format!(
                "expected local@domain, got {addr:?}"
            ))),
        }
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

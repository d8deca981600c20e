//! Match strings the classifier looks for.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How a generic booking page that names an older cycle is treated.
///
/// The keyword alone identifies a booking form. `Flag` additionally
/// demands that the page either names no cycle at all or names the current
/// one, so last year's live form does not look like this year's launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrongCyclePolicy {
    /// Keyword present means booking detected, whatever year it names.
    #[default]
    Accept,
    /// Keyword next to only a stale year marker is an unexpected change.
    Flag,
}

/// Substrings that drive classification, plus the page being watched.
///
/// Loaded from JSON, missing fields fall back to the built-in defaults, so a
/// rules file only has to name what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchRules {
    /// Page to fetch.
    pub target_url: String,
    /// Body text present only while the service is offline.
    pub offline_sentinel: String,
    /// Exact banner of the current cycle's booking system.
    pub banner_text: String,
    /// Generic wording found on any cycle's booking form.
    pub keyword_text: String,
    /// Year marker of the cycle being watched for.
    pub current_year_marker: String,
    /// All cycle year markers the pages are known to carry.
    pub year_markers: Vec<String>,
    /// Final-URL substrings that mean we were bounced to a login page.
    pub redirect_markers: Vec<String>,
    /// Treatment of keyword pages naming an older cycle.
    pub wrong_cycle: WrongCyclePolicy,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            target_url: "https://abs.warwick.ac.uk/WRB2526/".to_string(),
            offline_sentinel: "Application Unavailable".to_string(),
            banner_text: "Web Room Booking System 2025/26".to_string(),
            keyword_text: "Preferred Start".to_string(),
            current_year_marker: "2025/26".to_string(),
            year_markers: vec!["2024/25".to_string(), "2025/26".to_string()],
            redirect_markers: vec!["Login.aspx".to_string(), "ReturnUrl".to_string()],
            wrong_cycle: WrongCyclePolicy::Accept,
        }
    }
}

impl MatchRules {
    /// Parses rules from JSON and validates them.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed, names an unknown field, or
    /// fails [`MatchRules::validate`].
    pub fn from_json(json: &str) -> Result<Self> {
        let rules: Self = serde_json::from_str(json)?;
        rules.validate()?;
        Ok(rules)
    }

    /// Reads rules from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or its content is invalid.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let rules = Self::from_json(&contents)?;
        tracing::debug!(path = %path.display(), "Loaded match rules");
        Ok(rules)
    }

    /// Rejects rules that would make the classifier meaningless.
    ///
    /// An empty pattern is contained in every string, so an empty sentinel
    /// would report the service offline forever.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("target_url", &self.target_url),
            ("offline_sentinel", &self.offline_sentinel),
            ("banner_text", &self.banner_text),
            ("keyword_text", &self.keyword_text),
            ("current_year_marker", &self.current_year_marker),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("{field} must not be empty")));
            }
        }

        if !self.target_url.starts_with("http://") && !self.target_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "target_url must be an http(s) URL, got {:?}",
                self.target_url
            )));
        }

        let lists = [
            ("year_markers", &self.year_markers),
            ("redirect_markers", &self.redirect_markers),
        ];
        for (field, values) in lists {
            if values.iter().any(|v| v.is_empty()) {
                return Err(Error::Config(format!("{field} must not contain empty strings")));
            }
        }

        Ok(())
    }
}

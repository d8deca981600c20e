//! Configuration loaded from environment variables.
//!
//! | variable                 | meaning                                   | default           |
//! |--------------------------|-------------------------------------------|-------------------|
//! | `EMAIL_USER`             | mail account identity and sender          | empty             |
//! | `EMAIL_PASS`             | mail account credential                   | empty             |
//! | `TO_EMAIL`               | alert recipient                           | empty             |
//! | `SMTP_SERVER`            | submission host                           | `smtp.gmail.com`  |
//! | `SMTP_SECURITY`          | `tls`, `starttls` or `none`               | `tls`             |
//! | `SMTP_PORT`              | submission port                           | per security mode |
//! | `PAGEWATCH_RULES`        | JSON file overriding [`MatchRules`]       | built-in rules    |
//! | `PAGEWATCH_STATE`        | state file path, or `1`/`true` for default | disabled          |
//! | `PAGEWATCH_TIMEOUT_SECS` | HTTP and SMTP timeout                     | `30`              |
//! | `ALERT_SUBJECT`          | alert subject line                        | built-in subject  |
//! | `ALERT_PAGE_LABEL`       | page name used in the alert body          | built-in label    |
//!
//! The three mail values are not checked here; a missing one surfaces as a
//! notification error when an alert is actually sent.
//!
//! The built-in alert subject and page label name the WRB 25/26 cycle. A
//! rules file that points `target_url` at another page should be paired
//! with `ALERT_SUBJECT` and `ALERT_PAGE_LABEL`; loading warns otherwise.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::notify::{AlertTemplate, Security, SmtpConfig};
use crate::page::MatchRules;
use crate::state::StateStore;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Everything one invocation needs.
#[derive(Debug, Clone)]
pub struct Config {
    /// Classification rules and target URL.
    pub rules: MatchRules,
    /// Mail server and account.
    pub smtp: SmtpConfig,
    /// Alert wording.
    pub alert: AlertTemplate,
    /// State file enabling transition-only alerts.
    pub state_path: Option<PathBuf>,
    /// Timeout for the page fetch and for the SMTP session.
    pub timeout: Duration,
}

impl Config {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for malformed values, or an I/O/parse error
    /// if the rules file cannot be loaded.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`Config::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let rules = match var("PAGEWATCH_RULES") {
            Some(path) => MatchRules::load(Path::new(&path))?,
            None => MatchRules::default(),
        };

        let security = match var("SMTP_SECURITY") {
            Some(raw) => raw.parse::<Security>().map_err(Error::Config)?,
            None => Security::default(),
        };
        let port = match var("SMTP_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .ok()
                .filter(|p| *p != 0)
                .ok_or_else(|| Error::Config(format!("SMTP_PORT must be 1-65535, got {raw:?}")))?,
            None => security.default_port(),
        };

        let smtp = SmtpConfig {
            host: var("SMTP_SERVER").unwrap_or_else(|| SmtpConfig::default().host),
            port,
            security,
            username: lookup("EMAIL_USER").unwrap_or_default(),
            password: lookup("EMAIL_PASS").unwrap_or_default(),
            recipient: lookup("TO_EMAIL").unwrap_or_default(),
        };

        let mut alert = AlertTemplate {
            target_url: rules.target_url.clone(),
            ..AlertTemplate::default()
        };
        if let Some(subject) = var("ALERT_SUBJECT") {
            alert.subject = subject;
        }
        if let Some(label) = var("ALERT_PAGE_LABEL") {
            alert.page_label = label;
        }

        if stale_alert_wording(&rules, &alert) {
            tracing::warn!(
                target_url = %rules.target_url,
                "Rules retarget the page but ALERT_SUBJECT/ALERT_PAGE_LABEL keep the built-in WRB 25/26 wording"
            );
        }

        let state_path = var("PAGEWATCH_STATE").and_then(|raw| {
            match raw.trim().to_ascii_lowercase().as_str() {
                "0" | "false" | "off" => None,
                "1" | "true" | "on" => Some(StateStore::default_path()),
                _ => Some(PathBuf::from(raw.trim())),
            }
        });

        let timeout_secs = match var("PAGEWATCH_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().ok().filter(|s| *s > 0).ok_or_else(|| {
                Error::Config(format!(
                    "PAGEWATCH_TIMEOUT_SECS must be a positive integer, got {raw:?}"
                ))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            rules,
            smtp,
            alert,
            state_path,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// True when the page was retargeted but the alert still uses built-in text.
fn stale_alert_wording(rules: &MatchRules, alert: &AlertTemplate) -> bool {
    let builtin = AlertTemplate::default();
    rules.target_url != builtin.target_url
        && (alert.subject == builtin.subject || alert.page_label == builtin.page_label)
}

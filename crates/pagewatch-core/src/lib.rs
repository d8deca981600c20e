//! # pagewatch-core
//!
//! Core logic for `pagewatch`, a one-shot monitor that fetches a page,
//! decides what state the watched service is in, and emails an alert when
//! the page no longer shows the offline banner.
//!
//! This crate provides:
//! - Page snapshots and the four-way [`Decision`]
//! - Configurable [`MatchRules`] and the [`PageClassifier`]
//! - An HTTP [`PageSource`] built on `reqwest`
//! - An SMTP [`Notifier`] built on `pagewatch-smtp`
//! - Optional transition-only alerting backed by a JSON [`StateStore`]
//! - The [`Monitor`] that ties one check cycle together

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
mod error;
pub mod monitor;
pub mod notify;
pub mod page;
pub mod state;

pub use config::Config;
pub use error::{Error, Result};
pub use monitor::{Monitor, Outcome};
pub use notify::{
    AlertMessage, AlertTemplate, Notifier, NotifyError, Security, SmtpConfig, SmtpNotifier,
};
pub use page::{
    Action, Decision, FetchError, HttpPageSource, MatchRules, PageClassifier, PageSnapshot,
    PageSource, WrongCyclePolicy,
};
pub use state::{NotifyState, StateStore};

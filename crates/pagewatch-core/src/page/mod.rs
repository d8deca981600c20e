//! The watched page: what was fetched and what it means.

mod classifier;
mod model;
mod rules;
mod source;

pub use classifier::PageClassifier;
pub use model::{Action, Decision, PageSnapshot, STILL_UNAVAILABLE_LINE};
pub use rules::{MatchRules, WrongCyclePolicy};
pub use source::{FetchError, HttpPageSource, PageSource, USER_AGENT};

//! One check cycle: fetch, classify, then print or notify.

use chrono::Utc;

use crate::error::Result;
use crate::notify::Notifier;
use crate::page::{Action, Decision, PageClassifier, PageSource};
use crate::state::{NotifyState, StateStore};

/// Observable result of a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A line for the operator console; no alert was sent.
    Printed(String),
    /// Exactly one alert was delivered.
    Notified {
        /// Decision that triggered it.
        decision: Decision,
        /// Status text it carried.
        status: String,
    },
}

/// Runs check cycles against one page source and one notifier.
///
/// Without a [`StateStore`] every alerting decision notifies, every cycle.
/// With one, an alert is only sent when the decision differs from the one
/// last alerted on; repeats print a line instead.
#[derive(Debug)]
pub struct Monitor<S, N> {
    classifier: PageClassifier,
    source: S,
    notifier: N,
    state: Option<StateStore>,
}

impl<S, N> Monitor<S, N>
where
    S: PageSource,
    N: Notifier,
{
    /// Creates a stateless monitor.
    pub const fn new(classifier: PageClassifier, source: S, notifier: N) -> Self {
        Self {
            classifier,
            source,
            notifier,
            state: None,
        }
    }

    /// Enables transition-only alerts backed by `store`.
    #[must_use]
    pub fn with_state(mut self, store: StateStore) -> Self {
        self.state = Some(store);
        self
    }

    /// Notifier in use.
    pub const fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Runs one cycle.
    ///
    /// # Errors
    ///
    /// Fetch and notification errors propagate unchanged; nothing is
    /// retried. An error means neither a print nor an alert happened.
    ///
    /// The state file is advisory. An unreadable one is treated as absent
    /// and a failed write is logged, so neither can block or fail an alert.
    pub async fn run_once(&self) -> Result<Outcome> {
        let snapshot = self.source.fetch().await?;
        let decision = self.classifier.classify(&snapshot);
        tracing::info!(%decision, final_url = snapshot.final_url(), "Page classified");

        let previous = self.load_previous().await;

        match decision.action() {
            Action::Print(line) => {
                self.record(NotifyState::observed(decision, previous.as_ref()), previous.as_ref())
                    .await;
                Ok(Outcome::Printed(line.to_string()))
            }
            Action::Notify(status) => {
                if previous
                    .as_ref()
                    .is_some_and(|p| p.already_notified(decision))
                {
                    tracing::info!(%decision, "Already alerted for this state, skipping");
                    return Ok(Outcome::Printed(format!(
                        "No change since last notification ({decision})."
                    )));
                }

                self.notifier.notify(status).await?;
                self.record(NotifyState::notified(decision, Utc::now()), previous.as_ref())
                    .await;
                Ok(Outcome::Notified {
                    decision,
                    status: status.to_string(),
                })
            }
        }
    }

    async fn load_previous(&self) -> Option<NotifyState> {
        let store = self.state.as_ref()?;
        match store.load().await {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(
                    path = %store.path().display(),
                    error = %e,
                    "Ignoring unreadable state file"
                );
                None
            }
        }
    }

    async fn record(&self, next: NotifyState, previous: Option<&NotifyState>) {
        let Some(store) = &self.state else {
            return;
        };
        if previous == Some(&next) {
            return;
        }
        if let Err(e) = store.save(&next).await {
            tracing::warn!(
                path = %store.path().display(),
                error = %e,
                decision = %next.last_decision,
                "Failed to save state file"
            );
        }
    }
}

//! Snapshot → decision.

use super::model::{Decision, PageSnapshot};
use super::rules::{MatchRules, WrongCyclePolicy};

/// Maps a page snapshot to a [`Decision`] using a fixed set of rules.
///
/// Checks run in priority order and the first match wins:
///
/// 1. offline sentinel in the body → [`Decision::StillUnavailable`]
/// 2. a redirect marker in the final URL → [`Decision::LoginRedirect`]
/// 3. the current banner in the body → [`Decision::BookingDetected`]
/// 4. the booking keyword in the body (subject to [`WrongCyclePolicy`])
///    → [`Decision::BookingDetected`]
/// 5. anything else → [`Decision::UnexpectedChange`]
#[derive(Debug, Clone, Default)]
pub struct PageClassifier {
    rules: MatchRules,
}

impl PageClassifier {
    /// Creates a classifier over the given rules.
    #[must_use]
    pub const fn new(rules: MatchRules) -> Self {
        Self { rules }
    }

    /// Classifies one snapshot.
    #[must_use]
    pub fn classify(&self, snapshot: &PageSnapshot) -> Decision {
        let rules = &self.rules;
        let body = snapshot.body();

        if body.contains(rules.offline_sentinel.as_str()) {
            return Decision::StillUnavailable;
        }

        let url = snapshot.final_url();
        if rules.redirect_markers.iter().any(|m| url.contains(m.as_str())) {
            return Decision::LoginRedirect;
        }

        if body.contains(rules.banner_text.as_str()) {
            return Decision::BookingDetected;
        }

        if body.contains(rules.keyword_text.as_str()) && self.keyword_cycle_matches(body) {
            return Decision::BookingDetected;
        }

        Decision::UnexpectedChange
    }

    fn keyword_cycle_matches(&self, body: &str) -> bool {
        match self.rules.wrong_cycle {
            WrongCyclePolicy::Accept => true,
            WrongCyclePolicy::Flag => {
                let names_a_cycle = self
                    .rules
                    .year_markers
                    .iter()
                    .any(|m| body.contains(m.as_str()));
                !names_a_cycle || body.contains(self.rules.current_year_marker.as_str())
            }
        }
    }
}

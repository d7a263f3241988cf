//! Telemetry error-rate analyzer.
//!
//! Counts failed events against all events in the window. The
//! `min_events` floor keeps small samples from firing: 1 error out of 2
//! events is a 50% rate and still must not escalate.

use serde::{Deserialize, Serialize};
use tracing::debug;

use vigil_core::ErrorRateKnobs;

use crate::source::EventSource;

/// Windowed error-rate summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorRateSummary {
    pub total: u64,
    pub errors: u64,
    /// `errors / total`, 0 when the window is empty.
    pub rate: f64,
    pub window_minutes: u64,
    pub threshold: f64,
    pub min_events: u64,
    pub should_escalate: bool,
    /// Set when the event store query itself failed.
    pub unavailable: Option<String>,
}

impl ErrorRateSummary {
    /// One-line description for alert text.
    pub fn describe(&self) -> String {
        match &self.unavailable {
            Some(reason) => format!("error-rate signal unavailable: {reason}"),
            None => format!(
                "error rate {:.0}% ({}/{} events in {}m, threshold {:.0}%)",
                self.rate * 100.0,
                self.errors,
                self.total,
                self.window_minutes,
                self.threshold * 100.0
            ),
        }
    }
}

/// Computes the error-rate summary over a sliding window.
#[derive(Debug, Clone)]
pub struct ErrorRateAnalyzer {
    knobs: ErrorRateKnobs,
}

impl ErrorRateAnalyzer {
    pub fn new(knobs: ErrorRateKnobs) -> Self {
        Self { knobs }
    }

    /// Knobs from the process environment with fallback defaults.
    pub fn from_env() -> Self {
        Self::new(ErrorRateKnobs::from_env())
    }

    /// Query the source over `[now - window, now]` and summarize.
    ///
    /// A failed query returns an `unavailable` summary with
    /// `should_escalate = false` — never escalate on missing data.
    pub async fn analyze(&self, source: &dyn EventSource, now_ms: u64) -> ErrorRateSummary {
        let since = now_ms.saturating_sub(self.knobs.window_minutes * 60_000);
        match source.events_since(since).await {
            Ok(events) => {
                let total = events.len() as u64;
                let errors = events.iter().filter(|e| !e.success).count() as u64;
                let summary = summarize(total, errors, &self.knobs);
                debug!(
                    total,
                    errors,
                    rate = summary.rate,
                    should_escalate = summary.should_escalate,
                    "error-rate window analyzed"
                );
                summary
            }
            Err(e) => {
                debug!(error = %e, "error-rate query failed, suppressing escalation");
                ErrorRateSummary {
                    total: 0,
                    errors: 0,
                    rate: 0.0,
                    window_minutes: self.knobs.window_minutes,
                    threshold: self.knobs.threshold,
                    min_events: self.knobs.min_events,
                    should_escalate: false,
                    unavailable: Some(e.to_string()),
                }
            }
        }
    }
}

/// Pure summary from window counts.
pub fn summarize(total: u64, errors: u64, knobs: &ErrorRateKnobs) -> ErrorRateSummary {
    let rate = if total > 0 {
        errors as f64 / total as f64
    } else {
        0.0
    };
    ErrorRateSummary {
        total,
        errors,
        rate,
        window_minutes: knobs.window_minutes,
        threshold: knobs.threshold,
        min_events: knobs.min_events,
        should_escalate: total >= knobs.min_events && rate >= knobs.threshold,
        unavailable: None,
    }
}

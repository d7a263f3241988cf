//! Write-gate drift analyzer.
//!
//! Aggregates per-event gate-decision counters (`allow/hold/discard/
//! fallback`) over a window and compares each ratio against its
//! threshold. Two sample gates must both pass before any ratio is
//! considered: enough events carrying structured counters, and enough
//! actual verdicts — data can exist yet lack counters ("legacy" events),
//! and that must not escalate.

use serde::{Deserialize, Serialize};
use tracing::debug;

use vigil_core::DriftKnobs;
use vigil_state::GateCounts;

use crate::source::EventSource;

/// Windowed write-gate drift summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WriteGateDriftSummary {
    /// Events in the window that carried structured gate counters.
    pub events_with_gate_counts: u64,
    pub allow: u64,
    pub hold: u64,
    pub discard: u64,
    pub fallback: u64,
    /// `allow + hold + discard`.
    pub total_with_verdict: u64,
    pub hold_ratio: f64,
    pub discard_ratio: f64,
    pub fallback_rate: f64,
    pub window_minutes: u64,
    pub min_events: u64,
    pub min_verdicts: u64,
    pub hold_threshold: f64,
    pub discard_threshold: f64,
    pub fallback_threshold: f64,
    pub should_escalate: bool,
    /// Set when the event store query itself failed.
    pub unavailable: Option<String>,
}

impl WriteGateDriftSummary {
    /// One-line description for alert text.
    pub fn describe(&self) -> String {
        match &self.unavailable {
            Some(reason) => format!("write-gate signal unavailable: {reason}"),
            None => format!(
                "write-gate drift: hold {:.0}% discard {:.0}% fallback {:.0}% ({} verdicts in {}m)",
                self.hold_ratio * 100.0,
                self.discard_ratio * 100.0,
                self.fallback_rate * 100.0,
                self.total_with_verdict,
                self.window_minutes
            ),
        }
    }
}

/// Computes write-gate drift over a sliding window.
#[derive(Debug, Clone)]
pub struct WriteGateAnalyzer {
    knobs: DriftKnobs,
}

impl WriteGateAnalyzer {
    pub fn new(knobs: DriftKnobs) -> Self {
        Self { knobs }
    }

    /// Knobs from the process environment with fallback defaults.
    pub fn from_env() -> Self {
        Self::new(DriftKnobs::from_env())
    }

    /// Query the source over `[now - window, now]` and summarize.
    pub async fn analyze(&self, source: &dyn EventSource, now_ms: u64) -> WriteGateDriftSummary {
        let since = now_ms.saturating_sub(self.knobs.window_minutes * 60_000);
        match source.events_since(since).await {
            Ok(events) => {
                let mut with_counts = 0u64;
                let mut acc = GateCounts::default();
                for event in &events {
                    if let Some(counts) = event.gate_counts() {
                        with_counts += 1;
                        acc.allow += counts.allow;
                        acc.hold += counts.hold;
                        acc.discard += counts.discard;
                        acc.fallback += counts.fallback;
                    }
                }
                let summary = summarize(with_counts, acc, &self.knobs);
                debug!(
                    events_with_gate_counts = with_counts,
                    verdicts = summary.total_with_verdict,
                    should_escalate = summary.should_escalate,
                    "write-gate window analyzed"
                );
                summary
            }
            Err(e) => {
                debug!(error = %e, "write-gate query failed, suppressing escalation");
                summarize_unavailable(e.to_string(), &self.knobs)
            }
        }
    }
}

/// Pure summary from aggregated counters.
pub fn summarize(
    events_with_gate_counts: u64,
    counts: GateCounts,
    knobs: &DriftKnobs,
) -> WriteGateDriftSummary {
    let total_with_verdict = counts.total_with_verdict();
    let ratio = |n: u64| {
        if total_with_verdict > 0 {
            n as f64 / total_with_verdict as f64
        } else {
            0.0
        }
    };
    let hold_ratio = ratio(counts.hold);
    let discard_ratio = ratio(counts.discard);
    let fallback_rate = ratio(counts.fallback);

    let samples_ok = events_with_gate_counts >= knobs.min_events
        && total_with_verdict >= knobs.min_verdicts;
    let drifted = hold_ratio >= knobs.hold_threshold
        || discard_ratio >= knobs.discard_threshold
        || fallback_rate >= knobs.fallback_threshold;

    WriteGateDriftSummary {
        events_with_gate_counts,
        allow: counts.allow,
        hold: counts.hold,
        discard: counts.discard,
        fallback: counts.fallback,
        total_with_verdict,
        hold_ratio,
        discard_ratio,
        fallback_rate,
        window_minutes: knobs.window_minutes,
        min_events: knobs.min_events,
        min_verdicts: knobs.min_verdicts,
        hold_threshold: knobs.hold_threshold,
        discard_threshold: knobs.discard_threshold,
        fallback_threshold: knobs.fallback_threshold,
        should_escalate: samples_ok && drifted,
        unavailable: None,
    }
}

fn summarize_unavailable(reason: String, knobs: &DriftKnobs) -> WriteGateDriftSummary {
    let mut summary = summarize(0, GateCounts::default(), knobs);
    summary.unavailable = Some(reason);
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::EventsFuture;
    use vigil_state::TelemetryEvent;

    fn knobs() -> DriftKnobs {
        DriftKnobs {
            window_minutes: 120,
            min_events: 10,
            min_verdicts: 8,
            hold_threshold: 0.35,
            discard_threshold: 0.20,
            fallback_threshold: 0.30,
        }
    }

    #[test]
    fn all_hold_below_event_floor_does_not_escalate() {
        // holdRatio is 1.0 but only 5 events carried counters.
        let counts = GateCounts {
            allow: 0,
            hold: 50,
            discard: 0,
            fallback: 0,
        };
        let summary = summarize(5, counts, &knobs());
        assert_eq!(summary.hold_ratio, 1.0);
        assert!(!summary.should_escalate);
    }

    #[test]
    fn verdict_floor_blocks_legacy_heavy_windows() {
        // Plenty of events carried counters, but almost none held verdicts.
        let counts = GateCounts {
            allow: 3,
            hold: 2,
            discard: 1,
            fallback: 40,
        };
        let summary = summarize(50, counts, &knobs());
        assert_eq!(summary.total_with_verdict, 6);
        assert!(summary.total_with_verdict < summary.min_verdicts);
        assert!(!summary.should_escalate);
    }

    #[test]
    fn hold_drift_escalates() {
        let counts = GateCounts {
            allow: 10,
            hold: 10,
            discard: 0,
            fallback: 0,
        };
        let summary = summarize(20, counts, &knobs());
        assert_eq!(summary.hold_ratio, 0.5);
        assert!(summary.should_escalate);
    }

    #[test]
    fn fallback_drift_escalates() {
        let counts = GateCounts {
            allow: 18,
            hold: 1,
            discard: 1,
            fallback: 8,
        };
        let summary = summarize(20, counts, &knobs());
        assert_eq!(summary.fallback_rate, 0.4);
        assert!(summary.should_escalate);
    }

    #[test]
    fn healthy_ratios_do_not_escalate() {
        let counts = GateCounts {
            allow: 90,
            hold: 5,
            discard: 3,
            fallback: 2,
        };
        let summary = summarize(50, counts, &knobs());
        assert!(!summary.should_escalate);
    }

    #[test]
    fn empty_window_has_zero_ratios() {
        let summary = summarize(0, GateCounts::default(), &knobs());
        assert_eq!(summary.hold_ratio, 0.0);
        assert_eq!(summary.total_with_verdict, 0);
        assert!(!summary.should_escalate);
    }

    struct CannedSource(Vec<TelemetryEvent>);

    impl EventSource for CannedSource {
        fn events_since(&self, since: u64) -> EventsFuture<'_> {
            let events: Vec<_> = self
                .0
                .iter()
                .filter(|e| e.epoch_ms >= since)
                .cloned()
                .collect();
            Box::pin(async move { Ok(events) })
        }
    }

    struct FailingSource;

    impl EventSource for FailingSource {
        fn events_since(&self, _since: u64) -> EventsFuture<'_> {
            Box::pin(async { Err(anyhow::anyhow!("event store down")) })
        }
    }

    #[tokio::test]
    async fn analyze_skips_legacy_events_without_counters() {
        let now_ms = 1_000_000;
        let mut events = Vec::new();
        for i in 0..12 {
            events.push(
                TelemetryEvent::ok(now_ms - 1_000 - i, "write-gate", "gate-decision")
                    .with_metadata(
                        GateCounts {
                            allow: 1,
                            hold: 1,
                            discard: 0,
                            fallback: 0,
                        }
                        .into_metadata(),
                    ),
            );
        }
        // Legacy events: present in the window, no counters.
        for i in 0..30 {
            events.push(TelemetryEvent::ok(now_ms - 2_000 - i, "write-gate", "gate-decision"));
        }

        let analyzer = WriteGateAnalyzer::new(knobs());
        let summary = analyzer.analyze(&CannedSource(events), now_ms).await;

        assert_eq!(summary.events_with_gate_counts, 12);
        assert_eq!(summary.total_with_verdict, 24);
        assert_eq!(summary.hold_ratio, 0.5);
        assert!(summary.should_escalate);
    }

    #[tokio::test]
    async fn query_failure_suppresses_escalation() {
        let analyzer = WriteGateAnalyzer::new(knobs());
        let summary = analyzer.analyze(&FailingSource, 1_000_000).await;

        assert!(!summary.should_escalate);
        assert!(summary.unavailable.is_some());
        assert!(summary.describe().contains("unavailable"));
    }
}

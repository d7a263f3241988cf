//! Environment-tunable thresholds and windows for the signal analyzers
//! and cooldown gate.
//!
//! Every knob has a hard-coded default. A configured value that fails to
//! parse, or is non-positive where a positive value is required, falls
//! back to the default with a warning — a mistyped threshold must not
//! take the monitor down.

use tracing::warn;

/// Parse a positive float knob, falling back to `default`.
fn f64_knob(name: &str, raw: Option<&str>, default: f64) -> f64 {
    match raw {
        None => default,
        Some(s) => match s.trim().parse::<f64>() {
            Ok(v) if v > 0.0 => v,
            _ => {
                warn!(knob = name, value = s, default, "ignoring invalid knob value");
                default
            }
        },
    }
}

/// Parse a positive integer knob, falling back to `default`.
fn u64_knob(name: &str, raw: Option<&str>, default: u64) -> u64 {
    match raw {
        None => default,
        Some(s) => match s.trim().parse::<i64>() {
            Ok(v) if v > 0 => v as u64,
            _ => {
                warn!(knob = name, value = s, default, "ignoring invalid knob value");
                default
            }
        },
    }
}

fn env_raw(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

// ── Error-rate analyzer ───────────────────────────────────────────

/// Tuning for the telemetry error-rate analyzer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorRateKnobs {
    /// Sliding-window size in minutes.
    pub window_minutes: u64,
    /// Escalate when `errors/total` reaches this ratio.
    pub threshold: f64,
    /// Statistical-significance floor: never escalate below this many events.
    pub min_events: u64,
}

impl Default for ErrorRateKnobs {
    fn default() -> Self {
        Self {
            window_minutes: 60,
            threshold: 0.25,
            min_events: 20,
        }
    }
}

impl ErrorRateKnobs {
    /// Build from raw string values (exercised directly by tests).
    pub fn from_raw(
        window: Option<&str>,
        threshold: Option<&str>,
        min_events: Option<&str>,
    ) -> Self {
        let d = Self::default();
        Self {
            window_minutes: u64_knob("VIGIL_ERROR_WINDOW_MINUTES", window, d.window_minutes),
            threshold: f64_knob("VIGIL_ERROR_THRESHOLD", threshold, d.threshold),
            min_events: u64_knob("VIGIL_ERROR_MIN_EVENTS", min_events, d.min_events),
        }
    }

    /// Build from the process environment.
    pub fn from_env() -> Self {
        Self::from_raw(
            env_raw("VIGIL_ERROR_WINDOW_MINUTES").as_deref(),
            env_raw("VIGIL_ERROR_THRESHOLD").as_deref(),
            env_raw("VIGIL_ERROR_MIN_EVENTS").as_deref(),
        )
    }
}

// ── Write-gate drift analyzer ─────────────────────────────────────

/// Tuning for the write-gate drift analyzer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftKnobs {
    pub window_minutes: u64,
    /// Minimum events carrying structured gate counters.
    pub min_events: u64,
    /// Minimum allow+hold+discard verdicts before ratios are meaningful.
    pub min_verdicts: u64,
    pub hold_threshold: f64,
    pub discard_threshold: f64,
    pub fallback_threshold: f64,
}

impl Default for DriftKnobs {
    fn default() -> Self {
        Self {
            window_minutes: 120,
            min_events: 12,
            min_verdicts: 8,
            hold_threshold: 0.35,
            discard_threshold: 0.20,
            fallback_threshold: 0.30,
        }
    }
}

impl DriftKnobs {
    /// Build from raw string values (exercised directly by tests).
    #[allow(clippy::too_many_arguments)]
    pub fn from_raw(
        window: Option<&str>,
        min_events: Option<&str>,
        min_verdicts: Option<&str>,
        hold: Option<&str>,
        discard: Option<&str>,
        fallback: Option<&str>,
    ) -> Self {
        let d = Self::default();
        Self {
            window_minutes: u64_knob("VIGIL_DRIFT_WINDOW_MINUTES", window, d.window_minutes),
            min_events: u64_knob("VIGIL_DRIFT_MIN_EVENTS", min_events, d.min_events),
            min_verdicts: u64_knob("VIGIL_DRIFT_MIN_VERDICTS", min_verdicts, d.min_verdicts),
            hold_threshold: f64_knob("VIGIL_DRIFT_HOLD_THRESHOLD", hold, d.hold_threshold),
            discard_threshold: f64_knob(
                "VIGIL_DRIFT_DISCARD_THRESHOLD",
                discard,
                d.discard_threshold,
            ),
            fallback_threshold: f64_knob(
                "VIGIL_DRIFT_FALLBACK_THRESHOLD",
                fallback,
                d.fallback_threshold,
            ),
        }
    }

    /// Build from the process environment.
    pub fn from_env() -> Self {
        Self::from_raw(
            env_raw("VIGIL_DRIFT_WINDOW_MINUTES").as_deref(),
            env_raw("VIGIL_DRIFT_MIN_EVENTS").as_deref(),
            env_raw("VIGIL_DRIFT_MIN_VERDICTS").as_deref(),
            env_raw("VIGIL_DRIFT_HOLD_THRESHOLD").as_deref(),
            env_raw("VIGIL_DRIFT_DISCARD_THRESHOLD").as_deref(),
            env_raw("VIGIL_DRIFT_FALLBACK_THRESHOLD").as_deref(),
        )
    }
}

// ── Cooldown windows ──────────────────────────────────────────────

/// Suppression windows for the cooldown gate, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownWindows {
    /// Per-service "down" claim — how long before the same outage re-alerts.
    pub service_down_secs: u64,
    /// Elevated-signal alerts (error rate, drift).
    pub signal_alert_secs: u64,
    /// The monitor's own telemetry-gap warning.
    pub otel_gap_secs: u64,
    /// Run-lock TTL — crash backstop for the mutual-exclusion claim.
    pub run_lock_secs: u64,
}

impl Default for CooldownWindows {
    fn default() -> Self {
        Self {
            service_down_secs: 30 * 60,
            signal_alert_secs: 6 * 60 * 60,
            otel_gap_secs: 24 * 60 * 60,
            run_lock_secs: 5 * 60,
        }
    }
}

//! Persisted domain types for the Vigil store.
//!
//! Telemetry events carry a free-form `metadata` blob at the boundary;
//! typed accessors convert it into tagged records (`GateCounts`) where
//! the analyzers need structure. Events without structured counters are
//! "legacy" and simply don't contribute verdicts.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Telemetry events ──────────────────────────────────────────────

/// Severity of a telemetry event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// One record in the append-only telemetry stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TelemetryEvent {
    /// Unix timestamp in milliseconds.
    pub epoch_ms: u64,
    pub level: EventLevel,
    /// Emitting component, e.g. `"monitor"` or `"write-gate"`.
    pub component: String,
    /// What the component was doing, e.g. `"run"` or `"gate-decision"`.
    pub action: String,
    pub success: bool,
    /// Error text for failed actions.
    pub error: Option<String>,
    /// Free-form structured payload. Typed accessors parse known shapes.
    #[serde(default)]
    pub metadata: Value,
}

impl TelemetryEvent {
    /// A successful event with no metadata.
    pub fn ok(epoch_ms: u64, component: &str, action: &str) -> Self {
        Self {
            epoch_ms,
            level: EventLevel::Info,
            component: component.to_string(),
            action: action.to_string(),
            success: true,
            error: None,
            metadata: Value::Null,
        }
    }

    /// A failed event carrying error text.
    pub fn failed(epoch_ms: u64, component: &str, action: &str, error: &str) -> Self {
        Self {
            epoch_ms,
            level: EventLevel::Error,
            component: component.to_string(),
            action: action.to_string(),
            success: false,
            error: Some(error.to_string()),
            metadata: Value::Null,
        }
    }

    /// Attach a metadata payload.
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Parse structured write-gate counters out of the metadata blob.
    ///
    /// Returns `None` for events without a well-formed `gate_counts`
    /// object — those are excluded from the drift denominator.
    pub fn gate_counts(&self) -> Option<GateCounts> {
        let raw = self.metadata.get("gate_counts")?;
        serde_json::from_value(raw.clone()).ok()
    }
}

/// Per-event write-gate decision counters.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GateCounts {
    pub allow: u64,
    pub hold: u64,
    pub discard: u64,
    pub fallback: u64,
}

impl GateCounts {
    /// Decisions that reached a verdict (fallbacks are not verdicts).
    pub fn total_with_verdict(&self) -> u64 {
        self.allow + self.hold + self.discard
    }

    /// Wrap the counters in the metadata shape `gate_counts()` parses.
    pub fn into_metadata(self) -> Value {
        serde_json::json!({ "gate_counts": self })
    }
}

// ── Status board ──────────────────────────────────────────────────

/// Health value shown on the status board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentHealth {
    Healthy,
    Down,
}

/// Latest known status of one monitored component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoardEntry {
    pub component: String,
    pub health: ComponentHealth,
    pub detail: Option<String>,
    /// Unix timestamp in milliseconds of the last update.
    pub updated_at_ms: u64,
}

// ── Cooldown claims ───────────────────────────────────────────────

/// A cooldown claim record. Existence of an unexpired record means
/// "already notified in this window".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClaimRecord {
    pub claimed_at_ms: u64,
    pub expires_at_ms: u64,
}

impl ClaimRecord {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_counts_parsed_from_metadata() {
        let counts = GateCounts {
            allow: 5,
            hold: 2,
            discard: 1,
            fallback: 3,
        };
        let event =
            TelemetryEvent::ok(1_000, "write-gate", "gate-decision").with_metadata(counts.into_metadata());
        assert_eq!(event.gate_counts(), Some(counts));
        assert_eq!(counts.total_with_verdict(), 8);
    }

    #[test]
    fn legacy_event_has_no_gate_counts() {
        let event = TelemetryEvent::ok(1_000, "write-gate", "gate-decision");
        assert_eq!(event.gate_counts(), None);

        let malformed = TelemetryEvent::ok(1_000, "write-gate", "gate-decision")
            .with_metadata(serde_json::json!({ "gate_counts": "lots" }));
        assert_eq!(malformed.gate_counts(), None);
    }

    #[test]
    fn claim_expiry() {
        let claim = ClaimRecord {
            claimed_at_ms: 1_000,
            expires_at_ms: 2_000,
        };
        assert!(!claim.is_expired(1_999));
        assert!(claim.is_expired(2_000));
    }

    #[test]
    fn event_round_trips_through_json() {
        let event = TelemetryEvent::failed(42, "monitor", "run", "store unreachable")
            .with_metadata(serde_json::json!({ "degraded": 2 }));
        let bytes = serde_json::to_vec(&event).unwrap();
        let back: TelemetryEvent = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, event);
    }
}

//! Core domain types for monitoring runs.
//!
//! These types cross crate boundaries: probes produce `ServiceStatus`
//! records, triggers arrive as `TriggerEvent`s, and self-healing dispatch
//! carries `Evidence`, `Playbook`, and `RetryPolicy` values. All types are
//! serializable for run reports and outbound events.

use serde::{Deserialize, Serialize};

/// Maximum length for error/status detail strings carried on records.
///
/// Upstream errors can embed whole response bodies; everything past this
/// limit is noise in an alert line.
pub const MAX_DETAIL_LEN: usize = 240;

// ── Probe results ─────────────────────────────────────────────────

/// Outcome of a single service probe, one per probe per run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceStatus {
    /// Probe name — the service identity used for dedup and healing rules.
    pub name: String,
    /// Whether the probe succeeded within its timeout.
    pub ok: bool,
    /// Truncated error/status text for failed probes.
    pub detail: Option<String>,
    /// Wall-clock duration of the probe call.
    pub duration_ms: Option<u64>,
}

impl ServiceStatus {
    /// A passing probe result.
    pub fn ok(name: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            name: name.into(),
            ok: true,
            detail: None,
            duration_ms: Some(duration_ms),
        }
    }

    /// A failing probe result. The detail is truncated to `MAX_DETAIL_LEN`.
    pub fn failed(
        name: impl Into<String>,
        detail: impl Into<String>,
        duration_ms: Option<u64>,
    ) -> Self {
        Self {
            name: name.into(),
            ok: false,
            detail: Some(truncate_detail(&detail.into())),
            duration_ms,
        }
    }
}

/// Truncate a detail string to `MAX_DETAIL_LEN` on a char boundary.
pub fn truncate_detail(s: &str) -> String {
    if s.len() <= MAX_DETAIL_LEN {
        return s.to_string();
    }
    let mut end = MAX_DETAIL_LEN;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &s[..end])
}

// ── Triggers ──────────────────────────────────────────────────────

/// What kind of trigger started a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// Periodic scheduler heartbeat.
    Heartbeat,
    /// Explicit on-demand check request.
    Check,
}

/// The event that triggered a monitoring run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TriggerEvent {
    /// Event name, e.g. `"monitor/heartbeat"` or `"monitor/check-requested"`.
    pub name: String,
    /// Optional explicit mode override (`core|signals|full`).
    pub mode_override: Option<String>,
    /// Upstream event id, if the scheduler assigned one.
    pub event_id: Option<String>,
}

impl TriggerEvent {
    /// A plain heartbeat trigger.
    pub fn heartbeat() -> Self {
        Self {
            name: "monitor/heartbeat".to_string(),
            mode_override: None,
            event_id: None,
        }
    }

    /// An explicit check request, optionally carrying a mode override.
    pub fn check(mode_override: Option<&str>) -> Self {
        Self {
            name: "monitor/check-requested".to_string(),
            mode_override: mode_override.map(str::to_string),
            event_id: None,
        }
    }

    /// Classify the trigger by its event name. Names mentioning "check"
    /// are explicit requests; anything else behaves as a heartbeat.
    pub fn kind(&self) -> TriggerKind {
        if self.name.to_ascii_lowercase().contains("check") {
            TriggerKind::Check
        } else {
            TriggerKind::Heartbeat
        }
    }
}

// ── Self-healing building blocks ──────────────────────────────────

/// A single piece of evidence attached to a self-healing request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Evidence {
    /// Evidence kind, e.g. `"probe_failure"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Human-readable detail, truncated at the source.
    pub detail: String,
}

impl Evidence {
    pub fn new(kind: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            detail: truncate_detail(&detail.into()),
        }
    }
}

/// Human-executable remediation playbook embedded in a healing request.
///
/// The external handler attempts the ordered `actions` first; the named
/// commands are the manual fallback a human can run verbatim.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Playbook {
    /// Ordered remediation actions.
    pub actions: Vec<String>,
    /// Restart command for the component.
    pub restart: Option<String>,
    /// Hard-kill command if restart hangs.
    pub kill: Option<String>,
    /// What to do if remediation should be deferred.
    pub defer: Option<String>,
    /// Who/what to notify when the playbook is exhausted.
    pub notify: Option<String>,
    /// Runbook / dashboard links.
    pub links: Vec<String>,
}

/// Retry/backoff schedule owned by the self-healing consumer.
///
/// This engine only originates the values; the external handler executes
/// the loop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub sleep_min_ms: u64,
    pub sleep_max_ms: u64,
    pub sleep_step_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            sleep_min_ms: 2_000,
            sleep_max_ms: 30_000,
            sleep_step_ms: 2_000,
        }
    }
}

//! Health-check modes and their slice policies.
//!
//! A run executes in one of three modes: `core` probes live services,
//! `signals` runs only the statistical analyzers, `full` does both. The
//! mode is resolved once per run from the trigger kind plus an optional
//! override string, and carries a static `SlicePolicy` describing the
//! cadence and escalation posture of that slice.

use serde::{Deserialize, Serialize};

use crate::types::TriggerKind;

/// Which half (or both) of the monitoring work a run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthCheckMode {
    /// Live service probes only — the cheap, frequent heartbeat slice.
    Core,
    /// Statistical analyzers only — the expensive, infrequent sweep.
    Signals,
    /// Both halves.
    Full,
}

impl HealthCheckMode {
    /// Parse an override string, case-insensitive and trimmed.
    /// Returns `None` for anything unrecognized.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "core" => Some(Self::Core),
            "signals" => Some(Self::Signals),
            "full" => Some(Self::Full),
            _ => None,
        }
    }

    /// Whether this mode runs live service probes.
    pub fn runs_core_probes(self) -> bool {
        self != Self::Signals
    }

    /// Whether this mode runs the statistical analyzers.
    pub fn runs_signal_scan(self) -> bool {
        self != Self::Core
    }

    /// The static slice policy for this mode.
    pub fn policy(self) -> SlicePolicy {
        match self {
            Self::Core => SlicePolicy {
                cadence_minutes: 5,
                importance: Importance::Critical,
                alert_sensitivity: Sensitivity::High,
                self_healing: HealingPosture::Automatic,
                rank: 0,
            },
            Self::Full => SlicePolicy {
                cadence_minutes: 30,
                importance: Importance::High,
                alert_sensitivity: Sensitivity::Medium,
                self_healing: HealingPosture::Automatic,
                rank: 1,
            },
            Self::Signals => SlicePolicy {
                cadence_minutes: 120,
                importance: Importance::Medium,
                alert_sensitivity: Sensitivity::Low,
                self_healing: HealingPosture::Manual,
                rank: 2,
            },
        }
    }
}

impl std::fmt::Display for HealthCheckMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Core => "core",
            Self::Signals => "signals",
            Self::Full => "full",
        };
        f.write_str(s)
    }
}

/// Resolve the run mode from the trigger kind and an optional override.
///
/// A recognized override wins; otherwise the trigger implies the default:
/// explicit check requests get `Full`, heartbeats get `Core`. Unknown
/// override strings fall back to the trigger default — never an error.
pub fn resolve_mode(kind: TriggerKind, raw_override: Option<&str>) -> HealthCheckMode {
    if let Some(raw) = raw_override
        && let Some(mode) = HealthCheckMode::parse(raw)
    {
        return mode;
    }
    match kind {
        TriggerKind::Check => HealthCheckMode::Full,
        TriggerKind::Heartbeat => HealthCheckMode::Core,
    }
}

/// Escalation importance attached to a slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    Critical,
    High,
    Medium,
}

/// How eagerly a slice alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensitivity {
    High,
    Medium,
    Low,
}

/// Whether degradations in a slice may trigger automated remediation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealingPosture {
    Manual,
    Automatic,
}

/// Per-mode constant configuration record. Static data, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlicePolicy {
    pub cadence_minutes: u64,
    pub importance: Importance,
    pub alert_sensitivity: Sensitivity,
    pub self_healing: HealingPosture,
    pub rank: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heartbeat_defaults_to_core() {
        assert_eq!(
            resolve_mode(TriggerKind::Heartbeat, None),
            HealthCheckMode::Core
        );
    }

    #[test]
    fn check_defaults_to_full() {
        assert_eq!(resolve_mode(TriggerKind::Check, None), HealthCheckMode::Full);
    }

    #[test]
    fn override_wins_case_insensitive_trimmed() {
        assert_eq!(
            resolve_mode(TriggerKind::Heartbeat, Some("Signals ")),
            HealthCheckMode::Signals
        );
        assert_eq!(
            resolve_mode(TriggerKind::Check, Some("  CORE")),
            HealthCheckMode::Core
        );
        assert_eq!(
            resolve_mode(TriggerKind::Heartbeat, Some("full")),
            HealthCheckMode::Full
        );
    }

    #[test]
    fn unknown_override_falls_back_to_trigger_default() {
        for bad in ["", "verbose", "core+signals", "FULLL", "  "] {
            assert_eq!(
                resolve_mode(TriggerKind::Heartbeat, Some(bad)),
                HealthCheckMode::Core,
                "override {bad:?}"
            );
            assert_eq!(
                resolve_mode(TriggerKind::Check, Some(bad)),
                HealthCheckMode::Full,
                "override {bad:?}"
            );
        }
    }

    #[test]
    fn mode_halves() {
        assert!(HealthCheckMode::Core.runs_core_probes());
        assert!(!HealthCheckMode::Core.runs_signal_scan());

        assert!(!HealthCheckMode::Signals.runs_core_probes());
        assert!(HealthCheckMode::Signals.runs_signal_scan());

        assert!(HealthCheckMode::Full.runs_core_probes());
        assert!(HealthCheckMode::Full.runs_signal_scan());
    }

    #[test]
    fn slice_policies_are_ranked_by_cadence() {
        let core = HealthCheckMode::Core.policy();
        let full = HealthCheckMode::Full.policy();
        let signals = HealthCheckMode::Signals.policy();

        assert!(core.cadence_minutes < full.cadence_minutes);
        assert!(full.cadence_minutes < signals.cadence_minutes);
        assert_eq!(core.rank, 0);
        assert_eq!(signals.self_healing, HealingPosture::Manual);
    }

    #[test]
    fn mode_display_round_trips_through_parse() {
        for mode in [
            HealthCheckMode::Core,
            HealthCheckMode::Signals,
            HealthCheckMode::Full,
        ] {
            assert_eq!(HealthCheckMode::parse(&mode.to_string()), Some(mode));
        }
    }
}

//! Daemon configuration — `vigil.toml`.
//!
//! Everything has a default so an empty file (or none at all) yields a
//! working monitor with no probes. Analyzer thresholds are environment
//! knobs, not file config; the file owns the probe registry, healing
//! rules, cooldown windows, and paths.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use vigil_core::CooldownWindows;
use vigil_escalate::HealingRule;
use vigil_probe::ProbeSpec;

fn default_state_path() -> PathBuf {
    PathBuf::from("vigil.redb")
}

fn default_outbox_path() -> PathBuf {
    PathBuf::from("healing-outbox.jsonl")
}

fn default_tasks_path() -> PathBuf {
    PathBuf::from("tracked-tasks.json")
}

fn default_retention_days() -> u64 {
    14
}

fn default_probe_budget_ms() -> u64 {
    10_000
}

/// Cooldown window overrides, all optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CooldownsConfig {
    pub service_down_secs: Option<u64>,
    pub signal_alert_secs: Option<u64>,
    pub otel_gap_secs: Option<u64>,
    pub run_lock_secs: Option<u64>,
}

impl CooldownsConfig {
    pub fn windows(&self) -> CooldownWindows {
        let d = CooldownWindows::default();
        CooldownWindows {
            service_down_secs: self.service_down_secs.unwrap_or(d.service_down_secs),
            signal_alert_secs: self.signal_alert_secs.unwrap_or(d.signal_alert_secs),
            otel_gap_secs: self.otel_gap_secs.unwrap_or(d.otel_gap_secs),
            run_lock_secs: self.run_lock_secs.unwrap_or(d.run_lock_secs),
        }
    }
}

/// Root daemon configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DaemonConfig {
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
    #[serde(default = "default_outbox_path")]
    pub outbox_path: PathBuf,
    #[serde(default = "default_tasks_path")]
    pub tasks_path: PathBuf,
    /// Telemetry events older than this are pruned at startup.
    #[serde(default = "default_retention_days")]
    pub event_retention_days: u64,
    /// Overall budget for one probe batch.
    #[serde(default = "default_probe_budget_ms")]
    pub probe_budget_ms: u64,
    #[serde(default)]
    pub cooldowns: CooldownsConfig,
    #[serde(default)]
    pub probes: Vec<ProbeSpec>,
    /// Critical-domain healing rules; empty means the built-in defaults.
    #[serde(default)]
    pub healing: Vec<HealingRule>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
            outbox_path: default_outbox_path(),
            tasks_path: default_tasks_path(),
            event_retention_days: default_retention_days(),
            probe_budget_ms: default_probe_budget_ms(),
            cooldowns: CooldownsConfig::default(),
            probes: Vec::new(),
            healing: Vec::new(),
        }
    }
}

impl DaemonConfig {
    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        Ok(toml::from_str(&raw)?)
    }

    /// The healing rules to use — configured or built-in.
    pub fn healing_rules(&self) -> Vec<HealingRule> {
        if self.healing.is_empty() {
            vigil_escalate::default_rules()
        } else {
            self.healing.clone()
        }
    }
}

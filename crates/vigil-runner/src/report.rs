//! Run reports and step timing.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use vigil_core::{HealthCheckMode, ServiceStatus};
use vigil_escalate::DispatchOutcome;
use vigil_signals::{ErrorRateSummary, WriteGateDriftSummary};

/// Overall disposition of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Another run already holds the run lock.
    Skipped,
    Noop,
    Escalated,
    SelfHealingDispatched,
}

/// Structured, JSON-serializable result of one monitoring run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub trigger: String,
    pub mode: HealthCheckMode,
    pub status: RunStatus,
    pub reason: String,
    pub services: Vec<ServiceStatus>,
    pub error_rate: Option<ErrorRateSummary>,
    pub write_gate: Option<WriteGateDriftSummary>,
    /// Dispatch detail; absent on skipped runs.
    pub dispatch: Option<DispatchOutcome>,
    /// Wall-clock duration of each orchestration step.
    pub step_durations_ms: BTreeMap<String, u64>,
    pub started_at_ms: u64,
    pub finished_at_ms: u64,
}

impl RunReport {
    pub fn degraded_count(&self) -> usize {
        self.services.iter().filter(|s| !s.ok).count()
    }
}

/// Records per-step wall-clock durations.
#[derive(Debug, Default)]
pub struct StepTimer {
    steps: BTreeMap<String, u64>,
}

impl StepTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time an async step.
    pub async fn time<T>(&mut self, name: &str, fut: impl Future<Output = T>) -> T {
        let started = Instant::now();
        let out = fut.await;
        self.steps
            .insert(name.to_string(), started.elapsed().as_millis() as u64);
        out
    }

    /// Time a synchronous step.
    pub fn time_sync<T>(&mut self, name: &str, f: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let out = f();
        self.steps
            .insert(name.to_string(), started.elapsed().as_millis() as u64);
        out
    }

    /// Snapshot of the durations recorded so far.
    pub fn durations(&self) -> BTreeMap<String, u64> {
        self.steps.clone()
    }

    pub fn into_durations(self) -> BTreeMap<String, u64> {
        self.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn timer_records_each_step_once() {
        let mut timer = StepTimer::new();

        let value = timer.time("probes", async { 41 + 1 }).await;
        assert_eq!(value, 42);

        timer.time_sync("resolve_mode", || ());
        timer
            .time("probes", tokio::time::sleep(std::time::Duration::from_millis(15)))
            .await;

        let durations = timer.into_durations();
        assert_eq!(durations.len(), 2);
        // Re-timing a step overwrites it.
        assert!(durations["probes"] >= 10);
    }

    #[test]
    fn report_serializes_to_json() {
        let report = RunReport {
            trigger: "monitor/heartbeat".to_string(),
            mode: HealthCheckMode::Core,
            status: RunStatus::Noop,
            reason: "all services healthy".to_string(),
            services: vec![ServiceStatus::ok("Postgres", 4)],
            error_rate: None,
            write_gate: None,
            dispatch: None,
            step_durations_ms: BTreeMap::from([("probes".to_string(), 12)]),
            started_at_ms: 1_000,
            finished_at_ms: 1_050,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "noop");
        assert_eq!(json["step_durations_ms"]["probes"], 12);
        assert_eq!(report.degraded_count(), 0);
    }
}

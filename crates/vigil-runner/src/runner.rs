//! The monitoring orchestrator.
//!
//! One `Monitor` owns the probe registry, the analyzers, the cooldown
//! gate, and the escalation seams. Each triggered run flows through
//! `run()` — nothing in here returns an error to the caller under normal
//! operation; every external failure is converted into status and
//! summary data.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{info, warn};

use vigil_core::{
    resolve_mode, CooldownWindows, HealthCheckMode, ServiceStatus, TriggerEvent,
};
use vigil_escalate::{
    filter_untracked, recovery_key, DashboardSink, DispatchInput, DispatchStatus,
    EscalationDispatcher, HealingOutbound, HealingRule, NotifyChannel, NotifyLevel, NotifyPayload,
    TaskTracker, TelemetrySink,
};
use vigil_probe::{run_probes, ProbeSpec};
use vigil_signals::{ErrorRateAnalyzer, ErrorRateSummary, EventSource, WriteGateAnalyzer,
    WriteGateDriftSummary};
use vigil_state::{ComponentHealth, CooldownGate, EventLevel, TelemetryEvent};

use crate::report::{RunReport, RunStatus, StepTimer};

/// Claim key enforcing at most one run in flight.
pub const RUN_LOCK_KEY: &str = "run:lock";

/// Claim key for the monitor's own telemetry-gap warning.
pub const OTEL_GAP_KEY: &str = "otel:gap";

/// The external seams a monitor dispatches through.
pub struct Seams {
    pub dashboard: Arc<dyn DashboardSink>,
    pub notifier: Arc<dyn NotifyChannel>,
    pub telemetry: Arc<dyn TelemetrySink>,
    pub tracker: Arc<dyn TaskTracker>,
    pub outbound: Arc<dyn HealingOutbound>,
    pub events: Arc<dyn EventSource>,
}

/// The health-monitoring orchestrator.
pub struct Monitor {
    probes: Vec<ProbeSpec>,
    seams: Seams,
    gate: CooldownGate,
    windows: CooldownWindows,
    dispatcher: EscalationDispatcher,
    error_rate: ErrorRateAnalyzer,
    write_gate: WriteGateAnalyzer,
    /// Overall budget for the probe batch; stragglers are abandoned.
    probe_budget: Option<Duration>,
}

impl Monitor {
    /// Build a monitor with default windows and the built-in healing rules.
    pub fn new(probes: Vec<ProbeSpec>, seams: Seams, gate: CooldownGate) -> Self {
        Self::with_config(
            probes,
            seams,
            gate,
            CooldownWindows::default(),
            vigil_escalate::default_rules(),
        )
    }

    /// Build a monitor with explicit cooldown windows and healing rules.
    pub fn with_config(
        probes: Vec<ProbeSpec>,
        seams: Seams,
        gate: CooldownGate,
        windows: CooldownWindows,
        rules: Vec<HealingRule>,
    ) -> Self {
        let dispatcher = EscalationDispatcher::new(
            seams.notifier.clone(),
            seams.telemetry.clone(),
            seams.outbound.clone(),
            gate.clone(),
            windows,
            rules,
        );
        Self {
            probes,
            seams,
            gate,
            windows,
            dispatcher,
            error_rate: ErrorRateAnalyzer::from_env(),
            write_gate: WriteGateAnalyzer::from_env(),
            probe_budget: None,
        }
    }

    /// Bound the whole probe batch with an overall budget.
    pub fn with_probe_budget(mut self, budget: Duration) -> Self {
        self.probe_budget = Some(budget);
        self
    }

    /// Execute one monitoring run for the given trigger.
    pub async fn run(&self, trigger: &TriggerEvent) -> RunReport {
        let started_at_ms = epoch_ms();
        let mut timer = StepTimer::new();

        let mode = timer.time_sync("resolve_mode", || {
            resolve_mode(trigger.kind(), trigger.mode_override.as_deref())
        });

        // At most one run in flight. The TTL is a crash backstop; normal
        // runs release the claim on completion.
        if !self.gate.claim(RUN_LOCK_KEY, self.windows.run_lock_secs) {
            info!(trigger = %trigger.name, "run skipped, another run holds the lock");
            return RunReport {
                trigger: trigger.name.clone(),
                mode,
                status: RunStatus::Skipped,
                reason: "another run holds the run lock".to_string(),
                services: Vec::new(),
                error_rate: None,
                write_gate: None,
                dispatch: None,
                step_durations_ms: timer.into_durations(),
                started_at_ms,
                finished_at_ms: epoch_ms(),
            };
        }
        info!(%mode, trigger = %trigger.name, "monitoring run started");

        let mut services: Vec<ServiceStatus> = Vec::new();
        if mode.runs_core_probes() {
            services = timer
                .time("probes", run_probes(&self.probes, self.probe_budget))
                .await;
            timer.time("dashboard", self.push_board(&services)).await;

            // Recovery transitions: clear the "down" claim so the next
            // failure re-alerts immediately instead of waiting out a
            // stale window.
            for status in services.iter().filter(|s| s.ok) {
                if self.gate.release(&recovery_key(&status.name)) {
                    info!(service = %status.name, "service recovered, down cooldown cleared");
                }
            }
        }
        let degraded: Vec<ServiceStatus> =
            services.iter().filter(|s| !s.ok).cloned().collect();

        let (error_rate, write_gate) = if mode.runs_signal_scan() {
            let now_ms = epoch_ms();
            let (er, wg) = timer
                .time("signals", async {
                    tokio::join!(
                        self.error_rate.analyze(self.seams.events.as_ref(), now_ms),
                        self.write_gate.analyze(self.seams.events.as_ref(), now_ms),
                    )
                })
                .await;
            (Some(er), Some(wg))
        } else {
            (None, None)
        };

        let durations_so_far = timer.durations();
        timer
            .time(
                "telemetry",
                self.emit_run_summary(
                    trigger,
                    mode,
                    &services,
                    degraded.len(),
                    error_rate.as_ref(),
                    write_gate.as_ref(),
                    durations_so_far,
                ),
            )
            .await;

        let (fresh_degraded, already_tracked) = timer
            .time(
                "filter",
                filter_untracked(self.seams.tracker.as_ref(), degraded),
            )
            .await;

        let input = DispatchInput {
            trigger_name: &trigger.name,
            source_event_id: trigger.event_id.as_deref(),
            mode,
            services: &services,
            fresh_degraded: &fresh_degraded,
            already_tracked,
            error_rate: error_rate.as_ref(),
            write_gate: write_gate.as_ref(),
            epoch_ms: epoch_ms(),
        };
        let outcome = timer.time("dispatch", self.dispatcher.dispatch(input)).await;

        self.gate.release(RUN_LOCK_KEY);

        let status = match outcome.status {
            DispatchStatus::Noop => RunStatus::Noop,
            DispatchStatus::Escalated => RunStatus::Escalated,
            DispatchStatus::SelfHealingDispatched => RunStatus::SelfHealingDispatched,
        };
        info!(?status, reason = %outcome.reason, "monitoring run finished");

        RunReport {
            trigger: trigger.name.clone(),
            mode,
            status,
            reason: outcome.reason.clone(),
            services,
            error_rate,
            write_gate,
            dispatch: Some(outcome),
            step_durations_ms: timer.into_durations(),
            started_at_ms,
            finished_at_ms: epoch_ms(),
        }
    }

    /// Best-effort board push, one entry per probed service. A failed
    /// push is logged and never aborts the run or the other pushes.
    async fn push_board(&self, services: &[ServiceStatus]) {
        for status in services {
            let health = if status.ok {
                ComponentHealth::Healthy
            } else {
                ComponentHealth::Down
            };
            if let Err(e) = self
                .seams
                .dashboard
                .push_status(&status.name, health, status.detail.as_deref())
                .await
            {
                warn!(service = %status.name, error = %e, "dashboard push failed");
            }
        }
    }

    /// Emit the run-summary telemetry event. If the emission itself
    /// fails (or the sink reports `stored = false`), raise a separate,
    /// cooldown-gated warning — a monitor that cannot observe itself
    /// silently is a distinct failure mode.
    #[allow(clippy::too_many_arguments)]
    async fn emit_run_summary(
        &self,
        trigger: &TriggerEvent,
        mode: HealthCheckMode,
        services: &[ServiceStatus],
        degraded: usize,
        error_rate: Option<&ErrorRateSummary>,
        write_gate: Option<&WriteGateDriftSummary>,
        step_durations_ms: std::collections::BTreeMap<String, u64>,
    ) {
        let event = TelemetryEvent {
            epoch_ms: epoch_ms(),
            level: EventLevel::Info,
            component: "monitor".to_string(),
            action: "run-summary".to_string(),
            success: true,
            error: None,
            metadata: serde_json::json!({
                "trigger": trigger.name,
                "mode": mode,
                "services": services.len(),
                "degraded": degraded,
                "error_rate": error_rate,
                "write_gate": write_gate,
                "step_durations_ms": step_durations_ms,
            }),
        };

        let gap = match self.seams.telemetry.emit(&event).await {
            Ok(receipt) if receipt.stored => None,
            Ok(_) => Some("run summary accepted but not stored".to_string()),
            Err(e) => Some(e.to_string()),
        };

        let Some(reason) = gap else { return };
        warn!(%reason, "run summary telemetry gap");
        if self.gate.claim(OTEL_GAP_KEY, self.windows.otel_gap_secs) {
            let payload = NotifyPayload {
                kind: "monitor-gap".to_string(),
                prompt: format!("monitoring telemetry pipeline is failing: {reason}"),
                level: NotifyLevel::Warn,
                immediate: false,
            };
            if let Err(e) = self.seams.notifier.notify(&payload).await {
                warn!(error = %e, "telemetry-gap warning failed to send");
            }
        }
    }
}

fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

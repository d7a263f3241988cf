//! Escalation dispatcher — the PROBED → FILTERED → (NOOP | ESCALATED)
//! state machine, with an optional SELF_HEALING_DISPATCHED tail for
//! critical-domain failures.
//!
//! Every channel is independent and best-effort: a failed notification
//! must not block the telemetry emission or the healing dispatch, and
//! vice versa. Nothing here returns an error to the orchestrator.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use vigil_core::{CooldownWindows, HealthCheckMode, ServiceStatus};
use vigil_signals::{ErrorRateSummary, WriteGateDriftSummary};
use vigil_state::{CooldownGate, EventLevel, TelemetryEvent};

use crate::healing::{build_request, into_outbound, HealingRule};
use crate::sinks::{HealingOutbound, NotifyChannel, NotifyLevel, NotifyPayload, TelemetrySink};

/// Where a dispatch ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    /// Nothing notable, or everything notable was suppressed.
    Noop,
    /// At least one alert went out.
    Escalated,
    /// Alerts went out and at least one healing request was dispatched.
    SelfHealingDispatched,
}

/// Result of one dispatch, embedded in the run report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub status: DispatchStatus,
    pub reason: String,
    /// Newly-degraded services that cleared their cooldown and alerted.
    pub alerted: Vec<String>,
    /// Newly-degraded services muted by an active "down" claim.
    pub cooldown_suppressed: usize,
    /// Elevated-signal alerts that cleared their cooldown.
    pub signal_alerts: Vec<String>,
    /// Domains a self-healing request was dispatched for.
    pub healing_domains: Vec<String>,
}

/// Everything the dispatcher needs to know about one run.
#[derive(Debug, Clone, Copy)]
pub struct DispatchInput<'a> {
    pub trigger_name: &'a str,
    pub source_event_id: Option<&'a str>,
    pub mode: HealthCheckMode,
    /// All probed services, healthy and degraded.
    pub services: &'a [ServiceStatus],
    /// Degraded services that survived the tracked-task filter.
    pub fresh_degraded: &'a [ServiceStatus],
    /// Degraded services dropped by the filter.
    pub already_tracked: usize,
    pub error_rate: Option<&'a ErrorRateSummary>,
    pub write_gate: Option<&'a WriteGateDriftSummary>,
    pub epoch_ms: u64,
}

/// Fans a finding out to the notification, telemetry, and self-healing
/// channels.
pub struct EscalationDispatcher {
    notifier: Arc<dyn NotifyChannel>,
    telemetry: Arc<dyn TelemetrySink>,
    outbound: Arc<dyn HealingOutbound>,
    gate: CooldownGate,
    windows: CooldownWindows,
    rules: Vec<HealingRule>,
}

impl EscalationDispatcher {
    pub fn new(
        notifier: Arc<dyn NotifyChannel>,
        telemetry: Arc<dyn TelemetrySink>,
        outbound: Arc<dyn HealingOutbound>,
        gate: CooldownGate,
        windows: CooldownWindows,
        rules: Vec<HealingRule>,
    ) -> Self {
        Self {
            notifier,
            telemetry,
            outbound,
            gate,
            windows,
            rules,
        }
    }

    /// Run the dispatch state machine for one run's findings.
    pub async fn dispatch(&self, input: DispatchInput<'_>) -> DispatchOutcome {
        let escalating_signals = collect_escalating_signals(&input);

        if input.fresh_degraded.is_empty() && escalating_signals.is_empty() {
            let reason = if input.already_tracked > 0 {
                format!(
                    "{} degraded service(s) already tracked, nothing new",
                    input.already_tracked
                )
            } else {
                "all services healthy and no elevated signals".to_string()
            };
            return DispatchOutcome {
                status: DispatchStatus::Noop,
                reason,
                alerted: Vec::new(),
                cooldown_suppressed: 0,
                signal_alerts: Vec::new(),
                healing_domains: Vec::new(),
            };
        }

        // Per-service "down" claims: time-boxed suppression of repeat
        // alerts for the same outage. Recovery releases these keys.
        let mut alertable: Vec<&ServiceStatus> = Vec::new();
        let mut suppressed = 0usize;
        for status in input.fresh_degraded {
            if self
                .gate
                .claim(&down_key(&status.name), self.windows.service_down_secs)
            {
                alertable.push(status);
            } else {
                suppressed += 1;
            }
        }

        // Channel (b): human-facing notification.
        if !alertable.is_empty() {
            let immediate = alertable.iter().any(|s| self.rule_for(&s.name).is_some());
            let payload = NotifyPayload {
                kind: "health-alert".to_string(),
                prompt: format_alert(input.mode, input.services, &alertable),
                level: if immediate {
                    NotifyLevel::Critical
                } else {
                    NotifyLevel::Warn
                },
                immediate,
            };
            if let Err(e) = self.notifier.notify(&payload).await {
                warn!(error = %e, "health alert notification failed");
            }
        }

        // Channel (d): cooldown-gated elevated-signal alerts. These would
        // otherwise fire every run while the condition persists.
        let mut signal_alerts = Vec::new();
        for (key, line) in &escalating_signals {
            if self
                .gate
                .claim(&signal_key(key), self.windows.signal_alert_secs)
            {
                let payload = NotifyPayload {
                    kind: "elevated-signal".to_string(),
                    prompt: line.clone(),
                    level: NotifyLevel::Warn,
                    immediate: false,
                };
                if let Err(e) = self.notifier.notify(&payload).await {
                    warn!(signal = %key, error = %e, "elevated-signal notification failed");
                }
                signal_alerts.push(key.clone());
            }
        }

        // Self-healing tail: conservative allowlist only.
        let mut healing_domains = Vec::new();
        for status in &alertable {
            let Some(rule) = self.rule_for(&status.name) else {
                continue;
            };
            let request = build_request(
                rule,
                status,
                input.fresh_degraded,
                input.trigger_name,
                input.source_event_id,
            );
            let event = into_outbound(request, rule);
            // Fire-and-forget: remediation completion is not awaited.
            match self.outbound.send(&event).await {
                Ok(()) => {
                    info!(
                        service = %status.name,
                        domain = %rule.domain,
                        key = %event.request.run_context.run_context_key,
                        "self-healing request dispatched"
                    );
                    healing_domains.push(rule.domain.clone());
                }
                Err(e) => {
                    warn!(service = %status.name, error = %e, "self-healing dispatch failed");
                }
            }
        }

        // Channel (c): structured escalation telemetry.
        if !alertable.is_empty() || !signal_alerts.is_empty() {
            let alerted: Vec<&str> = alertable.iter().map(|s| s.name.as_str()).collect();
            let event = TelemetryEvent {
                epoch_ms: input.epoch_ms,
                level: EventLevel::Warn,
                component: "monitor".to_string(),
                action: "escalation".to_string(),
                success: true,
                error: None,
                metadata: serde_json::json!({
                    "mode": input.mode,
                    "degraded": input.fresh_degraded.len(),
                    "alerted": alerted,
                    "signal_alerts": signal_alerts,
                    "healing_domains": healing_domains,
                }),
            };
            if let Err(e) = self.telemetry.emit(&event).await {
                warn!(error = %e, "escalation telemetry emission failed");
            }
        }

        let status = if !healing_domains.is_empty() {
            DispatchStatus::SelfHealingDispatched
        } else if !alertable.is_empty() || !signal_alerts.is_empty() {
            DispatchStatus::Escalated
        } else {
            DispatchStatus::Noop
        };
        let reason = match status {
            DispatchStatus::Noop => "degraded but within an active cooldown window".to_string(),
            DispatchStatus::Escalated => format!(
                "{} new degradation(s), {} elevated signal(s)",
                alertable.len(),
                signal_alerts.len()
            ),
            DispatchStatus::SelfHealingDispatched => format!(
                "{} new degradation(s), self-healing dispatched for {}",
                alertable.len(),
                healing_domains.join(", ")
            ),
        };

        DispatchOutcome {
            status,
            reason,
            alerted: alertable.iter().map(|s| s.name.clone()).collect(),
            cooldown_suppressed: suppressed,
            signal_alerts,
            healing_domains,
        }
    }

    fn rule_for(&self, service_name: &str) -> Option<&HealingRule> {
        self.rules.iter().find(|r| r.matches(service_name))
    }
}

fn down_key(service: &str) -> String {
    format!("down:{service}")
}

fn signal_key(kind: &str) -> String {
    format!("signal:{kind}")
}

/// The cooldown key the orchestrator releases when a service recovers.
pub fn recovery_key(service: &str) -> String {
    down_key(service)
}

fn collect_escalating_signals(input: &DispatchInput<'_>) -> Vec<(String, String)> {
    let mut signals = Vec::new();
    if let Some(summary) = input.error_rate
        && summary.should_escalate
    {
        signals.push(("error-rate".to_string(), summary.describe()));
    }
    if let Some(summary) = input.write_gate
        && summary.should_escalate
    {
        signals.push(("write-gate-drift".to_string(), summary.describe()));
    }
    signals
}

/// Per-service ✅/❌ lines with truncated detail for failures.
fn format_alert(
    mode: HealthCheckMode,
    services: &[ServiceStatus],
    alertable: &[&ServiceStatus],
) -> String {
    let mut lines = vec![format!(
        "Health check ({mode}): {} service(s) need attention",
        alertable.len()
    )];
    for status in services {
        if status.ok {
            lines.push(format!("✅ {}", status.name));
        } else {
            lines.push(format!(
                "❌ {} — {}",
                status.name,
                status.detail.as_deref().unwrap_or("probe failed")
            ));
        }
    }
    lines.join("\n")
}

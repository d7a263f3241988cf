//! Seam traits for the escalation channels.
//!
//! Dyn-safe traits with boxed-future methods — injected for testability.
//! Every channel is best-effort: callers log failures and keep going.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use vigil_state::{ComponentHealth, TelemetryEvent};

use crate::healing::OutboundHealingEvent;

/// Boxed future returned by sink methods.
pub type SinkFuture<'a, T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send + 'a>>;

// ── Dashboard ─────────────────────────────────────────────────────

/// Status board push — one call per probed service per run.
pub trait DashboardSink: Send + Sync {
    fn push_status<'a>(
        &'a self,
        component: &'a str,
        health: ComponentHealth,
        detail: Option<&'a str>,
    ) -> SinkFuture<'a, ()>;
}

// ── Notification channel ──────────────────────────────────────────

/// Urgency of a human-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyLevel {
    Info,
    Warn,
    Critical,
}

/// Payload for the gateway notification channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotifyPayload {
    /// Notification type, e.g. `"health-alert"` or `"elevated-signal"`.
    pub kind: String,
    /// Human-readable message body.
    pub prompt: String,
    pub level: NotifyLevel,
    /// Bypass digest/cooldown batching — critical-domain failures only.
    pub immediate: bool,
}

/// Human-facing notification seam.
pub trait NotifyChannel: Send + Sync {
    fn notify<'a>(&'a self, payload: &'a NotifyPayload) -> SinkFuture<'a, ()>;
}

// ── Telemetry ─────────────────────────────────────────────────────

/// Acknowledgement from the telemetry sink. `stored = false` means the
/// pipeline accepted but did not persist the event — the monitor's own
/// observability has a gap worth surfacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmitReceipt {
    pub stored: bool,
}

/// Structured telemetry emission seam.
pub trait TelemetrySink: Send + Sync {
    fn emit<'a>(&'a self, event: &'a TelemetryEvent) -> SinkFuture<'a, EmitReceipt>;
}

// ── Task tracking ─────────────────────────────────────────────────

/// An open item in the external task system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackedTask {
    pub id: String,
    pub title: String,
}

/// Read-only view of currently tracked problems. This engine never
/// creates or closes tracked items.
pub trait TaskTracker: Send + Sync {
    fn open_tasks(&self) -> SinkFuture<'_, Vec<TrackedTask>>;
}

// ── Self-healing outbound ─────────────────────────────────────────

/// Fire-and-forget emission of a self-healing request to the external
/// handler.
pub trait HealingOutbound: Send + Sync {
    fn send<'a>(&'a self, event: &'a OutboundHealingEvent) -> SinkFuture<'a, ()>;
}

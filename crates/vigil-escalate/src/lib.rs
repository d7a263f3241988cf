//! vigil-escalate — turning findings into escalations.
//!
//! Takes a run's degraded set and elevated signals through the
//! escalation pipeline: filter out problems a tracking item already
//! covers, fan the rest out to the notification and telemetry channels
//! (each best-effort, none failing the others), and — for services in
//! the configured critical-domain allowlist — emit an evidence-bearing
//! self-healing request with a playbook and retry policy for the
//! external handler.
//!
//! The seams to the outside world (`NotifyChannel`, `TelemetrySink`,
//! `TaskTracker`, `HealingOutbound`, `DashboardSink`) are dyn traits
//! with boxed-future methods; production adapters live in [`adapters`].

pub mod adapters;
pub mod dispatcher;
pub mod filter;
pub mod flow;
pub mod healing;
pub mod sinks;

pub use dispatcher::{
    recovery_key, DispatchInput, DispatchOutcome, DispatchStatus, EscalationDispatcher,
};
pub use filter::{filter_untracked, matches_any};
pub use flow::{build_run_context, FlowInputs, RunContext};
pub use healing::{default_rules, HealingRule, OutboundHealingEvent, SelfHealingRequest};
pub use sinks::{
    DashboardSink, EmitReceipt, HealingOutbound, NotifyChannel, NotifyLevel, NotifyPayload,
    SinkFuture, TaskTracker, TelemetrySink, TrackedTask,
};

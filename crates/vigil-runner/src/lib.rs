//! vigil-runner — the per-run orchestrator.
//!
//! Sequences one monitoring run end to end: resolve the mode, take the
//! run lock, probe, push the status board, analyze signals, record the
//! run summary (and surface the monitor's own telemetry gaps), filter
//! already-tracked degradations, and dispatch escalations. Every step
//! records its wall-clock duration into the run report so slow
//! dependencies are visible without separate profiling.

pub mod report;
pub mod runner;

pub use report::{RunReport, RunStatus, StepTimer};
pub use runner::{Monitor, Seams};

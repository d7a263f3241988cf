//! vigil-core — shared domain types for the Vigil monitoring engine.
//!
//! Defines the vocabulary the rest of the workspace speaks: probe results
//! (`ServiceStatus`), health-check modes and their slice policies, trigger
//! events, self-healing building blocks (`RetryPolicy`, `Playbook`,
//! `Evidence`), and the environment-tunable analyzer knobs.
//!
//! Everything here is plain data — no I/O, no async. The store, probe,
//! and escalation crates build on these types.

pub mod knobs;
pub mod mode;
pub mod types;

pub use knobs::{CooldownWindows, DriftKnobs, ErrorRateKnobs};
pub use mode::{
    resolve_mode, HealingPosture, HealthCheckMode, Importance, Sensitivity, SlicePolicy,
};
pub use types::*;

//! vigil-state — embedded store for the Vigil monitoring engine.
//!
//! Backed by [redb](https://docs.rs/redb), holds the three pieces of
//! durable monitor state:
//!
//! - **cooldown claims** — at-most-once-per-window notification claims,
//!   written with a single atomic check-and-set;
//! - **telemetry events** — the append-only event stream the signal
//!   analyzers query over sliding windows;
//! - **status board** — the latest per-service health pushed after each
//!   run (the dashboard sink's backing table).
//!
//! All domain types are JSON-serialized into redb's `&[u8]` value
//! columns. The `MonitorStore` is `Clone` + `Send` + `Sync` (backed by
//! `Arc<Database>`) and can be shared across async tasks. Cooldown state
//! lives here rather than in process memory so claims survive restarts
//! and coordinate overlapping run attempts.

pub mod error;
pub mod gate;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use gate::{ClaimStore, CooldownGate};
pub use store::MonitorStore;
pub use types::*;

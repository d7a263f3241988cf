//! vigil-probe — timeout-bounded service probes.
//!
//! A probe is a named check of one dependency: an HTTP GET expecting 2xx,
//! or a bare TCP connect. The executor runs every registered probe
//! concurrently on a `JoinSet`, each under its own timeout, and collects
//! `ServiceStatus` records — one probe's failure, timeout, or panic never
//! blocks or aborts the others.

pub mod executor;
pub mod probe;

pub use executor::run_probes;
pub use probe::{ProbeKind, ProbeOutcome, ProbeSpec};

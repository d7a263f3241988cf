//! vigil-signals — statistical health signals over the telemetry stream.
//!
//! Each analyzer queries an event source over a sliding window, counts
//! totals and a matching error/verdict subset, and applies two gates
//! before escalating: a minimum-sample floor (a window with 2 events and
//! 1 error never fires) and a ratio threshold. A failed query yields an
//! `unavailable` summary with escalation suppressed — absence of signal
//! is not evidence of a problem.

pub mod error_rate;
pub mod source;
pub mod write_gate;

pub use error_rate::{ErrorRateAnalyzer, ErrorRateSummary};
pub use source::{EventSource, EventsFuture};
pub use write_gate::{WriteGateAnalyzer, WriteGateDriftSummary};

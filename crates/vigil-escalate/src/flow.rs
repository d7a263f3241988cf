//! Flow context — correlation identifiers for escalation chains.
//!
//! The run-context key is a deterministic digest over the dispatch
//! coordinates: the same inputs always produce the same key, so a
//! redelivered trigger produces a byte-identical self-healing dispatch
//! that downstream consumers can deduplicate. The flow trace is an
//! ordered list of hop labels for humans reading an escalation, never
//! used for logic.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Correlation context attached to a run's escalation chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunContext {
    /// Deterministic dedup key, `hc-` + 16 hex chars.
    pub run_context_key: String,
    /// Ordered hop labels for debugging.
    pub flow_trace: Vec<String>,
    pub source_event_id: Option<String>,
    pub source_event_name: Option<String>,
    pub attempt: u32,
}

/// The coordinates the run-context key is derived from.
#[derive(Debug, Clone, Copy)]
pub struct FlowInputs<'a> {
    pub event_name: &'a str,
    pub source_function: &'a str,
    pub target_component: &'a str,
    pub domain: &'a str,
    pub target_event_name: &'a str,
    pub attempt: u32,
    pub evidence_count: usize,
}

/// Build a `RunContext` from dispatch coordinates.
///
/// Pure and deterministic: identical inputs yield the identical key.
pub fn build_run_context(inputs: &FlowInputs<'_>, source_event_id: Option<&str>) -> RunContext {
    let mut hasher = Sha256::new();
    // Field separator prevents ("ab","c") colliding with ("a","bc").
    for field in [
        inputs.event_name,
        inputs.source_function,
        inputs.target_component,
        inputs.domain,
        inputs.target_event_name,
    ] {
        hasher.update(field.as_bytes());
        hasher.update([0u8]);
    }
    hasher.update(inputs.attempt.to_be_bytes());
    hasher.update((inputs.evidence_count as u64).to_be_bytes());
    let digest = hasher.finalize();
    let run_context_key = format!("hc-{}", &hex::encode(digest)[..16]);

    RunContext {
        run_context_key,
        flow_trace: vec![
            inputs.event_name.to_string(),
            inputs.source_function.to_string(),
            format!(
                "{}/{} ({})",
                inputs.target_component, inputs.target_event_name, inputs.domain
            ),
        ],
        source_event_id: source_event_id.map(str::to_string),
        source_event_name: Some(inputs.event_name.to_string()),
        attempt: inputs.attempt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> FlowInputs<'static> {
        FlowInputs {
            event_name: "monitor/heartbeat",
            source_function: "vigil/monitor",
            target_component: "gateway",
            domain: "gateway-bridge",
            target_event_name: "heal/gateway-bridge",
            attempt: 0,
            evidence_count: 2,
        }
    }

    #[test]
    fn identical_inputs_yield_identical_key() {
        let a = build_run_context(&inputs(), Some("evt-1"));
        let b = build_run_context(&inputs(), Some("evt-2"));
        // The source event id rides along but does not feed the key.
        assert_eq!(a.run_context_key, b.run_context_key);
    }

    #[test]
    fn changing_attempt_changes_key() {
        let base = build_run_context(&inputs(), None);
        let mut bumped = inputs();
        bumped.attempt = 1;
        let next = build_run_context(&bumped, None);
        assert_ne!(base.run_context_key, next.run_context_key);
        assert_eq!(next.attempt, 1);
    }

    #[test]
    fn changing_any_coordinate_changes_key() {
        let base = build_run_context(&inputs(), None).run_context_key;

        let mut other = inputs();
        other.domain = "event-bus";
        assert_ne!(build_run_context(&other, None).run_context_key, base);

        let mut other = inputs();
        other.evidence_count = 3;
        assert_ne!(build_run_context(&other, None).run_context_key, base);
    }

    #[test]
    fn adjacent_fields_do_not_collide() {
        let mut a = inputs();
        a.target_component = "gatewayx";
        a.domain = "bridge";
        let mut b = inputs();
        b.target_component = "gateway";
        b.domain = "xbridge";
        assert_ne!(
            build_run_context(&a, None).run_context_key,
            build_run_context(&b, None).run_context_key
        );
    }

    #[test]
    fn key_shape_is_stable() {
        let ctx = build_run_context(&inputs(), None);
        assert!(ctx.run_context_key.starts_with("hc-"));
        assert_eq!(ctx.run_context_key.len(), 3 + 16);
        assert_eq!(ctx.flow_trace.len(), 3);
        assert_eq!(ctx.source_event_name.as_deref(), Some("monitor/heartbeat"));
    }
}

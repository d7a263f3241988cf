//! Self-healing requests for critical failure domains.
//!
//! Only services on the configured allowlist get automated remediation;
//! everything else stays human-only. The allowlist and the name→domain
//! mapping are data (`HealingRule` records), not inline conditionals —
//! the set has shifted across revisions of this system and will again.

use serde::{Deserialize, Serialize};

use vigil_core::{Evidence, Playbook, RetryPolicy, ServiceStatus};

use crate::flow::{build_run_context, FlowInputs, RunContext};

/// Name of this engine as the healing-request originator.
pub const SOURCE_FUNCTION: &str = "vigil/monitor";

/// Maps one monitored service onto a self-healing domain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealingRule {
    /// Service name fragment to match (normalized containment).
    pub service: String,
    /// Failure domain, e.g. `"gateway-bridge"`.
    pub domain: String,
    /// Component the healing handler should act on.
    pub target_component: String,
    /// Event name the handler listens for.
    pub target_event: String,
    /// Human owner notified when the playbook is exhausted.
    pub owner: String,
}

impl HealingRule {
    /// Whether this rule covers the given degraded service.
    pub fn matches(&self, service_name: &str) -> bool {
        service_name
            .to_lowercase()
            .contains(&self.service.to_lowercase())
    }
}

/// Built-in allowlist: the external-gateway bridge and its coordination
/// store. Overridable from daemon configuration.
pub fn default_rules() -> Vec<HealingRule> {
    vec![
        HealingRule {
            service: "gateway".to_string(),
            domain: "gateway-bridge".to_string(),
            target_component: "gateway-bridge".to_string(),
            target_event: "heal/gateway-bridge".to_string(),
            owner: "infra".to_string(),
        },
        HealingRule {
            service: "redis".to_string(),
            domain: "gateway-bridge".to_string(),
            target_component: "redis".to_string(),
            target_event: "heal/gateway-bridge".to_string(),
            owner: "infra".to_string(),
        },
    ]
}

/// An evidence-bearing request for automated remediation.
///
/// Created fresh per dispatch, never mutated after construction; the
/// external handler owns the retry loop using the embedded policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelfHealingRequest {
    pub source_function: String,
    pub target_component: String,
    pub target_event_name: String,
    pub problem_summary: String,
    pub domain: String,
    pub attempt: u32,
    pub reason: String,
    pub evidence: Vec<Evidence>,
    pub playbook: Playbook,
    pub retry_policy: RetryPolicy,
    pub run_context: RunContext,
}

/// The outbound event envelope consumed by the self-healing handler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutboundHealingEvent {
    #[serde(flatten)]
    pub request: SelfHealingRequest,
    pub owner: String,
    /// What to do when remediation is exhausted.
    pub fallback_action: String,
    pub requested_by: String,
    pub dry_run: bool,
}

/// Build a healing request for a rule-covered degraded service.
///
/// Evidence comes from the triggering status plus any co-degraded
/// services the same rule covers. `attempt` starts at 0; the handler
/// increments it on its own retries.
pub fn build_request(
    rule: &HealingRule,
    trigger: &ServiceStatus,
    all_degraded: &[ServiceStatus],
    run_event_name: &str,
    source_event_id: Option<&str>,
) -> SelfHealingRequest {
    let mut evidence = vec![probe_evidence(trigger)];
    for status in all_degraded {
        if status.name != trigger.name && rule.matches(&status.name) {
            evidence.push(probe_evidence(status));
        }
    }

    let problem_summary = format!(
        "{} probe failing: {}",
        trigger.name,
        trigger.detail.as_deref().unwrap_or("no detail")
    );

    let run_context = build_run_context(
        &FlowInputs {
            event_name: run_event_name,
            source_function: SOURCE_FUNCTION,
            target_component: &rule.target_component,
            domain: &rule.domain,
            target_event_name: &rule.target_event,
            attempt: 0,
            evidence_count: evidence.len(),
        },
        source_event_id,
    );

    SelfHealingRequest {
        source_function: SOURCE_FUNCTION.to_string(),
        target_component: rule.target_component.clone(),
        target_event_name: rule.target_event.clone(),
        problem_summary,
        domain: rule.domain.clone(),
        attempt: 0,
        reason: format!("health probe failure in domain {}", rule.domain),
        evidence,
        playbook: default_playbook(rule),
        retry_policy: RetryPolicy::default(),
        run_context,
    }
}

/// Wrap a request in the outbound envelope.
pub fn into_outbound(request: SelfHealingRequest, rule: &HealingRule) -> OutboundHealingEvent {
    OutboundHealingEvent {
        owner: rule.owner.clone(),
        fallback_action: format!("notify {}", rule.owner),
        requested_by: SOURCE_FUNCTION.to_string(),
        dry_run: false,
        request,
    }
}

fn probe_evidence(status: &ServiceStatus) -> Evidence {
    Evidence::new(
        "probe_failure",
        format!(
            "{}: {}",
            status.name,
            status.detail.as_deref().unwrap_or("probe failed")
        ),
    )
}

fn default_playbook(rule: &HealingRule) -> Playbook {
    Playbook {
        actions: vec![
            format!("inspect recent {} logs", rule.target_component),
            format!("restart {}", rule.target_component),
            "verify the probe recovers on the next heartbeat".to_string(),
        ],
        restart: Some(format!("systemctl --user restart {}", rule.target_component)),
        kill: Some(format!("systemctl --user kill {}", rule.target_component)),
        defer: Some("leave for the next heartbeat run".to_string()),
        notify: Some(rule.owner.clone()),
        links: Vec::new(),
    }
}

//! Concurrent probe executor.
//!
//! Every registered probe runs on its own `JoinSet` task under its own
//! timeout. An optional overall budget bounds the whole batch: when it
//! elapses, still-running probes are abandoned and reported as cancelled
//! partial results rather than stalling the run.

use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tracing::{debug, warn};

use vigil_core::ServiceStatus;

use crate::probe::{ProbeOutcome, ProbeSpec};

/// Execute all probes concurrently and collect one status per probe.
///
/// Output order is unspecified; identity is by `name`.
pub async fn run_probes(specs: &[ProbeSpec], budget: Option<Duration>) -> Vec<ServiceStatus> {
    let mut set = JoinSet::new();
    for spec in specs {
        let spec = spec.clone();
        set.spawn(async move { execute_one(&spec).await });
    }

    let mut results: Vec<ServiceStatus> = Vec::with_capacity(specs.len());
    let collect = async {
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(status) => results.push(status),
                // A panicking probe is contained here; the missing name is
                // backfilled below.
                Err(e) => warn!(error = %e, "probe task failed to join"),
            }
        }
    };

    let deadline_hit = match budget {
        Some(budget) => tokio::time::timeout(budget, collect).await.is_err(),
        None => {
            collect.await;
            false
        }
    };
    set.abort_all();

    // Backfill specs that produced no result (aborted or panicked).
    for spec in specs {
        if !results.iter().any(|s| s.name == spec.name) {
            let detail = if deadline_hit {
                "cancelled: run budget exceeded"
            } else {
                "probe task failed"
            };
            results.push(ServiceStatus::failed(spec.name.clone(), detail, None));
        }
    }

    if deadline_hit {
        warn!(probes = specs.len(), "probe batch hit overall budget");
    }
    results
}

/// Run one probe under its own timeout and convert to a `ServiceStatus`.
async fn execute_one(spec: &ProbeSpec) -> ServiceStatus {
    let started = Instant::now();
    let outcome = tokio::time::timeout(spec.timeout(), spec.check()).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(ProbeOutcome::Pass) => {
            debug!(probe = %spec.name, elapsed_ms, "probe ok");
            ServiceStatus::ok(spec.name.clone(), elapsed_ms)
        }
        Ok(ProbeOutcome::Fail(detail)) => {
            debug!(probe = %spec.name, %detail, elapsed_ms, "probe failed");
            ServiceStatus::failed(spec.name.clone(), detail, Some(elapsed_ms))
        }
        Err(_) => {
            debug!(probe = %spec.name, timeout_ms = spec.timeout_ms, "probe timed out");
            ServiceStatus::failed(
                spec.name.clone(),
                format!("timed out after {}ms", spec.timeout_ms),
                Some(elapsed_ms),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Accepts connections but never answers, so HTTP probes hang until
    /// their timeout.
    async fn spawn_black_hole() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let mut held = Vec::new();
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    break;
                };
                held.push(socket);
            }
        });
        addr
    }

    fn with_timeout(mut spec: ProbeSpec, timeout_ms: u64) -> ProbeSpec {
        spec.timeout_ms = timeout_ms;
        spec
    }

    #[tokio::test]
    async fn empty_registry_yields_no_results() {
        let results = run_probes(&[], None).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn one_failure_does_not_block_others() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let live = listener.local_addr().unwrap().to_string();

        let specs = vec![
            ProbeSpec::tcp("Alive", &live),
            ProbeSpec::tcp("Dead", "127.0.0.1:1"),
        ];
        let results = run_probes(&specs, None).await;

        assert_eq!(results.len(), 2);
        let alive = results.iter().find(|s| s.name == "Alive").unwrap();
        let dead = results.iter().find(|s| s.name == "Dead").unwrap();
        assert!(alive.ok);
        assert!(!dead.ok);
        assert!(dead.detail.is_some());
    }

    #[tokio::test]
    async fn hanging_probe_times_out_individually() {
        let hole = spawn_black_hole().await;
        let specs = vec![with_timeout(ProbeSpec::http("Stuck", &hole, "/healthz"), 100)];

        let results = run_probes(&specs, None).await;
        assert_eq!(results.len(), 1);
        assert!(!results[0].ok);
        assert!(results[0].detail.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn probes_run_concurrently_not_sequentially() {
        let hole = spawn_black_hole().await;
        let specs: Vec<ProbeSpec> = (0..4)
            .map(|i| with_timeout(ProbeSpec::http(&format!("Stuck-{i}"), &hole, "/"), 300))
            .collect();

        let started = Instant::now();
        let results = run_probes(&specs, None).await;
        let elapsed = started.elapsed();

        assert_eq!(results.len(), 4);
        // Sequential execution would take ~1200ms.
        assert!(
            elapsed < Duration::from_millis(900),
            "probes appear to run sequentially: {elapsed:?}"
        );
    }

    #[tokio::test]
    async fn budget_abandons_stragglers_as_cancelled() {
        let hole = spawn_black_hole().await;
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let live = listener.local_addr().unwrap().to_string();

        let specs = vec![
            ProbeSpec::tcp("Fast", &live),
            // Would need 5s to time out on its own; the 300ms batch budget
            // cuts it off first.
            with_timeout(ProbeSpec::http("Slow", &hole, "/"), 5_000),
        ];
        let results = run_probes(&specs, Some(Duration::from_millis(300))).await;

        assert_eq!(results.len(), 2);
        let fast = results.iter().find(|s| s.name == "Fast").unwrap();
        let slow = results.iter().find(|s| s.name == "Slow").unwrap();
        assert!(fast.ok);
        assert!(!slow.ok);
        assert!(slow.detail.as_deref().unwrap().contains("cancelled"));
    }

    #[tokio::test]
    async fn every_spec_gets_exactly_one_status() {
        let specs = vec![
            ProbeSpec::tcp("A", "127.0.0.1:1"),
            ProbeSpec::tcp("B", "127.0.0.1:1"),
            ProbeSpec::tcp("C", "127.0.0.1:1"),
        ];
        let results = run_probes(&specs, None).await;
        let names: HashSet<&str> = results.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names.len(), 3);
        assert_eq!(results.len(), 3);
    }
}

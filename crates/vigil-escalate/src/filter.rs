//! Degradation filter — drop problems a tracking item already covers.
//!
//! A human or automation has already opened an item for "Redis outage
//! investigation"; re-raising "Redis down" every run is noise. Only
//! degraded services with no matching tracked item pass through.

use tracing::warn;

use vigil_core::ServiceStatus;

use crate::sinks::{TaskTracker, TrackedTask};

/// Whether any tracked task title mentions the service name
/// (normalized containment).
pub fn matches_any(tasks: &[TrackedTask], name: &str) -> bool {
    let needle = name.trim().to_lowercase();
    if needle.is_empty() {
        return false;
    }
    tasks.iter().any(|t| t.title.to_lowercase().contains(&needle))
}

/// Split the degraded set into (untracked, already_tracked_count).
///
/// If the task system is unreachable the whole set passes through —
/// over-notifying beats suppressing alerts on a tracker outage.
pub async fn filter_untracked(
    tracker: &dyn TaskTracker,
    degraded: Vec<ServiceStatus>,
) -> (Vec<ServiceStatus>, usize) {
    if degraded.is_empty() {
        return (degraded, 0);
    }
    let tasks = match tracker.open_tasks().await {
        Ok(tasks) => tasks,
        Err(e) => {
            warn!(error = %e, "task tracker unreachable, treating all degradations as new");
            return (degraded, 0);
        }
    };

    let mut untracked = Vec::new();
    let mut tracked = 0usize;
    for status in degraded {
        if matches_any(&tasks, &status.name) {
            tracked += 1;
        } else {
            untracked.push(status);
        }
    }
    (untracked, tracked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::SinkFuture;

    struct CannedTracker(Vec<TrackedTask>);

    impl TaskTracker for CannedTracker {
        fn open_tasks(&self) -> SinkFuture<'_, Vec<TrackedTask>> {
            let tasks = self.0.clone();
            Box::pin(async move { Ok(tasks) })
        }
    }

    struct BrokenTracker;

    impl TaskTracker for BrokenTracker {
        fn open_tasks(&self) -> SinkFuture<'_, Vec<TrackedTask>> {
            Box::pin(async { Err(anyhow::anyhow!("tracker down")) })
        }
    }

    fn task(title: &str) -> TrackedTask {
        TrackedTask {
            id: "t-1".to_string(),
            title: title.to_string(),
        }
    }

    fn degraded(name: &str) -> ServiceStatus {
        ServiceStatus::failed(name, "connection refused", Some(10))
    }

    #[test]
    fn containment_match_is_case_insensitive() {
        let tasks = vec![task("Redis outage investigation")];
        assert!(matches_any(&tasks, "Redis"));
        assert!(matches_any(&tasks, "redis"));
        assert!(!matches_any(&tasks, "Gateway"));
    }

    #[test]
    fn empty_name_never_matches() {
        let tasks = vec![task("anything at all")];
        assert!(!matches_any(&tasks, ""));
        assert!(!matches_any(&tasks, "   "));
    }

    #[tokio::test]
    async fn tracked_service_is_filtered_out() {
        let tracker = CannedTracker(vec![task("Redis outage investigation")]);
        let (untracked, tracked) = filter_untracked(&tracker, vec![degraded("Redis")]).await;
        assert!(untracked.is_empty());
        assert_eq!(tracked, 1);
    }

    #[tokio::test]
    async fn untracked_service_passes_through() {
        let tracker = CannedTracker(vec![task("Redis outage investigation")]);
        let (untracked, tracked) =
            filter_untracked(&tracker, vec![degraded("Redis"), degraded("Gateway")]).await;
        assert_eq!(untracked.len(), 1);
        assert_eq!(untracked[0].name, "Gateway");
        assert_eq!(tracked, 1);
    }

    #[tokio::test]
    async fn empty_degraded_set_skips_tracker_call() {
        let (untracked, tracked) = filter_untracked(&BrokenTracker, Vec::new()).await;
        assert!(untracked.is_empty());
        assert_eq!(tracked, 0);
    }

    #[tokio::test]
    async fn tracker_failure_fails_open() {
        let (untracked, tracked) = filter_untracked(&BrokenTracker, vec![degraded("Redis")]).await;
        assert_eq!(untracked.len(), 1);
        assert_eq!(tracked, 0);
    }
}

//! Production adapters for the escalation seams.
//!
//! Personal-infra flavored: the dashboard is the store's status board
//! table, telemetry appends to the embedded event stream, notifications
//! go out as structured log records the gateway bridge tails, healing
//! requests spool to a JSONL outbox, and tracked tasks load from a JSON
//! file.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use vigil_state::{BoardEntry, ComponentHealth, MonitorStore, TelemetryEvent};

use crate::healing::OutboundHealingEvent;
use crate::sinks::{
    DashboardSink, EmitReceipt, HealingOutbound, NotifyChannel, NotifyLevel, NotifyPayload,
    SinkFuture, TaskTracker, TelemetrySink, TrackedTask,
};

fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

// ── Dashboard: status board table ─────────────────────────────────

/// Pushes per-service status into the store's board table.
pub struct BoardDashboard {
    store: MonitorStore,
}

impl BoardDashboard {
    pub fn new(store: MonitorStore) -> Self {
        Self { store }
    }
}

impl DashboardSink for BoardDashboard {
    fn push_status<'a>(
        &'a self,
        component: &'a str,
        health: ComponentHealth,
        detail: Option<&'a str>,
    ) -> SinkFuture<'a, ()> {
        Box::pin(async move {
            self.store.put_board_entry(&BoardEntry {
                component: component.to_string(),
                health,
                detail: detail.map(str::to_string),
                updated_at_ms: epoch_ms(),
            })?;
            Ok(())
        })
    }
}

// ── Telemetry: embedded event stream ──────────────────────────────

/// Appends telemetry events to the store's event table.
pub struct StoreTelemetry {
    store: MonitorStore,
}

impl StoreTelemetry {
    pub fn new(store: MonitorStore) -> Self {
        Self { store }
    }
}

impl TelemetrySink for StoreTelemetry {
    fn emit<'a>(&'a self, event: &'a TelemetryEvent) -> SinkFuture<'a, EmitReceipt> {
        Box::pin(async move {
            self.store.append_event(event)?;
            Ok(EmitReceipt { stored: true })
        })
    }
}

// ── Notification: structured log stream ───────────────────────────

/// Emits notifications as structured log records for the gateway bridge
/// to tail.
pub struct LogNotifier;

impl NotifyChannel for LogNotifier {
    fn notify<'a>(&'a self, payload: &'a NotifyPayload) -> SinkFuture<'a, ()> {
        Box::pin(async move {
            match payload.level {
                NotifyLevel::Info => {
                    info!(kind = %payload.kind, immediate = payload.immediate, prompt = %payload.prompt, "notification")
                }
                NotifyLevel::Warn | NotifyLevel::Critical => {
                    warn!(kind = %payload.kind, level = ?payload.level, immediate = payload.immediate, prompt = %payload.prompt, "notification")
                }
            }
            Ok(())
        })
    }
}

// ── Self-healing outbox: JSONL spool ──────────────────────────────

/// Appends outbound healing events to a JSONL spool file consumed by
/// the external handler.
pub struct JsonlOutbox {
    path: PathBuf,
}

impl JsonlOutbox {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl HealingOutbound for JsonlOutbox {
    fn send<'a>(&'a self, event: &'a OutboundHealingEvent) -> SinkFuture<'a, ()> {
        Box::pin(async move {
            let mut line = serde_json::to_vec(event)?;
            line.push(b'\n');
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await?;
            file.write_all(&line).await?;
            file.flush().await?;
            Ok(())
        })
    }
}

// ── Task tracker: JSON file ───────────────────────────────────────

/// Reads open tracking items from a JSON file; a missing file means
/// no tracked problems.
pub struct JsonTaskFile {
    path: PathBuf,
}

impl JsonTaskFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TaskTracker for JsonTaskFile {
    fn open_tasks(&self) -> SinkFuture<'_, Vec<TrackedTask>> {
        Box::pin(async move {
            let raw = match tokio::fs::read(&self.path).await {
                Ok(raw) => raw,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => return Err(e.into()),
            };
            Ok(serde_json::from_slice(&raw)?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::ServiceStatus;

    use crate::healing::{build_request, default_rules, into_outbound};

    #[tokio::test]
    async fn board_dashboard_writes_through_to_store() {
        let store = MonitorStore::open_in_memory().unwrap();
        let dashboard = BoardDashboard::new(store.clone());

        dashboard
            .push_status("Gateway", ComponentHealth::Down, Some("refused"))
            .await
            .unwrap();
        dashboard
            .push_status("Gateway", ComponentHealth::Healthy, None)
            .await
            .unwrap();

        let entry = store.get_board_entry("Gateway").unwrap().unwrap();
        assert_eq!(entry.health, ComponentHealth::Healthy);
        assert_eq!(entry.detail, None);
    }

    #[tokio::test]
    async fn store_telemetry_appends_and_acknowledges() {
        let store = MonitorStore::open_in_memory().unwrap();
        let sink = StoreTelemetry::new(store.clone());

        let receipt = sink
            .emit(&TelemetryEvent::ok(1_000, "monitor", "run"))
            .await
            .unwrap();
        assert!(receipt.stored);
        assert_eq!(store.events_since(0).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn outbox_appends_one_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("healing-outbox.jsonl");
        let outbox = JsonlOutbox::new(&path);

        let rule = &default_rules()[0];
        let trigger = ServiceStatus::failed("Gateway", "down", None);
        let event = into_outbound(
            build_request(rule, &trigger, &[], "monitor/heartbeat", None),
            rule,
        );
        outbox.send(&event).await.unwrap();
        outbox.send(&event).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: OutboundHealingEvent = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.request.domain, "gateway-bridge");
    }

    #[tokio::test]
    async fn missing_task_file_means_no_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = JsonTaskFile::new(dir.path().join("absent.json"));
        assert!(tracker.open_tasks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn task_file_parses_tracked_items() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        std::fs::write(
            &path,
            r#"[{"id": "t-1", "title": "Redis outage investigation"}]"#,
        )
        .unwrap();

        let tracker = JsonTaskFile::new(&path);
        let tasks = tracker.open_tasks().await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert!(crate::filter::matches_any(&tasks, "Redis"));
    }

    #[tokio::test]
    async fn malformed_task_file_is_an_error_not_a_panic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        std::fs::write(&path, "not json").unwrap();

        let tracker = JsonTaskFile::new(&path);
        assert!(tracker.open_tasks().await.is_err());
    }

    #[tokio::test]
    async fn log_notifier_accepts_all_levels() {
        for level in [NotifyLevel::Info, NotifyLevel::Warn, NotifyLevel::Critical] {
            LogNotifier
                .notify(&NotifyPayload {
                    kind: "health-alert".to_string(),
                    prompt: "❌ Gateway — down".to_string(),
                    level,
                    immediate: level == NotifyLevel::Critical,
                })
                .await
                .unwrap();
        }
    }
}

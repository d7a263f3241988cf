//! Event-source seam for the analyzers.
//!
//! The monitor store implements it directly; tests inject canned or
//! failing sources.

use std::future::Future;
use std::pin::Pin;

use vigil_state::{MonitorStore, TelemetryEvent};

/// Boxed future returned by [`EventSource::events_since`].
pub type EventsFuture<'a> =
    Pin<Box<dyn Future<Output = anyhow::Result<Vec<TelemetryEvent>>> + Send + 'a>>;

/// Read-only view of the telemetry event stream.
pub trait EventSource: Send + Sync {
    /// All events with `epoch_ms >= since_epoch_ms`, oldest first.
    fn events_since(&self, since_epoch_ms: u64) -> EventsFuture<'_>;
}

impl EventSource for MonitorStore {
    fn events_since(&self, since_epoch_ms: u64) -> EventsFuture<'_> {
        Box::pin(async move { Ok(MonitorStore::events_since(self, since_epoch_ms)?) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_implements_event_source() {
        let store = MonitorStore::open_in_memory().unwrap();
        store
            .append_event(&TelemetryEvent::ok(5_000, "monitor", "run"))
            .unwrap();

        let source: &dyn EventSource = &store;
        let events = source.events_since(0).await.unwrap();
        assert_eq!(events.len(), 1);
        assert!(source.events_since(6_000).await.unwrap().is_empty());
    }
}

//! MonitorStore — redb-backed persistence for Vigil.
//!
//! Provides typed operations over cooldown claims, the telemetry event
//! stream, and the status board. All values are JSON-serialized into
//! redb's `&[u8]` value columns. The store supports both on-disk and
//! in-memory backends (the latter for testing).
//!
//! redb serializes write transactions, so the read-check-insert inside
//! [`MonitorStore::claim_if_absent`] is a true atomic check-and-set:
//! two concurrent claims on the same key can never both succeed.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe monitor store backed by redb.
#[derive(Clone)]
pub struct MonitorStore {
    db: Arc<Database>,
    /// Tie-breaker for events sharing an epoch millisecond.
    event_seq: Arc<AtomicU64>,
}

impl MonitorStore {
    /// Open (or create) a persistent store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self {
            db: Arc::new(db),
            event_seq: Arc::new(AtomicU64::new(0)),
        };
        store.ensure_tables()?;
        debug!(?path, "monitor store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self {
            db: Arc::new(db),
            event_seq: Arc::new(AtomicU64::new(0)),
        };
        store.ensure_tables()?;
        debug!("in-memory monitor store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(COOLDOWNS).map_err(map_err!(Table))?;
        txn.open_table(EVENTS).map_err(map_err!(Table))?;
        txn.open_table(BOARD).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Cooldown claims ────────────────────────────────────────────

    /// Atomically claim `key` for `ttl_secs` if no unexpired claim exists.
    ///
    /// Returns `true` if the claim was granted (caller may notify) or
    /// `false` if another claim owns the window. Expired claims are
    /// replaced in the same transaction.
    pub fn claim_if_absent(&self, key: &str, ttl_secs: u64, now_ms: u64) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let granted;
        {
            let mut table = txn.open_table(COOLDOWNS).map_err(map_err!(Table))?;

            let existing = match table.get(key).map_err(map_err!(Read))? {
                Some(guard) => {
                    let record: ClaimRecord = serde_json::from_slice(guard.value())
                        .map_err(map_err!(Deserialize))?;
                    Some(record)
                }
                None => None,
            };

            granted = match existing {
                Some(record) if !record.is_expired(now_ms) => false,
                _ => {
                    let record = ClaimRecord {
                        claimed_at_ms: now_ms,
                        expires_at_ms: now_ms + ttl_secs * 1_000,
                    };
                    let value = serde_json::to_vec(&record).map_err(map_err!(Serialize))?;
                    table
                        .insert(key, value.as_slice())
                        .map_err(map_err!(Write))?;
                    true
                }
            };
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, granted, "cooldown claim attempted");
        Ok(granted)
    }

    /// Look at the current claim for `key`, if any unexpired one exists.
    pub fn peek_claim(&self, key: &str, now_ms: u64) -> StateResult<Option<ClaimRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(COOLDOWNS).map_err(map_err!(Table))?;
        match table.get(key).map_err(map_err!(Read))? {
            Some(guard) => {
                let record: ClaimRecord =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(record).filter(|r| !r.is_expired(now_ms)))
            }
            None => Ok(None),
        }
    }

    /// Delete a claim. Returns true if one existed.
    ///
    /// Used by recovery transitions: clearing a "down" claim the moment
    /// the component recovers lets the next failure re-alert immediately.
    pub fn release_claim(&self, key: &str) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(COOLDOWNS).map_err(map_err!(Table))?;
            existed = table.remove(key).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, existed, "cooldown claim released");
        Ok(existed)
    }

    // ── Telemetry events ───────────────────────────────────────────

    /// Append an event to the telemetry stream.
    pub fn append_event(&self, event: &TelemetryEvent) -> StateResult<()> {
        let seq = self.event_seq.fetch_add(1, Ordering::Relaxed);
        let key = format!("{:013}:{:06}", event.epoch_ms, seq);
        let value = serde_json::to_vec(event).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(EVENTS).map_err(map_err!(Table))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// List all events with `epoch_ms >= since_epoch_ms`, oldest first.
    pub fn events_since(&self, since_epoch_ms: u64) -> StateResult<Vec<TelemetryEvent>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(EVENTS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let event: TelemetryEvent =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            if event.epoch_ms >= since_epoch_ms {
                results.push(event);
            }
        }
        Ok(results)
    }

    /// Delete events older than `before_epoch_ms`. Returns how many were removed.
    pub fn prune_events_before(&self, before_epoch_ms: u64) -> StateResult<usize> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let mut removed = 0;
        {
            let mut table = txn.open_table(EVENTS).map_err(map_err!(Table))?;
            let stale: Vec<String> = {
                let mut keys = Vec::new();
                for entry in table.iter().map_err(map_err!(Read))? {
                    let (key, value) = entry.map_err(map_err!(Read))?;
                    let event: TelemetryEvent =
                        serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                    if event.epoch_ms < before_epoch_ms {
                        keys.push(key.value().to_string());
                    }
                }
                keys
            };
            for key in stale {
                table.remove(key.as_str()).map_err(map_err!(Write))?;
                removed += 1;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(removed, "pruned telemetry events");
        Ok(removed)
    }

    // ── Status board ───────────────────────────────────────────────

    /// Insert or update a status board entry.
    pub fn put_board_entry(&self, entry: &BoardEntry) -> StateResult<()> {
        let value = serde_json::to_vec(entry).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(BOARD).map_err(map_err!(Table))?;
            table
                .insert(entry.component.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(component = %entry.component, health = ?entry.health, "board entry stored");
        Ok(())
    }

    /// Get the board entry for a component.
    pub fn get_board_entry(&self, component: &str) -> StateResult<Option<BoardEntry>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(BOARD).map_err(map_err!(Table))?;
        match table.get(component).map_err(map_err!(Read))? {
            Some(guard) => {
                let entry: BoardEntry =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// List all board entries.
    pub fn list_board(&self) -> StateResult<Vec<BoardEntry>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(BOARD).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let board: BoardEntry =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(board);
        }
        Ok(results)
    }
}

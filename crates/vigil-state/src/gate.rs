//! Cooldown gate — at-most-once-per-window claim primitive.
//!
//! Wraps a [`ClaimStore`] and adds the notification policy: a granted
//! claim means "you may notify now"; a denied claim means another
//! notification already owns the window. If the store itself is
//! unreachable the gate fails **open** — over-notifying beats silently
//! suppressing every future alert.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::warn;

use crate::error::StateResult;
use crate::store::MonitorStore;

/// Storage seam for cooldown claims. The monitor store implements it;
/// tests inject failing or counting stand-ins.
pub trait ClaimStore: Send + Sync {
    /// Atomically set `key` with TTL `ttl_secs` if absent/expired.
    /// Returns whether the claim was granted.
    fn claim_if_absent(&self, key: &str, ttl_secs: u64, now_ms: u64) -> StateResult<bool>;

    /// Remove a claim. Returns true if one existed.
    fn release_claim(&self, key: &str) -> StateResult<bool>;
}

impl ClaimStore for MonitorStore {
    fn claim_if_absent(&self, key: &str, ttl_secs: u64, now_ms: u64) -> StateResult<bool> {
        MonitorStore::claim_if_absent(self, key, ttl_secs, now_ms)
    }

    fn release_claim(&self, key: &str) -> StateResult<bool> {
        MonitorStore::release_claim(self, key)
    }
}

/// The cooldown gate used by the dispatcher and orchestrator.
#[derive(Clone)]
pub struct CooldownGate {
    store: Arc<dyn ClaimStore>,
}

impl CooldownGate {
    pub fn new(store: Arc<dyn ClaimStore>) -> Self {
        Self { store }
    }

    /// Claim `key` for `window_secs`. Returns `true` when the caller may
    /// proceed to notify. Fails open on store errors.
    pub fn claim(&self, key: &str, window_secs: u64) -> bool {
        match self.store.claim_if_absent(key, window_secs, epoch_ms()) {
            Ok(granted) => granted,
            Err(e) => {
                warn!(%key, error = %e, "cooldown store unreachable, failing open");
                true
            }
        }
    }

    /// Release `key` so the next failure re-alerts immediately.
    /// Returns whether a claim existed. Errors are logged and swallowed.
    pub fn release(&self, key: &str) -> bool {
        match self.store.release_claim(key) {
            Ok(existed) => existed,
            Err(e) => {
                warn!(%key, error = %e, "cooldown release failed");
                false
            }
        }
    }
}

fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StateError;

    /// Store stand-in whose operations always fail.
    struct BrokenStore;

    impl ClaimStore for BrokenStore {
        fn claim_if_absent(&self, _key: &str, _ttl: u64, _now: u64) -> StateResult<bool> {
            Err(StateError::Transaction("store down".to_string()))
        }

        fn release_claim(&self, _key: &str) -> StateResult<bool> {
            Err(StateError::Transaction("store down".to_string()))
        }
    }

    #[test]
    fn claim_and_suppress_through_real_store() {
        let gate = CooldownGate::new(Arc::new(MonitorStore::open_in_memory().unwrap()));
        assert!(gate.claim("signal:error-rate", 3_600));
        assert!(!gate.claim("signal:error-rate", 3_600));
    }

    #[test]
    fn release_reopens_window() {
        let gate = CooldownGate::new(Arc::new(MonitorStore::open_in_memory().unwrap()));
        assert!(gate.claim("down:Gateway", 3_600));
        assert!(gate.release("down:Gateway"));
        assert!(gate.claim("down:Gateway", 3_600));
    }

    #[test]
    fn release_of_absent_key_is_false() {
        let gate = CooldownGate::new(Arc::new(MonitorStore::open_in_memory().unwrap()));
        assert!(!gate.release("down:Gateway"));
    }

    #[test]
    fn broken_store_fails_open() {
        let gate = CooldownGate::new(Arc::new(BrokenStore));
        // Every claim is granted rather than suppressing all alerts.
        assert!(gate.claim("signal:error-rate", 3_600));
        assert!(gate.claim("signal:error-rate", 3_600));
        assert!(!gate.release("signal:error-rate"));
    }
}

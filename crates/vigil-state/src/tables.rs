//! redb table definitions for the Vigil store.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized domain
//! types). Event keys are zero-padded `{epoch_ms}:{seq}` so lexicographic
//! order equals chronological order.

use redb::TableDefinition;

/// Cooldown claims keyed by claim key (e.g. `down:Redis`).
pub const COOLDOWNS: TableDefinition<&str, &[u8]> = TableDefinition::new("cooldowns");

/// Telemetry events keyed by `{epoch_ms:013}:{seq:06}`.
pub const EVENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("events");

/// Status board entries keyed by component name.
pub const BOARD: TableDefinition<&str, &[u8]> = TableDefinition::new("board");

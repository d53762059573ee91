//! The process-wide sync cursor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The only key the `sync_state` table accepts.
pub const SYNC_STATE_ID: i64 = 1;

/// Singleton row recording when the last successful sync finished.
///
/// Created once with `last_sync = None` when the schema is initialised and
/// updated in place after every successful cycle. There is never a second
/// instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
  pub last_sync: Option<DateTime<Utc>>,
}

impl SyncState {
  pub fn has_synced(&self) -> bool { self.last_sync.is_some() }
}

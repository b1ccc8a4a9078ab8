//! Derived contact statistics — never stored, always computed server-side.

use serde::{Deserialize, Serialize};

/// Aggregate counters over a set of contacts: one bucket per status, the
/// unread count, and a trailing 30-day submission count.
///
/// Clients treat these as authoritative; the dashboard re-fetches them after
/// update/delete events rather than re-deriving them locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContactStats {
  pub total:        u64,
  pub new:          u64,
  pub read:         u64,
  pub replied:      u64,
  pub archived:     u64,
  pub unread:       u64,
  #[serde(rename = "last30Days")]
  pub last_30_days: u64,
}

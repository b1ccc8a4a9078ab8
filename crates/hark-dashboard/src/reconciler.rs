//! The dashboard reconciler — keeps the local contact list and stats summary
//! consistent with server state.
//!
//! Push events apply incrementally while the channel is up; a repeating full
//! re-fetch covers every gap while it is down. The machine is sans-IO: each
//! input returns the [`Effect`]s the driver must perform (fetches, timer
//! starts/stops, room announcements), so the contract is fully testable
//! without a transport.
//!
//! States:
//! - **Disconnected** (initial): an immediate full re-fetch plus a repeating
//!   poll timer until a push channel connects.
//! - **Connected**: the timer is cancelled (exactly once — starts and stops
//!   are idempotent), the account room is joined, and envelopes apply
//!   incrementally. On channel loss the timer resumes immediately; the next
//!   successful full re-fetch is the source of truth that heals any gap.

use std::time::Duration;

use hark_core::{
  contact::Contact,
  event::{ContactChange, ContactEvent},
  stats::ContactStats,
};
use uuid::Uuid;

/// Fixed fallback polling interval.
pub const POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Push-channel state, surfaced in the UI as Live/Offline. Channel failures
/// are never shown as errors — polling quietly carries the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
  Disconnected,
  Connected,
}

/// Work the driver performs on the reconciler's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
  /// Fetch the full list and stats; feed the result to
  /// [`Reconciler::apply_refetch`].
  Refetch,
  /// Fetch only the stats in the background; feed the result to
  /// [`Reconciler::apply_stats`]. Stats are server-derived aggregates —
  /// re-fetching beats re-deriving them locally per status permutation.
  RefetchStats,
  /// Announce the account id on the push channel to join its room.
  JoinAccount(Option<Uuid>),
  /// Start the repeating poll timer at [`POLL_INTERVAL`].
  StartPolling,
  /// Cancel the poll timer.
  StopPolling,
}

pub struct Reconciler {
  channel:    Channel,
  /// Timer guard: a start is only emitted when stopped and vice versa, so a
  /// duplicate timer (which would double the polling rate) cannot arise.
  polling:    bool,
  account_id: Option<Uuid>,

  pub contacts: Vec<Contact>,
  pub stats:    ContactStats,
}

impl Reconciler {
  /// A fresh dashboard in the Disconnected state: re-fetch immediately and
  /// begin polling.
  pub fn new(account_id: Option<Uuid>) -> (Self, Vec<Effect>) {
    let reconciler = Self {
      channel: Channel::Disconnected,
      polling: true,
      account_id,
      contacts: Vec::new(),
      stats: ContactStats::default(),
    };
    (reconciler, vec![Effect::Refetch, Effect::StartPolling])
  }

  pub fn channel(&self) -> Channel { self.channel }

  pub fn is_live(&self) -> bool { self.channel == Channel::Connected }

  // ── Channel transitions ───────────────────────────────────────────────────

  /// Push channel established: stop polling, join the account room.
  pub fn on_connected(&mut self) -> Vec<Effect> {
    if self.channel == Channel::Connected {
      return Vec::new();
    }
    self.channel = Channel::Connected;

    let mut effects = Vec::new();
    if self.polling {
      self.polling = false;
      effects.push(Effect::StopPolling);
    }
    effects.push(Effect::JoinAccount(self.account_id));
    effects
  }

  /// Channel lost: resume polling immediately. Missed events are not
  /// replayed; the next full re-fetch heals the gap.
  pub fn on_disconnected(&mut self) -> Vec<Effect> {
    if self.channel == Channel::Disconnected {
      return Vec::new();
    }
    self.channel = Channel::Disconnected;

    if self.polling {
      Vec::new()
    } else {
      self.polling = true;
      vec![Effect::StartPolling]
    }
  }

  /// The poll timer fired.
  pub fn on_poll_tick(&self) -> Vec<Effect> {
    if self.polling {
      vec![Effect::Refetch]
    } else {
      Vec::new()
    }
  }

  // ── Fetch results ─────────────────────────────────────────────────────────

  /// A completed full re-fetch replaces local state wholesale.
  pub fn apply_refetch(&mut self, contacts: Vec<Contact>, stats: ContactStats) {
    self.contacts = contacts;
    self.stats = stats;
  }

  /// A completed background stats re-fetch.
  pub fn apply_stats(&mut self, stats: ContactStats) {
    self.stats = stats;
  }

  // ── Incremental apply ─────────────────────────────────────────────────────

  /// Apply one pushed envelope (Connected state).
  pub fn apply_event(&mut self, event: &ContactEvent) -> Vec<Effect> {
    match &event.change {
      ContactChange::Created { contact } => {
        // Can race with this client's own optimistic insert: dedupe by id.
        let exists = self
          .contacts
          .iter()
          .any(|c| c.contact_id == contact.contact_id);
        if !exists {
          self.contacts.insert(0, contact.clone());
          self.stats.total += 1;
          self.stats.new += 1;
          self.stats.last_30_days += 1;
        }
        Vec::new()
      }
      ContactChange::Updated { contact } => {
        // The pushed representation is authoritative: replace the whole
        // record rather than patching fields.
        if let Some(existing) = self
          .contacts
          .iter_mut()
          .find(|c| c.contact_id == contact.contact_id)
        {
          *existing = contact.clone();
        }
        vec![Effect::RefetchStats]
      }
      ContactChange::Deleted { contact_id } => {
        self.contacts.retain(|c| c.contact_id != *contact_id);
        vec![Effect::RefetchStats]
      }
    }
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use hark_core::contact::{ContactStatus, Topic};

  use super::*;

  fn contact(name: &str) -> Contact {
    Contact {
      contact_id: Uuid::new_v4(),
      name:       name.into(),
      email:      "jane@example.com".into(),
      topic:      Topic::General,
      message:    "A message long enough to be plausible".into(),
      owner_id:   None,
      status:     ContactStatus::New,
      is_read:    false,
      ip_address: None,
      user_agent: None,
      created_at: Utc::now(),
      updated_at: Utc::now(),
    }
  }

  /// Recompute what the server's aggregate would say for a contact set.
  fn server_stats(contacts: &[Contact]) -> ContactStats {
    let count =
      |s: ContactStatus| contacts.iter().filter(|c| c.status == s).count() as u64;
    ContactStats {
      total:        contacts.len() as u64,
      new:          count(ContactStatus::New),
      read:         count(ContactStatus::Read),
      replied:      count(ContactStatus::Replied),
      archived:     count(ContactStatus::Archived),
      unread:       contacts.iter().filter(|c| !c.is_read).count() as u64,
      last_30_days: contacts.len() as u64,
    }
  }

  #[test]
  fn starts_disconnected_with_refetch_and_polling() {
    let (reconciler, effects) = Reconciler::new(Some(Uuid::new_v4()));
    assert_eq!(reconciler.channel(), Channel::Disconnected);
    assert_eq!(effects, vec![Effect::Refetch, Effect::StartPolling]);
    assert_eq!(reconciler.on_poll_tick(), vec![Effect::Refetch]);
  }

  #[test]
  fn connect_stops_the_timer_exactly_once_and_joins_the_room() {
    let account = Uuid::new_v4();
    let (mut reconciler, _) = Reconciler::new(Some(account));

    let effects = reconciler.on_connected();
    assert_eq!(
      effects,
      vec![Effect::StopPolling, Effect::JoinAccount(Some(account))]
    );
    assert!(reconciler.is_live());

    // A duplicate connect signal must not emit a second StopPolling.
    assert!(reconciler.on_connected().is_empty());
    // While connected the timer stays silent even if a stale tick fires.
    assert!(reconciler.on_poll_tick().is_empty());
  }

  #[test]
  fn disconnect_resumes_polling_idempotently() {
    let (mut reconciler, _) = Reconciler::new(None);
    reconciler.on_connected();

    let effects = reconciler.on_disconnected();
    assert_eq!(effects, vec![Effect::StartPolling]);

    // Double disconnect: no duplicate timer.
    assert!(reconciler.on_disconnected().is_empty());
    assert_eq!(reconciler.on_poll_tick(), vec![Effect::Refetch]);
  }

  #[test]
  fn created_prepends_and_bumps_counters() {
    let (mut reconciler, _) = Reconciler::new(None);
    reconciler.apply_refetch(vec![contact("Old")], ContactStats {
      total: 1,
      new: 1,
      unread: 1,
      last_30_days: 1,
      ..Default::default()
    });
    reconciler.on_connected();

    let fresh = contact("Fresh");
    let effects = reconciler.apply_event(&ContactEvent::created(fresh.clone()));
    assert!(effects.is_empty());

    assert_eq!(reconciler.contacts.len(), 2);
    assert_eq!(reconciler.contacts[0].contact_id, fresh.contact_id, "prepended");
    assert_eq!(reconciler.stats.total, 2);
    assert_eq!(reconciler.stats.new, 2);
    assert_eq!(reconciler.stats.last_30_days, 2);
  }

  #[test]
  fn created_with_known_id_is_a_noop() {
    let (mut reconciler, _) = Reconciler::new(None);
    let existing = contact("Existing");
    reconciler.apply_refetch(vec![existing.clone()], server_stats(&[existing.clone()]));

    let effects = reconciler.apply_event(&ContactEvent::created(existing));
    assert!(effects.is_empty());
    assert_eq!(reconciler.contacts.len(), 1, "list length unchanged");
    assert_eq!(reconciler.stats.total, 1, "counters unchanged");
  }

  #[test]
  fn updated_replaces_the_whole_record_and_schedules_a_stats_refetch() {
    let (mut reconciler, _) = Reconciler::new(None);
    let original = contact("Original");
    reconciler.apply_refetch(vec![original.clone()], server_stats(&[original.clone()]));

    let mut replaced = original.clone();
    replaced.status = ContactStatus::Replied;
    replaced.message = "Edited message, still long enough".into();

    let effects = reconciler.apply_event(&ContactEvent::updated(replaced.clone()));
    assert_eq!(effects, vec![Effect::RefetchStats]);
    assert_eq!(reconciler.contacts[0].status, ContactStatus::Replied);
    assert_eq!(reconciler.contacts[0].message, replaced.message);
  }

  #[test]
  fn updated_for_an_unknown_id_is_ignored_but_still_refetches_stats() {
    let (mut reconciler, _) = Reconciler::new(None);
    let effects = reconciler.apply_event(&ContactEvent::updated(contact("Ghost")));
    assert_eq!(effects, vec![Effect::RefetchStats]);
    assert!(reconciler.contacts.is_empty());
  }

  #[test]
  fn deleted_removes_by_id_and_schedules_a_stats_refetch() {
    let (mut reconciler, _) = Reconciler::new(None);
    let a = contact("A");
    let b = contact("B");
    reconciler.apply_refetch(vec![a.clone(), b.clone()], server_stats(&[a.clone(), b.clone()]));

    let effects = reconciler.apply_event(&ContactEvent::deleted(a.contact_id));
    assert_eq!(effects, vec![Effect::RefetchStats]);
    assert_eq!(reconciler.contacts.len(), 1);
    assert_eq!(reconciler.contacts[0].contact_id, b.contact_id);

    // Deleting the same id again (or an unknown one) is harmless.
    reconciler.apply_event(&ContactEvent::deleted(a.contact_id));
    assert_eq!(reconciler.contacts.len(), 1);
  }

  /// Convergence: however events interleave while connected, one full
  /// re-fetch afterwards makes local state equal a direct server read.
  #[test]
  fn full_refetch_heals_arbitrary_drift() {
    let (mut reconciler, _) = Reconciler::new(None);
    reconciler.on_connected();

    // Apply a scattering of events the client half-saw.
    reconciler.apply_event(&ContactEvent::created(contact("Seen")));
    reconciler.apply_event(&ContactEvent::deleted(Uuid::new_v4()));
    reconciler.apply_event(&ContactEvent::updated(contact("Never seen")));

    // Meanwhile the server's true state is this:
    let mut truth = vec![contact("Alpha"), contact("Beta"), contact("Gamma")];
    truth[1].status = ContactStatus::Archived;
    truth[1].is_read = true;
    let truth_stats = server_stats(&truth);

    reconciler.on_disconnected();
    reconciler.apply_refetch(truth.clone(), truth_stats);

    assert_eq!(reconciler.contacts.len(), truth.len());
    for (local, server) in reconciler.contacts.iter().zip(&truth) {
      assert_eq!(local.contact_id, server.contact_id);
      assert_eq!(local.status, server.status);
    }
    assert_eq!(reconciler.stats, truth_stats);
  }
}

//! The subscription (room) registry.
//!
//! Process-local and ephemeral: maps each owning account to the set of its
//! currently connected push-channel sessions, plus one shared dashboard
//! broadcast group that every session belongs to. Entries exist only while
//! the session is connected.
//!
//! The registry is an owned, injectable object with an explicit lifecycle —
//! created at server start, dropped at shutdown — not a module-level global.

use std::{
  collections::{HashMap, HashSet},
  sync::Mutex,
};

use hark_core::event::ContactEvent;
use tokio::sync::mpsc;
use uuid::Uuid;

pub type SessionId = Uuid;

struct Inner {
  /// Every connected session and its outbound channel. Membership here *is*
  /// the shared broadcast group.
  sessions:   HashMap<SessionId, mpsc::UnboundedSender<ContactEvent>>,
  /// Account id → sessions currently in that account's room.
  rooms:      HashMap<Uuid, HashSet<SessionId>>,
  /// Session id → the one account room it belongs to, if authenticated.
  membership: HashMap<SessionId, Uuid>,
}

/// Registry of connected push-channel sessions and their account rooms.
///
/// All operations are safe under concurrent connects and disconnects; no
/// operation reads-then-writes another session's membership, so a single
/// mutex over the maps suffices.
pub struct RoomRegistry {
  inner: Mutex<Inner>,
}

impl Default for RoomRegistry {
  fn default() -> Self { Self::new() }
}

impl RoomRegistry {
  pub fn new() -> Self {
    Self {
      inner: Mutex::new(Inner {
        sessions:   HashMap::new(),
        rooms:      HashMap::new(),
        membership: HashMap::new(),
      }),
    }
  }

  /// Add a new session to the shared broadcast group.
  ///
  /// Returns the session id and the receiving end of its outbound channel.
  /// The channel preserves per-session emission order; nothing else about
  /// ordering is guaranteed.
  pub fn register_session(
    &self,
  ) -> (SessionId, mpsc::UnboundedReceiver<ContactEvent>) {
    let id = Uuid::new_v4();
    let (tx, rx) = mpsc::unbounded_channel();
    self.inner.lock().unwrap().sessions.insert(id, tx);
    (id, rx)
  }

  /// Put `session` into the room named by `account_id`.
  ///
  /// Idempotent: joining the same room twice has no additional effect (the
  /// session still receives each event exactly once). A session belongs to
  /// at most one account room, so joining a different room leaves the old
  /// one. Silently no-ops for an absent account id or an unknown session.
  pub fn join_account_room(&self, session: SessionId, account_id: Option<Uuid>) {
    let Some(account_id) = account_id else { return };

    let mut inner = self.inner.lock().unwrap();
    if !inner.sessions.contains_key(&session) {
      return;
    }

    if let Some(previous) = inner.membership.insert(session, account_id) {
      if previous == account_id {
        return;
      }
      if let Some(members) = inner.rooms.get_mut(&previous) {
        members.remove(&session);
        if members.is_empty() {
          inner.rooms.remove(&previous);
        }
      }
    }

    inner.rooms.entry(account_id).or_default().insert(session);
  }

  /// Send the envelope to every session in `account_id`'s room.
  ///
  /// An empty room is a silent no-op — the envelope is never queued or
  /// retained for later delivery. A failed send to one session is dropped
  /// silently; the next poll cycle reconciles that client.
  pub fn deliver_to_account(&self, account_id: Uuid, event: &ContactEvent) {
    let inner = self.inner.lock().unwrap();
    let Some(members) = inner.rooms.get(&account_id) else { return };
    for session in members {
      if let Some(tx) = inner.sessions.get(session) {
        let _ = tx.send(event.clone());
      }
    }
  }

  /// Send the envelope to every session in the shared broadcast group.
  /// Used for mutations with no owning account to target.
  pub fn deliver_to_broadcast(&self, event: &ContactEvent) {
    let inner = self.inner.lock().unwrap();
    for tx in inner.sessions.values() {
      let _ = tx.send(event.clone());
    }
  }

  /// Remove `session` from every room it belonged to. Called on disconnect;
  /// safe to call any number of times.
  pub fn remove_session(&self, session: SessionId) {
    let mut inner = self.inner.lock().unwrap();
    inner.sessions.remove(&session);
    if let Some(account_id) = inner.membership.remove(&session) {
      if let Some(members) = inner.rooms.get_mut(&account_id) {
        members.remove(&session);
        if members.is_empty() {
          inner.rooms.remove(&account_id);
        }
      }
    }
  }

  /// Number of connected sessions (the broadcast group size).
  pub fn session_count(&self) -> usize {
    self.inner.lock().unwrap().sessions.len()
  }

  /// Number of sessions in an account's room; 0 when the room is absent.
  pub fn room_size(&self, account_id: Uuid) -> usize {
    self
      .inner
      .lock()
      .unwrap()
      .rooms
      .get(&account_id)
      .map_or(0, HashSet::len)
  }
}

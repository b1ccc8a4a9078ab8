//! The change notifier — one successful mutation in, one routed envelope out.

use std::sync::Arc;

use hark_core::{contact::Contact, event::ContactEvent};
use tracing::debug;
use uuid::Uuid;

use crate::registry::RoomRegistry;

/// Converts a confirmed contact mutation into exactly one [`ContactEvent`]
/// and hands it to the fan-out registry.
///
/// This is the synchronous emission strategy: API handlers call it right
/// after the store operation returns. Envelope construction is pure; routing
/// is a non-blocking channel push, so the HTTP response is never held up
/// waiting on delivery. Callers must only invoke this after a *successful*
/// mutation — failed persistence produces no envelope.
#[derive(Clone)]
pub struct ChangeNotifier {
  registry: Arc<RoomRegistry>,
}

impl ChangeNotifier {
  pub fn new(registry: Arc<RoomRegistry>) -> Self {
    Self { registry }
  }

  pub fn contact_created(&self, contact: &Contact) {
    self.dispatch(contact.owner_id, ContactEvent::created(contact.clone()));
  }

  pub fn contact_updated(&self, contact: &Contact) {
    self.dispatch(contact.owner_id, ContactEvent::updated(contact.clone()));
  }

  /// Takes the removed record (not just its id) so the deletion still routes
  /// to the owner's room.
  pub fn contact_deleted(&self, contact: &Contact) {
    self.dispatch(contact.owner_id, ContactEvent::deleted(contact.contact_id));
  }

  /// Owned mutations target the owner's room; unowned ones fall back to the
  /// shared dashboard broadcast group, since there is no account to target.
  fn dispatch(&self, owner: Option<Uuid>, event: ContactEvent) {
    debug!(event = event.event_name(), ?owner, "dispatching realtime event");
    match owner {
      Some(account_id) => self.registry.deliver_to_account(account_id, &event),
      None => self.registry.deliver_to_broadcast(&event),
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use hark_core::{
    contact::{ContactStatus, Topic},
    event::ContactChange,
  };
  use uuid::Uuid;

  use super::*;

  fn contact(owner_id: Option<Uuid>) -> Contact {
    Contact {
      contact_id: Uuid::new_v4(),
      name:       "Jane Doe".into(),
      email:      "jane@example.com".into(),
      topic:      Topic::Demo,
      message:    "Please schedule a demo for our team".into(),
      owner_id,
      status:     ContactStatus::New,
      is_read:    false,
      ip_address: None,
      user_agent: None,
      created_at: Utc::now(),
      updated_at: Utc::now(),
    }
  }

  #[test]
  fn owned_creation_targets_only_the_owner_room() {
    let registry = Arc::new(RoomRegistry::new());
    let notifier = ChangeNotifier::new(registry.clone());
    let owner = Uuid::new_v4();

    let (owner_session, mut owner_rx) = registry.register_session();
    let (_other_session, mut other_rx) = registry.register_session();
    registry.join_account_room(owner_session, Some(owner));

    notifier.contact_created(&contact(Some(owner)));

    let event = owner_rx.try_recv().expect("owner session receives the event");
    assert!(matches!(
      &event.change,
      ContactChange::Created { contact: c } if c.status == ContactStatus::New
    ));
    // The unjoined session sees nothing: owned events are room-scoped.
    assert!(other_rx.try_recv().is_err());
  }

  #[test]
  fn unowned_creation_broadcasts() {
    let registry = Arc::new(RoomRegistry::new());
    let notifier = ChangeNotifier::new(registry.clone());

    let (session, mut rx_joined) = registry.register_session();
    registry.join_account_room(session, Some(Uuid::new_v4()));
    let (_plain, mut rx_plain) = registry.register_session();

    notifier.contact_created(&contact(None));

    // Every connected session is in the broadcast group.
    assert!(rx_joined.try_recv().is_ok());
    assert!(rx_plain.try_recv().is_ok());
  }

  #[test]
  fn deletion_routes_to_the_owner_room_by_the_removed_record() {
    let registry = Arc::new(RoomRegistry::new());
    let notifier = ChangeNotifier::new(registry.clone());
    let owner = Uuid::new_v4();

    let (s1, mut rx1) = registry.register_session();
    let (s2, mut rx2) = registry.register_session();
    registry.join_account_room(s1, Some(owner));
    registry.join_account_room(s2, Some(owner));

    let removed = contact(Some(owner));
    notifier.contact_deleted(&removed);

    for rx in [&mut rx1, &mut rx2] {
      let event = rx.try_recv().expect("both owner sessions receive the delete");
      assert!(matches!(
        event.change,
        ContactChange::Deleted { contact_id } if contact_id == removed.contact_id
      ));
    }
  }

  #[test]
  fn notifying_with_nobody_connected_is_harmless() {
    let registry = Arc::new(RoomRegistry::new());
    let notifier = ChangeNotifier::new(registry);
    notifier.contact_updated(&contact(Some(Uuid::new_v4())));
    notifier.contact_created(&contact(None));
  }
}

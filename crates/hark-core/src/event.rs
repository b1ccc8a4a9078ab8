//! The realtime event envelope — one successful mutation, described for
//! delivery to dashboard subscribers.
//!
//! Envelopes are ephemeral: constructed immediately after a confirmed
//! persistence mutation, delivered best-effort, and discarded. There is no
//! durable queue and no replay; a disconnected dashboard reconciles via its
//! next full re-fetch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::contact::Contact;

/// What changed. Updates carry the full post-mutation record so subscribers
/// replace the whole row instead of patching fields; deletes carry only the
/// id (the record is already gone).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContactChange {
  Created { contact: Contact },
  Updated { contact: Contact },
  Deleted {
    #[serde(rename = "contactId")]
    contact_id: Uuid,
  },
}

/// The delivered envelope: a change plus its emission timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactEvent {
  #[serde(flatten)]
  pub change:    ContactChange,
  pub timestamp: DateTime<Utc>,
}

impl ContactEvent {
  /// Envelope construction is pure and synchronous: no I/O happens here.
  pub fn created(contact: Contact) -> Self {
    Self {
      change:    ContactChange::Created { contact },
      timestamp: Utc::now(),
    }
  }

  pub fn updated(contact: Contact) -> Self {
    Self {
      change:    ContactChange::Updated { contact },
      timestamp: Utc::now(),
    }
  }

  pub fn deleted(contact_id: Uuid) -> Self {
    Self {
      change:    ContactChange::Deleted { contact_id },
      timestamp: Utc::now(),
    }
  }

  /// Wire event name, e.g. `contact:created`.
  pub fn event_name(&self) -> &'static str {
    match self.change {
      ContactChange::Created { .. } => "contact:created",
      ContactChange::Updated { .. } => "contact:updated",
      ContactChange::Deleted { .. } => "contact:deleted",
    }
  }

  /// The id of the affected contact, for all three variants.
  pub fn contact_id(&self) -> Uuid {
    match &self.change {
      ContactChange::Created { contact } | ContactChange::Updated { contact } => {
        contact.contact_id
      }
      ContactChange::Deleted { contact_id } => *contact_id,
    }
  }
}

//! Contact — a customer inquiry record and its submission inputs.
//!
//! A contact is created by a (possibly unauthenticated) form submission,
//! mutated by status updates or full edits, and removed by hard delete.
//! There is no soft delete and no enforced status workflow: any status is
//! reachable from any other.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Enums ───────────────────────────────────────────────────────────────────

/// What the inquiry is about. Mirrors the subject dropdown on the form.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
  #[default]
  General,
  Demo,
  Support,
  Partnership,
}

impl Topic {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::General => "general",
      Self::Demo => "demo",
      Self::Support => "support",
      Self::Partnership => "partnership",
    }
  }
}

/// Triage status of a contact. Transitions are unordered — any status can be
/// set from any other.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ContactStatus {
  #[default]
  New,
  Read,
  Replied,
  Archived,
}

impl ContactStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::New => "new",
      Self::Read => "read",
      Self::Replied => "replied",
      Self::Archived => "archived",
    }
  }
}

// ─── Contact ─────────────────────────────────────────────────────────────────

/// A persisted customer inquiry.
///
/// `contact_id` is immutable once created. `owner_id` is `None` for
/// unauthenticated submissions. `updated_at` is bumped on every mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
  pub contact_id: Uuid,
  pub name:       String,
  /// Always stored lowercase.
  pub email:      String,
  /// Serialised as `subject` — the wire name the form and dashboard use.
  #[serde(rename = "subject")]
  pub topic:      Topic,
  pub message:    String,
  pub owner_id:   Option<Uuid>,
  pub status:     ContactStatus,
  pub is_read:    bool,
  pub ip_address: Option<String>,
  pub user_agent: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

// ─── Submission input ────────────────────────────────────────────────────────

/// Validation bounds for submitted fields.
pub const NAME_MIN: usize = 2;
pub const NAME_MAX: usize = 100;
pub const MESSAGE_MIN: usize = 10;
pub const MESSAGE_MAX: usize = 1000;

/// Input to [`crate::store::ContactStore::create_contact`].
/// `contact_id`, `status`, and both timestamps are set by the store.
#[derive(Debug, Clone)]
pub struct NewContact {
  pub name:       String,
  pub email:      String,
  pub topic:      Topic,
  pub message:    String,
  pub owner_id:   Option<Uuid>,
  pub ip_address: Option<String>,
  pub user_agent: Option<String>,
}

impl NewContact {
  /// Trim, normalise, and bounds-check the submitted fields.
  ///
  /// Returns the normalised input (email lowercased, name/message trimmed)
  /// or the first [`Error::Validation`] encountered. Must be called before
  /// any store write — invalid submissions never reach persistence.
  pub fn validated(mut self) -> Result<Self> {
    self.name = self.name.trim().to_owned();
    self.message = self.message.trim().to_owned();
    self.email = normalize_email(&self.email);

    validate_name(&self.name)?;
    validate_email(&self.email)?;
    validate_message(&self.message)?;
    Ok(self)
  }
}

// ─── Full edit ───────────────────────────────────────────────────────────────

/// A full replacement of the user-submitted fields, validated like a fresh
/// submission. Ownership, status, and submission metadata are untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactEdit {
  pub name:    String,
  pub email:   String,
  #[serde(rename = "subject")]
  pub topic:   Topic,
  pub message: String,
}

impl ContactEdit {
  pub fn validated(mut self) -> Result<Self> {
    self.name = self.name.trim().to_owned();
    self.message = self.message.trim().to_owned();
    self.email = normalize_email(&self.email);

    validate_name(&self.name)?;
    validate_email(&self.email)?;
    validate_message(&self.message)?;
    Ok(self)
  }
}

// ─── Field validation ────────────────────────────────────────────────────────

pub fn normalize_email(email: &str) -> String {
  email.trim().to_lowercase()
}

fn validate_name(name: &str) -> Result<()> {
  let len = name.chars().count();
  if len < NAME_MIN {
    return Err(Error::validation(
      "name",
      format!("must be at least {NAME_MIN} characters long"),
    ));
  }
  if len > NAME_MAX {
    return Err(Error::validation(
      "name",
      format!("cannot exceed {NAME_MAX} characters"),
    ));
  }
  Ok(())
}

/// Same shape check the form applies: non-whitespace local part, `@`, and a
/// dotted non-whitespace domain.
pub fn validate_email(email: &str) -> Result<()> {
  let valid = match email.split_once('@') {
    Some((local, domain)) => {
      !local.is_empty()
        && !local.contains(char::is_whitespace)
        && !domain.contains(char::is_whitespace)
        && !domain.contains('@')
        && domain.split_once('.').is_some_and(|(h, t)| !h.is_empty() && !t.is_empty())
    }
    None => false,
  };

  if valid {
    Ok(())
  } else {
    Err(Error::validation("email", "must be a valid email address"))
  }
}

fn validate_message(message: &str) -> Result<()> {
  let len = message.chars().count();
  if len < MESSAGE_MIN {
    return Err(Error::validation(
      "message",
      format!("must be at least {MESSAGE_MIN} characters long"),
    ));
  }
  if len > MESSAGE_MAX {
    return Err(Error::validation(
      "message",
      format!("cannot exceed {MESSAGE_MAX} characters"),
    ));
  }
  Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  fn submission() -> NewContact {
    NewContact {
      name:       "Jane Doe".into(),
      email:      "Jane@Example.COM".into(),
      topic:      Topic::Demo,
      message:    "Please schedule a demo for our team".into(),
      owner_id:   None,
      ip_address: None,
      user_agent: None,
    }
  }

  #[test]
  fn validated_lowercases_email_and_trims() {
    let mut input = submission();
    input.name = "  Jane Doe  ".into();
    let out = input.validated().unwrap();
    assert_eq!(out.email, "jane@example.com");
    assert_eq!(out.name, "Jane Doe");
  }

  #[test]
  fn rejects_short_name() {
    let mut input = submission();
    input.name = "J".into();
    assert!(matches!(
      input.validated(),
      Err(Error::Validation { field: "name", .. })
    ));
  }

  #[test]
  fn rejects_short_message() {
    let mut input = submission();
    input.message = "too short".into();
    assert!(matches!(
      input.validated(),
      Err(Error::Validation { field: "message", .. })
    ));
  }

  #[test]
  fn rejects_overlong_message() {
    let mut input = submission();
    input.message = "x".repeat(MESSAGE_MAX + 1);
    assert!(matches!(
      input.validated(),
      Err(Error::Validation { field: "message", .. })
    ));
  }

  #[test]
  fn rejects_malformed_emails() {
    for bad in ["", "nope", "a@b", "a b@c.d", "a@b c.d", "@x.y", "a@.y", "a@x."] {
      let mut input = submission();
      input.email = bad.into();
      assert!(
        matches!(input.validated(), Err(Error::Validation { field: "email", .. })),
        "accepted {bad:?}"
      );
    }
  }

  #[test]
  fn accepts_plausible_emails() {
    for ok in ["a@b.c", "jane.doe+tag@sub.example.com"] {
      let mut input = submission();
      input.email = ok.into();
      assert!(input.validated().is_ok(), "rejected {ok:?}");
    }
  }

  #[test]
  fn topic_and_status_serde_tags_are_lowercase() {
    assert_eq!(serde_json::to_string(&Topic::Demo).unwrap(), "\"demo\"");
    assert_eq!(
      serde_json::to_string(&ContactStatus::Replied).unwrap(),
      "\"replied\""
    );
    let status: ContactStatus = serde_json::from_str("\"archived\"").unwrap();
    assert_eq!(status, ContactStatus::Archived);
  }
}

//! Account — a person who can sign in and own contacts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  contact::{normalize_email, validate_email},
  Error, Result,
};

/// Authorization role. Admins manage the contact inbox; plain users only own
/// the contacts they submitted while signed in.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  #[default]
  User,
  Admin,
}

/// A persisted account.
///
/// Accounts are never hard-deleted; deactivation flips `is_active` and an
/// inactive account can no longer authenticate. The password hash is kept out
/// of every serialised representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
  pub account_id:  Uuid,
  /// Subject id at the external identity provider, when the account was
  /// created through OAuth. Unique when present.
  pub provider_id: Option<String>,
  /// Always stored lowercase; globally unique.
  pub email:       String,
  pub name:        String,
  pub avatar_url:  Option<String>,
  pub role:        Role,
  pub is_active:   bool,
  /// Argon2 PHC string. Never serialised.
  #[serde(skip)]
  pub password_hash: Option<String>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

/// Input to [`crate::store::AccountStore::create_account`].
#[derive(Debug, Clone)]
pub struct NewAccount {
  pub provider_id:   Option<String>,
  pub email:         String,
  pub name:          String,
  pub avatar_url:    Option<String>,
  pub role:          Role,
  pub password_hash: Option<String>,
}

impl NewAccount {
  /// Normalise the email and enforce the credential invariant: at least one
  /// of a password hash or an identity-provider id must be present, or the
  /// account could never authenticate.
  pub fn validated(mut self) -> Result<Self> {
    self.email = normalize_email(&self.email);
    self.name = self.name.trim().to_owned();

    validate_email(&self.email)?;
    if self.name.is_empty() {
      return Err(Error::validation("name", "must not be empty"));
    }
    if self.password_hash.is_none() && self.provider_id.is_none() {
      return Err(Error::NoCredential);
    }
    Ok(self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn registration() -> NewAccount {
    NewAccount {
      provider_id:   None,
      email:         "Admin@Example.com".into(),
      name:          "Admin".into(),
      avatar_url:    None,
      role:          Role::Admin,
      password_hash: Some("$argon2id$stub".into()),
    }
  }

  #[test]
  fn validated_lowercases_email() {
    let out = registration().validated().unwrap();
    assert_eq!(out.email, "admin@example.com");
  }

  #[test]
  fn requires_some_credential() {
    let mut input = registration();
    input.password_hash = None;
    assert!(matches!(input.validated(), Err(Error::NoCredential)));

    let mut input = registration();
    input.password_hash = None;
    input.provider_id = Some("google-sub-123".into());
    assert!(input.validated().is_ok());
  }

  #[test]
  fn password_hash_is_never_serialised() {
    let account = Account {
      account_id:    Uuid::new_v4(),
      provider_id:   None,
      email:         "a@b.co".into(),
      name:          "A".into(),
      avatar_url:    None,
      role:          Role::User,
      is_active:     true,
      password_hash: Some("$argon2id$secret".into()),
      created_at:    Utc::now(),
      updated_at:    Utc::now(),
    };
    let json = serde_json::to_string(&account).unwrap();
    assert!(!json.contains("argon2"));
    assert!(!json.contains("password"));
  }
}

//! Error types for `hark-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid {field}: {reason}")]
  Validation {
    field:  &'static str,
    reason: String,
  },

  #[error("contact not found: {0}")]
  ContactNotFound(Uuid),

  #[error("account not found: {0}")]
  AccountNotFound(Uuid),

  #[error("email already registered: {0}")]
  EmailTaken(String),

  #[error("account has no credential: need a password or an identity-provider id")]
  NoCredential,

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
    Self::Validation { field, reason: reason.into() }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

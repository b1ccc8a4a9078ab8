//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 UTC strings (which also sort
//! chronologically as text). UUIDs are stored as hyphenated lowercase
//! strings; enums as their lowercase serde tags.

use chrono::{DateTime, Utc};
use hark_core::{
  account::{Account, Role},
  contact::{Contact, ContactStatus, Topic},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── ContactStatus ───────────────────────────────────────────────────────────

pub fn encode_status(s: ContactStatus) -> &'static str {
  match s {
    ContactStatus::New => "new",
    ContactStatus::Read => "read",
    ContactStatus::Replied => "replied",
    ContactStatus::Archived => "archived",
  }
}

pub fn decode_status(s: &str) -> Result<ContactStatus> {
  match s {
    "new" => Ok(ContactStatus::New),
    "read" => Ok(ContactStatus::Read),
    "replied" => Ok(ContactStatus::Replied),
    "archived" => Ok(ContactStatus::Archived),
    other => Err(Error::Decode(format!("unknown contact status: {other:?}"))),
  }
}

// ─── Topic ───────────────────────────────────────────────────────────────────

pub fn encode_topic(t: Topic) -> &'static str {
  match t {
    Topic::General => "general",
    Topic::Demo => "demo",
    Topic::Support => "support",
    Topic::Partnership => "partnership",
  }
}

pub fn decode_topic(s: &str) -> Result<Topic> {
  match s {
    "general" => Ok(Topic::General),
    "demo" => Ok(Topic::Demo),
    "support" => Ok(Topic::Support),
    "partnership" => Ok(Topic::Partnership),
    other => Err(Error::Decode(format!("unknown topic: {other:?}"))),
  }
}

// ─── Role ────────────────────────────────────────────────────────────────────

pub fn encode_role(r: Role) -> &'static str {
  match r {
    Role::User => "user",
    Role::Admin => "admin",
  }
}

pub fn decode_role(s: &str) -> Result<Role> {
  match s {
    "user" => Ok(Role::User),
    "admin" => Ok(Role::Admin),
    other => Err(Error::Decode(format!("unknown role: {other:?}"))),
  }
}

// ─── Raw rows ────────────────────────────────────────────────────────────────

/// A `contacts` row as it comes off the wire, before decoding.
pub struct RawContact {
  pub contact_id: String,
  pub name:       String,
  pub email:      String,
  pub topic:      String,
  pub message:    String,
  pub owner_id:   Option<String>,
  pub status:     String,
  pub is_read:    bool,
  pub ip_address: Option<String>,
  pub user_agent: Option<String>,
  pub created_at: String,
  pub updated_at: String,
}

impl RawContact {
  /// The column list every contact SELECT uses, in `RawContact` field order.
  pub const COLUMNS: &'static str =
    "contact_id, name, email, topic, message, owner_id, status, is_read, \
     ip_address, user_agent, created_at, updated_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      contact_id: row.get(0)?,
      name:       row.get(1)?,
      email:      row.get(2)?,
      topic:      row.get(3)?,
      message:    row.get(4)?,
      owner_id:   row.get(5)?,
      status:     row.get(6)?,
      is_read:    row.get(7)?,
      ip_address: row.get(8)?,
      user_agent: row.get(9)?,
      created_at: row.get(10)?,
      updated_at: row.get(11)?,
    })
  }

  pub fn into_contact(self) -> Result<Contact> {
    Ok(Contact {
      contact_id: decode_uuid(&self.contact_id)?,
      name:       self.name,
      email:      self.email,
      topic:      decode_topic(&self.topic)?,
      message:    self.message,
      owner_id:   self.owner_id.as_deref().map(decode_uuid).transpose()?,
      status:     decode_status(&self.status)?,
      is_read:    self.is_read,
      ip_address: self.ip_address,
      user_agent: self.user_agent,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// An `accounts` row as it comes off the wire, before decoding.
pub struct RawAccount {
  pub account_id:    String,
  pub provider_id:   Option<String>,
  pub email:         String,
  pub name:          String,
  pub avatar_url:    Option<String>,
  pub role:          String,
  pub is_active:     bool,
  pub password_hash: Option<String>,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawAccount {
  pub const COLUMNS: &'static str =
    "account_id, provider_id, email, name, avatar_url, role, is_active, \
     password_hash, created_at, updated_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      account_id:    row.get(0)?,
      provider_id:   row.get(1)?,
      email:         row.get(2)?,
      name:          row.get(3)?,
      avatar_url:    row.get(4)?,
      role:          row.get(5)?,
      is_active:     row.get(6)?,
      password_hash: row.get(7)?,
      created_at:    row.get(8)?,
      updated_at:    row.get(9)?,
    })
  }

  pub fn into_account(self) -> Result<Account> {
    Ok(Account {
      account_id:    decode_uuid(&self.account_id)?,
      provider_id:   self.provider_id,
      email:         self.email,
      name:          self.name,
      avatar_url:    self.avatar_url,
      role:          decode_role(&self.role)?,
      is_active:     self.is_active,
      password_hash: self.password_hash,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

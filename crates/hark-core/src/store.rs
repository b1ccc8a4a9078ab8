//! Store traits and supporting query types.
//!
//! Implemented by storage backends (e.g. `hark-store-sqlite`). Higher layers
//! (`hark-api`, `hark-server`) depend on these abstractions, not on any
//! concrete backend.
//!
//! Owner-scoped and global access are distinct traits: every
//! [`ContactStore`] query is scoped by an owner id (where `None` scopes to
//! unowned, anonymously-submitted rows), while [`ContactAdminStore`] exposes
//! the unscoped variants the admin dashboard uses.

use std::future::Future;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
  account::{Account, NewAccount},
  contact::{Contact, ContactEdit, ContactStatus, NewContact},
  event::ContactEvent,
  stats::ContactStats,
};

// ─── Query types ─────────────────────────────────────────────────────────────

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Parameters for listing contacts. Results are always newest-first.
#[derive(Debug, Clone, Default)]
pub struct ContactQuery {
  /// 1-based page number; 0 is treated as 1.
  pub page:   u32,
  /// Page size; 0 means [`DEFAULT_PAGE_LIMIT`], values above
  /// [`MAX_PAGE_LIMIT`] are clamped.
  pub limit:  u32,
  pub status: Option<ContactStatus>,
  /// Case-insensitive substring match over name, email, and message.
  pub search: Option<String>,
}

impl ContactQuery {
  /// The effective `(page, limit)` after defaulting and clamping.
  pub fn page_limit(&self) -> (u32, u32) {
    let page = self.page.max(1);
    let limit = match self.limit {
      0 => DEFAULT_PAGE_LIMIT,
      n => n.min(MAX_PAGE_LIMIT),
    };
    (page, limit)
  }
}

/// One page of contacts plus the pagination block the dashboard renders.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ContactPage {
  pub data:       Vec<Contact>,
  pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Pagination {
  pub page:     u32,
  pub limit:    u32,
  pub total:    u64,
  pub pages:    u64,
  pub has_next: bool,
  pub has_prev: bool,
}

impl Pagination {
  /// Derive the pagination block from a total row count.
  pub fn for_total(page: u32, limit: u32, total: u64) -> Self {
    let pages = total.div_ceil(u64::from(limit));
    Self {
      page,
      limit,
      total,
      pages,
      has_next: u64::from(page) * u64::from(limit) < total,
      has_prev: page > 1,
    }
  }
}

// ─── Owner-scoped contacts ───────────────────────────────────────────────────

/// Abstraction over contact persistence, scoped by owning account.
///
/// `owner` is the scope of every query: `Some(id)` restricts to that
/// account's contacts, `None` restricts to unowned rows. Operations that
/// target a single contact return `None` when the id does not exist *within
/// the scope* — a row owned by somebody else is indistinguishable from a
/// missing row.
///
/// All methods return `Send` futures so the traits can be used in
/// multi-threaded async runtimes (tokio with `axum`).
pub trait ContactStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a validated submission. `status` starts as
  /// [`ContactStatus::New`] and timestamps are assigned by the store.
  fn create_contact(
    &self,
    input: NewContact,
  ) -> impl Future<Output = Result<Contact, Self::Error>> + Send + '_;

  fn contact_by_id(
    &self,
    owner: Option<Uuid>,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Contact>, Self::Error>> + Send + '_;

  /// Set the status; setting [`ContactStatus::Read`] also flips `is_read`.
  /// Returns the post-mutation record, or `None` when out of scope.
  fn update_status(
    &self,
    owner: Option<Uuid>,
    id: Uuid,
    status: ContactStatus,
  ) -> impl Future<Output = Result<Option<Contact>, Self::Error>> + Send + '_;

  /// Replace the user-submitted fields wholesale (a full edit).
  fn update_contact(
    &self,
    owner: Option<Uuid>,
    id: Uuid,
    edit: ContactEdit,
  ) -> impl Future<Output = Result<Option<Contact>, Self::Error>> + Send + '_;

  /// Hard delete. Returns the removed record so callers can build the
  /// deletion envelope from it, or `None` when out of scope.
  fn delete_contact(
    &self,
    owner: Option<Uuid>,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Contact>, Self::Error>> + Send + '_;

  fn list_contacts<'a>(
    &'a self,
    owner: Option<Uuid>,
    query: &'a ContactQuery,
  ) -> impl Future<Output = Result<ContactPage, Self::Error>> + Send + 'a;

  /// Grouped aggregation over the scope: counts per status, unread count,
  /// and the trailing 30-day submission count.
  fn aggregate_stats(
    &self,
    owner: Option<Uuid>,
  ) -> impl Future<Output = Result<ContactStats, Self::Error>> + Send + '_;
}

// ─── Global (admin) contacts ─────────────────────────────────────────────────

/// Unscoped variants of the contact operations. Deliberately a separate
/// trait: handlers that hold only a [`ContactStore`] cannot accidentally
/// issue a global query.
pub trait ContactAdminStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn list_all<'a>(
    &'a self,
    query: &'a ContactQuery,
  ) -> impl Future<Output = Result<ContactPage, Self::Error>> + Send + 'a;

  fn stats_all(
    &self,
  ) -> impl Future<Output = Result<ContactStats, Self::Error>> + Send + '_;

  fn contact_by_id_any(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Contact>, Self::Error>> + Send + '_;

  fn update_status_any(
    &self,
    id: Uuid,
    status: ContactStatus,
  ) -> impl Future<Output = Result<Option<Contact>, Self::Error>> + Send + '_;

  fn update_contact_any(
    &self,
    id: Uuid,
    edit: ContactEdit,
  ) -> impl Future<Output = Result<Option<Contact>, Self::Error>> + Send + '_;

  fn delete_contact_any(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Contact>, Self::Error>> + Send + '_;

  /// Every contact, newest first — the CSV export projection.
  fn export_all(
    &self,
  ) -> impl Future<Output = Result<Vec<Contact>, Self::Error>> + Send + '_;
}

// ─── Accounts ────────────────────────────────────────────────────────────────

pub trait AccountStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a validated account. Fails with the backend's duplicate-email
  /// error when the (lowercased) email is already registered.
  fn create_account(
    &self,
    input: NewAccount,
  ) -> impl Future<Output = Result<Account, Self::Error>> + Send + '_;

  fn account_by_id(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_;

  fn account_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + 'a;

  fn account_by_provider_id<'a>(
    &'a self,
    provider_id: &'a str,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + 'a;

  /// Deactivation only — accounts are never hard-deleted.
  fn set_active(
    &self,
    id: Uuid,
    active: bool,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_;
}

// ─── Change feed (optional capability) ───────────────────────────────────────

/// Ordered change notification, when the backend supports it.
///
/// `watch` returns `None` on backends without native change observation;
/// callers must degrade to a logged warning, never crash. Receivers observe
/// every committed contact mutation as a [`ContactEvent`], in commit order.
pub trait ContactFeed: Send + Sync {
  fn watch(&self) -> Option<broadcast::Receiver<ContactEvent>>;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn query_defaults_and_clamps() {
    assert_eq!(ContactQuery::default().page_limit(), (1, DEFAULT_PAGE_LIMIT));

    let q = ContactQuery { page: 0, limit: 500, ..Default::default() };
    assert_eq!(q.page_limit(), (1, MAX_PAGE_LIMIT));

    let q = ContactQuery { page: 3, limit: 25, ..Default::default() };
    assert_eq!(q.page_limit(), (3, 25));
  }

  #[test]
  fn pagination_math() {
    let p = Pagination::for_total(1, 10, 0);
    assert_eq!((p.pages, p.has_next, p.has_prev), (0, false, false));

    let p = Pagination::for_total(1, 10, 35);
    assert_eq!((p.pages, p.has_next, p.has_prev), (4, true, false));

    let p = Pagination::for_total(4, 10, 35);
    assert_eq!((p.pages, p.has_next, p.has_prev), (4, false, true));

    let p = Pagination::for_total(2, 10, 20);
    assert_eq!((p.pages, p.has_next, p.has_prev), (2, false, true));
  }
}

//! [`SqliteStore`] — the SQLite implementation of the Hark store traits.

use std::path::Path;

use chrono::{Duration, Utc};
use rusqlite::{OptionalExtension as _, ToSql};
use tokio::sync::broadcast;
use uuid::Uuid;

use hark_core::{
  account::{Account, NewAccount},
  contact::{Contact, ContactEdit, ContactStatus, NewContact},
  event::ContactEvent,
  stats::ContactStats,
  store::{
    AccountStore, ContactAdminStore, ContactFeed, ContactPage, ContactQuery,
    ContactStore, Pagination,
  },
};

use crate::{
  encode::{
    encode_dt, encode_role, encode_status, encode_topic, encode_uuid,
    RawAccount, RawContact,
  },
  schema::SCHEMA,
  Error, Result,
};

/// How many unconsumed feed events a slow observer may fall behind before
/// it starts seeing `Lagged` and has to resubscribe.
const FEED_CAPACITY: usize = 256;

// ─── Scope ───────────────────────────────────────────────────────────────────

/// Row visibility for a contact query.
///
/// `Owned(None)` scopes to anonymously-submitted rows; `Global` is the admin
/// interface with no owner filter at all.
#[derive(Debug, Clone, Copy)]
enum Scope {
  Owned(Option<Uuid>),
  Global,
}

impl Scope {
  /// SQL fragment (to AND into a WHERE clause) plus the owner bind, if any.
  /// Uses an unnumbered `?`, so the bind order must match the text order.
  fn filter(self) -> (&'static str, Option<String>) {
    match self {
      Scope::Owned(Some(owner)) => ("owner_id = ?", Some(encode_uuid(owner))),
      Scope::Owned(None) => ("owner_id IS NULL", None),
      Scope::Global => ("1=1", None),
    }
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Hark store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted and all
/// clones publish to the same change feed.
#[derive(Clone)]
pub struct SqliteStore {
  conn:    tokio_rusqlite::Connection,
  feed_tx: broadcast::Sender<ContactEvent>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::with_conn(conn).await
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::with_conn(conn).await
  }

  async fn with_conn(conn: tokio_rusqlite::Connection) -> Result<Self> {
    let (feed_tx, _) = broadcast::channel(FEED_CAPACITY);
    let store = Self { conn, feed_tx };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Publish a committed mutation to the change feed. Send errors only mean
  /// nobody is subscribed, which is the common case.
  fn publish(&self, event: ContactEvent) {
    let _ = self.feed_tx.send(event);
  }

  // ── Scoped contact helpers ────────────────────────────────────────────────

  async fn contact_one(&self, scope: Scope, id: Uuid) -> Result<Option<Contact>> {
    let id_str = encode_uuid(id);
    let (filter, owner) = scope.filter();
    let sql = format!(
      "SELECT {} FROM contacts WHERE contact_id = ? AND {filter}",
      RawContact::COLUMNS
    );

    let raw: Option<RawContact> = self
      .conn
      .call(move |conn| {
        let mut binds: Vec<&dyn ToSql> = vec![&id_str];
        if let Some(o) = &owner {
          binds.push(o);
        }
        Ok(
          conn
            .query_row(&sql, &binds[..], RawContact::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawContact::into_contact).transpose()
  }

  async fn status_update(
    &self,
    scope: Scope,
    id: Uuid,
    status: ContactStatus,
  ) -> Result<Option<Contact>> {
    let id_str = encode_uuid(id);
    let status_str = encode_status(status).to_owned();
    // Setting `read` also flips the unread flag; other statuses leave it.
    let mark_read = status == ContactStatus::Read;
    let now_str = encode_dt(Utc::now());
    let (filter, owner) = scope.filter();

    let update_sql = format!(
      "UPDATE contacts
       SET status = ?, is_read = (CASE WHEN ? THEN 1 ELSE is_read END),
           updated_at = ?
       WHERE contact_id = ? AND {filter}"
    );
    let select_sql = format!(
      "SELECT {} FROM contacts WHERE contact_id = ?",
      RawContact::COLUMNS
    );

    let raw: Option<RawContact> = self
      .conn
      .call(move |conn| {
        let mut binds: Vec<&dyn ToSql> =
          vec![&status_str, &mark_read, &now_str, &id_str];
        if let Some(o) = &owner {
          binds.push(o);
        }
        if conn.execute(&update_sql, &binds[..])? == 0 {
          return Ok(None);
        }
        Ok(
          conn
            .query_row(&select_sql, [&id_str], RawContact::from_row)
            .optional()?,
        )
      })
      .await?;

    let contact = raw.map(RawContact::into_contact).transpose()?;
    if let Some(c) = &contact {
      self.publish(ContactEvent::updated(c.clone()));
    }
    Ok(contact)
  }

  async fn edit_update(
    &self,
    scope: Scope,
    id: Uuid,
    edit: ContactEdit,
  ) -> Result<Option<Contact>> {
    let edit = edit.validated()?;
    let id_str = encode_uuid(id);
    let topic_str = encode_topic(edit.topic).to_owned();
    let now_str = encode_dt(Utc::now());
    let (filter, owner) = scope.filter();

    let update_sql = format!(
      "UPDATE contacts
       SET name = ?, email = ?, topic = ?, message = ?, updated_at = ?
       WHERE contact_id = ? AND {filter}"
    );
    let select_sql = format!(
      "SELECT {} FROM contacts WHERE contact_id = ?",
      RawContact::COLUMNS
    );

    let raw: Option<RawContact> = self
      .conn
      .call(move |conn| {
        let mut binds: Vec<&dyn ToSql> = vec![
          &edit.name,
          &edit.email,
          &topic_str,
          &edit.message,
          &now_str,
          &id_str,
        ];
        if let Some(o) = &owner {
          binds.push(o);
        }
        if conn.execute(&update_sql, &binds[..])? == 0 {
          return Ok(None);
        }
        Ok(
          conn
            .query_row(&select_sql, [&id_str], RawContact::from_row)
            .optional()?,
        )
      })
      .await?;

    let contact = raw.map(RawContact::into_contact).transpose()?;
    if let Some(c) = &contact {
      self.publish(ContactEvent::updated(c.clone()));
    }
    Ok(contact)
  }

  async fn delete_one(&self, scope: Scope, id: Uuid) -> Result<Option<Contact>> {
    let id_str = encode_uuid(id);
    let (filter, owner) = scope.filter();
    let select_sql = format!(
      "SELECT {} FROM contacts WHERE contact_id = ? AND {filter}",
      RawContact::COLUMNS
    );

    let raw: Option<RawContact> = self
      .conn
      .call(move |conn| {
        let mut binds: Vec<&dyn ToSql> = vec![&id_str];
        if let Some(o) = &owner {
          binds.push(o);
        }
        let raw = conn
          .query_row(&select_sql, &binds[..], RawContact::from_row)
          .optional()?;
        if raw.is_some() {
          conn.execute(
            "DELETE FROM contacts WHERE contact_id = ?",
            [&id_str],
          )?;
        }
        Ok(raw)
      })
      .await?;

    let contact = raw.map(RawContact::into_contact).transpose()?;
    if let Some(c) = &contact {
      self.publish(ContactEvent::deleted(c.contact_id));
    }
    Ok(contact)
  }

  async fn list_page(
    &self,
    scope: Scope,
    query: &ContactQuery,
  ) -> Result<ContactPage> {
    let (page, limit) = query.page_limit();
    let offset = i64::from(page - 1) * i64::from(limit);
    let limit_i = i64::from(limit);

    let (filter, owner) = scope.filter();
    let status = query.status.map(|s| encode_status(s).to_owned());
    let pattern = query
      .search
      .as_deref()
      .filter(|s| !s.trim().is_empty())
      .map(|s| format!("%{}%", s.trim()));

    let mut conds = vec![filter.to_owned()];
    if status.is_some() {
      conds.push("status = ?".to_owned());
    }
    if pattern.is_some() {
      conds.push("(name LIKE ? OR email LIKE ? OR message LIKE ?)".to_owned());
    }
    let where_clause = conds.join(" AND ");

    let count_sql = format!("SELECT COUNT(*) FROM contacts WHERE {where_clause}");
    let page_sql = format!(
      "SELECT {} FROM contacts WHERE {where_clause}
       ORDER BY created_at DESC LIMIT ? OFFSET ?",
      RawContact::COLUMNS
    );

    let (total, raws): (i64, Vec<RawContact>) = self
      .conn
      .call(move |conn| {
        let mut binds: Vec<&dyn ToSql> = vec![];
        if let Some(o) = &owner {
          binds.push(o);
        }
        if let Some(s) = &status {
          binds.push(s);
        }
        if let Some(p) = &pattern {
          binds.push(p);
          binds.push(p);
          binds.push(p);
        }

        let total: i64 = conn.query_row(&count_sql, &binds[..], |r| r.get(0))?;

        binds.push(&limit_i);
        binds.push(&offset);
        let mut stmt = conn.prepare(&page_sql)?;
        let raws = stmt
          .query_map(&binds[..], RawContact::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((total, raws))
      })
      .await?;

    let data = raws
      .into_iter()
      .map(RawContact::into_contact)
      .collect::<Result<Vec<_>>>()?;

    Ok(ContactPage {
      data,
      pagination: Pagination::for_total(page, limit, total as u64),
    })
  }

  async fn stats(&self, scope: Scope) -> Result<ContactStats> {
    // RFC 3339 UTC strings sort chronologically, so the window bound is a
    // plain string comparison.
    let cutoff = encode_dt(Utc::now() - Duration::days(30));
    let (filter, owner) = scope.filter();

    let sql = format!(
      "SELECT
         COUNT(*),
         COALESCE(SUM(CASE WHEN status = 'new'      THEN 1 ELSE 0 END), 0),
         COALESCE(SUM(CASE WHEN status = 'read'     THEN 1 ELSE 0 END), 0),
         COALESCE(SUM(CASE WHEN status = 'replied'  THEN 1 ELSE 0 END), 0),
         COALESCE(SUM(CASE WHEN status = 'archived' THEN 1 ELSE 0 END), 0),
         COALESCE(SUM(CASE WHEN is_read = 0         THEN 1 ELSE 0 END), 0),
         COALESCE(SUM(CASE WHEN created_at >= ?     THEN 1 ELSE 0 END), 0)
       FROM contacts WHERE {filter}"
    );

    let row: (i64, i64, i64, i64, i64, i64, i64) = self
      .conn
      .call(move |conn| {
        let mut binds: Vec<&dyn ToSql> = vec![&cutoff];
        if let Some(o) = &owner {
          binds.push(o);
        }
        Ok(conn.query_row(&sql, &binds[..], |r| {
          Ok((
            r.get(0)?,
            r.get(1)?,
            r.get(2)?,
            r.get(3)?,
            r.get(4)?,
            r.get(5)?,
            r.get(6)?,
          ))
        })?)
      })
      .await?;

    Ok(ContactStats {
      total:        row.0 as u64,
      new:          row.1 as u64,
      read:         row.2 as u64,
      replied:      row.3 as u64,
      archived:     row.4 as u64,
      unread:       row.5 as u64,
      last_30_days: row.6 as u64,
    })
  }
}

// ─── ContactStore impl ───────────────────────────────────────────────────────

impl ContactStore for SqliteStore {
  type Error = Error;

  async fn create_contact(&self, input: NewContact) -> Result<Contact> {
    // Re-validate at the boundary so the lowercase-email invariant holds no
    // matter which caller reaches the store.
    let input = input.validated()?;
    let now = Utc::now();
    let contact = Contact {
      contact_id: Uuid::new_v4(),
      name:       input.name,
      email:      input.email,
      topic:      input.topic,
      message:    input.message,
      owner_id:   input.owner_id,
      status:     ContactStatus::New,
      is_read:    false,
      ip_address: input.ip_address,
      user_agent: input.user_agent,
      created_at: now,
      updated_at: now,
    };

    let id_str = encode_uuid(contact.contact_id);
    let owner_str = contact.owner_id.map(encode_uuid);
    let topic_str = encode_topic(contact.topic).to_owned();
    let status_str = encode_status(contact.status).to_owned();
    let at_str = encode_dt(now);
    let row = contact.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO contacts (
             contact_id, name, email, topic, message, owner_id, status,
             is_read, ip_address, user_agent, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
          rusqlite::params![
            id_str,
            row.name,
            row.email,
            topic_str,
            row.message,
            owner_str,
            status_str,
            row.is_read,
            row.ip_address,
            row.user_agent,
            at_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    self.publish(ContactEvent::created(contact.clone()));
    Ok(contact)
  }

  async fn contact_by_id(&self, owner: Option<Uuid>, id: Uuid) -> Result<Option<Contact>> {
    self.contact_one(Scope::Owned(owner), id).await
  }

  async fn update_status(
    &self,
    owner: Option<Uuid>,
    id: Uuid,
    status: ContactStatus,
  ) -> Result<Option<Contact>> {
    self.status_update(Scope::Owned(owner), id, status).await
  }

  async fn update_contact(
    &self,
    owner: Option<Uuid>,
    id: Uuid,
    edit: ContactEdit,
  ) -> Result<Option<Contact>> {
    self.edit_update(Scope::Owned(owner), id, edit).await
  }

  async fn delete_contact(&self, owner: Option<Uuid>, id: Uuid) -> Result<Option<Contact>> {
    self.delete_one(Scope::Owned(owner), id).await
  }

  async fn list_contacts(
    &self,
    owner: Option<Uuid>,
    query: &ContactQuery,
  ) -> Result<ContactPage> {
    self.list_page(Scope::Owned(owner), query).await
  }

  async fn aggregate_stats(&self, owner: Option<Uuid>) -> Result<ContactStats> {
    self.stats(Scope::Owned(owner)).await
  }
}

// ─── ContactAdminStore impl ──────────────────────────────────────────────────

impl ContactAdminStore for SqliteStore {
  type Error = Error;

  async fn list_all(&self, query: &ContactQuery) -> Result<ContactPage> {
    self.list_page(Scope::Global, query).await
  }

  async fn stats_all(&self) -> Result<ContactStats> {
    self.stats(Scope::Global).await
  }

  async fn contact_by_id_any(&self, id: Uuid) -> Result<Option<Contact>> {
    self.contact_one(Scope::Global, id).await
  }

  async fn update_status_any(
    &self,
    id: Uuid,
    status: ContactStatus,
  ) -> Result<Option<Contact>> {
    self.status_update(Scope::Global, id, status).await
  }

  async fn update_contact_any(
    &self,
    id: Uuid,
    edit: ContactEdit,
  ) -> Result<Option<Contact>> {
    self.edit_update(Scope::Global, id, edit).await
  }

  async fn delete_contact_any(&self, id: Uuid) -> Result<Option<Contact>> {
    self.delete_one(Scope::Global, id).await
  }

  async fn export_all(&self) -> Result<Vec<Contact>> {
    let sql = format!(
      "SELECT {} FROM contacts ORDER BY created_at DESC",
      RawContact::COLUMNS
    );

    let raws: Vec<RawContact> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let raws = stmt
          .query_map([], RawContact::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(raws)
      })
      .await?;

    raws.into_iter().map(RawContact::into_contact).collect()
  }
}

// ─── AccountStore impl ───────────────────────────────────────────────────────

impl AccountStore for SqliteStore {
  type Error = Error;

  async fn create_account(&self, input: NewAccount) -> Result<Account> {
    let input = input.validated()?;
    let now = Utc::now();
    let account = Account {
      account_id:    Uuid::new_v4(),
      provider_id:   input.provider_id,
      email:         input.email,
      name:          input.name,
      avatar_url:    input.avatar_url,
      role:          input.role,
      is_active:     true,
      password_hash: input.password_hash,
      created_at:    now,
      updated_at:    now,
    };

    let id_str = encode_uuid(account.account_id);
    let role_str = encode_role(account.role).to_owned();
    let at_str = encode_dt(now);
    let row = account.clone();

    let taken: bool = self
      .conn
      .call({
        let email = account.email.clone();
        move |conn| {
          let exists: bool = conn
            .query_row(
              "SELECT 1 FROM accounts WHERE email = ?1",
              [&email],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
          Ok(exists)
        }
      })
      .await?;
    if taken {
      return Err(Error::EmailTaken(account.email));
    }

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO accounts (
             account_id, provider_id, email, name, avatar_url, role,
             is_active, password_hash, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
          rusqlite::params![
            id_str,
            row.provider_id,
            row.email,
            row.name,
            row.avatar_url,
            role_str,
            row.is_active,
            row.password_hash,
            at_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(account)
  }

  async fn account_by_id(&self, id: Uuid) -> Result<Option<Account>> {
    let id_str = encode_uuid(id);
    let sql = format!(
      "SELECT {} FROM accounts WHERE account_id = ?1",
      RawAccount::COLUMNS
    );

    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, [&id_str], RawAccount::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAccount::into_account).transpose()
  }

  async fn account_by_email(&self, email: &str) -> Result<Option<Account>> {
    let email = hark_core::contact::normalize_email(email);
    let sql = format!(
      "SELECT {} FROM accounts WHERE email = ?1",
      RawAccount::COLUMNS
    );

    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, [&email], RawAccount::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAccount::into_account).transpose()
  }

  async fn account_by_provider_id(&self, provider_id: &str) -> Result<Option<Account>> {
    let pid = provider_id.to_owned();
    let sql = format!(
      "SELECT {} FROM accounts WHERE provider_id = ?1",
      RawAccount::COLUMNS
    );

    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, [&pid], RawAccount::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAccount::into_account).transpose()
  }

  async fn set_active(&self, id: Uuid, active: bool) -> Result<Option<Account>> {
    let id_str = encode_uuid(id);
    let now_str = encode_dt(Utc::now());
    let sql = format!(
      "SELECT {} FROM accounts WHERE account_id = ?1",
      RawAccount::COLUMNS
    );

    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE accounts SET is_active = ?1, updated_at = ?2 WHERE account_id = ?3",
          rusqlite::params![active, now_str, id_str],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(
          conn
            .query_row(&sql, [&id_str], RawAccount::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAccount::into_account).transpose()
  }
}

// ─── ContactFeed impl ────────────────────────────────────────────────────────

impl ContactFeed for SqliteStore {
  fn watch(&self) -> Option<broadcast::Receiver<ContactEvent>> {
    Some(self.feed_tx.subscribe())
  }
}

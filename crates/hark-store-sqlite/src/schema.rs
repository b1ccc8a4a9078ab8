//! SQL schema for the Hark SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS accounts (
    account_id    TEXT PRIMARY KEY,
    provider_id   TEXT UNIQUE,            -- external identity-provider subject
    email         TEXT NOT NULL UNIQUE,   -- stored lowercase
    name          TEXT NOT NULL,
    avatar_url    TEXT,
    role          TEXT NOT NULL DEFAULT 'user',  -- 'user' | 'admin'
    is_active     INTEGER NOT NULL DEFAULT 1,
    password_hash TEXT,                   -- argon2 PHC string
    created_at    TEXT NOT NULL,          -- ISO 8601 UTC; server-assigned
    updated_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS contacts (
    contact_id  TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    email       TEXT NOT NULL,            -- stored lowercase
    topic       TEXT NOT NULL DEFAULT 'general',
    message     TEXT NOT NULL,
    owner_id    TEXT REFERENCES accounts(account_id),  -- NULL = anonymous
    status      TEXT NOT NULL DEFAULT 'new',
    is_read     INTEGER NOT NULL DEFAULT 0,
    ip_address  TEXT,
    user_agent  TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS contacts_email_idx   ON contacts(email);
CREATE INDEX IF NOT EXISTS contacts_owner_idx   ON contacts(owner_id);
CREATE INDEX IF NOT EXISTS contacts_status_idx  ON contacts(status);
CREATE INDEX IF NOT EXISTS contacts_created_idx ON contacts(created_at DESC);
CREATE INDEX IF NOT EXISTS accounts_created_idx ON accounts(created_at DESC);

PRAGMA user_version = 1;
";

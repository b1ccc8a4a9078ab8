//! Async HTTP client wrapping the Hark JSON API.

use anyhow::{Context, Result, anyhow};
use hark_core::{
  account::Account,
  contact::{Contact, ContactStatus},
  stats::ContactStats,
  store::Pagination,
};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

/// Connection settings for the Hark API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  /// Bearer token; obtained up front or via [`ApiClient::login`].
  pub token:    Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
  data: T,
}

#[derive(Debug, Deserialize)]
struct ListEnvelope {
  data:       Vec<Contact>,
  pagination: Pagination,
}

#[derive(Debug, Deserialize)]
struct SessionEnvelope {
  data: SessionData,
}

#[derive(Debug, Deserialize)]
struct SessionData {
  token: String,
}

/// Async HTTP client for the Hark JSON REST API.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{path}", self.config.base_url.trim_end_matches('/'))
  }

  fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    match &self.config.token {
      Some(token) => req.bearer_auth(token),
      None => req,
    }
  }

  // ── Auth ──────────────────────────────────────────────────────────────────

  /// `POST /auth/login` — stores the returned token for later calls.
  pub async fn login(&mut self, email: &str, password: &str) -> Result<()> {
    let resp = self
      .client
      .post(self.url("/auth/login"))
      .json(&serde_json::json!({ "email": email, "password": password }))
      .send()
      .await
      .context("POST /auth/login failed")?;

    if !resp.status().is_success() {
      return Err(anyhow!("POST /auth/login → {}", resp.status()));
    }
    let session: SessionEnvelope =
      resp.json().await.context("deserialising login response")?;
    self.config.token = Some(session.data.token);
    Ok(())
  }

  /// `GET /auth/me`
  pub async fn me(&self) -> Result<Account> {
    let resp = self
      .auth(self.client.get(self.url("/auth/me")))
      .send()
      .await
      .context("GET /auth/me failed")?;

    if !resp.status().is_success() {
      return Err(anyhow!("GET /auth/me → {}", resp.status()));
    }
    let envelope: Envelope<Account> =
      resp.json().await.context("deserialising account")?;
    Ok(envelope.data)
  }

  // ── Contacts ──────────────────────────────────────────────────────────────

  /// `GET /api/contacts?page&limit`
  pub async fn list_contacts(
    &self,
    page: u32,
    limit: u32,
  ) -> Result<(Vec<Contact>, Pagination)> {
    let resp = self
      .auth(self.client.get(self.url("/api/contacts")))
      .query(&[("page", page.to_string()), ("limit", limit.to_string())])
      .send()
      .await
      .context("GET /api/contacts failed")?;

    if !resp.status().is_success() {
      return Err(anyhow!("GET /api/contacts → {}", resp.status()));
    }
    let list: ListEnvelope =
      resp.json().await.context("deserialising contacts")?;
    Ok((list.data, list.pagination))
  }

  /// `GET /api/contacts/stats`
  pub async fn get_stats(&self) -> Result<ContactStats> {
    let resp = self
      .auth(self.client.get(self.url("/api/contacts/stats")))
      .send()
      .await
      .context("GET /api/contacts/stats failed")?;

    if !resp.status().is_success() {
      return Err(anyhow!("GET /api/contacts/stats → {}", resp.status()));
    }
    let envelope: Envelope<ContactStats> =
      resp.json().await.context("deserialising stats")?;
    Ok(envelope.data)
  }

  /// `PATCH /api/contacts/:id/status`
  pub async fn update_status(
    &self,
    id: Uuid,
    status: ContactStatus,
  ) -> Result<Contact> {
    let resp = self
      .auth(
        self
          .client
          .patch(self.url(&format!("/api/contacts/{id}/status"))),
      )
      .json(&serde_json::json!({ "status": status }))
      .send()
      .await
      .context("PATCH status failed")?;

    if !resp.status().is_success() {
      return Err(anyhow!("PATCH /api/contacts/{id}/status → {}", resp.status()));
    }
    let envelope: Envelope<Contact> =
      resp.json().await.context("deserialising updated contact")?;
    Ok(envelope.data)
  }

  /// `DELETE /api/contacts/:id`
  pub async fn delete_contact(&self, id: Uuid) -> Result<()> {
    let resp = self
      .auth(self.client.delete(self.url(&format!("/api/contacts/{id}"))))
      .send()
      .await
      .context("DELETE contact failed")?;

    if !resp.status().is_success() {
      return Err(anyhow!("DELETE /api/contacts/{id} → {}", resp.status()));
    }
    Ok(())
  }

  /// `GET /api/contacts/export` — raw CSV text.
  pub async fn export_csv(&self) -> Result<String> {
    let resp = self
      .auth(self.client.get(self.url("/api/contacts/export")))
      .send()
      .await
      .context("GET /api/contacts/export failed")?;

    if !resp.status().is_success() {
      return Err(anyhow!("GET /api/contacts/export → {}", resp.status()));
    }
    resp.text().await.context("reading CSV body")
  }
}

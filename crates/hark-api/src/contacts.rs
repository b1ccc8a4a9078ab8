//! Handlers for `/contacts` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/contacts` | Public; optional bearer token sets the owner |
//! | `GET`    | `/contacts` | Admin; `?page&limit&status&search` |
//! | `GET`    | `/contacts/:id` | Admin; 404 if absent |
//! | `PUT`    | `/contacts/:id` | Admin; full edit of submitted fields |
//! | `PATCH`  | `/contacts/:id/status` | Admin; body `{"status":"read"}` |
//! | `DELETE` | `/contacts/:id` | Admin |
//!
//! Mutating handlers fire the change notifier only after the store call
//! succeeds, so failed persistence never produces an event.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{HeaderMap, StatusCode, header},
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use hark_core::{
  contact::{Contact, ContactEdit, ContactStatus, NewContact, Topic},
  store::{
    ContactAdminStore as _, ContactQuery, ContactStore as _, Pagination,
  },
};

use crate::{
  ApiError, ApiResponse, ApiState, StoreBundle,
  auth::{AdminOnly, MaybeAccount},
  store_err,
};

// ─── Submit ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SubmitBody {
  pub name:    String,
  pub email:   String,
  #[serde(default)]
  pub subject: Topic,
  pub message: String,
}

/// Best-effort client address: proxy headers only. Deployments terminate TLS
/// behind a proxy, so the socket address would be the proxy's anyway.
fn client_ip(headers: &HeaderMap) -> Option<String> {
  let forwarded = headers
    .get("x-forwarded-for")
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.split(',').next())
    .map(|v| v.trim().to_owned())
    .filter(|v| !v.is_empty());
  forwarded.or_else(|| {
    headers
      .get("x-real-ip")
      .and_then(|v| v.to_str().ok())
      .map(str::to_owned)
  })
}

/// `POST /contacts` — the public form submission endpoint.
pub async fn submit<S>(
  State(state): State<ApiState<S>>,
  MaybeAccount(account): MaybeAccount,
  headers: HeaderMap,
  Json(body): Json<SubmitBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: StoreBundle,
{
  // Validation happens before any mutation; invalid submissions never reach
  // the store or the notifier.
  let input = NewContact {
    name:       body.name,
    email:      body.email,
    topic:      body.subject,
    message:    body.message,
    owner_id:   account.as_ref().map(|a| a.account_id),
    ip_address: client_ip(&headers),
    user_agent: headers
      .get(header::USER_AGENT)
      .and_then(|v| v.to_str().ok())
      .map(str::to_owned),
  }
  .validated()?;

  let contact = state
    .store
    .create_contact(input)
    .await
    .map_err(store_err)?;

  info!(name = %contact.name, email = %contact.email, "new contact submitted");
  state.notify(|n| n.contact_created(&contact));

  Ok((
    StatusCode::CREATED,
    Json(ApiResponse::with_message(
      contact,
      "Contact form submitted successfully",
    )),
  ))
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub page:   Option<u32>,
  pub limit:  Option<u32>,
  pub status: Option<ContactStatus>,
  pub search: Option<String>,
}

/// Paginated list response — the same shape the dashboard's initial load and
/// every poll-cycle re-fetch consume.
#[derive(Debug, Serialize)]
pub struct ListResponse {
  pub success:    bool,
  pub data:       Vec<Contact>,
  pub pagination: Pagination,
}

/// `GET /contacts?page&limit&status&search`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  AdminOnly(_): AdminOnly,
  Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>, ApiError>
where
  S: StoreBundle,
{
  let query = ContactQuery {
    page:   params.page.unwrap_or(1),
    limit:  params.limit.unwrap_or(0),
    status: params.status,
    search: params.search,
  };

  let page = state.store.list_all(&query).await.map_err(store_err)?;
  Ok(Json(ListResponse {
    success:    true,
    data:       page.data,
    pagination: page.pagination,
  }))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /contacts/:id`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  AdminOnly(_): AdminOnly,
  Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Contact>>, ApiError>
where
  S: StoreBundle,
{
  let contact = state
    .store
    .contact_by_id_any(id)
    .await
    .map_err(store_err)?
    .ok_or(ApiError::ContactNotFound)?;
  Ok(Json(ApiResponse::new(contact)))
}

// ─── Update status ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: ContactStatus,
}

/// `PATCH /contacts/:id/status`
pub async fn update_status<S>(
  State(state): State<ApiState<S>>,
  AdminOnly(_): AdminOnly,
  Path(id): Path<Uuid>,
  Json(body): Json<StatusBody>,
) -> Result<Json<ApiResponse<Contact>>, ApiError>
where
  S: StoreBundle,
{
  let contact = state
    .store
    .update_status_any(id, body.status)
    .await
    .map_err(store_err)?
    .ok_or(ApiError::ContactNotFound)?;

  info!(%id, status = ?body.status, "contact status updated");
  state.notify(|n| n.contact_updated(&contact));

  Ok(Json(ApiResponse::with_message(
    contact,
    "Contact status updated successfully",
  )))
}

// ─── Full edit ───────────────────────────────────────────────────────────────

/// `PUT /contacts/:id` — replace the submitted fields wholesale.
pub async fn edit<S>(
  State(state): State<ApiState<S>>,
  AdminOnly(_): AdminOnly,
  Path(id): Path<Uuid>,
  Json(body): Json<ContactEdit>,
) -> Result<Json<ApiResponse<Contact>>, ApiError>
where
  S: StoreBundle,
{
  let edit = body.validated()?;

  let contact = state
    .store
    .update_contact_any(id, edit)
    .await
    .map_err(store_err)?
    .ok_or(ApiError::ContactNotFound)?;

  state.notify(|n| n.contact_updated(&contact));
  Ok(Json(ApiResponse::with_message(
    contact,
    "Contact updated successfully",
  )))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
  pub success: bool,
  pub message: &'static str,
}

/// `DELETE /contacts/:id`
pub async fn delete<S>(
  State(state): State<ApiState<S>>,
  AdminOnly(_): AdminOnly,
  Path(id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, ApiError>
where
  S: StoreBundle,
{
  let removed = state
    .store
    .delete_contact_any(id)
    .await
    .map_err(store_err)?
    .ok_or(ApiError::ContactNotFound)?;

  info!(%id, "contact deleted");
  // The removed record still carries the owner, so the delete event routes
  // to the right room.
  state.notify(|n| n.contact_deleted(&removed));

  Ok(Json(DeleteResponse {
    success: true,
    message: "Contact deleted successfully",
  }))
}

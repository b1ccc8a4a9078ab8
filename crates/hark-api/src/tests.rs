//! Router-level integration tests against an in-memory SQLite store, with a
//! live room registry so realtime delivery is exercised end to end.

use std::sync::Arc;

use axum::{
  body::Body,
  http::{Request, StatusCode, header},
};
use hark_core::{
  account::{NewAccount, Role},
  contact::ContactStatus,
  event::ContactChange,
  store::{AccountStore, ContactAdminStore, ContactStore},
};
use hark_realtime::{ChangeNotifier, RoomRegistry};
use hark_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;
use uuid::Uuid;

use crate::{ApiState, AuthKeys, api_router};

async fn make_state() -> (ApiState<SqliteStore>, Arc<RoomRegistry>) {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let registry = Arc::new(RoomRegistry::new());
  let state = ApiState {
    store:    Arc::new(store),
    auth:     Arc::new(AuthKeys::from_secret(b"test-secret", 1)),
    notifier: Some(ChangeNotifier::new(registry.clone())),
  };
  (state, registry)
}

/// Create an account and mint a token for it.
async fn account_with_token(
  state: &ApiState<SqliteStore>,
  email: &str,
  role: Role,
) -> (Uuid, String) {
  let account = state
    .store
    .create_account(NewAccount {
      provider_id:   None,
      email:         email.into(),
      name:          "Test Account".into(),
      avatar_url:    None,
      role,
      password_hash: Some("$argon2id$stub".into()),
    })
    .await
    .unwrap();
  let token = state.auth.issue(account.account_id).unwrap();
  (account.account_id, token)
}

async fn request(
  state: &ApiState<SqliteStore>,
  method: &str,
  uri: &str,
  token: Option<&str>,
  body: Option<Value>,
) -> axum::response::Response {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(token) = token {
    builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
  }
  let req = match body {
    Some(value) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(value.to_string())),
    None => builder.body(Body::empty()),
  }
  .unwrap();
  api_router(state.clone()).oneshot(req).await.unwrap()
}

async fn body_json(resp: axum::response::Response) -> Value {
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  serde_json::from_slice(&bytes).unwrap()
}

fn demo_submission() -> Value {
  json!({
    "name": "Jane Doe",
    "email": "jane@example.com",
    "subject": "demo",
    "message": "Please schedule a demo for our team"
  })
}

// ─── Submission ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn authenticated_submission_is_owned_and_targets_the_owner_room() {
  let (state, registry) = make_state().await;
  let (owner_id, token) = account_with_token(&state, "x@example.com", Role::User).await;

  // X has an open dashboard; somebody else does too.
  let (owner_session, mut owner_rx) = registry.register_session();
  registry.join_account_room(owner_session, Some(owner_id));
  let (other_session, mut other_rx) = registry.register_session();
  registry.join_account_room(other_session, Some(Uuid::new_v4()));

  let resp =
    request(&state, "POST", "/contacts", Some(&token), Some(demo_submission()))
      .await;
  assert_eq!(resp.status(), StatusCode::CREATED);

  let body = body_json(resp).await;
  assert_eq!(body["success"], true);
  assert_eq!(body["data"]["status"], "new");
  assert_eq!(body["data"]["subject"], "demo");
  assert_eq!(body["data"]["owner_id"], owner_id.to_string());

  // The envelope reaches only X's room.
  let event = owner_rx.try_recv().expect("owner dashboard receives the event");
  assert!(matches!(
    &event.change,
    ContactChange::Created { contact } if contact.status == ContactStatus::New
  ));
  assert!(other_rx.try_recv().is_err());

  // X's stats reflect the new submission.
  let stats = state.store.aggregate_stats(Some(owner_id)).await.unwrap();
  assert_eq!((stats.total, stats.new, stats.last_30_days), (1, 1, 1));
}

#[tokio::test]
async fn anonymous_submission_is_unowned_and_broadcasts() {
  let (state, registry) = make_state().await;

  let (joined, mut joined_rx) = registry.register_session();
  registry.join_account_room(joined, Some(Uuid::new_v4()));
  let (_plain, mut plain_rx) = registry.register_session();

  let resp = request(&state, "POST", "/contacts", None, Some(demo_submission())).await;
  assert_eq!(resp.status(), StatusCode::CREATED);

  let body = body_json(resp).await;
  assert_eq!(body["data"]["owner_id"], Value::Null);

  // No account to target, so every connected dashboard hears about it.
  assert!(joined_rx.try_recv().is_ok());
  assert!(plain_rx.try_recv().is_ok());
}

#[tokio::test]
async fn invalid_submission_is_rejected_before_any_mutation_or_event() {
  let (state, registry) = make_state().await;
  let (_session, mut rx) = registry.register_session();

  let resp = request(
    &state,
    "POST",
    "/contacts",
    None,
    Some(json!({
      "name": "Jane Doe",
      "email": "jane@example.com",
      "subject": "demo",
      "message": "short"
    })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

  let body = body_json(resp).await;
  assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

  assert!(rx.try_recv().is_err(), "no event for a rejected submission");
  let stats = state.store.stats_all().await.unwrap();
  assert_eq!(stats.total, 0, "nothing persisted");
}

#[tokio::test]
async fn submission_with_bad_token_still_succeeds_unowned() {
  let (state, _registry) = make_state().await;

  let resp = request(
    &state,
    "POST",
    "/contacts",
    Some("not-a-jwt"),
    Some(demo_submission()),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::CREATED);

  let body = body_json(resp).await;
  assert_eq!(body["data"]["owner_id"], Value::Null);
}

// ─── Authorization ───────────────────────────────────────────────────────────

#[tokio::test]
async fn admin_endpoints_require_a_token() {
  let (state, _) = make_state().await;

  for uri in ["/contacts", "/contacts/stats", "/contacts/export"] {
    let resp = request(&state, "GET", uri, None, None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");
    let body = body_json(resp).await;
    assert_eq!(body["error"]["code"], "TOKEN_MISSING", "{uri}");
  }
}

#[tokio::test]
async fn admin_endpoints_reject_plain_users() {
  let (state, _) = make_state().await;
  let (_, token) = account_with_token(&state, "user@example.com", Role::User).await;

  let resp = request(&state, "GET", "/contacts", Some(&token), None).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  let body = body_json(resp).await;
  assert_eq!(body["error"]["code"], "INSUFFICIENT_PERMISSIONS");
}

#[tokio::test]
async fn garbage_and_deactivated_tokens_are_unauthorized() {
  let (state, _) = make_state().await;

  let resp = request(&state, "GET", "/contacts", Some("garbage"), None).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  assert_eq!(body_json(resp).await["error"]["code"], "TOKEN_INVALID");

  let (admin_id, token) =
    account_with_token(&state, "admin@example.com", Role::Admin).await;
  state.store.set_active(admin_id, false).await.unwrap();

  let resp = request(&state, "GET", "/contacts", Some(&token), None).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  assert_eq!(body_json(resp).await["error"]["code"], "USER_INVALID");
}

// ─── Listing & stats ─────────────────────────────────────────────────────────

#[tokio::test]
async fn list_is_paginated_newest_first() {
  let (state, _) = make_state().await;
  let (_, token) = account_with_token(&state, "admin@example.com", Role::Admin).await;

  for i in 0..3 {
    let mut body = demo_submission();
    body["name"] = json!(format!("Contact {i}"));
    request(&state, "POST", "/contacts", None, Some(body)).await;
  }

  let resp = request(&state, "GET", "/contacts?limit=2", Some(&token), None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = body_json(resp).await;

  assert_eq!(body["success"], true);
  assert_eq!(body["data"].as_array().unwrap().len(), 2);
  assert_eq!(body["data"][0]["name"], "Contact 2");
  assert_eq!(body["pagination"]["total"], 3);
  assert_eq!(body["pagination"]["pages"], 2);
  assert_eq!(body["pagination"]["has_next"], true);
}

#[tokio::test]
async fn stats_endpoint_returns_the_aggregate_shape() {
  let (state, _) = make_state().await;
  let (_, token) = account_with_token(&state, "admin@example.com", Role::Admin).await;
  request(&state, "POST", "/contacts", None, Some(demo_submission())).await;

  let resp = request(&state, "GET", "/contacts/stats", Some(&token), None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = body_json(resp).await;

  assert_eq!(body["data"]["total"], 1);
  assert_eq!(body["data"]["new"], 1);
  assert_eq!(body["data"]["unread"], 1);
  assert_eq!(body["data"]["last30Days"], 1);
}

#[tokio::test]
async fn get_missing_contact_returns_404() {
  let (state, _) = make_state().await;
  let (_, token) = account_with_token(&state, "admin@example.com", Role::Admin).await;

  let resp = request(
    &state,
    "GET",
    &format!("/contacts/{}", Uuid::new_v4()),
    Some(&token),
    None,
  )
  .await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  assert_eq!(body_json(resp).await["error"]["code"], "CONTACT_NOT_FOUND");
}

// ─── Mutations & realtime ────────────────────────────────────────────────────

#[tokio::test]
async fn status_update_replaces_the_row_and_notifies_the_owner_room_only() {
  let (state, registry) = make_state().await;
  let (owner_id, owner_token) =
    account_with_token(&state, "y@example.com", Role::User).await;
  let (_, admin_token) =
    account_with_token(&state, "admin@example.com", Role::Admin).await;

  let resp = request(
    &state,
    "POST",
    "/contacts",
    Some(&owner_token),
    Some(demo_submission()),
  )
  .await;
  let contact_id = body_json(resp).await["data"]["contact_id"]
    .as_str()
    .unwrap()
    .to_owned();

  let (owner_session, mut owner_rx) = registry.register_session();
  registry.join_account_room(owner_session, Some(owner_id));
  let (stranger_session, mut stranger_rx) = registry.register_session();
  registry.join_account_room(stranger_session, Some(Uuid::new_v4()));

  let resp = request(
    &state,
    "PATCH",
    &format!("/contacts/{contact_id}/status"),
    Some(&admin_token),
    Some(json!({"status": "replied"})),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(body_json(resp).await["data"]["status"], "replied");

  // The pushed representation is authoritative: whole record, new status.
  let event = owner_rx.try_recv().expect("owner room notified");
  assert!(matches!(
    &event.change,
    ContactChange::Updated { contact } if contact.status == ContactStatus::Replied
  ));
  assert!(stranger_rx.try_recv().is_err());

  // A stats re-fetch reflects the transition.
  let stats = state.store.aggregate_stats(Some(owner_id)).await.unwrap();
  assert_eq!((stats.new, stats.replied), (0, 1));
}

#[tokio::test]
async fn delete_fans_out_to_every_owner_session() {
  let (state, registry) = make_state().await;
  let (owner_id, owner_token) =
    account_with_token(&state, "y@example.com", Role::User).await;
  let (_, admin_token) =
    account_with_token(&state, "admin@example.com", Role::Admin).await;

  let resp = request(
    &state,
    "POST",
    "/contacts",
    Some(&owner_token),
    Some(demo_submission()),
  )
  .await;
  let contact_id = body_json(resp).await["data"]["contact_id"]
    .as_str()
    .unwrap()
    .to_owned();

  // Y has two open dashboard sessions; a third belongs to someone else.
  let (s1, mut rx1) = registry.register_session();
  let (s2, mut rx2) = registry.register_session();
  registry.join_account_room(s1, Some(owner_id));
  registry.join_account_room(s2, Some(owner_id));
  let (s3, mut rx3) = registry.register_session();
  registry.join_account_room(s3, Some(Uuid::new_v4()));

  let resp = request(
    &state,
    "DELETE",
    &format!("/contacts/{contact_id}"),
    Some(&admin_token),
    None,
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);

  for rx in [&mut rx1, &mut rx2] {
    let event = rx.try_recv().expect("both owner sessions receive the delete");
    assert!(matches!(
      &event.change,
      ContactChange::Deleted { contact_id: id } if id.to_string() == contact_id
    ));
  }
  assert!(rx3.try_recv().is_err());

  // A disconnected client reconciles on its next poll: the list no longer
  // contains the row.
  let resp = request(&state, "GET", "/contacts", Some(&admin_token), None).await;
  let body = body_json(resp).await;
  assert!(body["data"].as_array().unwrap().is_empty());

  // Deleting again is a 404, not a second event.
  let resp = request(
    &state,
    "DELETE",
    &format!("/contacts/{contact_id}"),
    Some(&admin_token),
    None,
  )
  .await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  assert!(rx1.try_recv().is_err());
}

#[tokio::test]
async fn full_edit_validates_and_notifies() {
  let (state, registry) = make_state().await;
  let (_, admin_token) =
    account_with_token(&state, "admin@example.com", Role::Admin).await;

  let resp = request(&state, "POST", "/contacts", None, Some(demo_submission())).await;
  let contact_id = body_json(resp).await["data"]["contact_id"]
    .as_str()
    .unwrap()
    .to_owned();

  let (_session, mut rx) = registry.register_session();

  // Invalid edit: rejected, no event.
  let resp = request(
    &state,
    "PUT",
    &format!("/contacts/{contact_id}"),
    Some(&admin_token),
    Some(json!({
      "name": "J",
      "email": "jane@example.com",
      "subject": "support",
      "message": "A perfectly valid replacement message"
    })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
  assert!(rx.try_recv().is_err());

  // Valid edit: replaced and broadcast (the contact is unowned).
  let resp = request(
    &state,
    "PUT",
    &format!("/contacts/{contact_id}"),
    Some(&admin_token),
    Some(json!({
      "name": "Jane Q. Doe",
      "email": "jane.doe@example.com",
      "subject": "support",
      "message": "A perfectly valid replacement message"
    })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = body_json(resp).await;
  assert_eq!(body["data"]["subject"], "support");

  let event = rx.try_recv().expect("edit broadcast");
  assert!(matches!(event.change, ContactChange::Updated { .. }));
}

// ─── Export ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn export_returns_csv_attachment() {
  let (state, _) = make_state().await;
  let (_, token) = account_with_token(&state, "admin@example.com", Role::Admin).await;

  let mut submission = demo_submission();
  submission["message"] = json!("Includes a comma, and a \"quote\" for escaping");
  request(&state, "POST", "/contacts", None, Some(submission)).await;

  let resp = request(&state, "GET", "/contacts/export", Some(&token), None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(
    resp.headers().get(header::CONTENT_TYPE).unwrap(),
    "text/csv"
  );
  assert_eq!(
    resp.headers().get(header::CONTENT_DISPOSITION).unwrap(),
    "attachment; filename=contacts.csv"
  );

  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let csv = std::str::from_utf8(&bytes).unwrap();
  assert!(csv.starts_with("Name,Email,Subject,Message,Status,Created At\n"));
  assert!(csv.contains("Jane Doe"));
  assert!(csv.contains("\"Includes a comma, and a \"\"quote\"\" for escaping\""));
}

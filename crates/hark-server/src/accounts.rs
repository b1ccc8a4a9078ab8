//! Account routes: registration, password login, current-account lookup,
//! and stateless logout. Identity is a verified token value threaded through
//! each call — there is no ambient session state.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::{
  Json, Router,
  extract::{FromRequestParts, State},
  http::{StatusCode, request::Parts},
  response::IntoResponse,
  routing::{get, post},
};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use hark_api::{ApiError, ApiResponse};
use hark_core::{
  account::{Account, NewAccount, Role},
  store::AccountStore,
};

use crate::AppState;

pub fn router(state: AppState) -> Router<()> {
  let mut router = Router::new()
    .route("/auth/register", post(register))
    .route("/auth/login", post(login))
    .route("/auth/me", get(me))
    .route("/auth/logout", post(logout));

  if state.oauth.is_some() {
    router = router
      .route("/auth/google", get(crate::oauth::begin))
      .route("/auth/google/callback", get(crate::oauth::callback));
  }

  router.with_state(state)
}

// ─── Bearer extractor ────────────────────────────────────────────────────────

/// The request carries a valid token for an active account.
pub struct Bearer(pub Account);

impl FromRequestParts<AppState> for Bearer {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState,
  ) -> Result<Self, Self::Rejection> {
    let token = parts
      .headers
      .get(axum::http::header::AUTHORIZATION)
      .and_then(|v| v.to_str().ok())
      .and_then(|v| v.strip_prefix("Bearer "))
      .ok_or(ApiError::TokenMissing)?;

    let account_id = state.auth.verify(token)?;
    let account = state
      .store
      .account_by_id(account_id)
      .await
      .map_err(|e| ApiError::Store(Box::new(e)))?
      .filter(|a| a.is_active)
      .ok_or(ApiError::AccountInvalid)?;

    Ok(Bearer(account))
  }
}

// ─── Password hashing ────────────────────────────────────────────────────────

pub const PASSWORD_MIN: usize = 6;

pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| ApiError::BadRequest(format!("password hashing failed: {e}")))
}

fn verify_password(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc)
    .and_then(|parsed| {
      Argon2::default().verify_password(password.as_bytes(), &parsed)
    })
    .is_ok()
}

// ─── Handlers ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SessionData {
  pub token:   String,
  pub account: Account,
}

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub name:     String,
  pub email:    String,
  pub password: String,
}

/// `POST /auth/register`
async fn register(
  State(state): State<AppState>,
  Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, ApiError> {
  if body.password.chars().count() < PASSWORD_MIN {
    return Err(ApiError::Validation {
      field:  "password",
      reason: format!("must be at least {PASSWORD_MIN} characters long"),
    });
  }

  let email = hark_core::contact::normalize_email(&body.email);
  if state
    .store
    .account_by_email(&email)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .is_some()
  {
    return Err(ApiError::EmailTaken);
  }

  let role = if state.config.admin_emails.iter().any(|a| a.eq_ignore_ascii_case(&email)) {
    Role::Admin
  } else {
    Role::User
  };

  let account = state
    .store
    .create_account(NewAccount {
      provider_id:   None,
      email,
      name:          body.name,
      avatar_url:    None,
      role,
      password_hash: Some(hash_password(&body.password)?),
    })
    .await
    .map_err(|e| match e {
      hark_store_sqlite::Error::EmailTaken(_) => ApiError::EmailTaken,
      hark_store_sqlite::Error::Core(core) => core.into(),
      other => ApiError::Store(Box::new(other)),
    })?;

  info!(email = %account.email, "account registered");
  let token = state.auth.issue(account.account_id)?;
  Ok((
    StatusCode::CREATED,
    Json(ApiResponse::new(SessionData { token, account })),
  ))
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub email:    String,
  pub password: String,
}

/// `POST /auth/login`
async fn login(
  State(state): State<AppState>,
  Json(body): Json<LoginBody>,
) -> Result<Json<ApiResponse<SessionData>>, ApiError> {
  let account = state
    .store
    .account_by_email(&body.email)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or(ApiError::BadCredentials)?;

  let ok = account
    .password_hash
    .as_deref()
    .is_some_and(|phc| verify_password(&body.password, phc));
  if !ok {
    return Err(ApiError::BadCredentials);
  }
  if !account.is_active {
    return Err(ApiError::AccountInvalid);
  }

  info!(email = %account.email, "account logged in");
  let token = state.auth.issue(account.account_id)?;
  Ok(Json(ApiResponse::new(SessionData { token, account })))
}

/// `GET /auth/me`
async fn me(Bearer(account): Bearer) -> Json<ApiResponse<Account>> {
  Json(ApiResponse::new(account))
}

/// `POST /auth/logout` — tokens are stateless; clients drop theirs.
async fn logout() -> Json<serde_json::Value> {
  Json(serde_json::json!({
    "success": true,
    "message": "Logged out successfully"
  }))
}

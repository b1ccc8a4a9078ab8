//! JWT bearer authentication.
//!
//! Tokens are HS256 with `sub` (account id), `iat`, and `exp` claims. Every
//! request verifies its own token and resolves the account from the store —
//! identity is a value threaded through the call, not ambient session state.

use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{
  Algorithm, DecodingKey, EncodingKey, Validation, decode, encode,
  errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use hark_core::{
  account::{Account, Role},
  store::AccountStore as _,
};

use crate::{ApiError, ApiState, StoreBundle};

/// Claims carried by a Hark access token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
  /// The account id, hyphenated.
  pub sub: String,
  pub iat: i64,
  pub exp: i64,
}

/// Signing and verification state for access tokens.
pub struct AuthKeys {
  encoding:   EncodingKey,
  decoding:   DecodingKey,
  validation: Validation,
  ttl:        Duration,
}

impl AuthKeys {
  /// HS256 keys from a shared secret, with the given token lifetime.
  pub fn from_secret(secret: &[u8], ttl_hours: i64) -> Self {
    Self {
      encoding:   EncodingKey::from_secret(secret),
      decoding:   DecodingKey::from_secret(secret),
      validation: Validation::new(Algorithm::HS256),
      ttl:        Duration::hours(ttl_hours),
    }
  }

  /// Issue a token for `account_id`.
  pub fn issue(&self, account_id: Uuid) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = Claims {
      sub: account_id.hyphenated().to_string(),
      iat: now.timestamp(),
      exp: (now + self.ttl).timestamp(),
    };
    encode(&jsonwebtoken::Header::default(), &claims, &self.encoding)
      .map_err(|e| ApiError::Store(Box::new(e)))
  }

  /// Verify a token and extract the account id.
  pub fn verify(&self, token: &str) -> Result<Uuid, ApiError> {
    let data = decode::<Claims>(token, &self.decoding, &self.validation)
      .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => ApiError::TokenExpired,
        _ => ApiError::TokenInvalid,
      })?;
    Uuid::parse_str(&data.claims.sub).map_err(|_| ApiError::TokenInvalid)
  }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
  parts
    .headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
}

async fn resolve_account<S>(
  state: &ApiState<S>,
  parts: &Parts,
) -> Result<Account, ApiError>
where
  S: StoreBundle,
{
  let token = bearer_token(parts).ok_or(ApiError::TokenMissing)?;
  let account_id = state.auth.verify(token)?;

  let account = state
    .store
    .account_by_id(account_id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or(ApiError::AccountInvalid)?;

  if !account.is_active {
    return Err(ApiError::AccountInvalid);
  }
  Ok(account)
}

/// Extractor: the request carries a valid token for an active account.
pub struct Authenticated(pub Account);

impl<S> FromRequestParts<ApiState<S>> for Authenticated
where
  S: StoreBundle,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &ApiState<S>,
  ) -> Result<Self, Self::Rejection> {
    resolve_account(state, parts).await.map(Authenticated)
  }
}

/// Extractor: like [`Authenticated`] but additionally requires admin role.
pub struct AdminOnly(pub Account);

impl<S> FromRequestParts<ApiState<S>> for AdminOnly
where
  S: StoreBundle,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &ApiState<S>,
  ) -> Result<Self, Self::Rejection> {
    let account = resolve_account(state, parts).await?;
    if account.role != Role::Admin {
      return Err(ApiError::Forbidden);
    }
    Ok(AdminOnly(account))
  }
}

/// Extractor for public endpoints: a valid token attributes the request to
/// its account; anything else (absent, expired, malformed, inactive) just
/// yields `None` — optional auth never rejects.
pub struct MaybeAccount(pub Option<Account>);

impl<S> FromRequestParts<ApiState<S>> for MaybeAccount
where
  S: StoreBundle,
{
  type Rejection = std::convert::Infallible;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &ApiState<S>,
  ) -> Result<Self, Self::Rejection> {
    Ok(MaybeAccount(resolve_account(state, parts).await.ok()))
  }
}

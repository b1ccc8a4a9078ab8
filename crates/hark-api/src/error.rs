//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Errors serialise as `{"error": {"message": …, "code": …}}` so the
//! dashboard can branch on the stable code rather than the message text.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("invalid {field}: {reason}")]
  Validation {
    field:  &'static str,
    reason: String,
  },

  #[error("contact not found")]
  ContactNotFound,

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("access token is required")]
  TokenMissing,

  #[error("invalid token")]
  TokenInvalid,

  #[error("token expired")]
  TokenExpired,

  #[error("invalid or inactive user")]
  AccountInvalid,

  #[error("invalid email or password")]
  BadCredentials,

  #[error("email already registered")]
  EmailTaken,

  #[error("insufficient permissions")]
  Forbidden,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  fn status_and_code(&self) -> (StatusCode, &'static str) {
    match self {
      ApiError::Validation { .. } => {
        (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR")
      }
      ApiError::ContactNotFound => (StatusCode::NOT_FOUND, "CONTACT_NOT_FOUND"),
      ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
      ApiError::TokenMissing => (StatusCode::UNAUTHORIZED, "TOKEN_MISSING"),
      ApiError::TokenInvalid => (StatusCode::UNAUTHORIZED, "TOKEN_INVALID"),
      ApiError::TokenExpired => (StatusCode::UNAUTHORIZED, "TOKEN_EXPIRED"),
      ApiError::AccountInvalid => (StatusCode::UNAUTHORIZED, "USER_INVALID"),
      ApiError::BadCredentials => (StatusCode::UNAUTHORIZED, "BAD_CREDENTIALS"),
      ApiError::EmailTaken => (StatusCode::CONFLICT, "EMAIL_TAKEN"),
      ApiError::Forbidden => {
        (StatusCode::FORBIDDEN, "INSUFFICIENT_PERMISSIONS")
      }
      ApiError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR"),
    }
  }
}

impl From<hark_core::Error> for ApiError {
  fn from(err: hark_core::Error) -> Self {
    match err {
      hark_core::Error::Validation { field, reason } => {
        ApiError::Validation { field, reason }
      }
      hark_core::Error::EmailTaken(_) => ApiError::EmailTaken,
      other => ApiError::Store(Box::new(other)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, code) = self.status_and_code();
    let body = json!({
      "success": false,
      "error": { "message": self.to_string(), "code": code }
    });
    (status, Json(body)).into_response()
  }
}

//! JSON REST API for Hark.
//!
//! Exposes an axum [`Router`] backed by any store implementing the core
//! traits. Transport and TLS are the caller's responsibility; authentication
//! is bearer-JWT, verified per request.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", hark_api::api_router(state))
//! ```

pub mod auth;
pub mod contacts;
pub mod error;
pub mod export;
pub mod stats;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, patch},
};
use hark_core::store::{AccountStore, ContactAdminStore, ContactStore};
use hark_realtime::ChangeNotifier;
use serde::Serialize;

pub use auth::AuthKeys;
pub use error::ApiError;

#[cfg(test)]
mod tests;

/// The full set of store capabilities the API needs, as a single bound.
pub trait StoreBundle:
  ContactStore + ContactAdminStore + AccountStore + 'static
{
}

impl<T> StoreBundle for T where
  T: ContactStore + ContactAdminStore + AccountStore + 'static
{
}

/// Shared state threaded through all API handlers.
pub struct ApiState<S> {
  pub store: Arc<S>,
  pub auth:  Arc<AuthKeys>,
  /// Present when the deployment uses synchronous emission. `None` means a
  /// feed observer owns emission instead — handlers then emit nothing, so
  /// events are never double-delivered.
  pub notifier: Option<ChangeNotifier>,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      store:    self.store.clone(),
      auth:     self.auth.clone(),
      notifier: self.notifier.clone(),
    }
  }
}

impl<S> ApiState<S> {
  /// Run `f` against the notifier when synchronous emission is active.
  /// Delivery is fire-and-forget; the response never waits on it.
  pub(crate) fn notify(&self, f: impl FnOnce(&ChangeNotifier)) {
    if let Some(notifier) = &self.notifier {
      f(notifier);
    }
  }
}

/// Success envelope used by every JSON endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
  pub success: bool,
  pub data:    T,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<&'static str>,
}

impl<T> ApiResponse<T> {
  pub fn new(data: T) -> Self {
    Self { success: true, data, message: None }
  }

  pub fn with_message(data: T, message: &'static str) -> Self {
    Self { success: true, data, message: Some(message) }
  }
}

pub(crate) fn store_err<E>(e: E) -> ApiError
where
  E: std::error::Error + Send + Sync + 'static,
{
  ApiError::Store(Box::new(e))
}

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type. `POST /contacts` is public; everything else
/// requires an admin bearer token.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: StoreBundle,
{
  Router::new()
    .route(
      "/contacts",
      get(contacts::list::<S>).post(contacts::submit::<S>),
    )
    .route("/contacts/stats", get(stats::handler::<S>))
    .route("/contacts/export", get(export::handler::<S>))
    .route(
      "/contacts/{id}",
      get(contacts::get_one::<S>)
        .put(contacts::edit::<S>)
        .delete(contacts::delete::<S>),
    )
    .route("/contacts/{id}/status", patch(contacts::update_status::<S>))
    .with_state(state)
}

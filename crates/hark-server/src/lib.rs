//! Hark server assembly: configuration, shared state, and the root router.

pub mod accounts;
pub mod oauth;


use std::{path::PathBuf, sync::Arc};

use axum::Router;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::info;

use hark_api::{ApiState, AuthKeys};
use hark_realtime::{ChangeNotifier, RoomRegistry, feed::spawn_feed_observer};
use hark_store_sqlite::SqliteStore;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Which component emits realtime envelopes. Exactly one is active per
/// deployment — wiring both would double-deliver every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RealtimeStrategy {
  /// API handlers notify right after each successful mutation (default).
  #[default]
  Synchronous,
  /// A spawned observer consumes the store's change feed instead.
  Feed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
  pub client_id:     String,
  pub client_secret: String,
  /// Absolute URL of `/auth/google/callback` as registered with Google.
  pub redirect_url:  String,
}

/// Runtime server configuration, deserialised from `config.toml` layered
/// with `HARK_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  pub host:          String,
  pub port:          u16,
  pub database_path: PathBuf,
  /// HMAC secret for access tokens.
  pub jwt_secret:    String,
  #[serde(default = "default_token_ttl_hours")]
  pub token_ttl_hours: i64,
  #[serde(default)]
  pub realtime_strategy: RealtimeStrategy,
  /// Base URL of the web client, for OAuth redirects back to the SPA.
  #[serde(default = "default_client_url")]
  pub client_url:    String,
  /// Accounts registering with one of these emails become admins.
  #[serde(default)]
  pub admin_emails:  Vec<String>,
  #[serde(default)]
  pub google:        Option<GoogleConfig>,
}

fn default_token_ttl_hours() -> i64 { 24 }

fn default_client_url() -> String { "http://localhost:3000".to_owned() }

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all server-level handlers.
pub struct AppState {
  pub store:    Arc<SqliteStore>,
  pub auth:     Arc<AuthKeys>,
  pub registry: Arc<RoomRegistry>,
  pub config:   Arc<ServerConfig>,
  pub oauth:    Option<Arc<oauth::GoogleClient>>,
}

impl Clone for AppState {
  fn clone(&self) -> Self {
    Self {
      store:    self.store.clone(),
      auth:     self.auth.clone(),
      registry: self.registry.clone(),
      config:   self.config.clone(),
      oauth:    self.oauth.clone(),
    }
  }
}

impl AppState {
  pub fn new(config: ServerConfig, store: SqliteStore) -> anyhow::Result<Self> {
    let oauth = config
      .google
      .as_ref()
      .map(oauth::GoogleClient::new)
      .transpose()?
      .map(Arc::new);

    Ok(Self {
      store:    Arc::new(store),
      auth:     Arc::new(AuthKeys::from_secret(
        config.jwt_secret.as_bytes(),
        config.token_ttl_hours,
      )),
      registry: Arc::new(RoomRegistry::new()),
      config:   Arc::new(config),
      oauth,
    })
  }
}

// ─── Router & realtime wiring ────────────────────────────────────────────────

/// Build the root router: auth routes, the JSON API under `/api`, and the
/// push channel at `/ws`.
pub fn router(state: &AppState) -> Router {
  // Synchronous strategy hands the API a notifier; feed strategy leaves it
  // without one, so emission stays single-sourced.
  let notifier = match state.config.realtime_strategy {
    RealtimeStrategy::Synchronous => {
      Some(ChangeNotifier::new(state.registry.clone()))
    }
    RealtimeStrategy::Feed => None,
  };

  let api_state = ApiState {
    store: state.store.clone(),
    auth: state.auth.clone(),
    notifier,
  };

  Router::new()
    .nest("/api", hark_api::api_router(api_state))
    .merge(hark_realtime::ws::router(state.registry.clone()))
    .merge(accounts::router(state.clone()))
    .layer(TraceLayer::new_for_http())
}

/// Start the feed observer when that strategy is configured.
pub fn spawn_realtime(state: &AppState) {
  if state.config.realtime_strategy == RealtimeStrategy::Feed {
    info!("realtime: feed-observer strategy");
    spawn_feed_observer((*state.store).clone(), state.registry.clone());
  } else {
    info!("realtime: synchronous emission strategy");
  }
}

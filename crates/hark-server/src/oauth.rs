//! Google OAuth sign-in: authorization-code flow with PKCE, then a userinfo
//! fetch and an account upsert.
//!
//! In-flight logins are tracked in an explicit process-local map keyed by the
//! CSRF state token (created at redirect, consumed once at callback) rather
//! than in ambient session middleware.

use std::{
  collections::HashMap,
  sync::Mutex,
  time::{Duration, Instant},
};

use anyhow::Context as _;
use axum::{
  extract::{Query, State},
  response::Redirect,
};
use oauth2::{
  AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
  PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope, TokenResponse as _,
  TokenUrl, basic::BasicClient,
};
use serde::Deserialize;
use tracing::{info, warn};

use hark_core::{
  account::{NewAccount, Role},
  store::AccountStore,
};

use crate::{AppState, GoogleConfig};

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// A pending login is abandoned after this long.
const PENDING_TTL: Duration = Duration::from_secs(600);

type ConfiguredClient = oauth2::Client<
  oauth2::StandardErrorResponse<oauth2::basic::BasicErrorResponseType>,
  oauth2::StandardTokenResponse<oauth2::EmptyExtraTokenFields, oauth2::basic::BasicTokenType>,
  oauth2::StandardTokenIntrospectionResponse<oauth2::EmptyExtraTokenFields, oauth2::basic::BasicTokenType>,
  oauth2::StandardRevocableToken,
  oauth2::StandardErrorResponse<oauth2::RevocationErrorResponseType>,
  oauth2::EndpointSet,
  oauth2::EndpointNotSet,
  oauth2::EndpointNotSet,
  oauth2::EndpointNotSet,
  oauth2::EndpointSet,
>;

/// The subset of the userinfo response we consume.
#[derive(Debug, Deserialize)]
pub struct GoogleProfile {
  pub sub:     String,
  pub email:   String,
  pub name:    Option<String>,
  pub picture: Option<String>,
}

pub struct GoogleClient {
  client:  ConfiguredClient,
  http:    reqwest::Client,
  /// CSRF state secret → (PKCE verifier, creation time).
  pending: Mutex<HashMap<String, (String, Instant)>>,
}

impl GoogleClient {
  pub fn new(config: &GoogleConfig) -> anyhow::Result<Self> {
    let client = BasicClient::new(ClientId::new(config.client_id.clone()))
      .set_client_secret(ClientSecret::new(config.client_secret.clone()))
      .set_auth_uri(AuthUrl::new(AUTH_URL.to_owned()).context("auth url")?)
      .set_token_uri(TokenUrl::new(TOKEN_URL.to_owned()).context("token url")?)
      .set_redirect_uri(
        RedirectUrl::new(config.redirect_url.clone())
          .context("invalid google.redirect_url")?,
      );

    let http = reqwest::ClientBuilder::new()
      .redirect(reqwest::redirect::Policy::none())
      .build()
      .context("building OAuth http client")?;

    Ok(Self { client, http, pending: Mutex::new(HashMap::new()) })
  }

  /// Build the provider redirect and remember the in-flight login.
  pub fn begin(&self) -> String {
    let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
    let (authorize_url, csrf_state) = self
      .client
      .authorize_url(CsrfToken::new_random)
      .add_scope(Scope::new("openid".to_owned()))
      .add_scope(Scope::new("profile".to_owned()))
      .add_scope(Scope::new("email".to_owned()))
      .set_pkce_challenge(pkce_challenge)
      .url();

    let mut pending = self.pending.lock().unwrap();
    pending.retain(|_, (_, created)| created.elapsed() < PENDING_TTL);
    pending.insert(
      csrf_state.secret().clone(),
      (pkce_verifier.secret().clone(), Instant::now()),
    );

    authorize_url.to_string()
  }

  /// Exchange the callback code for the Google profile. The CSRF state is
  /// single-use: it is removed from the pending map whether or not the
  /// exchange succeeds.
  pub async fn finish(
    &self,
    state: &str,
    code: String,
  ) -> anyhow::Result<GoogleProfile> {
    let (verifier, _) = self
      .pending
      .lock()
      .unwrap()
      .remove(state)
      .context("unknown or expired OAuth state")?;

    let token = self
      .client
      .exchange_code(AuthorizationCode::new(code))
      .set_pkce_verifier(PkceCodeVerifier::new(verifier))
      .request_async(&self.http)
      .await
      .context("code exchange failed")?;

    let profile: GoogleProfile = self
      .http
      .get(USERINFO_URL)
      .bearer_auth(token.access_token().secret())
      .send()
      .await
      .context("userinfo request failed")?
      .json()
      .await
      .context("userinfo response malformed")?;

    Ok(profile)
  }
}

// ─── Handlers ────────────────────────────────────────────────────────────────

/// `GET /auth/google` — redirect to the provider.
pub async fn begin(State(state): State<AppState>) -> Redirect {
  // The route is only mounted when oauth is configured.
  match state.oauth.as_ref() {
    Some(oauth) => Redirect::to(&oauth.begin()),
    None => Redirect::to(&state.config.client_url),
  }
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
  pub state: Option<String>,
  pub code:  Option<String>,
}

/// `GET /auth/google/callback` — finish the flow, upsert the account, and
/// hand the SPA a token. Failures bounce back to the login page; the
/// provider error is logged, never shown.
pub async fn callback(
  State(state): State<AppState>,
  Query(query): Query<CallbackQuery>,
) -> Redirect {
  let failure = format!("{}/login?error=auth_failed", state.config.client_url);

  let (Some(csrf), Some(code)) = (query.state, query.code) else {
    return Redirect::to(&failure);
  };
  let Some(oauth) = state.oauth.as_ref() else {
    return Redirect::to(&failure);
  };

  let profile = match oauth.finish(&csrf, code).await {
    Ok(profile) => profile,
    Err(err) => {
      warn!(%err, "google sign-in failed");
      return Redirect::to(&failure);
    }
  };

  let account = match upsert_account(&state, profile).await {
    Ok(account) => account,
    Err(err) => {
      warn!(%err, "account upsert failed after google sign-in");
      return Redirect::to(&failure);
    }
  };

  match state.auth.issue(account.account_id) {
    Ok(token) => Redirect::to(&format!(
      "{}/auth/callback?token={token}",
      state.config.client_url
    )),
    Err(_) => Redirect::to(&failure),
  }
}

/// Find the account for a Google profile, creating it on first sign-in.
/// Lookup order: provider subject, then (already-registered) email.
async fn upsert_account(
  state: &AppState,
  profile: GoogleProfile,
) -> anyhow::Result<hark_core::account::Account> {
  if let Some(account) = state.store.account_by_provider_id(&profile.sub).await? {
    return Ok(account);
  }
  if let Some(account) = state.store.account_by_email(&profile.email).await? {
    info!(email = %account.email, "existing account signed in via google");
    return Ok(account);
  }

  let role = if state
    .config
    .admin_emails
    .iter()
    .any(|a| a.eq_ignore_ascii_case(&profile.email))
  {
    Role::Admin
  } else {
    Role::User
  };

  let account = state
    .store
    .create_account(NewAccount {
      provider_id:   Some(profile.sub),
      email:         profile.email,
      name:          profile.name.unwrap_or_else(|| "Unnamed".to_owned()),
      avatar_url:    profile.picture,
      role,
      password_hash: None,
    })
    .await?;

  info!(email = %account.email, "new account created via google sign-in");
  Ok(account)
}

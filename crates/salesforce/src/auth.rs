//! OAuth token lifecycle.
//!
//! Tokens live in the host's [`SecretStore`]. The manager tracks where the
//! connection is in `Unauthenticated -> Authenticated -> Expired ->
//! Authenticated -> Revoked` and coalesces concurrent refreshes: callers that
//! saw a 401 with the same stale token share one refresh request.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use sfsync_core::secrets::{
    SecretStore, ACCESS_TOKEN_KEY, INSTANCE_URL_KEY, REFRESH_TOKEN_KEY,
};

use crate::config::SalesforceConfig;
use crate::error::{Result, SalesforceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    Unauthenticated,
    Authenticated,
    /// The access token was rejected and has not been refreshed yet.
    Expired,
    Revoked,
}

/// Token endpoint response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub instance_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: String,
    #[serde(default)]
    error_description: String,
}

pub struct TokenManager {
    http: reqwest::Client,
    config: SalesforceConfig,
    secrets: Arc<dyn SecretStore>,
    state: Mutex<AuthState>,
    refresh_lock: tokio::sync::Mutex<()>,
    refreshes: AtomicU64,
}

impl TokenManager {
    pub fn new(
        http: reqwest::Client,
        config: SalesforceConfig,
        secrets: Arc<dyn SecretStore>,
    ) -> Self {
        let initial = match secrets.get_secret(ACCESS_TOKEN_KEY) {
            Ok(Some(token)) if !token.is_empty() => AuthState::Authenticated,
            _ => AuthState::Unauthenticated,
        };
        Self {
            http,
            config,
            secrets,
            state: Mutex::new(initial),
            refresh_lock: tokio::sync::Mutex::new(()),
            refreshes: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
            .lock()
            .map(|state| *state)
            .unwrap_or(AuthState::Unauthenticated)
    }

    fn set_state(&self, next: AuthState) {
        if let Ok(mut state) = self.state.lock() {
            if *state != next {
                debug!("[Salesforce] Auth state {:?} -> {:?}", *state, next);
            }
            *state = next;
        }
    }

    pub(crate) fn mark_expired(&self) {
        self.set_state(AuthState::Expired);
    }

    /// Number of refresh requests sent so far.
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn access_token(&self) -> Result<String> {
        if self.state() == AuthState::Revoked {
            return Err(SalesforceError::auth("Salesforce connection was revoked"));
        }
        self.stored(ACCESS_TOKEN_KEY)?
            .ok_or_else(|| SalesforceError::auth("No Salesforce access token stored"))
    }

    pub fn instance_url(&self) -> Result<String> {
        self.stored(INSTANCE_URL_KEY)?
            .map(|url| url.trim_end_matches('/').to_string())
            .ok_or_else(|| SalesforceError::invalid_request("No Salesforce instance URL stored"))
    }

    fn stored(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .secrets
            .get_secret(key)?
            .filter(|value| !value.trim().is_empty()))
    }

    /// Persist tokens from an authorization or refresh response.
    ///
    /// An empty or missing refresh token never replaces the stored one.
    pub fn store_tokens(&self, tokens: &TokenResponse) -> Result<()> {
        self.secrets
            .set_secret(ACCESS_TOKEN_KEY, &tokens.access_token)?;
        if let Some(refresh) = tokens.refresh_token.as_deref().filter(|t| !t.is_empty()) {
            self.secrets.set_secret(REFRESH_TOKEN_KEY, refresh)?;
        }
        if let Some(url) = tokens.instance_url.as_deref().filter(|u| !u.is_empty()) {
            self.secrets.set_secret(INSTANCE_URL_KEY, url)?;
        }
        self.set_state(AuthState::Authenticated);
        Ok(())
    }

    /// Obtain a fresh access token after `stale_token` was rejected.
    ///
    /// If another caller already replaced `stale_token`, the newer token is
    /// returned without a second request.
    pub async fn refresh(&self, stale_token: &str) -> Result<String> {
        let _guard = self.refresh_lock.lock().await;

        if let Some(current) = self.stored(ACCESS_TOKEN_KEY)? {
            if current != stale_token && self.state() == AuthState::Authenticated {
                debug!("[Salesforce] Token already refreshed by a concurrent call");
                return Ok(current);
            }
        }
        self.set_state(AuthState::Expired);

        let refresh_token = self
            .stored(REFRESH_TOKEN_KEY)?
            .ok_or(SalesforceError::MissingRefreshToken)?;

        let url = format!("{}/services/oauth2/token", self.config.login_url);
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("refresh_token", refresh_token.as_str()),
        ];
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        let response = self.http.post(&url).form(&form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = match serde_json::from_str::<OAuthErrorResponse>(&body) {
                Ok(err) if err.error_description.is_empty() => err.error,
                Ok(err) => format!("{}: {}", err.error, err.error_description),
                Err(_) => format!("Token refresh failed with HTTP {}", status.as_u16()),
            };
            warn!("[Salesforce] Token refresh failed: {}", message);
            return Err(SalesforceError::auth(message));
        }

        let tokens: TokenResponse = serde_json::from_str(&body)?;
        self.store_tokens(&tokens)?;
        info!("[Salesforce] Access token refreshed");
        Ok(tokens.access_token)
    }

    /// Revoke the stored token remotely and forget every credential.
    pub async fn revoke(&self) -> Result<()> {
        let token = match self.stored(REFRESH_TOKEN_KEY)? {
            Some(token) => Some(token),
            None => self.stored(ACCESS_TOKEN_KEY)?,
        };

        if let Some(token) = token {
            let url = format!("{}/services/oauth2/revoke", self.config.login_url);
            match self.http.post(&url).form(&[("token", token.as_str())]).send().await {
                Ok(response) if response.status().is_success() => {}
                Ok(response) => warn!(
                    "[Salesforce] Token revocation returned HTTP {}",
                    response.status().as_u16()
                ),
                Err(err) => warn!("[Salesforce] Token revocation failed: {}", err),
            }
        }

        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, INSTANCE_URL_KEY] {
            self.secrets.delete_secret(key)?;
        }
        self.set_state(AuthState::Revoked);
        info!("[Salesforce] Connection revoked");
        Ok(())
    }
}

//! Firebase Authentication over its REST API.
//!
//! SYSTEM CONTEXT
//! ==============
//! The web client uses the Firebase JS SDK; this adapter speaks the same
//! Identity Toolkit and Secure Token endpoints directly:
//! - `accounts:signInWithPassword`, `accounts:signUp`, `accounts:signInWithIdp`
//!   sign a user in and return an ID token plus a refresh token
//! - `accounts:lookup` fills in `emailVerified` and `photoUrl`
//! - `securetoken /v1/token` trades the refresh token for a new ID token
//!
//! The signed-in user is persisted under [`IDENTITY_KEY`] so a restarted
//! process resumes the provider session, the way the SDK restores from
//! browser storage. Token refreshes update the user silently; only sign-in
//! and sign-out are auth-state events.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use session::{Clock, IdentityError, IdentityProvider, IdentityUser, Storage};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::ApiConfig;

pub const IDENTITY_KEY: &str = "flexrent.identity";

/// Refresh this long before the provider's stated expiry.
const EXPIRY_MARGIN_MS: i64 = 60_000;
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;
/// Redirect URI the IdP exchange requires even for server-side credentials.
const IDP_REQUEST_URI: &str = "http://localhost";

/// Persisted provider session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredUser {
    uid: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    photo_url: Option<String>,
    id_token: String,
    refresh_token: String,
    expires_at: i64,
}

impl StoredUser {
    fn from_identity(user: &IdentityUser, expires_at: i64) -> Self {
        Self {
            uid: user.uid.clone(),
            email: user.email.clone(),
            email_verified: user.email_verified,
            photo_url: user.photo_url.clone(),
            id_token: user.id_token.clone(),
            refresh_token: user.refresh_token.clone(),
            expires_at,
        }
    }

    fn into_identity(self) -> IdentityUser {
        IdentityUser {
            uid: self.uid,
            email: self.email,
            email_verified: self.email_verified,
            photo_url: self.photo_url,
            id_token: self.id_token,
            refresh_token: self.refresh_token,
        }
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<bool>,
    #[serde(default)]
    photo_url: Option<String>,
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    photo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
}

// =============================================================================
// PROVIDER
// =============================================================================

pub struct FirebaseIdentity {
    http: reqwest::Client,
    api_key: Option<String>,
    identity_base_url: String,
    securetoken_base_url: String,
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    state: watch::Sender<Option<IdentityUser>>,
    expires_at: AtomicI64,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl FirebaseIdentity {
    /// Build the provider and restore any persisted user.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig, storage: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Result<Self, IdentityError> {
        let http = config.http_client().map_err(|e| IdentityError::Config(e.to_string()))?;
        let restored = restore(storage.as_ref());
        let expires_at = restored.as_ref().map_or(0, |user| user.expires_at);
        if let Some(user) = &restored {
            info!(uid = %user.uid, "identity session restored");
        }
        let (state, _) = watch::channel(restored.map(StoredUser::into_identity));
        Ok(Self {
            http,
            api_key: config.firebase_api_key.clone(),
            identity_base_url: config.identity_base_url.trim_end_matches('/').to_owned(),
            securetoken_base_url: config.securetoken_base_url.trim_end_matches('/').to_owned(),
            storage,
            clock,
            state,
            expires_at: AtomicI64::new(expires_at),
            refresh_lock: tokio::sync::Mutex::new(()),
        })
    }

    fn api_key(&self) -> Result<&str, IdentityError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| IdentityError::Config("FLEXRENT_FIREBASE_API_KEY is not set".into()))
    }

    async fn post_accounts<T: DeserializeOwned>(&self, method: &str, body: &Value) -> Result<T, IdentityError> {
        let key = self.api_key()?;
        let url = format!("{}/v1/accounts:{method}", self.identity_base_url);
        let response = self
            .http
            .post(url)
            .query(&[("key", key)])
            .json(body)
            .send()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;
        read_response(response).await
    }

    /// Finish a sign-in: look up profile flags, persist, announce.
    async fn establish(&self, response: SignInResponse) -> IdentityUser {
        let mut user = IdentityUser {
            uid: response.local_id,
            email: response.email,
            email_verified: response.email_verified.unwrap_or(false),
            photo_url: response.photo_url,
            id_token: response.id_token,
            refresh_token: response.refresh_token,
        };
        if response.email_verified.is_none() {
            match self.lookup(&user.id_token).await {
                Ok(Some(profile)) => {
                    user.email_verified = profile.email_verified;
                    user.photo_url = user.photo_url.or(profile.photo_url);
                }
                Ok(None) => debug!(uid = %user.uid, "account lookup returned no user"),
                Err(e) => warn!(uid = %user.uid, error = %e, "account lookup failed"),
            }
        }

        let expires_at = self.expiry_from(response.expires_in.as_deref());
        self.expires_at.store(expires_at, Ordering::SeqCst);
        self.persist(&StoredUser::from_identity(&user, expires_at));
        info!(uid = %user.uid, "identity sign-in");
        self.state.send_replace(Some(user.clone()));
        user
    }

    async fn lookup(&self, id_token: &str) -> Result<Option<LookupUser>, IdentityError> {
        let response: LookupResponse = self.post_accounts("lookup", &json!({ "idToken": id_token })).await?;
        Ok(response.users.into_iter().next())
    }

    async fn refresh(&self, current: &IdentityUser) -> Result<String, IdentityError> {
        let key = self.api_key()?;
        let url = format!("{}/v1/token", self.securetoken_base_url);
        let sent = self
            .http
            .post(url)
            .query(&[("key", key)])
            .form(&[("grant_type", "refresh_token"), ("refresh_token", current.refresh_token.as_str())])
            .send()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()));
        let result = match sent {
            Ok(response) => read_response::<TokenResponse>(response).await,
            Err(e) => Err(e),
        };

        let tokens = match result {
            Ok(tokens) => tokens,
            Err(IdentityError::Rejected(reason)) => {
                warn!(uid = %current.uid, %reason, "refresh token rejected; signing out");
                self.clear();
                return Err(IdentityError::Rejected(reason));
            }
            Err(e) => return Err(e),
        };

        let expires_at = self.expiry_from(tokens.expires_in.as_deref());
        self.expires_at.store(expires_at, Ordering::SeqCst);
        let id_token = tokens.id_token.clone();
        let mut stored = None;
        // A refresh is not an auth-state change; update without notifying.
        self.state.send_if_modified(|user| {
            if let Some(user) = user.as_mut().filter(|u| u.uid == current.uid) {
                user.id_token = tokens.id_token;
                user.refresh_token = tokens.refresh_token;
                stored = Some(StoredUser::from_identity(user, expires_at));
            }
            false
        });
        if let Some(stored) = stored {
            self.persist(&stored);
        }
        debug!(uid = %current.uid, "id token refreshed");
        Ok(id_token)
    }

    fn expiry_from(&self, expires_in: Option<&str>) -> i64 {
        let secs = expires_in
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        self.clock.now_ms().saturating_add(secs.saturating_mul(1000))
    }

    fn persist(&self, user: &StoredUser) {
        let raw = match serde_json::to_string(user) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "identity session encode failed");
                return;
            }
        };
        if let Err(e) = self.storage.set(IDENTITY_KEY, &raw) {
            warn!(error = %e, "identity session write failed");
        }
    }

    fn clear(&self) {
        if let Err(e) = self.storage.remove(IDENTITY_KEY) {
            warn!(error = %e, "identity session remove failed");
        }
        self.expires_at.store(0, Ordering::SeqCst);
        self.state.send_if_modified(|user| user.take().is_some());
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<IdentityUser, IdentityError> {
        let body = json!({ "email": email, "password": password, "returnSecureToken": true });
        let response = self.post_accounts("signInWithPassword", &body).await?;
        Ok(self.establish(response).await)
    }

    async fn sign_in_with_idp(&self, provider_id: &str, id_token: &str) -> Result<IdentityUser, IdentityError> {
        let body = json!({
            "postBody": format!("id_token={id_token}&providerId={provider_id}"),
            "requestUri": IDP_REQUEST_URI,
            "returnIdpCredential": true,
            "returnSecureToken": true,
        });
        let response = self.post_accounts("signInWithIdp", &body).await?;
        Ok(self.establish(response).await)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<IdentityUser, IdentityError> {
        let body = json!({ "email": email, "password": password, "returnSecureToken": true });
        let response = self.post_accounts("signUp", &body).await?;
        Ok(self.establish(response).await)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.clear();
        info!("identity sign-out");
        Ok(())
    }

    async fn id_token(&self, force_refresh: bool) -> Result<String, IdentityError> {
        let _guard = self.refresh_lock.lock().await;
        let current = self.state.borrow().clone().ok_or(IdentityError::NoCurrentUser)?;
        let fresh = self.clock.now_ms() + EXPIRY_MARGIN_MS < self.expires_at.load(Ordering::SeqCst);
        if fresh && !force_refresh {
            return Ok(current.id_token);
        }
        self.refresh(&current).await
    }

    fn current_user(&self) -> Option<IdentityUser> {
        self.state.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<IdentityUser>> {
        self.state.subscribe()
    }
}

fn restore(storage: &dyn Storage) -> Option<StoredUser> {
    let raw = match storage.get(IDENTITY_KEY) {
        Ok(raw) => raw?,
        Err(e) => {
            warn!(error = %e, "identity session read failed");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(user) => Some(user),
        Err(e) => {
            warn!(error = %e, "discarding unparseable identity session");
            if let Err(e) = storage.remove(IDENTITY_KEY) {
                warn!(error = %e, "identity session remove failed");
            }
            None
        }
    }
}

/// Decode a 2xx body, or map the provider's `{"error": {"message": ...}}`.
async fn read_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, IdentityError> {
    let status = response.status();
    let text = response.text().await.map_err(|e| IdentityError::Transport(e.to_string()))?;
    if status.is_success() {
        return serde_json::from_str(&text).map_err(|e| IdentityError::Malformed(e.to_string()));
    }
    let reason = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
    if status.is_client_error() {
        Err(IdentityError::Rejected(reason))
    } else {
        Err(IdentityError::Transport(reason))
    }
}

#[cfg(test)]
#[path = "firebase_test.rs"]
mod tests;

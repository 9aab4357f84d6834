//! Sign-in, registration and role selection.
//!
//! Identity lives with the provider; the backend keeps the marketplace user
//! and its role. Each flow signs in with the provider through the session
//! bridge first, then tells the backend, then folds the backend's role into
//! the published session.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use session::{Role, SessionRecord};
use tracing::info;

use crate::error::ApiError;
use crate::http::ApiClient;
use crate::models::ValidationError;

pub const REGISTER_PATH: &str = "/api/auth/register";
pub const OAUTH_PATH: &str = "/api/auth/oauth";
pub const ROLE_PATH: &str = "/api/users/me/role";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BackendSignIn<'a> {
    uid: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    id_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    provider: Option<&'a str>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BackendUser {
    role: Option<Role>,
}

pub struct AuthService {
    api: Arc<ApiClient>,
}

impl AuthService {
    #[must_use]
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// Email/password sign-in. The role comes from the backend check the
    /// session bridge runs on sign-in.
    ///
    /// # Errors
    ///
    /// [`ApiError::Auth`] if the provider rejects the credentials.
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionRecord, ApiError> {
        let record = self.api.session().sign_in_with_password(email, password).await?;
        info!(uid = %record.uid, role = %record.role, "logged in");
        Ok(record)
    }

    /// Create the provider account, then the backend user with the chosen role.
    ///
    /// # Errors
    ///
    /// [`ApiError::Auth`] if the account cannot be created, or the backend's error.
    pub async fn register(&self, email: &str, password: &str, role: Role) -> Result<SessionRecord, ApiError> {
        let record = self.api.session().sign_up(email, password).await?;
        let body = BackendSignIn {
            uid: &record.uid,
            email: record.email.as_deref(),
            id_token: &record.id_token,
            role: (role != Role::Default).then_some(role),
            provider: None,
        };
        let user: BackendUser = self.api.post(REGISTER_PATH, &body).await?;
        self.api.session().apply_role(user.role.unwrap_or(role));
        info!(uid = %record.uid, "registered");
        self.current()
    }

    /// Federated sign-in (e.g. `google.com`) with a credential from that IdP.
    /// The backend creates the marketplace user on first sign-in.
    ///
    /// # Errors
    ///
    /// [`ApiError::Auth`] if the provider rejects the credential, or the backend's error.
    pub async fn login_with_idp(&self, provider_id: &str, credential: &str) -> Result<SessionRecord, ApiError> {
        let record = self.api.session().sign_in_with_idp(provider_id, credential).await?;
        let body = BackendSignIn {
            uid: &record.uid,
            email: record.email.as_deref(),
            id_token: &record.id_token,
            role: None,
            provider: Some(provider_id),
        };
        let user: BackendUser = self.api.post(OAUTH_PATH, &body).await?;
        if let Some(role) = user.role {
            self.api.session().apply_role(role);
        }
        self.current()
    }

    /// Choose the marketplace role after sign-up (profile completion).
    ///
    /// # Errors
    ///
    /// Rejects `DEFAULT` locally; otherwise the backend's error.
    pub async fn select_role(&self, role: Role) -> Result<SessionRecord, ApiError> {
        if role == Role::Default {
            return Err(ValidationError::Missing("role").into());
        }
        let user: BackendUser = self.api.put(ROLE_PATH, &serde_json::json!({ "role": role })).await?;
        self.api.session().apply_role(user.role.unwrap_or(role));
        self.current()
    }

    pub async fn logout(&self) {
        self.api.session().sign_out().await;
    }

    /// The published session record.
    ///
    /// # Errors
    ///
    /// [`ApiError::Auth`] when nobody is signed in.
    pub fn current(&self) -> Result<SessionRecord, ApiError> {
        self.api
            .session()
            .snapshot()
            .session()
            .cloned()
            .ok_or(ApiError::Auth(session::SessionError::NotAuthenticated))
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;

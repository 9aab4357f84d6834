//! Backend role check used by the session bridge.
//!
//! Runs outside [`ApiClient`](crate::http::ApiClient): the bridge supplies the
//! token it just adopted, and a failed check must never trigger the auth
//! recovery pipeline or a notice.

use async_trait::async_trait;
use serde::Deserialize;
use session::{Role, RoleVerifier, VerifyError};
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::ApiError;

pub const VERIFY_ROLE_PATH: &str = "/api/auth/verify-role";

#[derive(Debug, Deserialize)]
struct VerifyRoleResponse {
    #[serde(default)]
    uid: Option<String>,
    role: Role,
}

pub struct BackendRoleVerifier {
    http: reqwest::Client,
    base_url: String,
}

impl BackendRoleVerifier {
    /// # Errors
    ///
    /// Returns [`ApiError::Client`] if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        Ok(Self { http: config.http_client()?, base_url: config.api_base_url.trim_end_matches('/').to_owned() })
    }
}

#[async_trait]
impl RoleVerifier for BackendRoleVerifier {
    async fn verify_role(&self, uid: &str, id_token: &str) -> Result<Role, VerifyError> {
        let url = format!("{}{VERIFY_ROLE_PATH}", self.base_url);
        let response = self
            .http
            .get(url)
            .bearer_auth(id_token)
            .send()
            .await
            .map_err(|e| VerifyError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Err(VerifyError::Status { status });
        }
        let body: VerifyRoleResponse =
            response.json().await.map_err(|e| VerifyError::Malformed(e.to_string()))?;
        if let Some(answered) = body.uid.as_deref().filter(|answered| *answered != uid) {
            return Err(VerifyError::Malformed(format!("role answered for uid {answered}, expected {uid}")));
        }
        debug!(uid, role = %body.role, "backend role verified");
        Ok(body.role)
    }
}

#[cfg(test)]
#[path = "verifier_test.rs"]
mod tests;

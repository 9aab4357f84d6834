//! Ports to the external identity provider and the backend role check.
//!
//! SYSTEM CONTEXT
//! ==============
//! Token issuance, refresh cryptography and validation live in the identity
//! provider. The session layer only drives it through [`IdentityProvider`]
//! and listens to its auth-state stream. The backend is the source of truth
//! for marketplace roles and is reached through [`RoleVerifier`].

use async_trait::async_trait;
use tokio::sync::watch;

use crate::types::Role;

/// Errors produced by identity-provider operations.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// No user is signed in with the provider.
    #[error("no signed-in user")]
    NoCurrentUser,
    /// The provider rejected the credentials or token (e.g. `INVALID_PASSWORD`).
    #[error("identity provider rejected the request: {0}")]
    Rejected(String),
    /// The provider could not be reached.
    #[error("identity provider request failed: {0}")]
    Transport(String),
    /// The provider answered with something we could not decode.
    #[error("identity provider response malformed: {0}")]
    Malformed(String),
    /// The provider is not configured (missing API key and so on).
    #[error("identity provider not configured: {0}")]
    Config(String),
}

/// A user as reported by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentityUser {
    pub uid: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub photo_url: Option<String>,
    pub id_token: String,
    pub refresh_token: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Email/password sign-in.
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<IdentityUser, IdentityError>;

    /// Federated sign-in with a credential from an external IdP (e.g. a Google ID token).
    async fn sign_in_with_idp(&self, provider_id: &str, id_token: &str) -> Result<IdentityUser, IdentityError>;

    /// Create an email/password account and sign it in.
    async fn sign_up(&self, email: &str, password: &str) -> Result<IdentityUser, IdentityError>;

    async fn sign_out(&self) -> Result<(), IdentityError>;

    /// Current ID token; `force_refresh` mints a new one regardless of expiry.
    async fn id_token(&self, force_refresh: bool) -> Result<String, IdentityError>;

    fn current_user(&self) -> Option<IdentityUser>;

    /// Auth-state stream. The current value is the signed-in user, if any.
    fn subscribe(&self) -> watch::Receiver<Option<IdentityUser>>;
}

/// Errors from the backend role check.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("role verification request failed: {0}")]
    Transport(String),
    #[error("role verification returned status {status}")]
    Status { status: u16 },
    #[error("role verification response malformed: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait RoleVerifier: Send + Sync {
    /// Ask the backend which role `uid` holds, authenticating with `id_token`.
    async fn verify_role(&self, uid: &str, id_token: &str) -> Result<Role, VerifyError>;
}

//! Session record, cache envelope, and the published session state.

use serde::{Deserialize, Serialize};

// =============================================================================
// ROLE
// =============================================================================

/// Marketplace role assigned by the backend.
///
/// Wire names are the backend's upper-case Spanish identifiers. Any value the
/// client does not know decodes as [`Role::Default`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Books and rents spaces.
    Cliente,
    /// Publishes spaces.
    Proveedor,
    /// Platform administrator.
    Admin,
    /// Signed in but no marketplace role chosen yet. `serde(other)` has to
    /// sit on the last variant.
    #[default]
    #[serde(other)]
    Default,
}

impl Role {
    /// Upper-case wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "DEFAULT",
            Self::Cliente => "CLIENTE",
            Self::Proveedor => "PROVEEDOR",
            Self::Admin => "ADMIN",
        }
    }

    /// Parse a wire name case-insensitively. Unknown names map to `Default`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "CLIENTE" => Self::Cliente,
            "PROVEEDOR" => Self::Proveedor,
            "ADMIN" => Self::Admin,
            _ => Self::Default,
        }
    }

    /// Landing route for a signed-in user with this role.
    #[must_use]
    pub fn home_path(self) -> &'static str {
        match self {
            Self::Default => "/complete-profile",
            Self::Cliente => "/client/dashboard",
            Self::Proveedor => "/provider/dashboard",
            Self::Admin => "/admin/dashboard",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// SESSION RECORD
// =============================================================================

/// The signed-in user as known to the client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub role: Role,
    /// Opaque bearer token minted by the identity provider.
    pub id_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default, rename = "photoURL")]
    pub photo_url: Option<String>,
}

/// Persisted form of a [`SessionRecord`]: the record plus the epoch-millisecond
/// timestamp of the last write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEnvelope {
    pub user: SessionRecord,
    pub timestamp: i64,
}

impl CacheEnvelope {
    /// Whether the envelope is older than `ttl_ms` at `now_ms`.
    #[must_use]
    pub fn is_expired(&self, now_ms: i64, ttl_ms: i64) -> bool {
        now_ms.saturating_sub(self.timestamp) > ttl_ms
    }
}

// =============================================================================
// SESSION STATE
// =============================================================================

/// Authentication state published to every session consumer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Signed out.
    Anonymous,
    /// Startup without a usable cache; waiting for the identity provider.
    Rehydrating,
    /// A session record is known.
    Authenticated(SessionRecord),
    /// A forced token refresh is in flight. The record stays usable.
    Refreshing(SessionRecord),
    /// Recovery failed; the user has to sign in again.
    Expired,
}

impl SessionState {
    #[must_use]
    pub fn session(&self) -> Option<&SessionRecord> {
        match self {
            Self::Authenticated(record) | Self::Refreshing(record) => Some(record),
            Self::Anonymous | Self::Rehydrating | Self::Expired => None,
        }
    }

    /// Current role, `Default` when nobody is signed in.
    #[must_use]
    pub fn role(&self) -> Role {
        self.session().map_or(Role::Default, |record| record.role)
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }

    /// Short lowercase label for logs and CLI output.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Rehydrating => "rehydrating",
            Self::Authenticated(_) => "authenticated",
            Self::Refreshing(_) => "refreshing",
            Self::Expired => "expired",
        }
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;

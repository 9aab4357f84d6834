//! Client-side session state for the FlexRent marketplace.
//!
//! This crate owns the signed-in user's session record and everything that
//! keeps it alive: the persisted cache envelope, the identity-provider and
//! role-verifier ports, the state publisher, and the background token refresh.
//! It performs no HTTP itself; adapters live in the `marketplace` crate.
//!
//! DESIGN
//! ======
//! `SessionBridge` is the single writer of the session record. UI-facing code
//! (route guards, request interceptors, the CLI) reads cloned snapshots from a
//! `tokio::sync::watch` channel carrying [`SessionState`].

pub mod access;
pub mod bridge;
pub mod cache;
pub mod clock;
pub mod config;
pub mod identity;
pub mod refresh;
pub mod storage;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use access::{Access, Area};
pub use bridge::{SessionBridge, SessionError};
pub use cache::SessionCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SessionConfig;
pub use identity::{IdentityError, IdentityProvider, IdentityUser, RoleVerifier, VerifyError};
pub use refresh::{RefreshHandle, RefreshPhase, spawn_refresh_scheduler};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
pub use types::{CacheEnvelope, Role, SessionRecord, SessionState};

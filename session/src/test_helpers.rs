//! Mock identity provider and role verifier shared by the unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Notify, watch};

use crate::bridge::SessionBridge;
use crate::cache::{SESSION_KEY, SessionCache};
use crate::clock::ManualClock;
use crate::identity::{IdentityError, IdentityProvider, IdentityUser, RoleVerifier, VerifyError};
use crate::storage::{MemoryStorage, Storage};
use crate::types::{CacheEnvelope, Role, SessionRecord};

pub const NOW: i64 = 1_700_000_000_000;
pub const HOUR_MS: i64 = 60 * 60 * 1000;

pub fn user(uid: &str) -> IdentityUser {
    IdentityUser {
        uid: uid.to_owned(),
        email: Some(format!("{uid}@example.com")),
        email_verified: true,
        photo_url: None,
        id_token: format!("token-{uid}-0"),
        refresh_token: format!("refresh-{uid}"),
    }
}

pub fn record(uid: &str, role: Role) -> SessionRecord {
    let u = user(uid);
    SessionRecord {
        uid: u.uid,
        email: u.email,
        email_verified: u.email_verified,
        role,
        id_token: u.id_token,
        refresh_token: u.refresh_token,
        photo_url: None,
    }
}

// =============================================================================
// MockIdentity
// =============================================================================

pub struct MockIdentity {
    tx: watch::Sender<Option<IdentityUser>>,
    pub refresh_ok: AtomicBool,
    pub refresh_calls: AtomicUsize,
    pub sign_out_calls: AtomicUsize,
    /// Delay applied inside forced refreshes, to widen race windows.
    pub refresh_delay: Mutex<Duration>,
}

impl MockIdentity {
    pub fn new(initial: Option<IdentityUser>) -> Arc<Self> {
        let (tx, _) = watch::channel(initial);
        Arc::new(Self {
            tx,
            refresh_ok: AtomicBool::new(true),
            refresh_calls: AtomicUsize::new(0),
            sign_out_calls: AtomicUsize::new(0),
            refresh_delay: Mutex::new(Duration::ZERO),
        })
    }

    pub fn emit(&self, user: Option<IdentityUser>) {
        self.tx.send_replace(user);
    }

    pub fn refreshes(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for MockIdentity {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<IdentityUser, IdentityError> {
        if password == "wrong" {
            return Err(IdentityError::Rejected("INVALID_PASSWORD".into()));
        }
        let uid = email.split('@').next().unwrap_or(email);
        let signed_in = user(uid);
        self.emit(Some(signed_in.clone()));
        Ok(signed_in)
    }

    async fn sign_in_with_idp(&self, _provider_id: &str, _id_token: &str) -> Result<IdentityUser, IdentityError> {
        Err(IdentityError::Rejected("INVALID_IDP_RESPONSE".into()))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<IdentityUser, IdentityError> {
        self.sign_in_with_password(email, password).await
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        self.emit(None);
        Ok(())
    }

    async fn id_token(&self, force_refresh: bool) -> Result<String, IdentityError> {
        let current = self.tx.borrow().clone().ok_or(IdentityError::NoCurrentUser)?;
        if !force_refresh {
            return Ok(current.id_token);
        }
        let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = *self.refresh_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if !self.refresh_ok.load(Ordering::SeqCst) {
            return Err(IdentityError::Rejected("TOKEN_EXPIRED".into()));
        }
        let token = format!("token-{}-{n}", current.uid);
        let renewed = token.clone();
        // Token refreshes are not auth-state events.
        self.tx.send_if_modified(|user| {
            if let Some(user) = user.as_mut() {
                user.id_token = renewed;
                user.refresh_token = format!("refresh-{}-{n}", user.uid);
            }
            false
        });
        Ok(token)
    }

    fn current_user(&self) -> Option<IdentityUser> {
        self.tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<IdentityUser>> {
        self.tx.subscribe()
    }
}

// =============================================================================
// MockVerifier
// =============================================================================

pub struct MockVerifier {
    role: Mutex<Option<Role>>,
    gate: Option<Arc<Notify>>,
    pub calls: AtomicUsize,
}

impl MockVerifier {
    /// Answers `role`, or fails when `role` is `None`.
    pub fn answering(role: Option<Role>) -> Arc<Self> {
        Arc::new(Self { role: Mutex::new(role), gate: None, calls: AtomicUsize::new(0) })
    }

    /// Like [`answering`](Self::answering) but each call blocks until the
    /// returned `Notify` is signalled.
    pub fn gated(role: Option<Role>) -> (Arc<Self>, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let verifier =
            Arc::new(Self { role: Mutex::new(role), gate: Some(Arc::clone(&gate)), calls: AtomicUsize::new(0) });
        (verifier, gate)
    }
}

#[async_trait]
impl RoleVerifier for MockVerifier {
    async fn verify_role(&self, _uid: &str, _id_token: &str) -> Result<Role, VerifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let role = *self.role.lock().unwrap();
        role.ok_or(VerifyError::Status { status: 503 })
    }
}

// =============================================================================
// FIXTURE
// =============================================================================

pub struct Fixture {
    pub storage: Arc<MemoryStorage>,
    pub clock: Arc<ManualClock>,
    pub identity: Arc<MockIdentity>,
}

impl Fixture {
    pub fn new(identity_user: Option<IdentityUser>) -> Self {
        Self {
            storage: Arc::new(MemoryStorage::new()),
            clock: Arc::new(ManualClock::new(NOW)),
            identity: MockIdentity::new(identity_user),
        }
    }

    /// Seed the storage with an envelope written `age_ms` before `NOW`.
    pub fn seed_cache(&self, record: &SessionRecord, age_ms: i64) {
        let envelope = CacheEnvelope { user: record.clone(), timestamp: NOW - age_ms };
        self.storage
            .set(SESSION_KEY, &serde_json::to_string(&envelope).unwrap())
            .unwrap();
    }

    pub fn cached(&self) -> Option<CacheEnvelope> {
        self.storage
            .get(SESSION_KEY)
            .unwrap()
            .map(|raw| serde_json::from_str(&raw).unwrap())
    }

    pub fn cache(&self) -> SessionCache {
        SessionCache::new(self.storage.clone(), self.clock.clone(), Duration::from_secs(24 * 60 * 60))
    }

    pub fn bridge(&self, verifier: Arc<MockVerifier>) -> Arc<SessionBridge> {
        SessionBridge::new(self.identity.clone(), verifier, self.cache())
    }
}

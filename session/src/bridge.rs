//! Session bridge: the single owner of the signed-in user's record.
//!
//! ARCHITECTURE
//! ============
//! The bridge sits between the identity provider, the persisted cache and
//! every session consumer:
//! - startup rehydrates synchronously from the cache so a returning user is
//!   `Authenticated` before the provider has said anything
//! - provider auth-state events are consumed in order by the task returned
//!   from [`SessionBridge::start`]
//! - the backend role check runs after the state is published and only
//!   upgrades it; its failures are logged and swallowed
//! - forced token refreshes are single-flight behind an async mutex
//!
//! CONCURRENCY
//! ===========
//! Every transition happens inside the watch channel's write lock
//! (`send_modify` / `send_if_modified`), together with the generation bump and
//! the cache write it implies. A role-verification result carries the
//! generation it started under and is dropped if a sign-in or sign-out has
//! happened since, so a logout during verification cannot resurrect a cleared
//! cache entry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::SessionCache;
use crate::identity::{IdentityError, IdentityProvider, IdentityUser, RoleVerifier};
use crate::types::{Role, SessionRecord, SessionState};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error("not signed in")]
    NotAuthenticated,
}

pub struct SessionBridge {
    identity: Arc<dyn IdentityProvider>,
    verifier: Arc<dyn RoleVerifier>,
    cache: SessionCache,
    state: watch::Sender<SessionState>,
    generation: AtomicU64,
    /// `(uid, id_token)` of the last sign-in event adopted from the provider.
    last_event: Mutex<Option<(String, String)>>,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl SessionBridge {
    /// Build the bridge and rehydrate from the cache.
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityProvider>, verifier: Arc<dyn RoleVerifier>, cache: SessionCache) -> Arc<Self> {
        let initial = match cache.load() {
            Some(record) => {
                info!(uid = %record.uid, role = %record.role, "session rehydrated from cache");
                SessionState::Authenticated(record)
            }
            None => SessionState::Rehydrating,
        };
        let (state, _) = watch::channel(initial);
        Arc::new(Self {
            identity,
            verifier,
            cache,
            state,
            generation: AtomicU64::new(0),
            last_event: Mutex::new(None),
            refresh_lock: tokio::sync::Mutex::new(()),
        })
    }

    // =========================================================================
    // PUBLISHER
    // =========================================================================

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn current_role(&self) -> Role {
        self.state.borrow().role()
    }

    // =========================================================================
    // IDENTITY EVENTS
    // =========================================================================

    /// Spawn the task consuming the provider's auth-state stream, starting
    /// with its current value. The task ends when the provider drops its
    /// sender.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let bridge = Arc::clone(self);
        let mut events = self.identity.subscribe();
        tokio::spawn(async move {
            loop {
                let user = events.borrow_and_update().clone();
                let _verification = bridge.handle_auth_event(user);
                if events.changed().await.is_err() {
                    break;
                }
            }
            debug!("identity event stream closed");
        })
    }

    /// Apply one provider auth-state event.
    ///
    /// Returns the spawned role-verification task for a sign-in that was
    /// adopted, `None` for sign-outs and duplicate events.
    pub fn handle_auth_event(self: &Arc<Self>, user: Option<IdentityUser>) -> Option<JoinHandle<()>> {
        let Some(user) = user else {
            self.on_signed_out();
            return None;
        };

        {
            let last = self.last_event.lock().unwrap_or_else(PoisonError::into_inner);
            if last
                .as_ref()
                .is_some_and(|(uid, token)| *uid == user.uid && *token == user.id_token)
            {
                return None;
            }
        }

        let (generation, record) = self.adopt(user);
        let bridge = Arc::clone(self);
        Some(tokio::spawn(async move {
            bridge.verify_role(generation, &record).await;
        }))
    }

    /// Publish an authenticated state for `user`, reusing the cached role
    /// only when the cache belongs to the same uid.
    fn adopt(&self, user: IdentityUser) -> (u64, SessionRecord) {
        *self.last_event.lock().unwrap_or_else(PoisonError::into_inner) =
            Some((user.uid.clone(), user.id_token.clone()));

        let mut record = SessionRecord {
            uid: user.uid,
            email: user.email,
            email_verified: user.email_verified,
            role: Role::Default,
            id_token: user.id_token,
            refresh_token: user.refresh_token,
            photo_url: user.photo_url,
        };
        let mut generation = 0;
        self.state.send_modify(|state| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            // A different uid purges the cache here, before any role is read.
            record.role = self
                .cache
                .load_for(&record.uid)
                .map_or(Role::Default, |cached| cached.role);
            self.cache.store(&record);
            *state = SessionState::Authenticated(record.clone());
        });

        info!(uid = %record.uid, role = %record.role, generation, "session adopted");
        (generation, record)
    }

    fn on_signed_out(&self) {
        let previous = self.last_event.lock().unwrap_or_else(PoisonError::into_inner).take();

        // Until the provider has confirmed a user in this process, a null
        // event may just mean its own restore has not finished.
        if previous.is_none() {
            if let Some(cached) = self.cache.load() {
                debug!(uid = %cached.uid, "provider reports no user yet; keeping valid cached session");
                return;
            }
        }

        let changed = self.state.send_if_modified(|state| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            self.cache.clear();
            if matches!(state, SessionState::Anonymous | SessionState::Expired) {
                return false;
            }
            *state = SessionState::Anonymous;
            true
        });
        if changed {
            info!("session signed out by identity provider");
        }
    }

    async fn verify_role(&self, generation: u64, record: &SessionRecord) {
        let role = match self.verifier.verify_role(&record.uid, &record.id_token).await {
            Ok(role) => role,
            Err(e) => {
                warn!(uid = %record.uid, error = %e, "role verification failed; keeping cached role");
                return;
            }
        };

        let mut updated = None;
        self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            let next = match &*state {
                SessionState::Authenticated(current) if current.uid == record.uid && current.role != role => {
                    SessionState::Authenticated(SessionRecord { role, ..current.clone() })
                }
                SessionState::Refreshing(current) if current.uid == record.uid && current.role != role => {
                    SessionState::Refreshing(SessionRecord { role, ..current.clone() })
                }
                _ => return false,
            };
            if let Some(next_record) = next.session() {
                self.cache.store(next_record);
            }
            updated = next.session().map(|r| r.role);
            *state = next;
            true
        });

        match updated {
            Some(role) => info!(uid = %record.uid, %role, "role updated from backend"),
            None => debug!(uid = %record.uid, "role verification changed nothing"),
        }
    }

    // =========================================================================
    // SIGN IN / SIGN OUT
    // =========================================================================

    /// Email/password sign-in. Waits for the role check so the returned
    /// record carries the backend's role when it is reachable.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if sign-in is rejected.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<SessionRecord, SessionError> {
        let user = self.identity.sign_in_with_password(email, password).await?;
        Ok(self.adopt_and_verify(user).await)
    }

    /// Federated sign-in with an external IdP credential.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if sign-in is rejected.
    pub async fn sign_in_with_idp(&self, provider_id: &str, id_token: &str) -> Result<SessionRecord, SessionError> {
        let user = self.identity.sign_in_with_idp(provider_id, id_token).await?;
        Ok(self.adopt_and_verify(user).await)
    }

    /// Create an account and sign it in. The new user starts with `DEFAULT`
    /// until the backend assigns a role.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if the account cannot be created.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SessionRecord, SessionError> {
        let user = self.identity.sign_up(email, password).await?;
        let (_, record) = self.adopt(user);
        Ok(record)
    }

    async fn adopt_and_verify(&self, user: IdentityUser) -> SessionRecord {
        let (generation, record) = self.adopt(user);
        self.verify_role(generation, &record).await;
        self.state.borrow().session().cloned().unwrap_or(record)
    }

    /// Explicit logout: clear the cache, publish `Anonymous`, sign out of the provider.
    pub async fn sign_out(&self) {
        self.end_session(SessionState::Anonymous);
        info!("session signed out");
        if let Err(e) = self.identity.sign_out().await {
            warn!(error = %e, "identity provider sign-out failed");
        }
    }

    /// Authentication recovery failed: like [`sign_out`](Self::sign_out) but
    /// publishes `Expired` so consumers can send the user to the login page.
    pub async fn expire_session(&self) {
        self.end_session(SessionState::Expired);
        warn!("session expired");
        if let Err(e) = self.identity.sign_out().await {
            warn!(error = %e, "identity provider sign-out failed");
        }
    }

    fn end_session(&self, next: SessionState) {
        *self.last_event.lock().unwrap_or_else(PoisonError::into_inner) = None;
        self.state.send_modify(|state| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            self.cache.clear();
            *state = next;
        });
    }

    /// Replace the role after the backend accepted a role change.
    pub fn apply_role(&self, role: Role) {
        self.state.send_if_modified(|state| {
            let next = match &*state {
                SessionState::Authenticated(current) if current.role != role => {
                    SessionState::Authenticated(SessionRecord { role, ..current.clone() })
                }
                SessionState::Refreshing(current) if current.role != role => {
                    SessionState::Refreshing(SessionRecord { role, ..current.clone() })
                }
                _ => return false,
            };
            if let Some(record) = next.session() {
                self.cache.store(record);
            }
            *state = next;
            true
        });
    }

    // =========================================================================
    // TOKENS
    // =========================================================================

    /// Token from the provider's live session, if it has one. A token the
    /// provider renewed on its own is folded into the record and cache.
    pub async fn live_token(&self) -> Option<String> {
        self.identity.current_user()?;
        match self.identity.id_token(false).await {
            Ok(token) => {
                self.absorb_token(&token);
                Some(token)
            }
            Err(e) => {
                debug!(error = %e, "live token unavailable");
                None
            }
        }
    }

    /// Token of the published record, falling back to the persisted cache.
    #[must_use]
    pub fn cached_token(&self) -> Option<String> {
        let published = self.state.borrow().session().map(|r| r.id_token.clone());
        published.or_else(|| self.cache.load().map(|r| r.id_token))
    }

    /// Force the provider to mint a new token and persist it.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if the refresh fails.
    pub async fn force_refresh(&self) -> Result<String, SessionError> {
        self.force_refresh_after(None).await
    }

    /// Single-flight forced refresh. When `stale` is given and the published
    /// token already differs from it, another caller refreshed while this one
    /// waited, and the current token is returned without a second refresh.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if the refresh fails.
    pub async fn force_refresh_after(&self, stale: Option<&str>) -> Result<String, SessionError> {
        let _guard = self.refresh_lock.lock().await;

        if let Some(stale) = stale {
            let current = self.state.borrow().session().map(|r| r.id_token.clone());
            if let Some(current) = current.filter(|token| token != stale) {
                debug!("token already refreshed by a concurrent caller");
                return Ok(current);
            }
        }

        let generation = self.generation.load(Ordering::SeqCst);
        self.state.send_if_modified(|state| {
            let next = match &*state {
                SessionState::Authenticated(record) => SessionState::Refreshing(record.clone()),
                _ => return false,
            };
            *state = next;
            true
        });

        match self.identity.id_token(true).await {
            Ok(token) => {
                let refresh_token = self.identity.current_user().map(|user| user.refresh_token);
                self.state.send_if_modified(|state| {
                    if self.generation.load(Ordering::SeqCst) != generation {
                        return false;
                    }
                    let Some(current) = state.session() else {
                        return false;
                    };
                    let record = SessionRecord {
                        id_token: token.clone(),
                        refresh_token: refresh_token.unwrap_or_else(|| current.refresh_token.clone()),
                        ..current.clone()
                    };
                    self.cache.store(&record);
                    *state = SessionState::Authenticated(record);
                    true
                });
                debug!("token refreshed");
                Ok(token)
            }
            Err(e) => {
                self.state.send_if_modified(|state| {
                    let next = match &*state {
                        SessionState::Refreshing(record) => SessionState::Authenticated(record.clone()),
                        _ => return false,
                    };
                    *state = next;
                    true
                });
                warn!(error = %e, "forced token refresh failed");
                Err(e.into())
            }
        }
    }

    fn absorb_token(&self, token: &str) {
        let refresh_token = self.identity.current_user().map(|user| user.refresh_token);
        self.state.send_if_modified(|state| {
            let next = match &*state {
                SessionState::Authenticated(current) if current.id_token != token => {
                    SessionState::Authenticated(SessionRecord {
                        id_token: token.to_owned(),
                        refresh_token: refresh_token.unwrap_or_else(|| current.refresh_token.clone()),
                        ..current.clone()
                    })
                }
                _ => return false,
            };
            if let Some(record) = next.session() {
                self.cache.store(record);
            }
            *state = next;
            true
        });
    }
}

#[cfg(test)]
#[path = "bridge_test.rs"]
mod tests;

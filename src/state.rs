//! Wiring of the session and marketplace crates for one CLI invocation.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use marketplace::services::{
    AuthService, BookingService, DashboardService, InvoiceService, ProfileService, RentalService, SpaceService,
};
use marketplace::{ApiClient, ApiConfig, BackendRoleVerifier, FirebaseIdentity, PaymentRedirects};
use session::{
    Clock, FileStorage, RefreshHandle, SessionBridge, SessionCache, SessionConfig, SessionState, Storage,
    SystemClock, spawn_refresh_scheduler,
};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::CliError;
use crate::console::{ConsoleNavigator, ConsoleNotifier};

/// How long startup waits for the identity provider to settle an uncached session.
const READY_TIMEOUT: Duration = Duration::from_secs(10);

pub fn default_state_path() -> PathBuf {
    std::env::var_os("HOME")
        .map_or_else(|| PathBuf::from("."), PathBuf::from)
        .join(".flexrent")
        .join("state.json")
}

pub struct App {
    pub session_config: SessionConfig,
    pub bridge: Arc<SessionBridge>,
    pub api: Arc<ApiClient>,
    pub payments: PaymentRedirects,
    _events: JoinHandle<()>,
}

impl App {
    /// Build every component against `state_path` and start consuming
    /// identity events.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn build(api_base_url: Option<&str>, state_path: PathBuf) -> Result<Self, CliError> {
        let mut config = ApiConfig::from_env();
        if let Some(url) = api_base_url {
            config = config.with_api_base_url(url);
        }
        let session_config = SessionConfig::from_env();
        info!(api = %config.api_base_url, state = %state_path.display(), "starting");

        let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(state_path));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let identity = Arc::new(FirebaseIdentity::new(&config, Arc::clone(&storage), Arc::clone(&clock))?);
        let verifier = Arc::new(BackendRoleVerifier::new(&config)?);
        let cache = SessionCache::new(Arc::clone(&storage), Arc::clone(&clock), session_config.cache_ttl);
        let bridge = SessionBridge::new(identity, verifier, cache);
        let events = bridge.start();

        let api = Arc::new(ApiClient::new(
            &config,
            Arc::clone(&bridge),
            Arc::new(ConsoleNotifier),
            Arc::new(ConsoleNavigator),
        )?);
        let payments = PaymentRedirects::new(storage, clock);
        Ok(Self { session_config, bridge, api, payments, _events: events })
    }

    /// Wait until the session has left `Rehydrating`.
    ///
    /// # Errors
    ///
    /// [`CliError::Timeout`] if the provider never settles.
    pub async fn ready(&self) -> Result<SessionState, CliError> {
        let mut states = self.bridge.subscribe();
        let state = tokio::time::timeout(READY_TIMEOUT, states.wait_for(|s| *s != SessionState::Rehydrating))
            .await
            .map_err(|_| CliError::Timeout)?
            .map_err(|_| CliError::Timeout)?
            .clone();
        debug!(?state, "session ready");
        Ok(state)
    }

    pub fn refresh_scheduler(&self) -> RefreshHandle {
        spawn_refresh_scheduler(Arc::clone(&self.bridge), self.session_config.refresh_interval)
    }

    pub fn auth(&self) -> AuthService {
        AuthService::new(Arc::clone(&self.api))
    }

    pub fn spaces(&self) -> SpaceService {
        SpaceService::new(Arc::clone(&self.api))
    }

    pub fn bookings(&self) -> BookingService {
        BookingService::new(Arc::clone(&self.api))
    }

    pub fn rentals(&self) -> RentalService {
        RentalService::new(Arc::clone(&self.api))
    }

    pub fn invoices(&self) -> InvoiceService {
        InvoiceService::new(Arc::clone(&self.api))
    }

    pub fn profile(&self) -> ProfileService {
        ProfileService::new(Arc::clone(&self.api))
    }

    pub fn dashboard(&self) -> DashboardService {
        DashboardService::new(Arc::clone(&self.api))
    }
}

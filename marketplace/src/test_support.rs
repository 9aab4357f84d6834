//! In-process backend and session doubles shared by the unit tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use session::{
    IdentityError, IdentityProvider, IdentityUser, ManualClock, MemoryStorage, Role, RoleVerifier, SessionBridge,
    SessionCache, VerifyError,
};
use tokio::sync::watch;

use crate::config::ApiConfig;
use crate::error::Notice;
use crate::http::ApiClient;
use crate::notify::{Navigator, Notifier};

pub const NOW: i64 = 1_700_000_000_000;

// =============================================================================
// MOCK BACKEND
// =============================================================================

#[derive(Clone, Debug)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub request_id: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

impl Recorded {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

type Responder = Arc<dyn Fn(&Recorded) -> (u16, String) + Send + Sync>;

#[derive(Clone)]
struct BackendState {
    requests: Arc<Mutex<Vec<Recorded>>>,
    responder: Responder,
}

pub struct MockBackend {
    pub base_url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockBackend {
    /// Serve every request with `responder`, recording what arrived.
    pub async fn spawn(responder: impl Fn(&Recorded) -> (u16, String) + Send + Sync + 'static) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = BackendState { requests: Arc::clone(&requests), responder: Arc::new(responder) };
        let app = Router::new().fallback(record_and_reply).with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { base_url: format!("http://{addr}"), requests }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn hits(&self, path: &str) -> usize {
        self.requests.lock().unwrap().iter().filter(|r| r.path == path).count()
    }
}

async fn record_and_reply(
    State(state): State<BackendState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let header_value = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_owned);
    let recorded = Recorded {
        method: method.to_string(),
        path: uri.path().to_owned(),
        query: uri.query().map(str::to_owned),
        authorization: header_value("authorization"),
        request_id: header_value("x-request-id"),
        content_type: header_value("content-type"),
        body,
    };
    let (status, reply) = (state.responder)(&recorded);
    state.requests.lock().unwrap().push(recorded);
    let status = StatusCode::from_u16(status).unwrap();
    (status, [(header::CONTENT_TYPE, "application/json")], reply).into_response()
}

/// Base URL of a port nobody listens on.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub fn ok(body: serde_json::Value) -> (u16, String) {
    (200, body.to_string())
}

// =============================================================================
// SESSION DOUBLES
// =============================================================================

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

pub struct MockIdentity {
    tx: watch::Sender<Option<IdentityUser>>,
    pub refresh_ok: AtomicBool,
    refresh_calls: AtomicUsize,
    pub refresh_delay: Mutex<Duration>,
}

impl MockIdentity {
    pub fn new() -> Arc<Self> {
        let (tx, _) = watch::channel(None);
        Arc::new(Self {
            tx,
            refresh_ok: AtomicBool::new(true),
            refresh_calls: AtomicUsize::new(0),
            refresh_delay: Mutex::new(Duration::ZERO),
        })
    }

    pub fn refreshes(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Forget the live session without an auth event, as after a restart.
    pub fn forget(&self) {
        self.tx.send_if_modified(|user| {
            *user = None;
            false
        });
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
        self.tx.send_replace(Some(signed_in.clone()));
        Ok(signed_in)
    }

    async fn sign_in_with_idp(&self, _provider_id: &str, id_token: &str) -> Result<IdentityUser, IdentityError> {
        let signed_in = user(id_token);
        self.tx.send_replace(Some(signed_in.clone()));
        Ok(signed_in)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<IdentityUser, IdentityError> {
        self.sign_in_with_password(email, password).await
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.tx.send_replace(None);
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
        self.tx.send_if_modified(|user| {
            if let Some(user) = user.as_mut() {
                user.id_token = renewed;
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

pub struct FixedVerifier(pub Role);

#[async_trait]
impl RoleVerifier for FixedVerifier {
    async fn verify_role(&self, _uid: &str, _id_token: &str) -> Result<Role, VerifyError> {
        Ok(self.0)
    }
}

#[derive(Default)]
pub struct RecordingNotifier(Mutex<Vec<Notice>>);

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.0.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: &Notice) {
        self.0.lock().unwrap().push(notice.clone());
    }
}

#[derive(Default)]
pub struct RecordingNavigator(Mutex<Vec<String>>);

impl RecordingNavigator {
    pub fn paths(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.0.lock().unwrap().push(path.to_owned());
    }
}

// =============================================================================
// HARNESS
// =============================================================================

pub struct Harness {
    pub backend: MockBackend,
    pub identity: Arc<MockIdentity>,
    pub storage: Arc<MemoryStorage>,
    pub bridge: Arc<SessionBridge>,
    pub client: Arc<ApiClient>,
    pub notices: Arc<RecordingNotifier>,
    pub navigator: Arc<RecordingNavigator>,
}

impl Harness {
    /// Signed-out session against a backend answering with `responder`.
    pub async fn new(responder: impl Fn(&Recorded) -> (u16, String) + Send + Sync + 'static) -> Self {
        let backend = MockBackend::spawn(responder).await;
        let config = ApiConfig::default().with_api_base_url(&backend.base_url);
        Self::with_config(backend, &config, Role::Cliente)
    }

    /// Like [`new`](Self::new) with user `a` signed in as `role`.
    pub async fn signed_in(
        role: Role,
        responder: impl Fn(&Recorded) -> (u16, String) + Send + Sync + 'static,
    ) -> Self {
        let backend = MockBackend::spawn(responder).await;
        let config = ApiConfig::default().with_api_base_url(&backend.base_url);
        let harness = Self::with_config(backend, &config, role);
        harness.bridge.sign_in_with_password("a@example.com", "secret").await.unwrap();
        harness
    }

    pub fn with_config(backend: MockBackend, config: &ApiConfig, role: Role) -> Self {
        let identity = MockIdentity::new();
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(NOW));
        let cache = SessionCache::new(storage.clone(), clock, Duration::from_secs(86_400));
        let bridge = SessionBridge::new(identity.clone(), Arc::new(FixedVerifier(role)), cache);
        let notices = Arc::new(RecordingNotifier::default());
        let navigator = Arc::new(RecordingNavigator::default());
        let client =
            Arc::new(ApiClient::new(config, Arc::clone(&bridge), notices.clone(), navigator.clone()).unwrap());
        Self { backend, identity, storage, bridge, client, notices, navigator }
    }
}

//! Authenticated REST client.
//!
//! ARCHITECTURE
//! ============
//! Every backend call goes through [`ApiClient::send`], which runs the two
//! request interceptors of the web client as one pipeline:
//!
//! 1. Bearer token. Requests outside the public allowlist carry
//!    `Authorization: Bearer <token>`, taken from the provider's live session
//!    or, failing that, from the cached session record.
//! 2. Auth recovery. A `401`/`403` on a request sent without any token goes
//!    straight to `/login`. Otherwise it triggers one forced token refresh and
//!    one retry. A failed refresh, or another `401` on the retry, ends the session:
//!    `Expired` is published, a notice is shown and the user is sent to
//!    `/login`.
//! 3. Classification. Remaining failures become an [`ApiError`] and a notice,
//!    except empty-state `404`s (resolved as `None`) and static asset
//!    failures (logged only).
//!
//! The retry budget lives in a per-request [`RequestContext`], so concurrent
//! requests never share a counter. Concurrent `401`s collapse onto one
//! refresh through [`SessionBridge::force_refresh_after`].

use std::sync::Arc;

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use session::SessionBridge;
use session::access::LOGIN_PATH;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ApiConfig;
use crate::error::{ApiError, Notice, classify, is_empty_state, is_static_asset};
use crate::notify::{Navigator, Notifier};

/// Endpoints that authenticate through their body and never carry a bearer token.
pub const PUBLIC_ENDPOINTS: &[&str] = &["/api/auth/login", "/api/auth/register", "/api/auth/oauth"];

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[must_use]
pub fn is_public(path: &str) -> bool {
    let path = path.split('?').next().unwrap_or(path);
    PUBLIC_ENDPOINTS.iter().any(|public| {
        path.strip_prefix(public)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}

/// Per-request state threaded through the pipeline.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub method: Method,
    pub path: String,
    pub public: bool,
    retried: bool,
}

impl RequestContext {
    #[must_use]
    pub fn new(method: Method, path: &str) -> Self {
        Self { request_id: Uuid::new_v4(), method, public: is_public(path), path: path.to_owned(), retried: false }
    }

    /// Whether an auth failure may still be recovered by refresh-and-retry.
    #[must_use]
    pub fn can_retry(&self) -> bool {
        !self.public && !self.retried
    }

    #[must_use]
    pub fn retried(&self) -> bool {
        self.retried
    }
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionBridge>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns [`ApiError::Client`] if the HTTP client cannot be built.
    pub fn new(
        config: &ApiConfig,
        session: Arc<SessionBridge>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            http: config.http_client()?,
            base_url: config.api_base_url.trim_end_matches('/').to_owned(),
            session,
            notifier,
            navigator,
        })
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionBridge> {
        &self.session
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Show a notice through the configured notifier.
    pub fn notify(&self, notice: &Notice) {
        self.notifier.notify(notice);
    }

    // =========================================================================
    // TYPED HELPERS
    // =========================================================================

    /// # Errors
    ///
    /// Any [`ApiError`]; an empty-state `404` surfaces as `NotFound` without a notice.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.get_query(path, &[]).await
    }

    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub async fn get_query<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, ApiError> {
        match self.send(Method::GET, path, query, None).await? {
            Some(value) => decode(value),
            None => Err(ApiError::NotFound { path: path.to_owned() }),
        }
    }

    /// GET where "nothing saved yet" is a normal answer.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`] other than an empty-state `404`.
    pub async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ApiError> {
        match self.send(Method::GET, path, &[], None).await? {
            Some(Value::Null) | None => Ok(None),
            Some(value) => decode(value).map(Some),
        }
    }

    /// # Errors
    ///
    /// Any [`ApiError`].
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_body(Method::POST, path, body).await
    }

    /// # Errors
    ///
    /// Any [`ApiError`].
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_body(Method::PUT, path, body).await
    }

    /// # Errors
    ///
    /// Any [`ApiError`].
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(Method::DELETE, path, &[], None).await?;
        Ok(())
    }

    async fn send_body<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body).map_err(|e| ApiError::Encode(e.to_string()))?;
        match self.send(method, path, &[], Some(&body)).await? {
            Some(value) => decode(value),
            None => Err(ApiError::NotFound { path: path.to_owned() }),
        }
    }

    // =========================================================================
    // PIPELINE
    // =========================================================================

    /// Run one request through the interceptor pipeline.
    ///
    /// `Ok(None)` is an empty-state `404`; an empty success body is `Value::Null`.
    ///
    /// # Errors
    ///
    /// The classified failure, after the notice has been shown.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Option<Value>, ApiError> {
        let mut ctx = RequestContext::new(method, path);
        let mut token = if ctx.public { None } else { self.bearer_token().await };

        loop {
            let (status, text) = match self.dispatch(&ctx, query, body, token.as_deref()).await {
                Ok(reply) => reply,
                Err(e) => return Err(self.fail(&ctx, ApiError::Network(e.to_string()))),
            };

            if (200..300).contains(&status) {
                return parse_body(&text).map(Some);
            }

            if matches!(status, 401 | 403) && token.is_none() && !ctx.public {
                return Err(self.require_sign_in(&ctx));
            }

            if matches!(status, 401 | 403) && ctx.can_retry() {
                ctx.retried = true;
                match self.session.force_refresh_after(token.as_deref()).await {
                    Ok(fresh) => {
                        info!(request_id = %ctx.request_id, path = %ctx.path, status, "retrying with refreshed token");
                        token = Some(fresh);
                        continue;
                    }
                    Err(e) => {
                        warn!(request_id = %ctx.request_id, error = %e, "token refresh failed during auth recovery");
                        return Err(self.expire(&ctx).await);
                    }
                }
            }

            if status == 401 && !ctx.public {
                return Err(self.expire(&ctx).await);
            }

            if is_empty_state(status, &ctx.path) {
                debug!(request_id = %ctx.request_id, path = %ctx.path, "empty state");
                return Ok(None);
            }

            return Err(self.fail(&ctx, classify(status, &ctx.path, &text)));
        }
    }

    async fn bearer_token(&self) -> Option<String> {
        if let Some(token) = self.session.live_token().await {
            return Some(token);
        }
        let cached = self.session.cached_token();
        if cached.is_some() {
            debug!("no live identity session; sending cached token");
        }
        cached
    }

    async fn dispatch(
        &self,
        ctx: &RequestContext,
        query: &[(&str, String)],
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<(u16, String), reqwest::Error> {
        let url = format!("{}{}", self.base_url, ctx.path);
        let mut request = self
            .http
            .request(ctx.method.clone(), &url)
            .header(REQUEST_ID_HEADER, ctx.request_id.to_string());
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        debug!(
            request_id = %ctx.request_id,
            method = %ctx.method,
            path = %ctx.path,
            status,
            retried = ctx.retried,
            "api response"
        );
        Ok((status, text))
    }

    async fn expire(&self, ctx: &RequestContext) -> ApiError {
        warn!(request_id = %ctx.request_id, path = %ctx.path, "authentication recovery failed; ending session");
        self.session.expire_session().await;
        self.notifier.notify(&Notice::session_expired());
        self.navigator.navigate(LOGIN_PATH);
        ApiError::SessionExpired
    }

    /// Nothing to refresh without a token; send the visitor to sign in.
    fn require_sign_in(&self, ctx: &RequestContext) -> ApiError {
        info!(request_id = %ctx.request_id, path = %ctx.path, "protected request without a session");
        let err = ApiError::Unauthorized;
        self.notifier.notify(&err.notice());
        self.navigator.navigate(LOGIN_PATH);
        err
    }

    fn fail(&self, ctx: &RequestContext, err: ApiError) -> ApiError {
        if is_static_asset(&ctx.path) {
            warn!(request_id = %ctx.request_id, path = %ctx.path, error = %err, "static asset request failed");
            return err;
        }
        warn!(request_id = %ctx.request_id, method = %ctx.method, path = %ctx.path, error = %err, "api request failed");
        self.notifier.notify(&err.notice());
        err
    }
}

fn parse_body(text: &str) -> Result<Value, ApiError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text).map_err(|e| ApiError::Decode(e.to_string()))
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;

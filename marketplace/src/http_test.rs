use std::sync::atomic::Ordering;
use std::time::Duration;

use serde_json::json;
use session::{Role, SessionState};

use super::*;
use crate::error::Severity;
use crate::test_support::*;

/// 401 for the initial token, 200 once a refreshed token is presented.
fn rejects_initial_token(r: &Recorded) -> (u16, String) {
    match r.authorization.as_deref() {
        Some("Bearer token-a-0") | None => (401, String::new()),
        Some(_) => ok(json!({"path": r.path})),
    }
}

#[test]
fn public_allowlist_matches_whole_segments() {
    assert!(is_public("/api/auth/login"));
    assert!(is_public("/api/auth/oauth/google"));
    assert!(is_public("/api/auth/register?ref=landing"));
    assert!(!is_public("/api/auth/verify-role"));
    assert!(!is_public("/api/auth/loginx"));
    assert!(!is_public("/api/spaces"));
}

#[test]
fn request_context_allows_one_retry() {
    let mut ctx = RequestContext::new(Method::GET, "/api/spaces/mine");
    assert!(ctx.can_retry());
    ctx.retried = true;
    assert!(!ctx.can_retry());
    assert!(!RequestContext::new(Method::POST, "/api/auth/login").can_retry());
}

#[tokio::test]
async fn public_endpoints_never_carry_a_bearer() {
    let h = Harness::signed_in(Role::Cliente, |_| ok(json!({"ok": true}))).await;

    let _: Value = h.client.post("/api/auth/register", &json!({"email": "a@example.com"})).await.unwrap();
    let _: Value = h.client.get("/api/spaces/mine").await.unwrap();

    let requests = h.backend.requests();
    assert_eq!(requests[0].authorization, None);
    assert_eq!(requests[1].authorization.as_deref(), Some("Bearer token-a-0"));
}

#[tokio::test]
async fn requests_carry_a_request_id() {
    let h = Harness::signed_in(Role::Cliente, |_| ok(json!([]))).await;
    let _: Value = h.client.get("/api/bookings/mine").await.unwrap();

    let id = h.backend.requests()[0].request_id.clone().unwrap();
    assert!(Uuid::parse_str(&id).is_ok());
}

#[tokio::test]
async fn cached_token_is_sent_without_a_live_session() {
    let h = Harness::signed_in(Role::Cliente, |_| ok(json!([]))).await;
    h.identity.forget();

    let _: Value = h.client.get("/api/rentals/mine").await.unwrap();
    assert_eq!(h.backend.requests()[0].authorization.as_deref(), Some("Bearer token-a-0"));
}

#[tokio::test]
async fn unauthorized_refreshes_once_and_retries() {
    let h = Harness::signed_in(Role::Cliente, rejects_initial_token).await;

    let body: Value = h.client.get("/api/invoices/mine").await.unwrap();
    assert_eq!(body["path"], "/api/invoices/mine");
    assert_eq!(h.identity.refreshes(), 1);

    let requests = h.backend.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].authorization.as_deref(), Some("Bearer token-a-1"));
    assert_eq!(requests[0].request_id, requests[1].request_id, "retry keeps the request id");
    assert!(h.notices.notices().is_empty());
    assert!(h.bridge.snapshot().is_authenticated());
}

#[tokio::test]
async fn second_unauthorized_expires_the_session() {
    let h = Harness::signed_in(Role::Cliente, |_| (401, String::new())).await;

    let err = h.client.get::<Value>("/api/bookings/mine").await.unwrap_err();
    assert!(matches!(err, ApiError::SessionExpired));
    assert_eq!(h.backend.requests().len(), 2, "exactly one retry");
    assert_eq!(h.identity.refreshes(), 1);
    assert_eq!(h.bridge.snapshot(), SessionState::Expired);
    assert_eq!(h.navigator.paths(), vec!["/login".to_owned()]);
    assert_eq!(h.notices.notices(), vec![Notice::session_expired()]);
    assert_eq!(h.bridge.cached_token(), None, "cache cleared");
}

#[tokio::test]
async fn failed_refresh_expires_without_retrying() {
    let h = Harness::signed_in(Role::Cliente, |_| (401, String::new())).await;
    h.identity.refresh_ok.store(false, Ordering::SeqCst);

    let err = h.client.get::<Value>("/api/dashboard/client").await.unwrap_err();
    assert!(matches!(err, ApiError::SessionExpired));
    assert_eq!(h.backend.requests().len(), 1);
    assert_eq!(h.bridge.snapshot(), SessionState::Expired);
    assert_eq!(h.navigator.paths(), vec!["/login".to_owned()]);
}

#[tokio::test]
async fn forbidden_after_retry_is_a_permission_error() {
    let h = Harness::signed_in(Role::Cliente, |_| (403, String::new())).await;

    let err = h.client.delete("/api/spaces/7").await.unwrap_err();
    assert!(matches!(err, ApiError::Forbidden));
    assert_eq!(h.backend.requests().len(), 2);
    assert!(h.bridge.snapshot().is_authenticated(), "403 does not end the session");
    assert!(h.navigator.paths().is_empty());
    assert_eq!(h.notices.notices()[0].severity, Severity::Error);
}

#[tokio::test]
async fn concurrent_unauthorized_requests_share_one_refresh() {
    let h = Harness::signed_in(Role::Cliente, rejects_initial_token).await;
    *h.identity.refresh_delay.lock().unwrap() = Duration::from_millis(50);

    let (a, b) = tokio::join!(h.client.get::<Value>("/api/bookings/mine"), h.client.get::<Value>("/api/rentals/mine"));
    a.unwrap();
    b.unwrap();
    assert_eq!(h.identity.refreshes(), 1);
    assert_eq!(h.backend.requests().len(), 4);
}

#[tokio::test]
async fn signed_out_request_redirects_to_login() {
    let h = Harness::new(|_| (401, String::new())).await;

    let err = h.client.get::<Value>("/api/invoices/mine").await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
    assert_eq!(h.backend.requests().len(), 1);
    assert_eq!(h.backend.requests()[0].authorization, None);
    assert_eq!(h.identity.refreshes(), 0, "no session to refresh");
    assert_ne!(h.bridge.snapshot(), SessionState::Expired);
    assert_eq!(h.navigator.paths(), vec!["/login".to_owned()]);
    assert_eq!(h.notices.notices(), vec![ApiError::Unauthorized.notice()]);
}

#[tokio::test]
async fn signed_out_forbidden_also_redirects_without_refresh() {
    let h = Harness::new(|_| (403, String::new())).await;

    let err = h.client.delete("/api/spaces/7").await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
    assert_eq!(h.identity.refreshes(), 0);
    assert_eq!(h.navigator.paths(), vec!["/login".to_owned()]);
}

#[tokio::test]
async fn public_unauthorized_is_not_a_session_failure() {
    let h = Harness::new(|_| (401, r#"{"message":"bad credentials"}"#.to_owned())).await;

    let err = h.client.post::<_, Value>("/api/auth/login", &json!({})).await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
    assert_eq!(h.backend.requests().len(), 1);
    assert!(h.navigator.paths().is_empty());
    assert_eq!(h.identity.refreshes(), 0);
}

#[tokio::test]
async fn empty_state_404_resolves_to_none_silently() {
    let h = Harness::signed_in(Role::Cliente, |_| (404, String::new())).await;

    let personal: Option<Value> = h.client.get_optional("/api/users/me/personal-data").await.unwrap();
    assert_eq!(personal, None);
    assert!(h.notices.notices().is_empty());

    let err = h.client.get_optional::<Value>("/api/spaces/99").await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound { .. }));
    assert_eq!(h.notices.notices().len(), 1);
}

#[tokio::test]
async fn business_errors_are_surfaced_once_without_retry() {
    let h = Harness::signed_in(Role::Cliente, |_| (409, r#"{"message":"Horario no disponible"}"#.to_owned())).await;

    let err = h.client.post::<_, Value>("/api/bookings", &json!({"spaceId": 1})).await.unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
    assert_eq!(h.backend.requests().len(), 1);
    assert_eq!(h.notices.notices(), vec![Notice::new(Severity::Warning, "Horario no disponible")]);
}

#[tokio::test]
async fn static_asset_failures_are_only_logged() {
    let h = Harness::signed_in(Role::Cliente, |_| (500, String::new())).await;

    let err = h.client.get::<Value>("/assets/i18n/es.json").await.unwrap_err();
    assert!(matches!(err, ApiError::Server { status: 500 }));
    assert!(h.notices.notices().is_empty());
}

#[tokio::test]
async fn network_failure_is_classified() {
    let backend = MockBackend::spawn(|_| ok(json!(null))).await;
    let config = ApiConfig::default().with_api_base_url(&closed_port_url().await);
    let h = Harness::with_config(backend, &config, Role::Cliente);

    let err = h.client.get::<Value>("/api/spaces").await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
    assert_eq!(h.notices.notices()[0].severity, Severity::Error);
}

#[tokio::test]
async fn query_pairs_are_encoded() {
    let h = Harness::new(|_| ok(json!({"content": []}))).await;
    let _: Value = h
        .client
        .get_query("/api/spaces", &[("city", "San José".to_owned()), ("page", "2".to_owned())])
        .await
        .unwrap();

    let recorded = &h.backend.requests()[0];
    assert_eq!(recorded.path, "/api/spaces");
    assert_eq!(recorded.query.as_deref(), Some("city=San+Jos%C3%A9&page=2"));
}

#[tokio::test]
async fn empty_success_body_decodes_as_unit() {
    let h = Harness::signed_in(Role::Proveedor, |_| (204, String::new())).await;
    let (): () = h.client.put("/api/rentals/3/auto-renewal", &json!({"autoRenewal": false})).await.unwrap();
}

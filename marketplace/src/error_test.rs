use super::*;

#[test]
fn classify_maps_status_families() {
    assert!(matches!(classify(401, "/api/spaces", ""), ApiError::Unauthorized));
    assert!(matches!(classify(403, "/api/spaces", ""), ApiError::Forbidden));
    assert!(matches!(classify(404, "/api/spaces/9", ""), ApiError::NotFound { path } if path == "/api/spaces/9"));
    assert!(matches!(classify(502, "/api/spaces", ""), ApiError::Server { status: 502 }));
    assert!(matches!(classify(418, "/api/spaces", ""), ApiError::Unexpected { status: 418 }));
}

#[test]
fn validation_uses_server_message() {
    let err = classify(400, "/api/bookings", r#"{"status":400,"message":"El espacio no está disponible"}"#);
    assert_eq!(err.notice(), Notice::new(Severity::Warning, "El espacio no está disponible"));
    assert_eq!(err.status(), Some(400));

    let err = classify(422, "/api/bookings", r#"{"error":"end before start"}"#);
    assert!(matches!(err, ApiError::Validation { message, .. } if message == "end before start"));
}

#[test]
fn validation_falls_back_when_body_is_useless() {
    let err = classify(400, "/api/bookings", "<html><body>Bad Request</body></html>");
    assert!(matches!(err, ApiError::Validation { message, .. } if message == "The request is invalid."));

    let err = classify(409, "/api/rentals", "");
    assert!(matches!(err, ApiError::Conflict(m) if m.contains("already exists")));
}

#[test]
fn plain_text_bodies_are_kept() {
    let err = classify(409, "/api/bookings", "slot already taken");
    assert_eq!(err.notice().message, "slot already taken");
}

#[test]
fn empty_state_paths() {
    assert!(is_empty_state(404, "/api/users/me/personal-data"));
    assert!(is_empty_state(404, "/api/users/me/addresses"));
    assert!(is_empty_state(404, "/api/dashboard/provider"));
    assert!(!is_empty_state(500, "/api/users/me/personal-data"));
    assert!(!is_empty_state(404, "/api/users/me/role"));
    assert!(!is_empty_state(404, "/api/spaces/1"));
}

#[test]
fn static_assets_are_recognised() {
    assert!(is_static_asset("/assets/i18n/es.json"));
    assert!(!is_static_asset("/api/assets"));
}

#[test]
fn network_errors_have_no_status() {
    let err = ApiError::Network("connection refused".into());
    assert_eq!(err.status(), None);
    assert_eq!(err.notice().severity, Severity::Error);
}

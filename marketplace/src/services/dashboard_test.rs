use serde_json::json;
use time::macros::date;

use super::*;
use crate::models::ClientKpis;
use crate::test_support::*;

fn backend(r: &Recorded) -> (u16, String) {
    match r.path.as_str() {
        "/api/dashboard/provider" => ok(json!({
            "publishedSpaces": 3,
            "activeRentals": 2,
            "occupancyRate": 0.4,
            "monthlyRevenue": [{"month": "2025-03", "value": 900.0}, {"month": "2025-05", "value": 1200.0}]
        })),
        "/api/dashboard/admin" => (500, String::new()),
        _ => (404, String::new()),
    }
}

#[tokio::test]
async fn provider_dashboard_and_series() {
    let h = Harness::signed_in(Role::Proveedor, backend).await;
    let dashboard = DashboardService::new(h.client.clone()).for_role(Role::Proveedor).await.unwrap().unwrap();
    let Dashboard::Provider(kpis) = &dashboard else { panic!("expected provider dashboard") };
    assert_eq!(kpis.published_spaces, 3);
    assert_eq!(kpis.upcoming_bookings, 0);

    let chart = series(&dashboard, date!(2025-05-20));
    assert_eq!(chart.labels.first().map(String::as_str), Some("2024-12"));
    assert_eq!(chart.values, vec![0.0, 0.0, 0.0, 900.0, 0.0, 1200.0]);
    assert_eq!(chart.total(), 2100.0);
}

#[tokio::test]
async fn empty_dashboard_is_all_zero() {
    let h = Harness::signed_in(Role::Cliente, backend).await;
    let dashboard = DashboardService::new(h.client.clone()).for_role(Role::Cliente).await.unwrap();
    assert_eq!(dashboard, Some(Dashboard::Client(ClientKpis::default())));
    assert!(h.notices.notices().is_empty());
}

#[tokio::test]
async fn no_dashboard_without_a_role() {
    let h = Harness::signed_in(Role::Default, backend).await;
    assert_eq!(DashboardService::new(h.client.clone()).for_role(Role::Default).await.unwrap(), None);
    assert!(h.backend.requests().is_empty());
}

#[tokio::test]
async fn server_errors_propagate() {
    let h = Harness::signed_in(Role::Admin, backend).await;
    let err = DashboardService::new(h.client.clone()).for_role(Role::Admin).await.unwrap_err();
    assert!(matches!(err, ApiError::Server { status: 500 }));
}

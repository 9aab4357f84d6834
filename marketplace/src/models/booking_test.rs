use time::macros::datetime;

use super::*;
use crate::models::space::SpaceKind;

const NOW: OffsetDateTime = datetime!(2025-03-01 09:00 UTC);

fn space() -> Space {
    Space {
        id: 1,
        name: "Oficina 3B".into(),
        description: None,
        kind: SpaceKind::PrivateOffice,
        city: "Montevideo".into(),
        address: None,
        capacity: 4,
        amenities: Vec::new(),
        hourly_price: Some(12.5),
        daily_price: Some(80.0),
        monthly_price: Some(1200.0),
        provider_id: None,
        photos: Vec::new(),
    }
}

#[test]
fn hourly_rounds_partial_hours_up() {
    let q = quote(&space(), BookingKind::Hourly, datetime!(2025-03-02 10:00 UTC), datetime!(2025-03-02 12:20 UTC), NOW)
        .unwrap();
    assert_eq!(q.units, 3);
    assert_eq!(q.total, 37.5);
}

#[test]
fn daily_counts_started_days() {
    let q = quote(&space(), BookingKind::Daily, datetime!(2025-03-02 09:00 UTC), datetime!(2025-03-04 10:00 UTC), NOW)
        .unwrap();
    assert_eq!(q.units, 3);
    assert_eq!(q.total, 240.0);
}

#[test]
fn monthly_uses_calendar_months() {
    let start = datetime!(2025-01-31 00:00 UTC);
    let now = datetime!(2025-01-01 00:00 UTC);
    // Jan 31 + 1 month clamps to Feb 28.
    let q = quote(&space(), BookingKind::Monthly, start, datetime!(2025-02-28 00:00 UTC), now).unwrap();
    assert_eq!(q.units, 1);
    let q = quote(&space(), BookingKind::Monthly, start, datetime!(2025-03-01 00:00 UTC), now).unwrap();
    assert_eq!(q.units, 2);
    assert_eq!(q.total, 2400.0);
}

#[test]
fn monthly_range_past_the_calendar_is_rejected() {
    let start = datetime!(9999-11-30 23:00 UTC);
    let end = datetime!(9999-12-31 23:30 UTC);
    assert_eq!(
        quote(&space(), BookingKind::Monthly, start, end, NOW),
        Err(ValidationError::BeyondCalendar("end"))
    );
}

#[test]
fn rejects_bad_ranges() {
    let s = space();
    let at = datetime!(2025-03-02 10:00 UTC);
    assert_eq!(quote(&s, BookingKind::Hourly, at, at, NOW), Err(ValidationError::InvertedRange));
    assert_eq!(
        quote(&s, BookingKind::Hourly, datetime!(2025-02-28 10:00 UTC), at, NOW),
        Err(ValidationError::InPast)
    );
}

#[test]
fn rejects_unpriced_kind() {
    let s = Space { daily_price: None, ..space() };
    let err = quote(&s, BookingKind::Daily, datetime!(2025-03-02 00:00 UTC), datetime!(2025-03-03 00:00 UTC), NOW)
        .unwrap_err();
    assert_eq!(err, ValidationError::NotPriced(BookingKind::Daily));
    assert_eq!(err.to_string(), "this space does not offer daily bookings");
}

#[test]
fn cancellation_window() {
    let booking: Booking = serde_json::from_value(serde_json::json!({
        "id": 9,
        "spaceId": 1,
        "kind": "HOURLY",
        "start": "2025-03-02T10:00:00Z",
        "end": "2025-03-02T12:00:00Z",
        "status": "CONFIRMED",
        "total": 25.0
    }))
    .unwrap();
    assert!(booking.can_cancel(NOW));
    assert!(!booking.can_cancel(datetime!(2025-03-02 10:30 UTC)));
    assert!(!Booking { status: BookingStatus::Cancelled, ..booking }.can_cancel(NOW));
}

#[test]
fn request_serializes_rfc3339() {
    let request = BookingRequest {
        space_id: 1,
        kind: BookingKind::Hourly,
        start: datetime!(2025-03-02 10:00 UTC),
        end: datetime!(2025-03-02 12:00 UTC),
        notes: None,
    };
    let value = serde_json::to_value(&request).unwrap();
    assert_eq!(value["spaceId"], 1);
    assert_eq!(value["kind"], "HOURLY");
    assert_eq!(value["start"], "2025-03-02T10:00:00Z");
    assert!(value.get("notes").is_none());
}

use time::macros::date;

use super::*;

fn invoice(status: InvoiceStatus) -> Invoice {
    Invoice {
        id: 5,
        number: "F-0005".into(),
        concept: Some("Renta marzo".into()),
        amount: 900.0,
        currency: Some("USD".into()),
        issue_date: date!(2025-03-01),
        due_date: date!(2025-03-10),
        status,
        booking_id: None,
        rental_id: Some(11),
    }
}

#[test]
fn overdue_is_derived_from_due_date() {
    let pending = invoice(InvoiceStatus::Pending);
    assert!(!pending.is_overdue(date!(2025-03-10)));
    assert!(pending.is_overdue(date!(2025-03-11)));
    assert!(invoice(InvoiceStatus::Overdue).is_overdue(date!(2025-03-01)));
    assert!(!invoice(InvoiceStatus::Paid).is_overdue(date!(2025-04-01)));
}

#[test]
fn only_open_invoices_are_payable() {
    assert!(invoice(InvoiceStatus::Pending).is_payable());
    assert!(invoice(InvoiceStatus::Overdue).is_payable());
    assert!(!invoice(InvoiceStatus::Paid).is_payable());
    assert!(!invoice(InvoiceStatus::Cancelled).is_payable());
}

#[test]
fn checkout_accepts_mercado_pago_field_names() {
    let camel: PaymentCheckout =
        serde_json::from_str(r#"{"preferenceId":"123-abc","initPoint":"https://mp.test/checkout?pref=123-abc"}"#)
            .unwrap();
    let snake: PaymentCheckout =
        serde_json::from_str(r#"{"id":"123-abc","init_point":"https://mp.test/checkout?pref=123-abc"}"#).unwrap();
    assert_eq!(camel, snake);
}

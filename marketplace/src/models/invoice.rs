//! Invoices and hosted-checkout handles.

use serde::{Deserialize, Serialize};
use time::Date;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: i64,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub concept: Option<String>,
    pub amount: f64,
    #[serde(default)]
    pub currency: Option<String>,
    pub issue_date: Date,
    pub due_date: Date,
    pub status: InvoiceStatus,
    #[serde(default)]
    pub booking_id: Option<i64>,
    #[serde(default)]
    pub rental_id: Option<i64>,
}

impl Invoice {
    /// Unpaid past its due date, whether or not the backend has flagged it yet.
    #[must_use]
    pub fn is_overdue(&self, today: Date) -> bool {
        match self.status {
            InvoiceStatus::Overdue => true,
            InvoiceStatus::Pending => self.due_date < today,
            InvoiceStatus::Paid | InvoiceStatus::Cancelled => false,
        }
    }

    #[must_use]
    pub fn is_payable(&self) -> bool {
        matches!(self.status, InvoiceStatus::Pending | InvoiceStatus::Overdue)
    }
}

/// Hosted checkout created by `POST /api/invoices/{id}/checkout`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCheckout {
    #[serde(alias = "id", alias = "preference_id")]
    pub preference_id: String,
    /// Mercado Pago URL the user is sent to.
    #[serde(alias = "init_point")]
    pub init_point: String,
}

#[cfg(test)]
#[path = "invoice_test.rs"]
mod tests;

//! Hosted-checkout redirect flags.
//!
//! Paying an invoice leaves the application for Mercado Pago's checkout and
//! comes back through a return URL. A flag per invoice, written before
//! leaving and consumed exactly once on return, tells a genuine return apart
//! from a stale or replayed link.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use session::{Clock, Storage, StorageError};
use tracing::{info, warn};

use crate::error::{Notice, Severity};

pub const PAYMENT_KEY_PREFIX: &str = "payment_redirect.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingPayment {
    pub invoice_id: i64,
    pub checkout_url: String,
    pub started_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Approved,
    /// `pending` or `in_process`: the gateway will settle it later.
    Pending,
    Rejected,
    /// The user came back without paying (`collection_status=null`).
    Abandoned,
}

impl PaymentOutcome {
    /// Outcome from the return URL's query string (or the full URL).
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let query = query.split_once('?').map_or(query, |(_, q)| q);
        let param = |name: &str| {
            query
                .split('&')
                .filter_map(|pair| pair.split_once('='))
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_ascii_lowercase())
        };
        match param("collection_status").or_else(|| param("status")).as_deref() {
            Some("approved") => Self::Approved,
            Some("pending" | "in_process" | "in_mediation") => Self::Pending,
            Some("rejected" | "cancelled" | "refunded" | "charged_back") => Self::Rejected,
            _ => Self::Abandoned,
        }
    }

    #[must_use]
    pub fn notice(self) -> Notice {
        match self {
            Self::Approved => Notice::new(Severity::Info, "Payment approved. Thank you!"),
            Self::Pending => Notice::new(Severity::Info, "Your payment is being processed."),
            Self::Rejected => Notice::new(Severity::Warning, "The payment was rejected. Try another payment method."),
            Self::Abandoned => Notice::new(Severity::Warning, "The payment was not completed."),
        }
    }
}

impl fmt::Display for PaymentOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Approved => "approved",
            Self::Pending => "pending",
            Self::Rejected => "rejected",
            Self::Abandoned => "abandoned",
        })
    }
}

pub struct PaymentRedirects {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
}

impl PaymentRedirects {
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Record that the user is leaving for `checkout_url` to pay `invoice_id`.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the flag cannot be written.
    pub fn begin(&self, invoice_id: i64, checkout_url: &str) -> Result<PendingPayment, StorageError> {
        let pending =
            PendingPayment { invoice_id, checkout_url: checkout_url.to_owned(), started_at: self.clock.now_ms() };
        let raw = serde_json::json!(pending).to_string();
        self.storage.set(&key(invoice_id), &raw)?;
        info!(invoice_id, "payment redirect started");
        Ok(pending)
    }

    /// # Errors
    ///
    /// Returns the storage error if the flag cannot be read.
    pub fn pending(&self, invoice_id: i64) -> Result<Option<PendingPayment>, StorageError> {
        let Some(raw) = self.storage.get(&key(invoice_id))? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(pending) => Ok(Some(pending)),
            Err(e) => {
                warn!(invoice_id, error = %e, "discarding unparseable payment flag");
                self.storage.remove(&key(invoice_id))?;
                Ok(None)
            }
        }
    }

    /// Consume the flag for `invoice_id` and read the gateway's verdict.
    /// `None` when no payment was started from here (or it was already
    /// completed).
    ///
    /// # Errors
    ///
    /// Returns the storage error if the flag cannot be read or removed.
    pub fn complete(&self, invoice_id: i64, return_query: &str) -> Result<Option<PaymentOutcome>, StorageError> {
        if self.pending(invoice_id)?.is_none() {
            warn!(invoice_id, "payment return without a pending redirect");
            return Ok(None);
        }
        self.storage.remove(&key(invoice_id))?;
        let outcome = PaymentOutcome::from_query(return_query);
        info!(invoice_id, %outcome, "payment redirect completed");
        Ok(Some(outcome))
    }
}

fn key(invoice_id: i64) -> String {
    format!("{PAYMENT_KEY_PREFIX}{invoice_id}")
}

#[cfg(test)]
#[path = "payment_test.rs"]
mod tests;

//! Invoices and their hosted-checkout payments.

use std::sync::Arc;

use serde_json::json;
use tracing::info;

use crate::error::ApiError;
use crate::http::ApiClient;
use crate::models::{Invoice, PaymentCheckout, ValidationError};
use crate::payment::{PaymentOutcome, PaymentRedirects, PendingPayment};

pub const INVOICES_PATH: &str = "/api/invoices";

pub struct InvoiceService {
    api: Arc<ApiClient>,
}

impl InvoiceService {
    #[must_use]
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// # Errors
    ///
    /// Any [`ApiError`].
    pub async fn mine(&self) -> Result<Vec<Invoice>, ApiError> {
        self.api.get(&format!("{INVOICES_PATH}/mine")).await
    }

    /// # Errors
    ///
    /// Any [`ApiError`].
    pub async fn get(&self, id: i64) -> Result<Invoice, ApiError> {
        self.api.get(&format!("{INVOICES_PATH}/{id}")).await
    }

    /// # Errors
    ///
    /// Any [`ApiError`].
    pub async fn checkout(&self, id: i64) -> Result<PaymentCheckout, ApiError> {
        self.api.post(&format!("{INVOICES_PATH}/{id}/checkout"), &json!({})).await
    }

    /// Open a checkout for invoice `id` and flag the redirect. The caller
    /// sends the user to the returned `checkout_url`.
    ///
    /// # Errors
    ///
    /// `Invalid(NotPayable)` for paid or cancelled invoices, `Storage` if the
    /// flag cannot be written, otherwise the backend's error.
    pub async fn pay(&self, id: i64, redirects: &PaymentRedirects) -> Result<PendingPayment, ApiError> {
        let invoice = self.get(id).await?;
        if !invoice.is_payable() {
            return Err(ValidationError::NotPayable(id).into());
        }
        let checkout = self.checkout(id).await?;
        info!(invoice_id = id, preference_id = %checkout.preference_id, "checkout created");
        Ok(redirects.begin(id, &checkout.init_point)?)
    }

    /// Handle the return from checkout: consume the redirect flag and show
    /// the outcome. `None` for returns nobody started here.
    ///
    /// # Errors
    ///
    /// `Storage` if the flag cannot be read or removed.
    pub fn complete_return(
        &self,
        id: i64,
        return_query: &str,
        redirects: &PaymentRedirects,
    ) -> Result<Option<PaymentOutcome>, ApiError> {
        let outcome = redirects.complete(id, return_query)?;
        if let Some(outcome) = outcome {
            self.api.notify(&outcome.notice());
        }
        Ok(outcome)
    }
}

#[cfg(test)]
#[path = "invoices_test.rs"]
mod tests;

//! Long-term rental contracts of the signed-in client.

use std::sync::Arc;

use serde_json::json;
use time::Date;
use tracing::info;

use crate::error::ApiError;
use crate::http::ApiClient;
use crate::models::{CancellationQuote, Rental, RentalRequest};

pub const RENTALS_PATH: &str = "/api/rentals";

pub struct RentalService {
    api: Arc<ApiClient>,
}

impl RentalService {
    #[must_use]
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// # Errors
    ///
    /// Any [`ApiError`].
    pub async fn mine(&self) -> Result<Vec<Rental>, ApiError> {
        self.api.get(&format!("{RENTALS_PATH}/mine")).await
    }

    /// # Errors
    ///
    /// [`ApiError::Invalid`] for terms outside 1-36 months or a past start,
    /// otherwise the backend's error.
    pub async fn create(&self, request: &RentalRequest, today: Date) -> Result<Rental, ApiError> {
        request.validate(today)?;
        let rental: Rental = self.api.post(RENTALS_PATH, request).await?;
        info!(rental_id = rental.id, space_id = request.space_id, months = request.months, "rental created");
        Ok(rental)
    }

    /// What cancelling rental `id` on `on` would cost.
    ///
    /// # Errors
    ///
    /// `NotFound` if the rental is not among the user's, `Invalid` if it
    /// cannot be cancelled.
    pub async fn cancellation_quote(&self, id: i64, on: Date) -> Result<CancellationQuote, ApiError> {
        let rental = self
            .mine()
            .await?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| ApiError::NotFound { path: format!("{RENTALS_PATH}/{id}") })?;
        Ok(rental.cancellation_quote(on)?)
    }

    /// # Errors
    ///
    /// Any [`ApiError`].
    pub async fn cancel(&self, id: i64) -> Result<Rental, ApiError> {
        self.api.post(&format!("{RENTALS_PATH}/{id}/cancel"), &json!({})).await
    }

    /// # Errors
    ///
    /// Any [`ApiError`].
    pub async fn set_auto_renewal(&self, id: i64, enabled: bool) -> Result<Rental, ApiError> {
        self.api.put(&format!("{RENTALS_PATH}/{id}/auto-renewal"), &json!({ "autoRenewal": enabled })).await
    }
}

#[cfg(test)]
#[path = "rentals_test.rs"]
mod tests;

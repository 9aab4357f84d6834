//! Hourly, daily and monthly bookings of the signed-in client.

use std::sync::Arc;

use serde_json::json;
use time::OffsetDateTime;
use tracing::info;

use crate::error::ApiError;
use crate::http::ApiClient;
use crate::models::{Booking, BookingRequest, Quote, Space, ValidationError, quote};
use crate::services::spaces::SPACES_PATH;

pub const BOOKINGS_PATH: &str = "/api/bookings";

pub struct BookingService {
    api: Arc<ApiClient>,
}

impl BookingService {
    #[must_use]
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// # Errors
    ///
    /// Any [`ApiError`].
    pub async fn mine(&self) -> Result<Vec<Booking>, ApiError> {
        self.api.get(&format!("{BOOKINGS_PATH}/mine")).await
    }

    /// Price `request` against the space's current rates.
    ///
    /// # Errors
    ///
    /// [`ApiError::Invalid`] for ranges the space cannot be booked for.
    pub async fn quote(&self, request: &BookingRequest, now: OffsetDateTime) -> Result<Quote, ApiError> {
        let space: Space = self.api.get(&format!("{SPACES_PATH}/{}", request.space_id)).await?;
        Ok(quote(&space, request.kind, request.start, request.end, now)?)
    }

    /// Quote locally, then book.
    ///
    /// # Errors
    ///
    /// [`ApiError::Invalid`] if the quote fails, otherwise the backend's error
    /// (e.g. `Conflict` when the slot is taken).
    pub async fn create(&self, request: &BookingRequest, now: OffsetDateTime) -> Result<Booking, ApiError> {
        let quoted = self.quote(request, now).await?;
        let booking: Booking = self.api.post(BOOKINGS_PATH, request).await?;
        info!(booking_id = booking.id, space_id = request.space_id, total = quoted.total, "booking created");
        Ok(booking)
    }

    /// Cancel booking `id` if it has not started yet.
    ///
    /// # Errors
    ///
    /// `NotFound` if the booking is not among the user's, `Invalid` once it
    /// has started or is already closed, otherwise the backend's error.
    pub async fn cancel(&self, id: i64, now: OffsetDateTime) -> Result<Booking, ApiError> {
        let booking = self
            .mine()
            .await?
            .into_iter()
            .find(|b| b.id == id)
            .ok_or_else(|| ApiError::NotFound { path: format!("{BOOKINGS_PATH}/{id}") })?;
        if !booking.can_cancel(now) {
            return Err(ValidationError::NotCancellable(format!("booking {id}")).into());
        }
        let cancelled: Booking = self.api.post(&format!("{BOOKINGS_PATH}/{id}/cancel"), &json!({})).await?;
        info!(booking_id = id, "booking cancelled");
        Ok(cancelled)
    }
}

#[cfg(test)]
#[path = "bookings_test.rs"]
mod tests;

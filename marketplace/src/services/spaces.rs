//! Space discovery and provider listings.

use std::sync::Arc;

use crate::error::ApiError;
use crate::http::ApiClient;
use crate::models::{Page, Space, SpaceFilter, SpaceInput};

pub const SPACES_PATH: &str = "/api/spaces";

pub struct SpaceService {
    api: Arc<ApiClient>,
}

impl SpaceService {
    #[must_use]
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// # Errors
    ///
    /// Any [`ApiError`].
    pub async fn search(&self, filter: &SpaceFilter) -> Result<Page<Space>, ApiError> {
        self.api.get_query(SPACES_PATH, &filter.query()).await
    }

    /// # Errors
    ///
    /// Any [`ApiError`].
    pub async fn get(&self, id: i64) -> Result<Space, ApiError> {
        self.api.get(&format!("{SPACES_PATH}/{id}")).await
    }

    /// Spaces published by the signed-in provider.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`].
    pub async fn mine(&self) -> Result<Vec<Space>, ApiError> {
        self.api.get(&format!("{SPACES_PATH}/mine")).await
    }

    /// # Errors
    ///
    /// [`ApiError::Invalid`] for an incomplete listing, otherwise the backend's error.
    pub async fn create(&self, input: &SpaceInput) -> Result<Space, ApiError> {
        input.validate()?;
        self.api.post(SPACES_PATH, input).await
    }

    /// # Errors
    ///
    /// [`ApiError::Invalid`] for an incomplete listing, otherwise the backend's error.
    pub async fn update(&self, id: i64, input: &SpaceInput) -> Result<Space, ApiError> {
        input.validate()?;
        self.api.put(&format!("{SPACES_PATH}/{id}"), input).await
    }

    /// # Errors
    ///
    /// Any [`ApiError`].
    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        self.api.delete(&format!("{SPACES_PATH}/{id}")).await
    }
}

#[cfg(test)]
#[path = "spaces_test.rs"]
mod tests;

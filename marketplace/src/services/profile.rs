//! Personal data and addresses of the signed-in user.

use std::sync::Arc;

use crate::error::ApiError;
use crate::http::ApiClient;
use crate::models::{Address, PersonalData, ProfileOverview};

pub const PERSONAL_DATA_PATH: &str = "/api/users/me/personal-data";
pub const ADDRESSES_PATH: &str = "/api/users/me/addresses";

pub struct ProfileService {
    api: Arc<ApiClient>,
}

impl ProfileService {
    #[must_use]
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// `None` until the user saves personal data for the first time.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`] other than the "nothing saved yet" `404`.
    pub async fn personal_data(&self) -> Result<Option<PersonalData>, ApiError> {
        self.api.get_optional(PERSONAL_DATA_PATH).await
    }

    /// # Errors
    ///
    /// [`ApiError::Invalid`] for incomplete data, otherwise the backend's error.
    pub async fn save_personal_data(&self, data: &PersonalData) -> Result<PersonalData, ApiError> {
        data.validate()?;
        self.api.put(PERSONAL_DATA_PATH, data).await
    }

    /// # Errors
    ///
    /// Any [`ApiError`] other than the "nothing saved yet" `404`.
    pub async fn addresses(&self) -> Result<Vec<Address>, ApiError> {
        Ok(self.api.get_optional(ADDRESSES_PATH).await?.unwrap_or_default())
    }

    /// # Errors
    ///
    /// [`ApiError::Invalid`] for an incomplete address, otherwise the backend's error.
    pub async fn add_address(&self, address: &Address) -> Result<Address, ApiError> {
        address.validate()?;
        self.api.post(ADDRESSES_PATH, address).await
    }

    /// # Errors
    ///
    /// Any [`ApiError`].
    pub async fn delete_address(&self, id: i64) -> Result<(), ApiError> {
        self.api.delete(&format!("{ADDRESSES_PATH}/{id}")).await
    }

    /// Personal data and addresses fetched together, with the completion check.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`] from either lookup.
    pub async fn overview(&self) -> Result<ProfileOverview, ApiError> {
        let (personal, addresses) = tokio::try_join!(self.personal_data(), self.addresses())?;
        Ok(ProfileOverview::new(personal, addresses))
    }
}

#[cfg(test)]
#[path = "profile_test.rs"]
mod tests;

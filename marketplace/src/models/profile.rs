//! Personal data, addresses, and profile completion.

use serde::{Deserialize, Serialize};
use time::Date;

use super::ValidationError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalData {
    pub first_name: String,
    pub last_name: String,
    pub document_type: String,
    pub document_number: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<Date>,
}

impl PersonalData {
    /// Names of required fields that are blank.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
            ("documentType", &self.document_type),
            ("documentNumber", &self.document_number),
            ("phone", &self.phone),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// # Errors
    ///
    /// The first blank required field, or a phone number that is not 7-15 digits.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(field) = self.missing_fields().first().copied() {
            return Err(ValidationError::Missing(field));
        }
        let digits = self.phone.chars().filter(char::is_ascii_digit).count();
        let allowed = |c: char| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')');
        if !(7..=15).contains(&digits) || !self.phone.chars().all(allowed) {
            return Err(ValidationError::OutOfRange { field: "phone digits", min: 7, max: 15 });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub street: String,
    pub number: String,
    pub city: String,
    pub province: String,
    pub postal_code: String,
    pub country: String,
}

impl Address {
    /// # Errors
    ///
    /// The first blank field among street, city and country.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, value) in [("street", &self.street), ("city", &self.city), ("country", &self.country)] {
            if value.trim().is_empty() {
                return Err(ValidationError::Missing(name));
            }
        }
        Ok(())
    }
}

/// What a user still has to fill in before the profile counts as complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileCompletion {
    pub missing: Vec<&'static str>,
}

impl ProfileCompletion {
    #[must_use]
    pub fn evaluate(personal: Option<&PersonalData>, addresses: &[Address]) -> Self {
        let mut missing = match personal {
            Some(data) => data.missing_fields(),
            None => vec!["personalData"],
        };
        if addresses.is_empty() {
            missing.push("address");
        }
        Self { missing }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// The profile page in one value: saved data plus what is still missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileOverview {
    pub personal_data: Option<PersonalData>,
    pub addresses: Vec<Address>,
    pub completion: ProfileCompletion,
}

impl ProfileOverview {
    #[must_use]
    pub fn new(personal_data: Option<PersonalData>, addresses: Vec<Address>) -> Self {
        let completion = ProfileCompletion::evaluate(personal_data.as_ref(), &addresses);
        Self { personal_data, addresses, completion }
    }
}

#[cfg(test)]
#[path = "profile_test.rs"]
mod tests;

//! Coworking spaces and search filters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ValidationError;
use super::booking::BookingKind;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpaceKind {
    Desk,
    PrivateOffice,
    MeetingRoom,
    EventHall,
}

impl SpaceKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Desk => "DESK",
            Self::PrivateOffice => "PRIVATE_OFFICE",
            Self::MeetingRoom => "MEETING_ROOM",
            Self::EventHall => "EVENT_HALL",
        }
    }
}

impl fmt::Display for SpaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpaceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "DESK" => Ok(Self::Desk),
            "PRIVATE_OFFICE" => Ok(Self::PrivateOffice),
            "MEETING_ROOM" => Ok(Self::MeetingRoom),
            "EVENT_HALL" => Ok(Self::EventHall),
            other => Err(format!("unknown space kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Space {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub kind: SpaceKind,
    pub city: String,
    #[serde(default)]
    pub address: Option<String>,
    pub capacity: u32,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub hourly_price: Option<f64>,
    #[serde(default)]
    pub daily_price: Option<f64>,
    #[serde(default)]
    pub monthly_price: Option<f64>,
    #[serde(default)]
    pub provider_id: Option<String>,
    #[serde(default)]
    pub photos: Vec<String>,
}

impl Space {
    /// Unit price for `kind`, if the space is offered that way.
    #[must_use]
    pub fn price_for(&self, kind: BookingKind) -> Option<f64> {
        let price = match kind {
            BookingKind::Hourly => self.hourly_price,
            BookingKind::Daily => self.daily_price,
            BookingKind::Monthly => self.monthly_price,
        };
        price.filter(|p| *p > 0.0)
    }

    /// Cheapest advertised unit, shown on search cards ("from $X / hour").
    #[must_use]
    pub fn starting_price(&self) -> Option<(BookingKind, f64)> {
        [BookingKind::Hourly, BookingKind::Daily, BookingKind::Monthly]
            .into_iter()
            .find_map(|kind| self.price_for(kind).map(|price| (kind, price)))
    }
}

/// Search criteria for `GET /api/spaces`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpaceFilter {
    pub city: Option<String>,
    pub kind: Option<SpaceKind>,
    pub min_capacity: Option<u32>,
    pub max_price: Option<f64>,
    pub amenities: Vec<String>,
    pub page: u32,
    pub size: u32,
}

impl Default for SpaceFilter {
    fn default() -> Self {
        Self {
            city: None,
            kind: None,
            min_capacity: None,
            max_price: None,
            amenities: Vec::new(),
            page: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl SpaceFilter {
    /// Query pairs in a stable order; unset criteria are omitted.
    #[must_use]
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(city) = self.city.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            pairs.push(("city", city.to_owned()));
        }
        if let Some(kind) = self.kind {
            pairs.push(("kind", kind.as_str().to_owned()));
        }
        if let Some(capacity) = self.min_capacity.filter(|c| *c > 0) {
            pairs.push(("minCapacity", capacity.to_string()));
        }
        if let Some(price) = self.max_price.filter(|p| *p > 0.0) {
            pairs.push(("maxPrice", price.to_string()));
        }
        let amenities: Vec<&str> =
            self.amenities.iter().map(|a| a.trim()).filter(|a| !a.is_empty()).collect();
        if !amenities.is_empty() {
            pairs.push(("amenities", amenities.join(",")));
        }
        pairs.push(("page", self.page.to_string()));
        pairs.push(("size", self.size.clamp(1, MAX_PAGE_SIZE).to_string()));
        pairs
    }
}

/// Body of `POST /api/spaces` and `PUT /api/spaces/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceInput {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub kind: SpaceKind,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub capacity: u32,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hourly_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_price: Option<f64>,
}

impl SpaceInput {
    /// # Errors
    ///
    /// The first rule the listing breaks: a name and city, a capacity of
    /// 1-500, and at least one positive price.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::Missing("name"));
        }
        if self.city.trim().is_empty() {
            return Err(ValidationError::Missing("city"));
        }
        if !(1..=500).contains(&self.capacity) {
            return Err(ValidationError::OutOfRange { field: "capacity", min: 1, max: 500 });
        }
        let prices = [self.hourly_price, self.daily_price, self.monthly_price];
        if prices.iter().flatten().any(|p| *p <= 0.0) {
            return Err(ValidationError::NotPositive("price"));
        }
        if prices.iter().all(Option::is_none) {
            return Err(ValidationError::Missing("price"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "space_test.rs"]
mod tests;

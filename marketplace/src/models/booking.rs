//! Hourly, daily and monthly bookings, and the price quote shown before
//! confirming one.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::space::Space;
use super::{ValidationError, add_months};

const SECS_PER_HOUR: i64 = 60 * 60;
const SECS_PER_DAY: i64 = 24 * SECS_PER_HOUR;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingKind {
    Hourly,
    Daily,
    Monthly,
}

impl fmt::Display for BookingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Monthly => "monthly",
        })
    }
}

impl FromStr for BookingKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hourly" | "hour" => Ok(Self::Hourly),
            "daily" | "day" => Ok(Self::Daily),
            "monthly" | "month" => Ok(Self::Monthly),
            other => Err(format!("unknown booking kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: i64,
    pub space_id: i64,
    #[serde(default)]
    pub space_name: Option<String>,
    pub kind: BookingKind,
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end: OffsetDateTime,
    pub status: BookingStatus,
    pub total: f64,
}

impl Booking {
    /// Only pending or confirmed bookings that have not started can be cancelled.
    #[must_use]
    pub fn can_cancel(&self, now: OffsetDateTime) -> bool {
        matches!(self.status, BookingStatus::Pending | BookingStatus::Confirmed) && self.start > now
    }
}

/// Body of `POST /api/bookings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub space_id: i64,
    pub kind: BookingKind,
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub kind: BookingKind,
    pub units: u32,
    pub unit_price: f64,
    pub total: f64,
}

/// Price a booking of `space` from `start` to `end`.
///
/// Partial units are billed in full: hours and days round up, and a monthly
/// booking counts calendar months from `start`, rounding a partial month up.
///
/// # Errors
///
/// Rejects inverted ranges, starts before `now`, and kinds the space does
/// not price, plus monthly ranges that run off the end of the calendar.
pub fn quote(
    space: &Space,
    kind: BookingKind,
    start: OffsetDateTime,
    end: OffsetDateTime,
    now: OffsetDateTime,
) -> Result<Quote, ValidationError> {
    if end <= start {
        return Err(ValidationError::InvertedRange);
    }
    if start < now {
        return Err(ValidationError::InPast);
    }
    let unit_price = space.price_for(kind).ok_or(ValidationError::NotPriced(kind))?;

    let secs = (end - start).whole_seconds();
    let units = match kind {
        BookingKind::Hourly => ceil_div(secs, SECS_PER_HOUR),
        BookingKind::Daily => ceil_div(secs, SECS_PER_DAY),
        BookingKind::Monthly => months_covering(start, end)?,
    }
    .max(1);

    Ok(Quote { kind, units, unit_price, total: round_cents(unit_price * f64::from(units)) })
}

fn ceil_div(secs: i64, unit: i64) -> u32 {
    u32::try_from((secs + unit - 1) / unit).unwrap_or(u32::MAX)
}

fn months_covering(start: OffsetDateTime, end: OffsetDateTime) -> Result<u32, ValidationError> {
    let mut months = 1;
    loop {
        let boundary = add_months(start.date(), months).ok_or(ValidationError::BeyondCalendar("end"))?;
        if start.replace_date(boundary) >= end {
            return Ok(months);
        }
        months += 1;
    }
}

pub(crate) fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
#[path = "booking_test.rs"]
mod tests;

//! Long-term rental contracts: auto-renewal and cancellation policies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::Date;

use super::booking::round_cents;
use super::{ValidationError, add_months};

pub const MIN_RENTAL_MONTHS: u32 = 1;
pub const MAX_RENTAL_MONTHS: u32 = 36;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CancellationPolicy {
    Flexible,
    Moderate,
    Strict,
}

impl CancellationPolicy {
    /// Days of notice before the end date that avoid the penalty.
    #[must_use]
    pub fn notice_days(self) -> i64 {
        match self {
            Self::Flexible => 7,
            Self::Moderate => 30,
            Self::Strict => 60,
        }
    }

    /// Penalty, in monthly rents, when notice is not met.
    #[must_use]
    pub fn penalty_months(self) -> f64 {
        match self {
            Self::Flexible => 0.5,
            Self::Moderate => 1.0,
            Self::Strict => 2.0,
        }
    }
}

impl fmt::Display for CancellationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Flexible => "flexible",
            Self::Moderate => "moderate",
            Self::Strict => "strict",
        })
    }
}

impl FromStr for CancellationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flexible" => Ok(Self::Flexible),
            "moderate" => Ok(Self::Moderate),
            "strict" => Ok(Self::Strict),
            other => Err(format!("unknown cancellation policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RentalStatus {
    Pending,
    Active,
    Cancelled,
    Expired,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rental {
    pub id: i64,
    pub space_id: i64,
    #[serde(default)]
    pub space_name: Option<String>,
    pub start_date: Date,
    pub end_date: Date,
    pub monthly_price: f64,
    #[serde(default)]
    pub deposit: f64,
    #[serde(default)]
    pub auto_renewal: bool,
    #[serde(default = "one")]
    pub renewal_months: u32,
    pub cancellation_policy: CancellationPolicy,
    pub status: RentalStatus,
}

/// What cancelling a rental on a given day costs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationQuote {
    pub policy: CancellationPolicy,
    pub notice_days: i64,
    pub days_to_end: i64,
    pub notice_met: bool,
    pub penalty: f64,
    pub deposit_refunded: bool,
}

impl Rental {
    /// End date after the next automatic renewal, if one will happen.
    #[must_use]
    pub fn renewal_end(&self) -> Option<Date> {
        if !self.auto_renewal || self.status != RentalStatus::Active {
            return None;
        }
        add_months(self.end_date, self.renewal_months.max(1))
    }

    /// Price a cancellation requested on `on`.
    ///
    /// Meeting the policy's notice period waives the penalty. A strict
    /// contract also keeps the deposit when notice is missed or the
    /// cancellation falls inside the first month.
    ///
    /// # Errors
    ///
    /// Returns `NotCancellable` for finished contracts or dates past the end.
    pub fn cancellation_quote(&self, on: Date) -> Result<CancellationQuote, ValidationError> {
        if !matches!(self.status, RentalStatus::Pending | RentalStatus::Active) || on > self.end_date {
            return Err(ValidationError::NotCancellable(format!("rental {}", self.id)));
        }
        let policy = self.cancellation_policy;
        let days_to_end = (self.end_date - on).whole_days();
        let notice_met = days_to_end >= policy.notice_days();
        let penalty = if notice_met { 0.0 } else { round_cents(self.monthly_price * policy.penalty_months()) };
        let deposit_refunded = match policy {
            CancellationPolicy::Strict => notice_met && add_months(self.start_date, 1).is_some_and(|month_in| on >= month_in),
            CancellationPolicy::Flexible | CancellationPolicy::Moderate => true,
        };
        Ok(CancellationQuote { policy, notice_days: policy.notice_days(), days_to_end, notice_met, penalty, deposit_refunded })
    }
}

/// Body of `POST /api/rentals`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalRequest {
    pub space_id: i64,
    pub start_date: Date,
    pub months: u32,
    pub auto_renewal: bool,
    pub cancellation_policy: CancellationPolicy,
}

impl RentalRequest {
    /// Last day of the requested term; `None` past the end of the calendar.
    #[must_use]
    pub fn end_date(&self) -> Option<Date> {
        add_months(self.start_date, self.months)
    }

    /// # Errors
    ///
    /// Rejects terms outside 1-36 months, start dates before `today`, and
    /// terms that would end past the last representable date.
    pub fn validate(&self, today: Date) -> Result<(), ValidationError> {
        if !(MIN_RENTAL_MONTHS..=MAX_RENTAL_MONTHS).contains(&self.months) {
            return Err(ValidationError::OutOfRange {
                field: "months",
                min: i64::from(MIN_RENTAL_MONTHS),
                max: i64::from(MAX_RENTAL_MONTHS),
            });
        }
        if self.start_date < today {
            return Err(ValidationError::InPast);
        }
        if self.end_date().is_none() {
            return Err(ValidationError::BeyondCalendar("end date"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "rental_test.rs"]
mod tests;

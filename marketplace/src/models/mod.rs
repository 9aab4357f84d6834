//! Backend DTOs and the client-side rules that run before a request is sent.

pub mod booking;
pub mod dashboard;
pub mod invoice;
pub mod page;
pub mod profile;
pub mod rental;
pub mod space;

pub use booking::{Booking, BookingKind, BookingRequest, BookingStatus, Quote, quote};
pub use dashboard::{AdminKpis, ChartSeries, ClientKpis, Dashboard, MonthlyPoint, ProviderKpis};
pub use invoice::{Invoice, InvoiceStatus, PaymentCheckout};
pub use page::Page;
pub use profile::{Address, PersonalData, ProfileCompletion, ProfileOverview};
pub use rental::{CancellationPolicy, CancellationQuote, Rental, RentalRequest, RentalStatus};
pub use space::{Space, SpaceFilter, SpaceInput, SpaceKind};

use time::{Date, Month};

/// Client-side rejection of a request before it reaches the backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: &'static str, min: i64, max: i64 },
    #[error("{0} must be positive")]
    NotPositive(&'static str),
    #[error("the end must be after the start")]
    InvertedRange,
    #[error("the start is in the past")]
    InPast,
    #[error("this space does not offer {0} bookings")]
    NotPriced(BookingKind),
    #[error("{0} cannot be cancelled")]
    NotCancellable(String),
    #[error("invoice {0} is not open for payment")]
    NotPayable(i64),
    #[error("{0} falls past the last representable date")]
    BeyondCalendar(&'static str),
}

/// Same day `months` calendar months later, clamped to the end of shorter
/// months. `None` once the result would leave the supported calendar.
pub(crate) fn add_months(date: Date, months: u32) -> Option<Date> {
    let index = (date.year() * 12 + i32::from(u8::from(date.month())) - 1).checked_add(i32::try_from(months).ok()?)?;
    let year = index.div_euclid(12);
    let month = Month::try_from(u8::try_from(index.rem_euclid(12) + 1).ok()?).ok()?;
    (1..=date.day()).rev().find_map(|day| Date::from_calendar_date(year, month, day).ok())
}

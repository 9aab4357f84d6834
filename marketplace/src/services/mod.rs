//! Typed wrappers over the backend REST endpoints.
//!
//! Services validate input with the model rules before sending, so a request
//! the backend would reject for shape reasons never leaves the client.

pub mod auth;
pub mod bookings;
pub mod dashboard;
pub mod invoices;
pub mod profile;
pub mod rentals;
pub mod spaces;

pub use auth::AuthService;
pub use bookings::BookingService;
pub use dashboard::DashboardService;
pub use invoices::InvoiceService;
pub use profile::ProfileService;
pub use rentals::RentalService;
pub use spaces::SpaceService;

//! REST client for the FlexRent coworking marketplace.
//!
//! Builds on the `session` crate: [`firebase::FirebaseIdentity`] and
//! [`verifier::BackendRoleVerifier`] are its identity and role adapters, and
//! [`http::ApiClient`] runs every backend call through the bearer-token and
//! error-classification pipeline. [`services`] wraps the endpoints with typed
//! requests validated by the [`models`] rules.

pub mod config;
pub mod error;
pub mod firebase;
pub mod http;
pub mod models;
pub mod notify;
pub mod payment;
pub mod services;
pub mod verifier;

#[cfg(test)]
mod test_support;

pub use config::ApiConfig;
pub use error::{ApiError, Notice, Severity};
pub use firebase::FirebaseIdentity;
pub use http::ApiClient;
pub use notify::{Navigator, Notifier};
pub use payment::{PaymentOutcome, PaymentRedirects};
pub use verifier::BackendRoleVerifier;

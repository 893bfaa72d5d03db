//! Mechanic Hub backend integration.
//!
//! Provides a reqwest-based client for the marketplace REST API, covering
//! auth, service requests, offers, mechanics, reviews, location, KYC, and
//! the diamonds wallet.

mod client;
mod error;
pub mod types;


pub use client::ApiClient;
pub use error::ApiError;
pub use types::{MechanicLocation, PaymentMethod, RequestOffers};

//! Mechanic Hub Core Library
//!
//! Shared functionality for Mechanic Hub clients:
//! - Marketplace domain model (requests, offers, KYC, reviews, mechanics)
//! - Request/offer lifecycle state machine
//! - KYC document capture and review queue
//! - Configuration resolution and common error types

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod geo;
pub mod kyc;
pub mod lifecycle;
pub mod model;
pub mod tracing_init;

pub use config::Config;
pub use error::{Error, Result};
pub use lifecycle::{BookConfig, OfferCursor, RequestBook};

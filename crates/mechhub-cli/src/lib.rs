//! Mechanic Hub CLI Library
//!
//! Marketplace client for customers, mechanics, and admins: REST API client,
//! persisted session, polling loops, and the subcommands built on them.

pub mod api;
pub mod auth_cmd;
pub mod fmt;
pub mod kyc_cmd;
pub mod mechanic_cmd;
pub mod offer_cmd;
pub mod poll;
pub mod request_cmd;
pub mod review_cmd;
pub mod session;
pub mod track_cmd;
pub mod wallet_cmd;

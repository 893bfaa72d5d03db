//! Request/offer lifecycle state machine.
//!
//! `pending → offered → accepted → in-progress → completed`, with
//! `cancelled` reachable from every non-terminal state. Offers never have
//! their own terminal write; they become void once a sibling is accepted or
//! the request closes.

mod book;
mod offers;

pub use book::{BookConfig, RequestBook};
pub use offers::OfferCursor;

#[cfg(test)]
mod tests;

//! Offer submission and ordered listing.

use std::iter::FusedIterator;

use tracing::info;

use super::book::{RequestBook, transition};
use crate::error::{Error, Result};
use crate::model::{NewOffer, Offer, OfferStatus, RequestStatus};

impl RequestBook {
    /// Record a mechanic's bid on an open request.
    ///
    /// The first offer moves the request from `pending` to `offered`.
    pub fn submit_offer(&mut self, new: NewOffer) -> Result<Offer> {
        new.validate()?;

        let max_offers = self.config.max_offers_per_request;
        let now = self.clock.now();
        let request = self.request_mut(&new.request_id)?;

        if request.customer_id == new.mechanic.id {
            return Err(Error::InvalidTransition(format!(
                "Customers cannot bid on their own request {}",
                request.id
            )));
        }
        if !request.status.is_open() {
            return Err(Error::InvalidTransition(format!(
                "Request {} is {} and no longer takes offers",
                request.id, request.status
            )));
        }
        if request
            .offers
            .iter()
            .any(|o| o.mechanic_id == new.mechanic.id && !o.is_void(request))
        {
            return Err(Error::DuplicateOffer {
                request_id: request.id.clone(),
                mechanic_id: new.mechanic.id,
            });
        }
        if request.offers.len() >= max_offers {
            return Err(Error::Validation(format!(
                "Request {} already has the maximum of {max_offers} offers",
                request.id
            )));
        }

        let offer = Offer {
            id: uuid::Uuid::new_v4().to_string(),
            request_id: request.id.clone(),
            mechanic_id: new.mechanic.id,
            mechanic_name: new.mechanic.name,
            mechanic_rating: new.mechanic.rating,
            estimated_price: new.estimated_price,
            estimated_time: new.estimated_time.trim().to_string(),
            message: new.message.filter(|m| !m.trim().is_empty()),
            status: OfferStatus::Pending,
            created_at: now,
        };

        if request.status == RequestStatus::Pending {
            transition(request, RequestStatus::Offered)?;
        }
        request.offers.push(offer.clone());

        info!(
            request_id = %offer.request_id,
            offer_id = %offer.id,
            mechanic_id = %offer.mechanic_id,
            estimated_price = offer.estimated_price,
            "Offer submitted"
        );
        Ok(offer)
    }

    /// Offers on a request, earliest first, ties broken by ID.
    pub fn list_offers(&self, request_id: &str) -> Result<OfferCursor<'_>> {
        let request = self
            .get(request_id)
            .ok_or_else(|| Error::NotFound(format!("Request {request_id}")))?;
        Ok(OfferCursor::new(&request.offers))
    }
}

/// Finite, restartable iterator over offers in submission order.
///
/// Only the ordering is computed up front; offers are yielded by reference
/// on demand. Clone the cursor (or call [`OfferCursor::restart`]) to walk
/// the sequence again.
#[derive(Debug, Clone)]
pub struct OfferCursor<'a> {
    offers: &'a [Offer],
    order: Vec<usize>,
    pos: usize,
}

impl<'a> OfferCursor<'a> {
    pub fn new(offers: &'a [Offer]) -> Self {
        let mut order: Vec<usize> = (0..offers.len()).collect();
        order.sort_by(|&a, &b| {
            offers[a]
                .created_at
                .cmp(&offers[b].created_at)
                .then_with(|| offers[a].id.cmp(&offers[b].id))
        });
        Self {
            offers,
            order,
            pos: 0,
        }
    }

    /// Rewind to the earliest offer.
    pub const fn restart(&mut self) {
        self.pos = 0;
    }
}

impl<'a> Iterator for OfferCursor<'a> {
    type Item = &'a Offer;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = *self.order.get(self.pos)?;
        self.pos += 1;
        Some(&self.offers[idx])
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.order.len() - self.pos;
        (left, Some(left))
    }
}

impl ExactSizeIterator for OfferCursor<'_> {}

impl FusedIterator for OfferCursor<'_> {}

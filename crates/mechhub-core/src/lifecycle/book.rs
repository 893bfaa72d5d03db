//! Client-side mirror of service requests and their lifecycle.
//!
//! The backend is the source of truth. `RequestBook` applies the same
//! transition rules optimistically so a user gets immediate feedback, and
//! `reconcile` overwrites local state with whatever the last poll fetched.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::model::{NewRequest, OfferStatus, RequestStatus, ServiceRequest};

/// Lifecycle policy knobs.
#[derive(Debug, Clone)]
pub struct BookConfig {
    /// Offers a single request may collect before further bids are refused.
    pub max_offers_per_request: usize,
    /// Non-terminal requests older than this are cancelled by
    /// [`RequestBook::expire_stale`]. `None` disables the policy.
    pub offer_timeout: Option<Duration>,
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            max_offers_per_request: 10,
            offer_timeout: Some(Duration::minutes(30)),
        }
    }
}

/// Service requests known to this client, keyed by request ID.
pub struct RequestBook {
    pub(super) requests: HashMap<String, ServiceRequest>,
    pub(super) config: BookConfig,
    pub(super) clock: Arc<dyn Clock>,
}

impl RequestBook {
    pub fn new(config: BookConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: BookConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            requests: HashMap::new(),
            config,
            clock,
        }
    }

    pub fn config(&self) -> &BookConfig {
        &self.config
    }

    pub fn get(&self, request_id: &str) -> Option<&ServiceRequest> {
        self.requests.get(request_id)
    }

    /// All known requests, oldest first.
    pub fn requests(&self) -> Vec<&ServiceRequest> {
        let mut all: Vec<_> = self.requests.values().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        all
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub(super) fn request_mut(&mut self, request_id: &str) -> Result<&mut ServiceRequest> {
        self.requests
            .get_mut(request_id)
            .ok_or_else(|| Error::NotFound(format!("Request {request_id}")))
    }

    // =========================================================================
    // Request lifecycle
    // =========================================================================

    /// Post a new request in `pending` with no offers.
    pub fn create_request(&mut self, new: NewRequest) -> Result<ServiceRequest> {
        new.validate()?;

        let request = ServiceRequest {
            id: uuid::Uuid::new_v4().to_string(),
            customer_id: new.customer_id,
            category: new.category,
            description: new.description.trim().to_string(),
            location: new.location,
            requested_price: new.requested_price,
            urgency: new.urgency,
            status: RequestStatus::Pending,
            offers: Vec::new(),
            created_at: self.clock.now(),
        };

        info!(
            request_id = %request.id,
            category = %request.category,
            urgency = %request.urgency,
            "Request created"
        );
        self.requests.insert(request.id.clone(), request.clone());
        Ok(request)
    }

    /// Cancel an open request. Only its customer may cancel.
    pub fn cancel_request(&mut self, request_id: &str, actor_id: &str) -> Result<()> {
        let request = self.request_mut(request_id)?;
        ensure_customer(request, actor_id, "cancel")?;
        if !request.status.is_open() {
            return Err(Error::InvalidTransition(format!(
                "Request {request_id} is {} and can no longer be cancelled",
                request.status
            )));
        }
        transition(request, RequestStatus::Cancelled)
    }

    /// Hire the mechanic behind `offer_id`.
    ///
    /// Sibling offers are left untouched: an accepted sibling is what makes
    /// them void. A repeated call fails without side effects.
    pub fn accept_offer(
        &mut self,
        request_id: &str,
        offer_id: &str,
        actor_id: &str,
    ) -> Result<ServiceRequest> {
        let request = self.request_mut(request_id)?;
        ensure_customer(request, actor_id, "accept offers on")?;
        if !request.status.is_open() {
            return Err(Error::InvalidTransition(format!(
                "Request {request_id} is {} and can no longer accept offers",
                request.status
            )));
        }

        let idx = request
            .offers
            .iter()
            .position(|o| o.id == offer_id)
            .ok_or_else(|| Error::NotFound(format!("Offer {offer_id} on request {request_id}")))?;
        if request.offers[idx].is_void(request) {
            return Err(Error::InvalidTransition(format!(
                "Offer {offer_id} is void"
            )));
        }

        transition(request, RequestStatus::Accepted)?;
        request.offers[idx].status = OfferStatus::Accepted;
        info!(
            request_id,
            offer_id,
            mechanic_id = %request.offers[idx].mechanic_id,
            "Offer accepted"
        );
        Ok(request.clone())
    }

    /// The hired mechanic starts the job.
    pub fn start_work(&mut self, request_id: &str, actor_id: &str) -> Result<()> {
        let request = self.request_mut(request_id)?;
        if request.status != RequestStatus::Accepted {
            return Err(Error::InvalidTransition(format!(
                "Work on request {request_id} cannot start while it is {}",
                request.status
            )));
        }
        let hired = hired_mechanic(request)?;
        if hired != actor_id {
            return Err(Error::InvalidTransition(format!(
                "Only the hired mechanic may start work on request {request_id}"
            )));
        }
        transition(request, RequestStatus::InProgress)
    }

    /// The job is done; either the hired mechanic or the customer may say so.
    pub fn complete_work(&mut self, request_id: &str, actor_id: &str) -> Result<()> {
        let request = self.request_mut(request_id)?;
        if request.status != RequestStatus::InProgress {
            return Err(Error::InvalidTransition(format!(
                "Request {request_id} is {} and cannot be completed",
                request.status
            )));
        }
        let hired = hired_mechanic(request)?;
        if hired != actor_id && request.customer_id != actor_id {
            return Err(Error::InvalidTransition(format!(
                "Only the customer or hired mechanic may complete request {request_id}"
            )));
        }
        transition(request, RequestStatus::Completed)
    }

    /// Cancel every non-terminal request older than the configured timeout.
    ///
    /// Returns the IDs that were cancelled.
    pub fn expire_stale(&mut self) -> Vec<String> {
        let Some(timeout) = self.config.offer_timeout else {
            return Vec::new();
        };
        let now = self.clock.now();

        let mut expired = Vec::new();
        for request in self.requests.values_mut() {
            if request.status.is_terminal() || now - request.created_at < timeout {
                continue;
            }
            if transition(request, RequestStatus::Cancelled).is_ok() {
                expired.push(request.id.clone());
            }
        }
        for id in &expired {
            warn!(request_id = %id, "Request timed out and was cancelled");
        }
        expired
    }

    /// Replace the local copy of a request with the backend's snapshot.
    pub fn reconcile(&mut self, snapshot: ServiceRequest) {
        match self.requests.get(&snapshot.id) {
            Some(local) if local.status == snapshot.status => {
                debug!(request_id = %snapshot.id, "Request in sync");
            }
            Some(local) if local.status.can_transition_to(snapshot.status) => {
                info!(
                    request_id = %snapshot.id,
                    from = %local.status,
                    to = %snapshot.status,
                    "Request advanced on server"
                );
            }
            Some(local) => {
                warn!(
                    request_id = %snapshot.id,
                    local = %local.status,
                    server = %snapshot.status,
                    "Server state disagrees with local state, taking server"
                );
            }
            None => {
                debug!(request_id = %snapshot.id, status = %snapshot.status, "Request tracked");
            }
        }
        self.requests.insert(snapshot.id.clone(), snapshot);
    }

    /// Stop tracking a request.
    pub fn forget(&mut self, request_id: &str) -> Option<ServiceRequest> {
        self.requests.remove(request_id)
    }
}

fn ensure_customer(request: &ServiceRequest, actor_id: &str, action: &str) -> Result<()> {
    if request.customer_id == actor_id {
        Ok(())
    } else {
        Err(Error::InvalidTransition(format!(
            "Only the customer may {action} request {}",
            request.id
        )))
    }
}

fn hired_mechanic(request: &ServiceRequest) -> Result<&str> {
    request
        .accepted_offer()
        .map(|o| o.mechanic_id.as_str())
        .ok_or_else(|| {
            Error::InvalidTransition(format!("Request {} has no accepted offer", request.id))
        })
}

pub(super) fn transition(request: &mut ServiceRequest, next: RequestStatus) -> Result<()> {
    if !request.status.can_transition_to(next) {
        return Err(Error::InvalidTransition(format!(
            "Request {} cannot move from {} to {next}",
            request.id, request.status
        )));
    }
    debug!(request_id = %request.id, from = %request.status, to = %next, "Request transition");
    request.status = next;
    Ok(())
}

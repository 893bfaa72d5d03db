//! Offers (bids) mechanics place on service requests.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::request::ServiceRequest;
use crate::error::Error;

/// Stored offer status.
///
/// `Rejected` is what the backend may report for losing bids; the client
/// never writes it. A pending offer whose request already has an accepted
/// sibling is void regardless of its stored status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl OfferStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mechanic's bid against a specific request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    #[serde(alias = "_id")]
    pub id: String,
    pub request_id: String,
    pub mechanic_id: String,
    pub mechanic_name: String,
    #[serde(default)]
    pub mechanic_rating: f32,
    pub estimated_price: f64,
    pub estimated_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub status: OfferStatus,
    pub created_at: DateTime<Utc>,
}

impl Offer {
    /// Whether no further action is possible on this offer.
    ///
    /// True for explicitly rejected offers, and for every non-accepted offer
    /// once the owning request is hired out or closed.
    pub fn is_void(&self, request: &ServiceRequest) -> bool {
        self.is_void_among(&request.offers, request.status.is_terminal())
    }

    /// [`Offer::is_void`] against a bare offer list, for views that have the
    /// request's offers but not the request. `closed` is whether the request
    /// reached a terminal state.
    pub fn is_void_among(&self, offers: &[Self], closed: bool) -> bool {
        match self.status {
            OfferStatus::Accepted => false,
            OfferStatus::Rejected => true,
            OfferStatus::Pending => {
                closed
                    || offers
                        .iter()
                        .any(|o| o.id != self.id && o.status == OfferStatus::Accepted)
            }
        }
    }
}

/// Identity of the bidding mechanic, captured when the offer is made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MechanicSnapshot {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub rating: f32,
}

/// Input for submitting an offer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOffer {
    pub request_id: String,
    #[serde(skip)]
    pub mechanic: MechanicSnapshot,
    pub estimated_price: f64,
    pub estimated_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl NewOffer {
    pub fn validate(&self) -> Result<(), Error> {
        if !self.estimated_price.is_finite() || self.estimated_price <= 0.0 {
            return Err(Error::Validation("Please enter a valid price".into()));
        }
        if self.estimated_time.trim().is_empty() {
            return Err(Error::Validation("Time estimate is required".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn new_offer(price: f64, time: &str) -> NewOffer {
        NewOffer {
            request_id: "r1".into(),
            mechanic: MechanicSnapshot {
                id: "m1".into(),
                name: "Asif".into(),
                rating: 4.5,
            },
            estimated_price: price,
            estimated_time: time.into(),
            message: None,
        }
    }

    #[test]
    fn validate_rejects_bad_price_and_blank_time() {
        assert!(new_offer(1200.0, "2 hours").validate().is_ok());
        assert!(matches!(
            new_offer(0.0, "2 hours").validate(),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            new_offer(1200.0, "  ").validate(),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn wire_form_omits_mechanic_snapshot() {
        let json = serde_json::to_value(new_offer(1200.0, "1 hour")).unwrap();
        assert_eq!(json["requestId"], "r1");
        assert_eq!(json["estimatedPrice"], 1200.0);
        assert!(json.get("mechanic").is_none());
        assert!(json.get("message").is_none());
    }

    #[test]
    fn missing_status_defaults_to_pending() {
        let json = r#"{
            "_id": "o1",
            "requestId": "r1",
            "mechanicId": "m1",
            "mechanicName": "Asif",
            "estimatedPrice": 1200,
            "estimatedTime": "1 hour",
            "createdAt": "2024-03-13T10:00:00Z"
        }"#;
        let offer: Offer = serde_json::from_str(json).unwrap();
        assert_eq!(offer.status, OfferStatus::Pending);
        assert!(offer.message.is_none());
    }

    #[test]
    fn void_among_follows_the_hired_sibling() {
        let offer = |id: &str, status| Offer {
            id: id.into(),
            request_id: "r1".into(),
            mechanic_id: format!("m-{id}"),
            mechanic_name: id.into(),
            mechanic_rating: 4.0,
            estimated_price: 1000.0,
            estimated_time: "1 hour".into(),
            message: None,
            status,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
        };
        let open = vec![offer("a", OfferStatus::Pending), offer("b", OfferStatus::Pending)];
        assert!(!open[0].is_void_among(&open, false));
        assert!(open[0].is_void_among(&open, true));

        let hired = vec![offer("a", OfferStatus::Pending), offer("b", OfferStatus::Accepted)];
        assert!(hired[0].is_void_among(&hired, false));
        assert!(!hired[1].is_void_among(&hired, false));
        assert!(offer("c", OfferStatus::Rejected).is_void_among(&[], false));
    }
}

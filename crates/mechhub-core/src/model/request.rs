//! Service requests posted by customers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::category::ServiceCategory;
use super::offer::{Offer, OfferStatus};
use crate::error::Error;

/// Request lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestStatus {
    Pending,
    Offered,
    Accepted,
    InProgress,
    Completed,
    Cancelled,
}

impl RequestStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Offered => "offered",
            Self::Accepted => "accepted",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// No transition leaves a terminal state.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// States in which mechanics may still bid and the customer may still
    /// accept or cancel.
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::Offered)
    }

    /// Whether an offer has been accepted (the request is hired out).
    pub const fn is_hired(&self) -> bool {
        matches!(self, Self::Accepted | Self::InProgress | Self::Completed)
    }

    /// Whether the lifecycle graph has an edge from `self` to `next`.
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Offered | Self::Accepted | Self::Cancelled)
                | (Self::Offered, Self::Accepted | Self::Cancelled)
                | (Self::Accepted, Self::InProgress | Self::Cancelled)
                | (Self::InProgress, Self::Completed | Self::Cancelled)
        )
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How soon the customer needs the job done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    #[default]
    Normal,
    Urgent,
    Emergency,
}

impl Urgency {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Urgent => "urgent",
            Self::Emergency => "emergency",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Urgency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "urgent" => Ok(Self::Urgent),
            "emergency" => Ok(Self::Emergency),
            other => Err(Error::Validation(format!("Unknown urgency: {other}"))),
        }
    }
}

/// Where the job is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl Location {
    pub fn address(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            latitude: None,
            longitude: None,
        }
    }

    #[must_use]
    pub const fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn coordinates(&self) -> Option<crate::geo::Coordinates> {
        Some(crate::geo::Coordinates::new(self.latitude?, self.longitude?))
    }
}

/// A customer's posted need for a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRequest {
    #[serde(alias = "_id")]
    pub id: String,
    pub customer_id: String,
    pub category: ServiceCategory,
    pub description: String,
    pub location: Location,
    pub requested_price: f64,
    #[serde(default)]
    pub urgency: Urgency,
    pub status: RequestStatus,
    /// Arrival order.
    #[serde(default)]
    pub offers: Vec<Offer>,
    pub created_at: DateTime<Utc>,
}

impl ServiceRequest {
    /// The single accepted offer, if the request has been hired out.
    pub fn accepted_offer(&self) -> Option<&Offer> {
        self.offers
            .iter()
            .find(|o| o.status == OfferStatus::Accepted)
    }

    pub fn offer(&self, offer_id: &str) -> Option<&Offer> {
        self.offers.iter().find(|o| o.id == offer_id)
    }

    /// Offers that can still be acted on (none once an offer is accepted).
    pub fn live_offers(&self) -> impl Iterator<Item = &Offer> {
        self.offers.iter().filter(|o| !o.is_void(self))
    }
}

/// Input for creating a request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRequest {
    pub customer_id: String,
    pub category: ServiceCategory,
    pub description: String,
    pub location: Location,
    pub requested_price: f64,
    pub urgency: Urgency,
}

impl NewRequest {
    pub fn validate(&self) -> Result<(), Error> {
        if self.description.trim().is_empty() {
            return Err(Error::Validation("Description is required".into()));
        }
        if self.location.address.trim().is_empty() {
            return Err(Error::Validation("Location is required".into()));
        }
        if !self.requested_price.is_finite() || self.requested_price <= 0.0 {
            return Err(Error::Validation(
                "Requested price must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

//! Request and response bodies for the Mechanic Hub REST API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mechhub_core::geo::Coordinates;
use mechhub_core::model::{
    KycDecision, KycStatus, NewRequest, Offer, RequestStatus, ServiceCategory, ServiceRequest,
    User, UserRole,
};

/// Error body returned with non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub phone: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub phone: String,
    pub password: String,
    #[serde(rename = "type")]
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cnic: Option<String>,
    pub categories: Vec<ServiceCategory>,
}

/// Login and register response.
#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// Request addressed to one mechanic rather than broadcast.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectRequest<'a> {
    #[serde(flatten)]
    pub request: &'a NewRequest,
    pub mechanic_id: &'a str,
}

/// Envelope around a created request.
#[derive(Debug, Deserialize)]
pub struct CreatedRequest {
    pub request: ServiceRequest,
}

/// `GET /services/request/:id/offers` body.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestOffers {
    pub request: ServiceRequest,
    #[serde(default)]
    pub offers: Vec<Offer>,
}

impl RequestOffers {
    /// The request with the separately listed offers attached.
    pub fn into_request(self) -> ServiceRequest {
        let mut request = self.request;
        if !self.offers.is_empty() {
            request.offers = self.offers;
        }
        request
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptOfferRequest<'a> {
    pub request_id: &'a str,
    pub offer_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct StatusUpdate {
    pub status: RequestStatus,
}

/// Live location push.
#[derive(Debug, Clone, Serialize)]
pub struct LocationUpdate {
    pub lat: f64,
    pub lng: f64,
    pub timestamp: DateTime<Utc>,
}

impl LocationUpdate {
    pub const fn new(at: Coordinates, timestamp: DateTime<Utc>) -> Self {
        Self {
            lat: at.latitude,
            lng: at.longitude,
            timestamp,
        }
    }
}

/// `GET /location/mechanic/:id` body.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MechanicLocation {
    #[serde(default)]
    pub location: Option<Coordinates>,
    #[serde(default)]
    pub is_online: bool,
}

/// Leaderboard row.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub total_reviews: u32,
    #[serde(default)]
    pub jobs_completed: u32,
    #[serde(default)]
    pub quality_score: u32,
}

/// `GET /kyc/status` body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KycStatusResponse {
    pub kyc_status: KycStatus,
    #[serde(default)]
    pub kyc_verified: bool,
}

/// `POST /admin/kyc-approve` body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KycAdjudication<'a> {
    pub request_id: &'a str,
    pub action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'a str>,
}

impl<'a> KycAdjudication<'a> {
    pub fn new(request_id: &'a str, decision: &'a KycDecision) -> Self {
        match decision {
            KycDecision::Approve => Self {
                request_id,
                action: "approve",
                reason: None,
            },
            KycDecision::Reject { reason } => Self {
                request_id,
                action: "reject",
                reason: Some(reason.as_str()),
            },
        }
    }
}

/// Wallet top-up channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Jazzcash,
    Easypaisa,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyDiamonds<'a> {
    pub package_name: &'a str,
    pub payment_method: PaymentMethod,
    pub phone_number: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct WalletBalance {
    pub diamonds: u32,
}

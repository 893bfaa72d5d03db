//! Mechanic Hub REST API client.
//!
//! Uses reqwest against the backend's `/api` routes. Every call carries the
//! session's bearer token and `user-id` header when logged in.

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use mechhub_core::config::ApiConfig;
use mechhub_core::geo::Coordinates;
use mechhub_core::model::{
    KycDecision, KycStatus, KycSubmission, MechanicProfile, NewOffer, NewRequest, Offer,
    RequestStatus, Review, ReviewDraft, ServiceCategory, ServiceRequest,
};

use super::error::ApiError;
use super::types::{
    AcceptOfferRequest, AuthResponse, BuyDiamonds, CreatedRequest, DirectRequest, ErrorBody,
    KycAdjudication, KycStatusResponse, LeaderboardEntry, LocationUpdate, LoginRequest,
    MechanicLocation, PaymentMethod, RegisterRequest, RequestOffers, StatusUpdate, WalletBalance,
};
use crate::session::Session;

/// Mechanic Hub REST API client.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client, authenticating as the session's user if any.
    pub fn new(config: &ApiConfig, session: &Session) -> Result<Self, ApiError> {
        if config.base_url.trim().is_empty() {
            return Err(ApiError::Config("base_url is empty".into()));
        }

        let mut headers = HeaderMap::new();
        if let Some(token) = &session.token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| ApiError::Config("Invalid token format".into()))?;
            headers.insert(AUTHORIZATION, value);
        }
        if let Some(user) = &session.current_user {
            let value = HeaderValue::from_str(&user.id)
                .map_err(|_| ApiError::Config("Invalid user id".into()))?;
            headers.insert(HeaderName::from_static("user-id"), value);
        }

        // reqwest is built with rustls-no-provider; Err means one is already installed.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    pub(crate) fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn api_url_with_query(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.api_url(path))
            .map_err(|e| ApiError::Config(format!("Invalid API URL: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Map non-success statuses to [`ApiError`] using the `{message}` body.
    async fn check_status(resp: Response) -> Result<Response, ApiError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let fallback = status.canonical_reason().unwrap_or("Unknown").to_string();
        let message = resp
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(fallback);
        debug!(status = status.as_u16(), %message, "API call failed");
        Err(ApiError::from_status(status.as_u16(), message))
    }

    async fn fetch<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, ApiError> {
        let resp = Self::check_status(req.send().await?).await?;
        resp.json().await.map_err(ApiError::from_body)
    }

    async fn execute(req: RequestBuilder) -> Result<(), ApiError> {
        Self::check_status(req.send().await?).await?;
        Ok(())
    }

    // =========================================================================
    // Auth
    // =========================================================================

    pub async fn login(&self, phone: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let req = self
            .http
            .post(self.api_url("/auth/login"))
            .json(&LoginRequest { phone, password });
        Self::fetch(req).await
    }

    pub async fn register(&self, body: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        let req = self.http.post(self.api_url("/auth/register")).json(body);
        Self::fetch(req).await
    }

    // =========================================================================
    // Service requests
    // =========================================================================

    /// Post a request for the customer's chosen category.
    pub async fn create_request(&self, request: &NewRequest) -> Result<ServiceRequest, ApiError> {
        let req = self.http.post(self.api_url("/services/create")).json(request);
        Ok(Self::fetch::<CreatedRequest>(req).await?.request)
    }

    /// Send a request to one mechanic.
    pub async fn request_mechanic(
        &self,
        request: &NewRequest,
        mechanic_id: &str,
    ) -> Result<ServiceRequest, ApiError> {
        let req = self
            .http
            .post(self.api_url("/services/request"))
            .json(&DirectRequest {
                request,
                mechanic_id,
            });
        Ok(Self::fetch::<CreatedRequest>(req).await?.request)
    }

    /// Broadcast a request to every mechanic in its category.
    pub async fn broadcast_request(
        &self,
        request: &NewRequest,
    ) -> Result<ServiceRequest, ApiError> {
        let req = self
            .http
            .post(self.api_url("/services/broadcast"))
            .json(request);
        Ok(Self::fetch::<CreatedRequest>(req).await?.request)
    }

    /// Open requests mechanics can bid on.
    pub async fn available_requests(&self) -> Result<Vec<ServiceRequest>, ApiError> {
        Self::fetch(self.http.get(self.api_url("/services/available"))).await
    }

    /// A request together with its offers.
    pub async fn request_offers(&self, request_id: &str) -> Result<RequestOffers, ApiError> {
        let url = self.api_url(&format!("/services/request/{request_id}/offers"));
        Self::fetch(self.http.get(url)).await
    }

    /// Record cancel / start / complete on the server.
    pub async fn update_request_status(
        &self,
        request_id: &str,
        status: RequestStatus,
    ) -> Result<(), ApiError> {
        let url = self.api_url(&format!("/services/request/{request_id}/status"));
        Self::execute(self.http.post(url).json(&StatusUpdate { status })).await
    }

    // =========================================================================
    // Offers
    // =========================================================================

    pub async fn send_offer(&self, offer: &NewOffer) -> Result<Offer, ApiError> {
        let req = self.http.post(self.api_url("/offers/send")).json(offer);
        Self::fetch(req)
            .await
            .map_err(|e| e.into_duplicate_offer(&offer.request_id, &offer.mechanic.id))
    }

    pub async fn accept_offer(&self, request_id: &str, offer_id: &str) -> Result<(), ApiError> {
        let req = self
            .http
            .post(self.api_url("/offers/accept"))
            .json(&AcceptOfferRequest {
                request_id,
                offer_id,
            });
        Self::execute(req).await
    }

    pub async fn received_offers(&self, request_id: &str) -> Result<Vec<Offer>, ApiError> {
        let url = self.api_url(&format!("/offers/received/{request_id}"));
        Self::fetch(self.http.get(url)).await
    }

    // =========================================================================
    // Mechanics
    // =========================================================================

    pub async fn nearby_mechanics(
        &self,
        at: Coordinates,
        radius_km: f64,
    ) -> Result<Vec<MechanicProfile>, ApiError> {
        let (lat, lng, radius) = (
            at.latitude.to_string(),
            at.longitude.to_string(),
            radius_km.to_string(),
        );
        let url = self.api_url_with_query(
            "/mechanics/nearby",
            &[("lat", &lat), ("lng", &lng), ("radius", &radius)],
        )?;
        Self::fetch(self.http.get(url)).await
    }

    pub async fn mechanics_by_category(
        &self,
        category: ServiceCategory,
    ) -> Result<Vec<MechanicProfile>, ApiError> {
        let url = self.api_url_with_query(
            "/mechanics/by-category",
            &[("category", category.display_name())],
        )?;
        Self::fetch(self.http.get(url)).await
    }

    pub async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, ApiError> {
        Self::fetch(self.http.get(self.api_url("/mechanics/leaderboard"))).await
    }

    // =========================================================================
    // Reviews
    // =========================================================================

    pub async fn submit_review(&self, review: &ReviewDraft) -> Result<(), ApiError> {
        Self::execute(self.http.post(self.api_url("/reviews/submit")).json(review)).await
    }

    pub async fn reviews(&self, mechanic_id: &str) -> Result<Vec<Review>, ApiError> {
        let url = self.api_url(&format!("/reviews/{mechanic_id}"));
        Self::fetch(self.http.get(url)).await
    }

    // =========================================================================
    // Location
    // =========================================================================

    pub async fn update_location(&self, update: &LocationUpdate) -> Result<(), ApiError> {
        Self::execute(self.http.post(self.api_url("/location/update")).json(update)).await
    }

    pub async fn mechanic_location(&self, mechanic_id: &str) -> Result<MechanicLocation, ApiError> {
        let url = self.api_url(&format!("/location/mechanic/{mechanic_id}"));
        Self::fetch(self.http.get(url)).await
    }

    // =========================================================================
    // KYC and wallet
    // =========================================================================

    pub async fn kyc_requests(
        &self,
        status: Option<KycStatus>,
    ) -> Result<Vec<KycSubmission>, ApiError> {
        let query: Vec<(&str, &str)> = status.iter().map(|s| ("status", s.as_str())).collect();
        let url = self.api_url_with_query("/admin/kyc-requests", &query)?;
        Self::fetch(self.http.get(url)).await
    }

    pub async fn adjudicate_kyc(
        &self,
        submission_id: &str,
        decision: &KycDecision,
    ) -> Result<(), ApiError> {
        let req = self
            .http
            .post(self.api_url("/admin/kyc-approve"))
            .json(&KycAdjudication::new(submission_id, decision));
        Self::execute(req).await
    }

    pub async fn kyc_status(&self) -> Result<KycStatusResponse, ApiError> {
        Self::fetch(self.http.get(self.api_url("/kyc/status"))).await
    }

    pub async fn buy_diamonds(
        &self,
        package_name: &str,
        payment_method: PaymentMethod,
        phone_number: &str,
    ) -> Result<WalletBalance, ApiError> {
        let req = self
            .http
            .post(self.api_url("/wallet/buy-diamonds"))
            .json(&BuyDiamonds {
                package_name,
                payment_method,
                phone_number,
            });
        Self::fetch(req).await
    }
}

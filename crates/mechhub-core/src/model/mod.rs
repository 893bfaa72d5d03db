//! Marketplace domain types shared by the lifecycle book and the API client.

pub mod category;
pub mod kyc;
pub mod mechanic;
pub mod offer;
pub mod request;
pub mod review;
pub mod user;

pub use category::ServiceCategory;
pub use kyc::{KycDecision, KycStatus, KycSubmission};
pub use mechanic::{DIAMOND_PACKAGES, DIAMONDS_PER_HIRE, DiamondPackage, MechanicProfile};
pub use offer::{MechanicSnapshot, NewOffer, Offer, OfferStatus};
pub use request::{Location, NewRequest, RequestStatus, ServiceRequest, Urgency};
pub use review::{Review, ReviewDraft};
pub use user::{User, UserRole};

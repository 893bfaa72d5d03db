//! Mechanic profiles and the diamonds wallet.

use serde::{Deserialize, Serialize};

use super::category::ServiceCategory;
use crate::geo::Coordinates;

/// Public mechanic profile as listed by discovery endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MechanicProfile {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub categories: Vec<ServiceCategory>,
    #[serde(default)]
    pub completed_jobs: u32,
    #[serde(default)]
    pub location: Option<Coordinates>,
    #[serde(default)]
    pub diamonds: Option<u32>,
}

/// Diamonds a mechanic spends when a customer hires them on an offer.
pub const DIAMONDS_PER_HIRE: u32 = 1;

/// A purchasable bundle of diamonds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiamondPackage {
    pub id: &'static str,
    pub diamonds: u32,
    /// Price in PKR.
    pub price: u32,
}

pub const DIAMOND_PACKAGES: [DiamondPackage; 4] = [
    DiamondPackage { id: "small", diamonds: 100, price: 500 },
    DiamondPackage { id: "medium", diamonds: 250, price: 1000 },
    DiamondPackage { id: "large", diamonds: 500, price: 2000 },
    DiamondPackage { id: "premium", diamonds: 1000, price: 3500 },
];

impl DiamondPackage {
    pub fn find(id: &str) -> Option<Self> {
        DIAMOND_PACKAGES.iter().copied().find(|p| p.id == id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn finds_packages_by_id() {
        assert_eq!(DiamondPackage::find("medium").unwrap().diamonds, 250);
        assert!(DiamondPackage::find("huge").is_none());
    }

    #[test]
    fn profile_tolerates_sparse_documents() {
        let json = r#"{"_id": "m1", "name": "Asif", "categories": ["Plumber"]}"#;
        let p: MechanicProfile = serde_json::from_str(json).unwrap();
        assert_eq!(p.categories, vec![ServiceCategory::Plumber]);
        assert_eq!(p.completed_jobs, 0);
        assert!(p.location.is_none());
    }
}

//! Account identity restored from the session store.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::category::ServiceCategory;
use super::kyc::KycStatus;

/// Which side of the marketplace an account is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Customer,
    Mechanic,
    Admin,
}

impl UserRole {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Mechanic => "mechanic",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The logged-in user's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "type", default)]
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<ServiceCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kyc_status: Option<KycStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
}

impl User {
    pub fn is_mechanic(&self) -> bool {
        self.role == UserRole::Mechanic
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn login_payload_user() {
        let json = r#"{"_id": "u1", "name": "Bilal", "phone": "03001234567", "type": "mechanic",
            "categories": ["Car Mechanic", "AC/Fridge"]}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, "u1");
        assert!(user.is_mechanic());
        assert_eq!(user.categories[1], ServiceCategory::AcFridge);
        assert!(user.kyc_status.is_none());
    }

    #[test]
    fn role_defaults_to_customer() {
        let user: User = serde_json::from_str(r#"{"id": "u2", "name": "Sana"}"#).unwrap();
        assert_eq!(user.role, UserRole::Customer);
        assert!(!user.is_admin());
    }
}

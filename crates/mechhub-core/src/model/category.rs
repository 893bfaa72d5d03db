//! Service categories offered on the marketplace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Fixed set of service types a request can be posted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceCategory {
    #[serde(rename = "Bike Mechanic")]
    BikeMechanic,
    #[serde(rename = "Car Mechanic")]
    CarMechanic,
    #[serde(rename = "Plumber")]
    Plumber,
    #[serde(rename = "Electrician")]
    Electrician,
    #[serde(rename = "AC & Fridge", alias = "AC/Fridge")]
    AcFridge,
    #[serde(rename = "General Mart")]
    GeneralMart,
    #[serde(rename = "Carpenter")]
    Carpenter,
    #[serde(rename = "Painter")]
    Painter,
}

impl ServiceCategory {
    pub const ALL: [Self; 8] = [
        Self::BikeMechanic,
        Self::CarMechanic,
        Self::Plumber,
        Self::Electrician,
        Self::AcFridge,
        Self::GeneralMart,
        Self::Carpenter,
        Self::Painter,
    ];

    /// Name as the backend and the category picker show it.
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::BikeMechanic => "Bike Mechanic",
            Self::CarMechanic => "Car Mechanic",
            Self::Plumber => "Plumber",
            Self::Electrician => "Electrician",
            Self::AcFridge => "AC & Fridge",
            Self::GeneralMart => "General Mart",
            Self::Carpenter => "Carpenter",
            Self::Painter => "Painter",
        }
    }

    fn key(&self) -> String {
        normalize(self.display_name())
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

impl fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ServiceCategory {
    type Err = Error;

    /// Accepts display names and slugs in any case ("Plumber", "bike-mechanic",
    /// "ac/fridge").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        Self::ALL
            .into_iter()
            .find(|c| c.key() == wanted)
            .ok_or_else(|| Error::Validation(format!("Unknown service category: {s}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_display_names_and_slugs() {
        assert_eq!("Plumber".parse::<ServiceCategory>().unwrap(), ServiceCategory::Plumber);
        assert_eq!(
            "bike-mechanic".parse::<ServiceCategory>().unwrap(),
            ServiceCategory::BikeMechanic
        );
        assert_eq!("AC/Fridge".parse::<ServiceCategory>().unwrap(), ServiceCategory::AcFridge);
        assert_eq!(
            "ac & fridge".parse::<ServiceCategory>().unwrap(),
            ServiceCategory::AcFridge
        );
    }

    #[test]
    fn unknown_category_is_validation_error() {
        let err = "Astronaut".parse::<ServiceCategory>().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn serializes_as_display_name() {
        let json = serde_json::to_string(&ServiceCategory::CarMechanic).unwrap();
        assert_eq!(json, "\"Car Mechanic\"");
        let back: ServiceCategory = serde_json::from_str("\"AC/Fridge\"").unwrap();
        assert_eq!(back, ServiceCategory::AcFridge);
    }
}

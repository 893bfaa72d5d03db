//! Customer reviews of mechanics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Review being composed by a customer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDraft {
    pub mechanic_id: String,
    pub rating: u8,
    pub comment: String,
    pub photos: Vec<String>,
}

impl ReviewDraft {
    pub fn validate(&self) -> Result<(), Error> {
        if !(1..=5).contains(&self.rating) {
            return Err(Error::Validation("Please select a rating".into()));
        }
        if self.comment.trim().is_empty() {
            return Err(Error::Validation("Please write a comment".into()));
        }
        Ok(())
    }
}

/// Published review.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(alias = "_id")]
    pub id: String,
    pub mechanic_id: String,
    #[serde(default)]
    pub customer_name: Option<String>,
    pub rating: u8,
    pub comment: String,
    #[serde(default)]
    pub photos: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(rating: u8, comment: &str) -> ReviewDraft {
        ReviewDraft {
            mechanic_id: "m1".into(),
            rating,
            comment: comment.into(),
            photos: Vec::new(),
        }
    }

    #[test]
    fn rating_must_be_one_to_five() {
        assert!(draft(0, "ok").validate().is_err());
        assert!(draft(6, "ok").validate().is_err());
        assert!(draft(5, "Fixed it fast").validate().is_ok());
    }

    #[test]
    fn comment_must_not_be_blank() {
        assert!(matches!(draft(4, " \n").validate(), Err(Error::Validation(_))));
    }
}

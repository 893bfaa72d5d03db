//! Mechanic identity verification (KYC) records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// KYC review status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    NotStarted,
    Pending,
    Approved,
    Rejected,
}

impl KycStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Whether a fresh submission may be made from this state.
    pub const fn allows_submission(&self) -> bool {
        matches!(self, Self::NotStarted | Self::Rejected)
    }
}

impl fmt::Display for KycStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KycStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(Self::NotStarted),
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(Error::Validation(format!("Unknown KYC status: {other}"))),
        }
    }
}

/// A KYC submission with its review outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KycSubmission {
    pub id: String,
    pub user_id: String,
    pub status: KycStatus,
    pub cnic_front: String,
    pub cnic_back: String,
    pub selfie: String,
    pub submitted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

/// Admin verdict on a pending submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KycDecision {
    Approve,
    Reject { reason: String },
}

impl KycDecision {
    pub const fn status(&self) -> KycStatus {
        match self {
            Self::Approve => KycStatus::Approved,
            Self::Reject { .. } => KycStatus::Rejected,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for s in [
            KycStatus::NotStarted,
            KycStatus::Pending,
            KycStatus::Approved,
            KycStatus::Rejected,
        ] {
            assert_eq!(s.as_str().parse::<KycStatus>().unwrap(), s);
        }
    }

    #[test]
    fn only_fresh_or_rejected_may_submit() {
        assert!(KycStatus::NotStarted.allows_submission());
        assert!(KycStatus::Rejected.allows_submission());
        assert!(!KycStatus::Pending.allows_submission());
        assert!(!KycStatus::Approved.allows_submission());
    }
}

//! Persistent KYC review queue.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::capture::KYC_STEPS;
use crate::clock::{Clock, SystemClock};
use crate::db::{Database, DatabaseError};
use crate::error::{Error, Result};
use crate::model::{KycDecision, KycStatus, KycSubmission};

/// KYC row as stored.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct KycRow {
    pub id: String,
    pub user_id: String,
    pub status: String,
    pub cnic_front: String,
    pub cnic_back: String,
    pub selfie: String,
    pub submitted_at: i64,
    pub approved_at: Option<i64>,
    pub approved_by: Option<String>,
    pub rejected_at: Option<i64>,
    pub rejected_by: Option<String>,
    pub rejection_reason: Option<String>,
    pub seq: i64,
}

impl TryFrom<KycRow> for KycSubmission {
    type Error = Error;

    fn try_from(row: KycRow) -> Result<Self> {
        Ok(Self {
            status: row.status.parse()?,
            submitted_at: from_millis(row.submitted_at)?,
            approved_at: row.approved_at.map(from_millis).transpose()?,
            rejected_at: row.rejected_at.map(from_millis).transpose()?,
            id: row.id,
            user_id: row.user_id,
            cnic_front: row.cnic_front,
            cnic_back: row.cnic_back,
            selfie: row.selfie,
            approved_by: row.approved_by,
            rejected_by: row.rejected_by,
            rejection_reason: row.rejection_reason,
        })
    }
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| DatabaseError::Query(format!("Timestamp out of range: {ms}")).into())
}

fn already_submitted(user_id: &str, current: KycStatus) -> Error {
    Error::InvalidTransition(format!(
        "User {user_id} already has a {current} KYC submission"
    ))
}

/// Submission totals per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KycCounts {
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
}

impl KycCounts {
    pub const fn total(&self) -> u64 {
        self.pending + self.approved + self.rejected
    }
}

impl Database {
    // =========================================================================
    // KYC queries
    // =========================================================================

    /// Insert `row` unless the user's newest submission is pending or
    /// approved. Returns the number of rows written (0 or 1).
    ///
    /// Check and insert are one statement, so concurrent submits for the
    /// same user cannot both land.
    async fn insert_kyc_if_allowed(
        &self,
        row: &KycRow,
    ) -> std::result::Result<u64, DatabaseError> {
        let result = sqlx::query(
            r"
            INSERT INTO kyc_submissions
                (id, user_id, status, cnic_front, cnic_back, selfie, submitted_at, seq)
            SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7,
                (SELECT COALESCE(MAX(seq), 0) + 1 FROM kyc_submissions)
            WHERE NOT EXISTS (
                SELECT 1 FROM kyc_submissions
                WHERE user_id = ?2
                  AND status IN ('pending', 'approved')
                  AND seq = (SELECT MAX(seq) FROM kyc_submissions WHERE user_id = ?2)
            )
            ",
        )
        .bind(&row.id)
        .bind(&row.user_id)
        .bind(&row.status)
        .bind(&row.cnic_front)
        .bind(&row.cnic_back)
        .bind(&row.selfie)
        .bind(row.submitted_at)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected())
    }

    async fn get_kyc(&self, id: &str) -> std::result::Result<KycRow, DatabaseError> {
        sqlx::query_as::<_, KycRow>("SELECT * FROM kyc_submissions WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("KYC submission {id}")))
    }

    async fn latest_kyc_for_user(
        &self,
        user_id: &str,
    ) -> std::result::Result<Option<KycRow>, DatabaseError> {
        let row = sqlx::query_as::<_, KycRow>(
            "SELECT * FROM kyc_submissions WHERE user_id = ? ORDER BY seq DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }

    async fn list_kyc(
        &self,
        status: Option<KycStatus>,
        user_id: Option<&str>,
    ) -> std::result::Result<Vec<KycRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, KycRow>(
            r"
            SELECT * FROM kyc_submissions
            WHERE (?1 IS NULL OR status = ?1) AND (?2 IS NULL OR user_id = ?2)
            ORDER BY seq DESC
            ",
        )
        .bind(status.map(|s| s.as_str()))
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    async fn approve_kyc(
        &self,
        id: &str,
        admin_id: &str,
        at: i64,
    ) -> std::result::Result<u64, DatabaseError> {
        let result = sqlx::query(
            r"
            UPDATE kyc_submissions
            SET status = 'approved', approved_at = ?, approved_by = ?
            WHERE id = ? AND status = 'pending'
            ",
        )
        .bind(at)
        .bind(admin_id)
        .bind(id)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected())
    }

    async fn reject_kyc(
        &self,
        id: &str,
        admin_id: &str,
        reason: &str,
        at: i64,
    ) -> std::result::Result<u64, DatabaseError> {
        let result = sqlx::query(
            r"
            UPDATE kyc_submissions
            SET status = 'rejected', rejected_at = ?, rejected_by = ?, rejection_reason = ?
            WHERE id = ? AND status = 'pending'
            ",
        )
        .bind(at)
        .bind(admin_id)
        .bind(reason)
        .bind(id)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected())
    }

    async fn count_kyc_by_status(&self) -> std::result::Result<Vec<(String, i64)>, DatabaseError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT status, COUNT(*) FROM kyc_submissions GROUP BY status",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }
}

/// Mechanic submissions and admin verdicts.
///
/// A user may hold several rows over time; only the newest one decides
/// their status. Rejected rows are kept when the user resubmits.
#[derive(Clone)]
pub struct KycQueue {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl KycQueue {
    pub fn new(db: Database) -> Self {
        Self::with_clock(db, Arc::new(SystemClock))
    }

    pub fn with_clock(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// File a new submission for review.
    pub async fn submit(
        &self,
        user_id: &str,
        images: [Option<String>; KYC_STEPS],
    ) -> Result<KycSubmission> {
        let [Some(front), Some(back), Some(selfie)] = images.map(|img| {
            img.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        }) else {
            return Err(Error::Validation(
                "Please complete all steps before submitting".into(),
            ));
        };

        let current = self.status_for_user(user_id).await?;
        if !current.allows_submission() {
            return Err(already_submitted(user_id, current));
        }

        let row = KycRow {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            status: KycStatus::Pending.as_str().to_string(),
            cnic_front: front,
            cnic_back: back,
            selfie,
            submitted_at: self.clock.now().timestamp_millis(),
            approved_at: None,
            approved_by: None,
            rejected_at: None,
            rejected_by: None,
            rejection_reason: None,
            seq: 0,
        };
        // Another submit for this user won the race since the check above.
        if self.db.insert_kyc_if_allowed(&row).await? == 0 {
            let current = self.status_for_user(user_id).await?;
            return Err(already_submitted(user_id, current));
        }

        info!(submission_id = %row.id, user_id, "KYC submitted");
        self.get(&row.id).await
    }

    /// Approve or reject a pending submission.
    pub async fn adjudicate(
        &self,
        submission_id: &str,
        admin_id: &str,
        decision: KycDecision,
    ) -> Result<KycSubmission> {
        if matches!(&decision, KycDecision::Reject { reason } if reason.trim().is_empty()) {
            return Err(Error::Validation(
                "Please provide a reason for rejection".into(),
            ));
        }

        let existing = self.get(submission_id).await?;
        if existing.status != KycStatus::Pending {
            return Err(Error::InvalidTransition(format!(
                "KYC submission {submission_id} is already {}",
                existing.status
            )));
        }

        let now = self.clock.now().timestamp_millis();
        let updated = match &decision {
            KycDecision::Approve => self.db.approve_kyc(submission_id, admin_id, now).await?,
            KycDecision::Reject { reason } => {
                self.db
                    .reject_kyc(submission_id, admin_id, reason.trim(), now)
                    .await?
            }
        };
        if updated == 0 {
            warn!(submission_id, "KYC submission changed during review");
            return Err(Error::InvalidTransition(format!(
                "KYC submission {submission_id} is no longer pending"
            )));
        }

        info!(
            submission_id,
            admin_id,
            status = %decision.status(),
            "KYC reviewed"
        );
        self.get(submission_id).await
    }

    pub async fn get(&self, submission_id: &str) -> Result<KycSubmission> {
        match self.db.get_kyc(submission_id).await {
            Ok(row) => row.try_into(),
            Err(DatabaseError::NotFound(what)) => Err(Error::NotFound(what)),
            Err(e) => Err(e.into()),
        }
    }

    /// Submissions, newest first, optionally filtered by status.
    pub async fn list(&self, status: Option<KycStatus>) -> Result<Vec<KycSubmission>> {
        self.db
            .list_kyc(status, None)
            .await?
            .into_iter()
            .map(KycSubmission::try_from)
            .collect()
    }

    /// Status of the user's newest submission, `not_started` if none.
    pub async fn status_for_user(&self, user_id: &str) -> Result<KycStatus> {
        match self.db.latest_kyc_for_user(user_id).await? {
            Some(row) => row.status.parse(),
            None => Ok(KycStatus::NotStarted),
        }
    }

    /// Every submission by a user, newest first.
    pub async fn history(&self, user_id: &str) -> Result<Vec<KycSubmission>> {
        self.db
            .list_kyc(None, Some(user_id))
            .await?
            .into_iter()
            .map(KycSubmission::try_from)
            .collect()
    }

    pub async fn counts(&self) -> Result<KycCounts> {
        let mut counts = KycCounts::default();
        for (status, n) in self.db.count_kyc_by_status().await? {
            let n = u64::try_from(n).unwrap_or(0);
            match status.parse()? {
                KycStatus::Pending => counts.pending = n,
                KycStatus::Approved => counts.approved = n,
                KycStatus::Rejected => counts.rejected = n,
                KycStatus::NotStarted => {}
            }
        }
        Ok(counts)
    }
}

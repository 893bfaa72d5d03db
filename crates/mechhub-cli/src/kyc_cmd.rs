//! KYC subcommands: submit, status, history (mechanics) and list, show,
//! approve, reject, counts (admins).
//!
//! Submissions live in the local SQLite queue at `~/.mechhub/kyc.db`.
//! `--remote` routes status and review commands to the backend instead.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::io::{self, Write};
use std::path::Path;

use anyhow::Context;

use mechhub_core::Config;
use mechhub_core::db::Database;
use mechhub_core::kyc::{KYC_STEPS, KycCapture, KycQueue};
use mechhub_core::model::{KycDecision, KycStatus, User};

use crate::api::ApiClient;
use crate::fmt::{write_kyc_detail, write_kyc_row};
use crate::session::SessionContext;

/// KYC subcommand actions.
#[derive(clap::Subcommand, Debug)]
pub enum KycAction {
    /// Submit CNIC front, CNIC back, and selfie images for review.
    Submit {
        /// CNIC front image.
        #[arg(long)]
        front: Option<String>,
        /// CNIC back image.
        #[arg(long)]
        back: Option<String>,
        /// Selfie holding the CNIC.
        #[arg(long)]
        selfie: Option<String>,
    },
    /// Show your verification status.
    Status {
        /// Ask the backend instead of the local queue.
        #[arg(long)]
        remote: bool,
    },
    /// Show all of your submissions, newest first.
    History,
    /// List submissions (admins).
    List {
        /// Filter: pending, approved, rejected.
        #[arg(short, long)]
        status: Option<KycStatus>,
        /// Read the backend queue instead of the local one.
        #[arg(long)]
        remote: bool,
    },
    /// Show one submission (admins).
    Show {
        /// Submission ID.
        submission_id: String,
    },
    /// Approve a pending submission (admins).
    Approve {
        /// Submission ID.
        submission_id: String,
        /// Review on the backend instead of locally.
        #[arg(long)]
        remote: bool,
    },
    /// Reject a pending submission with a reason (admins).
    Reject {
        /// Submission ID.
        submission_id: String,
        /// Why the documents were not accepted.
        #[arg(short, long)]
        reason: String,
        /// Review on the backend instead of locally.
        #[arg(long)]
        remote: bool,
    },
    /// Count submissions per status (admins).
    Counts,
}

/// Execute a KYC subcommand.
pub async fn run(
    action: KycAction,
    session: &SessionContext,
    config: &Config,
) -> anyhow::Result<()> {
    let user = session.require_user()?.clone();
    let mut out = io::stdout();

    match action {
        KycAction::Submit {
            front,
            back,
            selfie,
        } => {
            let mut capture = KycCapture::new();
            for (step, image) in [(1, front), (2, back), (3, selfie)] {
                if let Some(image) = image {
                    capture.capture_step(step, &resolve_image(&image)?)?;
                }
            }
            if !capture.is_complete() {
                let missing: Vec<&str> = capture
                    .missing_steps()
                    .into_iter()
                    .filter_map(KycCapture::step_name)
                    .collect();
                anyhow::bail!("Missing {}. All {KYC_STEPS} images are required", missing.join(", "));
            }
            let queue = open_queue().await?;
            let submission = queue.submit(&user.id, capture.into_images()).await?;
            writeln!(out, "KYC submitted for review")?;
            write_kyc_detail(&mut out, &submission)?;
        }
        KycAction::Status { remote: true } => {
            let client = ApiClient::new(&config.api, session.session())?;
            let status = client.kyc_status().await?;
            writeln!(out, "KYC status: {}", status.kyc_status)?;
            writeln!(out, "Verified: {}", if status.kyc_verified { "yes" } else { "no" })?;
        }
        KycAction::Status { remote: false } => {
            let queue = open_queue().await?;
            let status = queue.status_for_user(&user.id).await?;
            writeln!(out, "KYC status: {status}")?;
            match status {
                KycStatus::NotStarted => {
                    writeln!(out, "Submit your documents with `mechhub kyc submit`")?;
                }
                KycStatus::Rejected => {
                    if let Some(reason) = queue
                        .history(&user.id)
                        .await?
                        .into_iter()
                        .next()
                        .and_then(|s| s.rejection_reason)
                    {
                        writeln!(out, "Reason: {reason}")?;
                    }
                    writeln!(out, "You can resubmit with `mechhub kyc submit`")?;
                }
                KycStatus::Pending | KycStatus::Approved => {}
            }
        }
        KycAction::History => {
            let history = open_queue().await?.history(&user.id).await?;
            if history.is_empty() {
                writeln!(out, "No submissions yet.")?;
            }
            for (i, submission) in history.iter().enumerate() {
                if i > 0 {
                    writeln!(out)?;
                }
                write_kyc_detail(&mut out, submission)?;
            }
        }
        KycAction::List { status, remote } => {
            require_admin(&user)?;
            let submissions = if remote {
                let client = ApiClient::new(&config.api, session.session())?;
                client.kyc_requests(status).await?
            } else {
                open_queue().await?.list(status).await?
            };
            if submissions.is_empty() {
                writeln!(out, "No KYC submissions.")?;
            } else {
                writeln!(out, "{:<36} {:<20} {:<9} SUBMITTED", "ID", "USER", "STATUS")?;
                for submission in &submissions {
                    write_kyc_row(&mut out, submission)?;
                }
                writeln!(out, "\n{} submission(s)", submissions.len())?;
            }
        }
        KycAction::Show { submission_id } => {
            require_admin(&user)?;
            let submission = open_queue().await?.get(&submission_id).await?;
            write_kyc_detail(&mut out, &submission)?;
        }
        KycAction::Approve {
            submission_id,
            remote,
        } => {
            require_admin(&user)?;
            adjudicate(session, config, &user, &submission_id, KycDecision::Approve, remote)
                .await?;
            writeln!(out, "KYC {submission_id} approved")?;
        }
        KycAction::Reject {
            submission_id,
            reason,
            remote,
        } => {
            require_admin(&user)?;
            let decision = KycDecision::Reject { reason };
            adjudicate(session, config, &user, &submission_id, decision, remote).await?;
            writeln!(out, "KYC {submission_id} rejected")?;
        }
        KycAction::Counts => {
            require_admin(&user)?;
            let counts = open_queue().await?.counts().await?;
            writeln!(out, "Pending:  {}", counts.pending)?;
            writeln!(out, "Approved: {}", counts.approved)?;
            writeln!(out, "Rejected: {}", counts.rejected)?;
            writeln!(out, "Total:    {}", counts.total())?;
        }
    }
    Ok(())
}

async fn adjudicate(
    session: &SessionContext,
    config: &Config,
    admin: &User,
    submission_id: &str,
    decision: KycDecision,
    remote: bool,
) -> anyhow::Result<()> {
    if remote {
        // Same blank-reason rule the local queue enforces.
        if matches!(&decision, KycDecision::Reject { reason } if reason.trim().is_empty()) {
            anyhow::bail!("Please provide a reason for rejection");
        }
        let client = ApiClient::new(&config.api, session.session())?;
        client.adjudicate_kyc(submission_id, &decision).await?;
    } else {
        open_queue()
            .await?
            .adjudicate(submission_id, &admin.id, decision)
            .await?;
    }
    Ok(())
}

async fn open_queue() -> anyhow::Result<KycQueue> {
    let path = mechhub_core::config::kyc_database_path()
        .ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    let db = Database::open(&path)
        .await
        .with_context(|| format!("Failed to open KYC database at {}", path.display()))?;
    Ok(KycQueue::new(db))
}

fn require_admin(user: &User) -> anyhow::Result<()> {
    if user.is_admin() {
        Ok(())
    } else {
        anyhow::bail!("Only admins can review KYC submissions")
    }
}

/// Absolute path of an existing image file.
fn resolve_image(image: &str) -> anyhow::Result<String> {
    let path = Path::new(image.trim());
    let absolute = std::fs::canonicalize(path)
        .with_context(|| format!("Image not found: {}", path.display()))?;
    Ok(absolute.to_string_lossy().into_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn resolve_image_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let front = dir.path().join("front.jpg");
        std::fs::write(&front, b"jpeg").unwrap();

        let resolved = resolve_image(front.to_str().unwrap()).unwrap();
        assert!(Path::new(&resolved).is_absolute());
        assert!(resolved.ends_with("front.jpg"));

        let err = resolve_image(dir.path().join("back.jpg").to_str().unwrap()).unwrap_err();
        assert!(err.to_string().starts_with("Image not found"));
    }

    #[test]
    fn only_admins_review() {
        let admin: User =
            serde_json::from_value(serde_json::json!({"id": "a1", "name": "Admin", "type": "admin"}))
                .unwrap();
        let mechanic: User = serde_json::from_value(
            serde_json::json!({"id": "m1", "name": "Asif", "type": "mechanic"}),
        )
        .unwrap();
        assert!(require_admin(&admin).is_ok());
        assert!(require_admin(&mechanic).is_err());
    }
}

//! Review subcommands: submit, list.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::io::{self, Write};

use mechhub_core::Config;
use mechhub_core::model::ReviewDraft;

use crate::api::ApiClient;
use crate::fmt::write_review;
use crate::session::SessionContext;

/// Review subcommand actions.
#[derive(clap::Subcommand, Debug)]
pub enum ReviewAction {
    /// Rate a mechanic after a completed job.
    Submit {
        /// Mechanic ID.
        mechanic_id: String,
        /// Stars, 1 to 5.
        #[arg(short, long)]
        rating: u8,
        /// What went well or badly.
        #[arg(short, long)]
        comment: String,
        /// Photo references (repeatable).
        #[arg(short, long = "photo")]
        photos: Vec<String>,
    },
    /// Show a mechanic's reviews.
    List {
        /// Mechanic ID.
        mechanic_id: String,
    },
}

/// Execute a review subcommand.
pub async fn run(
    action: ReviewAction,
    session: &SessionContext,
    config: &Config,
) -> anyhow::Result<()> {
    let mut out = io::stdout();
    match action {
        ReviewAction::Submit {
            mechanic_id,
            rating,
            comment,
            photos,
        } => {
            session.require_user()?;
            let draft = ReviewDraft {
                mechanic_id,
                rating,
                comment: comment.trim().to_string(),
                photos,
            };
            draft.validate()?;
            let client = ApiClient::new(&config.api, session.session())?;
            client.submit_review(&draft).await?;
            writeln!(out, "Thanks! Your review has been submitted")?;
        }
        ReviewAction::List { mechanic_id } => {
            let client = ApiClient::new(&config.api, session.session())?;
            let reviews = client.reviews(&mechanic_id).await?;
            if reviews.is_empty() {
                writeln!(out, "No reviews yet.")?;
                return Ok(());
            }
            let total: u32 = reviews.iter().map(|r| u32::from(r.rating)).sum();
            #[allow(clippy::cast_precision_loss)]
            let average = f64::from(total) / reviews.len() as f64;
            writeln!(out, "{average:.1}★ from {} review(s)\n", reviews.len())?;
            for review in &reviews {
                write_review(&mut out, review)?;
            }
        }
    }
    Ok(())
}

//! Mechanic Hub CLI
//!
//! Marketplace client: customers post service requests and hire mechanics,
//! mechanics bid and share their location, admins review KYC submissions.

use std::io::{self, Write};

use clap::{Parser, Subcommand};
use tracing::{debug, info};

use mechhub_cli::api::ApiError;
use mechhub_cli::auth_cmd::{self, AuthAction};
use mechhub_cli::kyc_cmd::{self, KycAction};
use mechhub_cli::mechanic_cmd::{self, MechanicAction};
use mechhub_cli::offer_cmd::{self, OfferAction};
use mechhub_cli::request_cmd::{self, RequestAction};
use mechhub_cli::review_cmd::{self, ReviewAction};
use mechhub_cli::session::{SessionContext, SessionStore};
use mechhub_cli::track_cmd::{self, TrackAction};
use mechhub_cli::wallet_cmd::{self, WalletAction};

#[derive(Parser, Debug)]
#[command(name = "mechhub")]
#[command(version, about = "Mechanic Hub marketplace CLI", long_about = None)]
struct Cli {
    /// Backend API base URL (overrides settings.json)
    #[arg(long, global = true, env = "MECHHUB_API_URL")]
    api_url: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Log in, register, log out
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
    /// Post and manage service requests
    Request {
        #[command(subcommand)]
        action: RequestAction,
    },
    /// Send and review offers
    Offer {
        #[command(subcommand)]
        action: OfferAction,
    },
    /// Identity verification
    Kyc {
        #[command(subcommand)]
        action: KycAction,
    },
    /// Find mechanics
    Mechanic {
        #[command(subcommand)]
        action: MechanicAction,
    },
    /// Rate mechanics
    Review {
        #[command(subcommand)]
        action: ReviewAction,
    },
    /// Live location
    Track {
        #[command(subcommand)]
        action: TrackAction,
    },
    /// Diamond packages
    Wallet {
        #[command(subcommand)]
        action: WalletAction,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = mechhub_core::config::load_config()?;
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }
    mechhub_core::tracing_init::init_tracing(
        &format!("mechhub={}", config.log_level),
        cli.log_json,
    );
    info!(version = env!("CARGO_PKG_VERSION"), api = %config.api.base_url, "Starting mechhub");

    let store = SessionStore::default_location()?;
    debug!(path = %store.path().display(), "Session store");
    let mut session = SessionContext::open(store);

    let result = match cli.command {
        Commands::Auth { action } => auth_cmd::run(action, &mut session, &config).await,
        Commands::Request { action } => request_cmd::run(action, &session, &config).await,
        Commands::Offer { action } => offer_cmd::run(action, &session, &config).await,
        Commands::Kyc { action } => kyc_cmd::run(action, &session, &config).await,
        Commands::Mechanic { action } => mechanic_cmd::run(action, &session, &config).await,
        Commands::Review { action } => review_cmd::run(action, &session, &config).await,
        Commands::Track { action } => track_cmd::run(action, &session, &config).await,
        Commands::Wallet { action } => wallet_cmd::run(action, &session, &config).await,
    };

    if let Err(e) = &result {
        if is_retryable(e) {
            let _ = writeln!(
                io::stderr(),
                "Could not reach Mechanic Hub at {}. Check your connection and try again.",
                config.api.base_url
            );
        }
    }
    result
}

fn is_retryable(err: &anyhow::Error) -> bool {
    if let Some(api) = err.downcast_ref::<ApiError>() {
        return api.is_retryable();
    }
    err.downcast_ref::<mechhub_core::Error>()
        .is_some_and(mechhub_core::Error::is_retryable)
}

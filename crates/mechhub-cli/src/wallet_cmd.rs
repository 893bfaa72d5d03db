//! Diamond wallet subcommands: packages, status, buy.
//!
//! Mechanics spend diamonds to get hired.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::io::{self, Write};

use mechhub_core::Config;
use mechhub_core::model::{DIAMOND_PACKAGES, DIAMONDS_PER_HIRE, DiamondPackage};

use crate::api::{ApiClient, PaymentMethod};
use crate::session::SessionContext;

/// Wallet subcommand actions.
#[derive(clap::Subcommand, Debug)]
pub enum WalletAction {
    /// List diamond packages.
    Packages,
    /// Show whether the account may receive jobs.
    Status,
    /// Buy a diamond package.
    Buy {
        /// Package ID: small, medium, large, premium.
        package: String,
        /// Payment channel.
        #[arg(short, long, value_enum)]
        method: PaymentMethod,
        /// Mobile wallet phone number.
        #[arg(short, long)]
        phone: String,
    },
}

/// Execute a wallet subcommand.
pub async fn run(
    action: WalletAction,
    session: &SessionContext,
    config: &Config,
) -> anyhow::Result<()> {
    let mut out = io::stdout();
    match action {
        WalletAction::Packages => {
            writeln!(out, "{:<8} {:>8} {:>10}", "PACKAGE", "DIAMONDS", "PRICE")?;
            for p in &DIAMOND_PACKAGES {
                writeln!(out, "{:<8} {:>8} {:>10}", p.id, p.diamonds, format!("Rs. {}", p.price))?;
            }
            writeln!(out, "\nEach hire costs {DIAMONDS_PER_HIRE} diamond(s)")?;
        }
        WalletAction::Status => {
            let user = session.require_user()?;
            let client = ApiClient::new(&config.api, session.session())?;
            let kyc = client.kyc_status().await?;
            writeln!(out, "Account: {}", user.name)?;
            writeln!(out, "KYC: {}", kyc.kyc_status)?;
            if !kyc.kyc_verified {
                writeln!(out, "Complete KYC to receive jobs")?;
            }
        }
        WalletAction::Buy {
            package,
            method,
            phone,
        } => {
            let user = session.require_user()?;
            if !user.is_mechanic() {
                anyhow::bail!("Only mechanics hold a diamond wallet");
            }
            let pkg = DiamondPackage::find(&package).ok_or_else(|| {
                anyhow::anyhow!("Unknown package {package}. See `mechhub wallet packages`")
            })?;
            if phone.trim().is_empty() {
                anyhow::bail!("Please enter your phone number");
            }
            let client = ApiClient::new(&config.api, session.session())?;
            let balance = client.buy_diamonds(pkg.id, method, phone.trim()).await?;
            writeln!(
                out,
                "Purchased {} diamonds for Rs. {}. Balance: {}",
                pkg.diamonds, pkg.price, balance.diamonds
            )?;
        }
    }
    Ok(())
}

//! Auth subcommands: login, register, logout, status.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::io::{self, Write};

use tracing::info;

use mechhub_core::Config;
use mechhub_core::model::{ServiceCategory, UserRole};

use crate::api::ApiClient;
use crate::api::types::RegisterRequest;
use crate::session::{Session, SessionContext};

/// Auth subcommand actions.
#[derive(clap::Subcommand, Debug)]
pub enum AuthAction {
    /// Log in with phone number and password.
    Login {
        /// Phone number (e.g., 03001234567).
        #[arg(short, long)]
        phone: String,
        /// Password.
        #[arg(short = 'P', long)]
        password: String,
    },
    /// Create an account and log in.
    Register {
        /// Full name.
        #[arg(short, long)]
        name: String,
        /// Phone number.
        #[arg(short, long)]
        phone: String,
        /// Password.
        #[arg(short = 'P', long)]
        password: String,
        /// Register as a mechanic instead of a customer.
        #[arg(long)]
        mechanic: bool,
        /// CNIC number (mechanics).
        #[arg(long)]
        cnic: Option<String>,
        /// Service categories offered (mechanics, repeatable).
        #[arg(short, long = "category")]
        categories: Vec<ServiceCategory>,
    },
    /// Forget the stored session.
    Logout,
    /// Show who is logged in.
    Status,
}

/// Execute an auth subcommand.
pub async fn run(
    action: AuthAction,
    session: &mut SessionContext,
    config: &Config,
) -> anyhow::Result<()> {
    match action {
        AuthAction::Login { phone, password } => login(session, config, &phone, &password).await,
        AuthAction::Register {
            name,
            phone,
            password,
            mechanic,
            cnic,
            categories,
        } => {
            let role = if mechanic {
                UserRole::Mechanic
            } else {
                UserRole::Customer
            };
            if role == UserRole::Mechanic && categories.is_empty() {
                anyhow::bail!("Mechanics must pick at least one --category");
            }
            let body = RegisterRequest {
                name,
                phone,
                password,
                role,
                cnic,
                categories,
            };
            register(session, config, &body).await
        }
        AuthAction::Logout => logout(session),
        AuthAction::Status => status(session),
    }
}

async fn login(
    session: &mut SessionContext,
    config: &Config,
    phone: &str,
    password: &str,
) -> anyhow::Result<()> {
    if phone.trim().is_empty() || password.is_empty() {
        anyhow::bail!("Please enter phone and password");
    }
    let client = ApiClient::new(&config.api, &Session::default())?;
    let resp = client.login(phone, password).await?;
    info!(user_id = %resp.user.id, role = %resp.user.role, "Logged in");

    let mut out = io::stdout();
    writeln!(out, "Logged in as {} ({})", resp.user.name, resp.user.role)?;
    session.login(resp.token, resp.user)?;
    Ok(())
}

async fn register(
    session: &mut SessionContext,
    config: &Config,
    body: &RegisterRequest,
) -> anyhow::Result<()> {
    let client = ApiClient::new(&config.api, &Session::default())?;
    let resp = client.register(body).await?;
    info!(user_id = %resp.user.id, role = %resp.user.role, "Registered");

    let mut out = io::stdout();
    writeln!(out, "Welcome, {}! Account created as {}", resp.user.name, resp.user.role)?;
    if resp.user.is_mechanic() {
        writeln!(out, "Complete identity verification with `mechhub kyc submit`")?;
    }
    session.login(resp.token, resp.user)?;
    Ok(())
}

fn logout(session: &mut SessionContext) -> anyhow::Result<()> {
    session.logout()?;
    let mut out = io::stdout();
    writeln!(out, "Logged out")?;
    Ok(())
}

fn status(session: &SessionContext) -> anyhow::Result<()> {
    let mut out = io::stdout();
    match session.current_user() {
        Some(user) if session.token().is_some() => {
            writeln!(out, "Logged in as: {}", user.name)?;
            writeln!(out, "User ID: {}", user.id)?;
            writeln!(out, "Role: {}", user.role)?;
            if let Some(phone) = &user.phone {
                writeln!(out, "Phone: {phone}")?;
            }
            if !user.categories.is_empty() {
                let names: Vec<&str> = user.categories.iter().map(|c| c.display_name()).collect();
                writeln!(out, "Categories: {}", names.join(", "))?;
            }
            if let Some(kyc) = user.kyc_status {
                writeln!(out, "KYC: {kyc}")?;
            }
        }
        _ => writeln!(out, "Not logged in")?,
    }
    Ok(())
}

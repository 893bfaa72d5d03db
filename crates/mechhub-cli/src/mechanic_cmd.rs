//! Mechanic discovery subcommands: nearby, category, leaderboard.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::io::{self, Write};

use mechhub_core::Config;
use mechhub_core::geo::Coordinates;
use mechhub_core::model::{MechanicProfile, ServiceCategory};

use crate::api::ApiClient;
use crate::fmt::{write_leaderboard_row, write_mechanic_header, write_mechanic_row};
use crate::session::SessionContext;

/// Mechanic subcommand actions.
#[derive(clap::Subcommand, Debug)]
pub enum MechanicAction {
    /// Mechanics within a radius of a point.
    Nearby {
        /// Latitude (defaults to the configured location).
        #[arg(long, requires = "lng", allow_negative_numbers = true)]
        lat: Option<f64>,
        /// Longitude.
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lng: Option<f64>,
        /// Search radius in km (capped by config).
        #[arg(short, long)]
        radius: Option<f64>,
        /// Only mechanics offering this category.
        #[arg(short, long)]
        category: Option<ServiceCategory>,
    },
    /// Mechanics offering a service category.
    Category {
        /// Service category.
        category: ServiceCategory,
    },
    /// Top-rated mechanics.
    Leaderboard {
        /// Maximum results.
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}

/// Execute a mechanic subcommand.
pub async fn run(
    action: MechanicAction,
    session: &SessionContext,
    config: &Config,
) -> anyhow::Result<()> {
    let client = ApiClient::new(&config.api, session.session())?;
    let mut out = io::stdout();

    match action {
        MechanicAction::Nearby {
            lat,
            lng,
            radius,
            category,
        } => {
            let at = match (lat, lng) {
                (Some(lat), Some(lng)) => Coordinates::new(lat, lng),
                _ => config.distance.default_location,
            };
            let radius = config.distance.radius_km(radius);
            let mut mechanics = client.nearby_mechanics(at, radius).await?;
            if let Some(category) = category {
                mechanics.retain(|m| m.categories.contains(&category));
            }
            sort_by_distance(&mut mechanics, at);
            writeln!(out, "Within {radius:.0} km of {:.4}, {:.4}", at.latitude, at.longitude)?;
            write_mechanics(&mut out, &mechanics, Some(at))?;
        }
        MechanicAction::Category { category } => {
            let mechanics = client.mechanics_by_category(category).await?;
            write_mechanics(&mut out, &mechanics, None)?;
        }
        MechanicAction::Leaderboard { limit } => {
            let entries = client.leaderboard().await?;
            if entries.is_empty() {
                writeln!(out, "No ranked mechanics yet.")?;
            }
            for (i, entry) in entries.iter().take(limit).enumerate() {
                write_leaderboard_row(&mut out, i + 1, entry)?;
            }
        }
    }
    Ok(())
}

fn write_mechanics(
    out: &mut impl Write,
    mechanics: &[MechanicProfile],
    from: Option<Coordinates>,
) -> io::Result<()> {
    if mechanics.is_empty() {
        return writeln!(out, "No mechanics found.");
    }
    write_mechanic_header(out)?;
    for mechanic in mechanics {
        write_mechanic_row(out, mechanic, from)?;
    }
    writeln!(out, "\n{} mechanic(s)", mechanics.len())
}

/// Closest first; mechanics without a location go last.
fn sort_by_distance(mechanics: &mut [MechanicProfile], from: Coordinates) {
    mechanics.sort_by(|a, b| {
        let da = a.location.map_or(f64::INFINITY, |l| from.distance_km(&l));
        let db = b.location.map_or(f64::INFINITY, |l| from.distance_km(&l));
        da.total_cmp(&db)
    });
}

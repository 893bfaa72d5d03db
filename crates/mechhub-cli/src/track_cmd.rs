//! Live location subcommands: watch a mechanic, push your own location.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::io::{self, Write};
use std::time::Duration;

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use mechhub_core::Config;
use mechhub_core::geo::{Coordinates, LocationFix, LocationThrottle};

use crate::api::types::LocationUpdate;
use crate::api::{ApiClient, MechanicLocation};
use crate::fmt::distance_and_eta;
use crate::poll::{Poller, cancel_on_ctrl_c};
use crate::session::SessionContext;

/// Track subcommand actions.
#[derive(clap::Subcommand, Debug)]
pub enum TrackAction {
    /// Follow a mechanic's live location with distance and ETA.
    Watch {
        /// Mechanic ID.
        mechanic_id: String,
        /// Your latitude (defaults to the configured location).
        #[arg(long, requires = "lng", allow_negative_numbers = true)]
        lat: Option<f64>,
        /// Your longitude.
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lng: Option<f64>,
    },
    /// Share your location (mechanics).
    ///
    /// With --lat/--lng the fix is sent once. Otherwise fixes are read from
    /// stdin as `lat,lng[,accuracy_m]` lines and the latest one is pushed on
    /// every interval.
    Push {
        /// Latitude of a single fix.
        #[arg(long, requires = "lng", allow_negative_numbers = true)]
        lat: Option<f64>,
        /// Longitude of a single fix.
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lng: Option<f64>,
        /// Accuracy radius in metres.
        #[arg(short, long, default_value = "10")]
        accuracy: f64,
    },
}

/// Execute a track subcommand.
pub async fn run(
    action: TrackAction,
    session: &SessionContext,
    config: &Config,
) -> anyhow::Result<()> {
    let user = session.require_user()?;
    let client = ApiClient::new(&config.api, session.session())?;
    let mut out = io::stdout();

    match action {
        TrackAction::Watch {
            mechanic_id,
            lat,
            lng,
        } => {
            let from = match (lat, lng) {
                (Some(lat), Some(lng)) => Coordinates::new(lat, lng),
                _ => config.distance.default_location,
            };
            writeln!(out, "Tracking mechanic {mechanic_id} (Ctrl-C to stop)")?;
            let shutdown = cancel_on_ctrl_c();
            watch_mechanic(client, &mechanic_id, from, config, &mut out, shutdown).await?;
        }
        TrackAction::Push { lat, lng, accuracy } => {
            if !user.is_mechanic() {
                anyhow::bail!("Only mechanics share their location");
            }
            let mut throttle = LocationThrottle::new(
                config.tracking.min_distance_meters,
                config.tracking.accuracy_threshold_meters,
            );
            if let (Some(lat), Some(lng)) = (lat, lng) {
                let fix = LocationFix {
                    coordinates: Coordinates::new(lat, lng),
                    accuracy_meters: accuracy,
                };
                if !throttle.offer(fix) {
                    anyhow::bail!(
                        "Location accuracy {accuracy} m exceeds the {} m threshold",
                        config.tracking.accuracy_threshold_meters
                    );
                }
                client
                    .update_location(&LocationUpdate::new(fix.coordinates, Utc::now()))
                    .await?;
                writeln!(out, "Location updated")?;
            } else {
                let fixes = spawn_stdin_fixes(accuracy);
                let every = config.polling.location_push();
                let shutdown = cancel_on_ctrl_c();
                let sent = push_locations(&client, fixes, &mut throttle, every, shutdown).await;
                writeln!(out, "Sent {sent} location update(s)")?;
            }
        }
    }
    Ok(())
}

/// Poll a mechanic's location, printing distance and ETA whenever it changes.
pub async fn watch_mechanic(
    client: ApiClient,
    mechanic_id: &str,
    from: Coordinates,
    config: &Config,
    out: &mut impl Write,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let mut handle = {
        let id = mechanic_id.to_string();
        Poller::new("tracking", config.polling.tracking()).spawn(move || {
            let client = client.clone();
            let id = id.clone();
            async move { client.mechanic_location(&id).await }
        })
    };

    let mut last: Option<MechanicLocation> = None;
    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            alive = handle.changed() => {
                if !alive {
                    break;
                }
            }
        }
        let Some(current) = handle.latest() else {
            continue;
        };
        if last.as_ref() == Some(&current) {
            continue;
        }
        let now = Utc::now().format("%H:%M:%S");
        match current.location {
            Some(at) if current.is_online => {
                let line = distance_and_eta(from, at, config.distance.average_speed_kmh);
                writeln!(out, "[{now}] {line}")?;
            }
            Some(at) => {
                let line = distance_and_eta(from, at, config.distance.average_speed_kmh);
                writeln!(out, "[{now}] offline, last seen {line}")?;
            }
            None => writeln!(out, "[{now}] location not shared yet")?,
        }
        last = Some(current);
    }

    handle.stop().await;
    Ok(())
}

/// Push the latest fix every `every` when the throttle lets it through.
///
/// Runs until `shutdown` fires or the fix source closes. Failed pushes are
/// logged and retried with the next fix. Returns the number of fixes sent.
pub async fn push_locations(
    client: &ApiClient,
    mut fixes: watch::Receiver<Option<LocationFix>>,
    throttle: &mut LocationThrottle,
    every: Duration,
    shutdown: CancellationToken,
) -> u64 {
    let mut timer = tokio::time::interval(every);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut sent = 0;

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = timer.tick() => {}
        }
        let source_closed = fixes.has_changed().is_err();
        let latest = *fixes.borrow_and_update();
        if let Some(fix) = latest {
            if throttle.offer(fix) {
                let update = LocationUpdate::new(fix.coordinates, Utc::now());
                match client.update_location(&update).await {
                    Ok(()) => {
                        sent += 1;
                        debug!(lat = update.lat, lng = update.lng, "Location pushed");
                    }
                    Err(e) => warn!(error = %e, "Location push failed"),
                }
            }
        }
        if source_closed {
            break;
        }
    }
    info!(sent, "Location sharing stopped");
    sent
}

/// Parse a `lat,lng[,accuracy_m]` line. Blank lines and `#` comments yield
/// `None`.
pub fn parse_fix(line: &str, default_accuracy: f64) -> anyhow::Result<Option<LocationFix>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let parts: Vec<&str> = line.split(',').map(str::trim).collect();
    let (lat, lng, accuracy) = match parts.as_slice() {
        [lat, lng] => (lat.parse::<f64>()?, lng.parse::<f64>()?, default_accuracy),
        [lat, lng, acc] => (lat.parse()?, lng.parse()?, acc.parse()?),
        _ => anyhow::bail!("Expected lat,lng[,accuracy], got {line:?}"),
    };
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        anyhow::bail!("Coordinates out of range: {lat}, {lng}");
    }
    if !accuracy.is_finite() || accuracy < 0.0 {
        anyhow::bail!("Invalid accuracy: {accuracy}");
    }
    Ok(Some(LocationFix {
        coordinates: Coordinates::new(lat, lng),
        accuracy_meters: accuracy,
    }))
}

fn spawn_stdin_fixes(default_accuracy: f64) -> watch::Receiver<Option<LocationFix>> {
    let (tx, rx) = watch::channel(None);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match parse_fix(&line, default_accuracy) {
                Ok(Some(fix)) => {
                    tx.send_replace(Some(fix));
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Ignoring location line"),
            }
        }
        debug!("Location input closed");
    });
    rx
}

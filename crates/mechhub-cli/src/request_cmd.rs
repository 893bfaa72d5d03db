//! Service request subcommands: create, show, watch, accept, cancel, start,
//! complete, available.
//!
//! Mutating commands fetch the server's copy of the request first and replay
//! the transition on a local [`RequestBook`], so an illegal move is reported
//! without a round trip. The server remains authoritative.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::collections::HashSet;
use std::io::{self, Write};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use mechhub_core::model::{
    Location, NewRequest, RequestStatus, ServiceCategory, ServiceRequest, Urgency,
};
use mechhub_core::{Config, RequestBook};

use crate::api::{ApiClient, RequestOffers};
use crate::fmt::{
    price, write_offer_header, write_offer_row, write_offers, write_request_detail,
    write_request_header, write_request_row,
};
use crate::poll::{Poller, cancel_on_ctrl_c};
use crate::session::SessionContext;

/// Request subcommand actions.
#[derive(clap::Subcommand, Debug)]
pub enum RequestAction {
    /// Post a new service request.
    Create {
        /// Service category (e.g., "Plumber", "ac-fridge").
        #[arg(short, long)]
        category: ServiceCategory,
        /// What needs doing.
        #[arg(short, long)]
        description: String,
        /// Street address of the job.
        #[arg(short, long)]
        address: String,
        /// Offered price in rupees.
        #[arg(long)]
        price: f64,
        /// normal, urgent, or emergency.
        #[arg(short, long, default_value = "normal")]
        urgency: Urgency,
        /// Job latitude.
        #[arg(long, requires = "lng", allow_negative_numbers = true)]
        lat: Option<f64>,
        /// Job longitude.
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lng: Option<f64>,
        /// Send the request to one mechanic only.
        #[arg(short, long, conflicts_with = "broadcast")]
        mechanic: Option<String>,
        /// Broadcast to every mechanic in the category.
        #[arg(short, long)]
        broadcast: bool,
    },
    /// Show a request and its offers.
    Show {
        /// Request ID.
        request_id: String,
    },
    /// Poll a request and print offers as they arrive.
    Watch {
        /// Request ID.
        request_id: String,
    },
    /// Hire the mechanic behind an offer.
    Accept {
        /// Request ID.
        request_id: String,
        /// Offer ID.
        offer_id: String,
    },
    /// Cancel an open request.
    Cancel {
        /// Request ID.
        request_id: String,
    },
    /// Start work on an accepted request (hired mechanic).
    Start {
        /// Request ID.
        request_id: String,
    },
    /// Mark a request in progress as completed.
    Complete {
        /// Request ID.
        request_id: String,
    },
    /// List open requests mechanics can bid on.
    Available,
}

/// Execute a request subcommand.
pub async fn run(
    action: RequestAction,
    session: &SessionContext,
    config: &Config,
) -> anyhow::Result<()> {
    let user = session.require_user()?.clone();
    let client = ApiClient::new(&config.api, session.session())?;
    let mut out = io::stdout();

    match action {
        RequestAction::Create {
            category,
            description,
            address,
            price,
            urgency,
            lat,
            lng,
            mechanic,
            broadcast,
        } => {
            let mut location = Location::address(address);
            if let (Some(lat), Some(lng)) = (lat, lng) {
                location = location.with_coordinates(lat, lng);
            }
            let new = NewRequest {
                customer_id: user.id,
                category,
                description,
                location,
                requested_price: price,
                urgency,
            };
            new.validate()?;

            let created = match (mechanic, broadcast) {
                (Some(mechanic_id), _) => client.request_mechanic(&new, &mechanic_id).await?,
                (None, true) => client.broadcast_request(&new).await?,
                (None, false) => client.create_request(&new).await?,
            };
            info!(request_id = %created.id, category = %created.category, "Request created");
            writeln!(out, "Request created")?;
            write_request_detail(&mut out, &created)?;
        }
        RequestAction::Show { request_id } => {
            let request = client.request_offers(&request_id).await?.into_request();
            write_request_detail(&mut out, &request)?;
            writeln!(out)?;
            write_offers(&mut out, &request)?;
        }
        RequestAction::Watch { request_id } => {
            writeln!(out, "Watching request {request_id} (Ctrl-C to stop)")?;
            let shutdown = cancel_on_ctrl_c();
            if let Some(last) = watch_offers(client, &request_id, config, &mut out, shutdown).await? {
                if let Some(offer) = last.accepted_offer() {
                    writeln!(out, "Hired {}", offer.mechanic_name)?;
                }
            }
        }
        RequestAction::Accept {
            request_id,
            offer_id,
        } => {
            let accepted = accept(&client, config, &request_id, &offer_id, &user.id).await?;
            if let Some(offer) = accepted.accepted_offer() {
                writeln!(
                    out,
                    "Hired {} for {} ({})",
                    offer.mechanic_name,
                    price(offer.estimated_price),
                    offer.estimated_time
                )?;
            }
        }
        RequestAction::Cancel { request_id } => {
            let status =
                advance(&client, config, &request_id, &user.id, RequestStatus::Cancelled).await?;
            writeln!(out, "Request {request_id} is now {status}")?;
        }
        RequestAction::Start { request_id } => {
            let status =
                advance(&client, config, &request_id, &user.id, RequestStatus::InProgress).await?;
            writeln!(out, "Request {request_id} is now {status}")?;
        }
        RequestAction::Complete { request_id } => {
            let status =
                advance(&client, config, &request_id, &user.id, RequestStatus::Completed).await?;
            writeln!(out, "Request {request_id} is now {status}")?;
            writeln!(out, "Leave a review with `mechhub review submit`")?;
        }
        RequestAction::Available => {
            let requests = client.available_requests().await?;
            if requests.is_empty() {
                writeln!(out, "No open requests.")?;
            } else {
                write_request_header(&mut out)?;
                for req in &requests {
                    write_request_row(&mut out, req)?;
                }
                writeln!(out, "\n{} request(s)", requests.len())?;
            }
        }
    }
    Ok(())
}

/// Fetch the server's copy of a request into a fresh local book.
pub async fn mirror(
    client: &ApiClient,
    config: &Config,
    request_id: &str,
) -> anyhow::Result<RequestBook> {
    let snapshot = client.request_offers(request_id).await?.into_request();
    let mut book = RequestBook::new(config.requests.to_book_config());
    book.reconcile(snapshot);
    Ok(book)
}

/// Accept an offer locally, then on the server.
pub async fn accept(
    client: &ApiClient,
    config: &Config,
    request_id: &str,
    offer_id: &str,
    actor_id: &str,
) -> anyhow::Result<ServiceRequest> {
    let mut book = mirror(client, config, request_id).await?;
    let accepted = book.accept_offer(request_id, offer_id, actor_id)?;
    client.accept_offer(request_id, offer_id).await?;
    Ok(accepted)
}

/// Move a request to `target` (cancelled, in-progress, or completed).
pub async fn advance(
    client: &ApiClient,
    config: &Config,
    request_id: &str,
    actor_id: &str,
    target: RequestStatus,
) -> anyhow::Result<RequestStatus> {
    let mut book = mirror(client, config, request_id).await?;
    match target {
        RequestStatus::Cancelled => book.cancel_request(request_id, actor_id)?,
        RequestStatus::InProgress => book.start_work(request_id, actor_id)?,
        RequestStatus::Completed => book.complete_work(request_id, actor_id)?,
        other => anyhow::bail!("Requests cannot be moved to {other} directly"),
    }
    client.update_request_status(request_id, target).await?;
    info!(request_id, status = %target, "Request status updated");
    Ok(target)
}

/// Poll a request, printing each new offer once in arrival order.
///
/// Returns the last snapshot once the request leaves the open states or
/// `shutdown` fires. An open request that outlives the offer timeout is
/// cancelled.
pub async fn watch_offers(
    client: ApiClient,
    request_id: &str,
    config: &Config,
    out: &mut impl Write,
    shutdown: CancellationToken,
) -> anyhow::Result<Option<ServiceRequest>> {
    // Fail fast on a bad ID or unreachable backend.
    client.request_offers(request_id).await?;

    let mut handle = {
        let client = client.clone();
        let id = request_id.to_string();
        Poller::new("request-offers", config.polling.request_offers()).spawn(move || {
            let client = client.clone();
            let id = id.clone();
            async move {
                client
                    .request_offers(&id)
                    .await
                    .map(RequestOffers::into_request)
            }
        })
    };

    let mut book = RequestBook::new(config.requests.to_book_config());
    let mut seen: HashSet<String> = HashSet::new();
    let mut last_status: Option<RequestStatus> = None;

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            alive = handle.changed() => {
                if !alive {
                    break;
                }
            }
        }
        let Some(snapshot) = handle.latest() else {
            continue;
        };
        let waiting = snapshot.status.is_open();
        book.reconcile(snapshot.clone());

        if waiting && !book.expire_stale().is_empty() {
            match client
                .update_request_status(request_id, RequestStatus::Cancelled)
                .await
            {
                Ok(()) => writeln!(out, "No offer accepted in time, request cancelled")?,
                Err(e) => {
                    // Still open on the server; retried on the next snapshot.
                    warn!(request_id, error = %e, "Failed to cancel timed-out request on server");
                    book.reconcile(snapshot);
                }
            }
        }

        let Some(request) = book.get(request_id) else {
            continue;
        };
        if last_status != Some(request.status) {
            writeln!(out, "Status: {}", request.status)?;
            last_status = Some(request.status);
        }

        let fresh: Vec<_> = book
            .list_offers(request_id)?
            .enumerate()
            .filter(|(_, offer)| !seen.contains(&offer.id))
            .collect();
        if !fresh.is_empty() {
            if seen.is_empty() {
                write_offer_header(out)?;
            }
            for (i, offer) in fresh {
                write_offer_row(out, i + 1, offer, offer.is_void(request))?;
                seen.insert(offer.id.clone());
            }
        }

        if !request.status.is_open() {
            break;
        }
    }

    handle.stop().await;
    Ok(book.forget(request_id))
}

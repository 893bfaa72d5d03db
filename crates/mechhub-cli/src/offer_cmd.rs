//! Offer subcommands: send, received.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::io::{self, Write};

use tracing::info;

use mechhub_core::model::{MechanicSnapshot, NewOffer, Offer};
use mechhub_core::{Config, OfferCursor};

use crate::api::ApiClient;
use crate::fmt::{price, write_offer_header, write_offer_row};
use crate::poll::{Poller, cancel_on_ctrl_c};
use crate::request_cmd::mirror;
use crate::session::SessionContext;

/// Offer subcommand actions.
#[derive(clap::Subcommand, Debug)]
pub enum OfferAction {
    /// Bid on an open request (mechanics).
    Send {
        /// Request ID.
        request_id: String,
        /// Quoted price in rupees.
        #[arg(short, long)]
        price: f64,
        /// Time estimate (e.g., "1 hour").
        #[arg(short, long)]
        time: String,
        /// Optional note to the customer.
        #[arg(short, long)]
        message: Option<String>,
    },
    /// List offers received on one of your requests.
    Received {
        /// Request ID.
        request_id: String,
        /// Keep refreshing until Ctrl-C.
        #[arg(short, long)]
        watch: bool,
    },
}

/// Execute an offer subcommand.
pub async fn run(
    action: OfferAction,
    session: &SessionContext,
    config: &Config,
) -> anyhow::Result<()> {
    let user = session.require_user()?.clone();
    let client = ApiClient::new(&config.api, session.session())?;
    let mut out = io::stdout();

    match action {
        OfferAction::Send {
            request_id,
            price: amount,
            time,
            message,
        } => {
            if !user.is_mechanic() {
                anyhow::bail!("Only mechanics can send offers");
            }
            let offer = NewOffer {
                request_id,
                mechanic: MechanicSnapshot {
                    id: user.id,
                    name: user.name,
                    rating: user.rating.unwrap_or_default(),
                },
                estimated_price: amount,
                estimated_time: time,
                message,
            };
            let sent = send(&client, config, offer).await?;
            writeln!(
                out,
                "Offer {} sent: {} in {}",
                sent.id,
                price(sent.estimated_price),
                sent.estimated_time
            )?;
        }
        OfferAction::Received {
            request_id,
            watch: false,
        } => {
            let offers = client.received_offers(&request_id).await?;
            write_received(&mut out, &offers)?;
        }
        OfferAction::Received {
            request_id,
            watch: true,
        } => {
            let mut handle = Poller::new("offers", config.polling.offers()).spawn(move || {
                let client = client.clone();
                let id = request_id.clone();
                async move { client.received_offers(&id).await }
            });
            let shutdown = cancel_on_ctrl_c();
            let mut shown: Option<Vec<Offer>> = None;
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    alive = handle.changed() => {
                        if !alive {
                            break;
                        }
                    }
                }
                let Some(offers) = handle.latest() else {
                    continue;
                };
                if shown.as_ref() != Some(&offers) {
                    writeln!(out)?;
                    write_received(&mut out, &offers)?;
                    shown = Some(offers);
                }
            }
            handle.stop().await;
        }
    }
    Ok(())
}

/// Submit an offer after checking it against the server's copy of the request.
pub async fn send(client: &ApiClient, config: &Config, offer: NewOffer) -> anyhow::Result<Offer> {
    let mut book = mirror(client, config, &offer.request_id).await?;
    book.submit_offer(offer.clone())?;
    let sent = client.send_offer(&offer).await?;
    info!(request_id = %sent.request_id, offer_id = %sent.id, "Offer sent");
    Ok(sent)
}

fn write_received(out: &mut impl Write, offers: &[Offer]) -> io::Result<()> {
    if offers.is_empty() {
        return writeln!(out, "No offers yet.");
    }
    write_offer_header(out)?;
    for (i, offer) in OfferCursor::new(offers).enumerate() {
        write_offer_row(out, i + 1, offer, offer.is_void_among(offers, false))?;
    }
    writeln!(out, "\n{} offer(s)", offers.len())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use mechhub_core::model::OfferStatus;

    use super::*;

    fn offer(id: &str, minute: u32, status: OfferStatus) -> Offer {
        Offer {
            id: id.into(),
            request_id: "r1".into(),
            mechanic_id: format!("m-{id}"),
            mechanic_name: format!("Mechanic {id}"),
            mechanic_rating: 4.0,
            estimated_price: 1000.0,
            estimated_time: "2 hours".into(),
            message: None,
            status,
            created_at: Utc.with_ymd_and_hms(2024, 3, 13, 10, minute, 0).unwrap(),
        }
    }

    #[test]
    fn received_offers_mark_losers_void_once_hired() {
        let offers = vec![
            offer("b", 5, OfferStatus::Accepted),
            offer("a", 1, OfferStatus::Pending),
        ];
        let mut buf = Vec::new();
        write_received(&mut buf, &offers).unwrap();
        let out = String::from_utf8(buf).unwrap();
        let rows: Vec<&str> = out.lines().skip(1).take(2).collect();
        assert!(rows[0].starts_with("1   a") && rows[0].trim_end().ends_with("void"));
        assert!(rows[1].starts_with("2   b") && rows[1].trim_end().ends_with("accepted"));
    }

    #[test]
    fn pending_offers_stay_live_until_hire() {
        let offers = vec![
            offer("a", 1, OfferStatus::Pending),
            offer("c", 2, OfferStatus::Rejected),
        ];
        let mut buf = Vec::new();
        write_received(&mut buf, &offers).unwrap();
        let out = String::from_utf8(buf).unwrap();
        let rows: Vec<&str> = out.lines().skip(1).take(2).collect();
        assert!(rows[0].starts_with("1   a") && rows[0].trim_end().ends_with("pending"));
        assert!(rows[1].starts_with("2   c") && rows[1].trim_end().ends_with("void"));
    }
}

//! Output formatting helpers for the CLI subcommands.

use std::io::{self, Write};

use chrono::{DateTime, Utc};

use mechhub_core::geo::{Coordinates, format_distance, format_eta, travel_minutes};
use mechhub_core::OfferCursor;
use mechhub_core::model::{KycSubmission, MechanicProfile, Offer, Review, ServiceRequest};

use crate::api::types::LeaderboardEntry;

pub fn write_request_detail(w: &mut impl Write, req: &ServiceRequest) -> io::Result<()> {
    writeln!(w, "  Request:   {}", req.id)?;
    writeln!(w, "  Category:  {}", req.category)?;
    writeln!(w, "  Status:    {}", req.status)?;
    writeln!(w, "  Urgency:   {}", req.urgency)?;
    writeln!(w, "  Price:     {}", price(req.requested_price))?;
    writeln!(w, "  Location:  {}", req.location.address)?;
    writeln!(w, "  Created:   {}", timestamp(&req.created_at))?;
    writeln!(w, "  Offers:    {}", req.offers.len())?;
    if let Some(offer) = req.accepted_offer() {
        writeln!(
            w,
            "  Hired:     {} ({})",
            offer.mechanic_name,
            price(offer.estimated_price)
        )?;
    }
    if !req.description.is_empty() {
        writeln!(w)?;
        for line in req.description.lines() {
            writeln!(w, "  {line}")?;
        }
    }
    Ok(())
}

/// Header matching [`write_request_row`].
pub fn write_request_header(w: &mut impl Write) -> io::Result<()> {
    writeln!(
        w,
        "{:<26} {:<14} {:<12} {:<10} {:<30}",
        "ID", "CATEGORY", "STATUS", "PRICE", "LOCATION"
    )
}

pub fn write_request_row(w: &mut impl Write, req: &ServiceRequest) -> io::Result<()> {
    writeln!(
        w,
        "{:<26} {:<14} {:<12} {:<10} {:<30}",
        truncate(&req.id, 26),
        truncate(req.category.display_name(), 14),
        req.status.as_str(),
        price(req.requested_price),
        truncate(&req.location.address, 30),
    )
}

/// Header matching [`write_offer_row`].
pub fn write_offer_header(w: &mut impl Write) -> io::Result<()> {
    writeln!(
        w,
        "{:<3} {:<26} {:<20} {:<6} {:<10} {:<12} {:<9}",
        "#", "OFFER", "MECHANIC", "RATING", "PRICE", "TIME", "STATUS"
    )
}

/// One offer row; a void offer shows as `void` whatever its stored status.
pub fn write_offer_row(
    w: &mut impl Write,
    position: usize,
    offer: &Offer,
    void: bool,
) -> io::Result<()> {
    let status = if void {
        "void"
    } else {
        offer.status.as_str()
    };
    writeln!(
        w,
        "{:<3} {:<26} {:<20} {:<6.1} {:<10} {:<12} {:<9}",
        position,
        truncate(&offer.id, 26),
        truncate(&offer.mechanic_name, 20),
        offer.mechanic_rating,
        price(offer.estimated_price),
        truncate(&offer.estimated_time, 12),
        status,
    )
}

/// Every offer on `request`, earliest first.
pub fn write_offers(w: &mut impl Write, request: &ServiceRequest) -> io::Result<()> {
    if request.offers.is_empty() {
        return writeln!(w, "No offers yet.");
    }
    write_offer_header(w)?;
    for (i, offer) in OfferCursor::new(&request.offers).enumerate() {
        write_offer_row(w, i + 1, offer, offer.is_void(request))?;
    }
    Ok(())
}

pub fn write_mechanic_header(w: &mut impl Write) -> io::Result<()> {
    writeln!(
        w,
        "{:<26} {:<20} {:<6} {:<6} {:<10}",
        "ID", "NAME", "RATING", "JOBS", "DISTANCE"
    )
}

/// One mechanic row; distance is shown when both ends are known.
pub fn write_mechanic_row(
    w: &mut impl Write,
    mechanic: &MechanicProfile,
    from: Option<Coordinates>,
) -> io::Result<()> {
    let distance = match (from, mechanic.location) {
        (Some(a), Some(b)) => format_distance(a.distance_km(&b)),
        _ => "-".to_string(),
    };
    writeln!(
        w,
        "{:<26} {:<20} {:<6.1} {:<6} {:<10}",
        truncate(&mechanic.id, 26),
        truncate(&mechanic.name, 20),
        mechanic.rating,
        mechanic.completed_jobs,
        distance,
    )
}

pub fn write_leaderboard_row(
    w: &mut impl Write,
    rank: usize,
    entry: &LeaderboardEntry,
) -> io::Result<()> {
    writeln!(
        w,
        "{:>3}. {:<20} {:.1}★ ({} reviews, {} jobs, score {})",
        rank,
        truncate(&entry.name, 20),
        entry.rating,
        entry.total_reviews,
        entry.jobs_completed,
        entry.quality_score,
    )
}

pub fn write_kyc_detail(w: &mut impl Write, kyc: &KycSubmission) -> io::Result<()> {
    writeln!(w, "  KYC:       {}", kyc.id)?;
    writeln!(w, "  User:      {}", kyc.user_id)?;
    writeln!(w, "  Status:    {}", kyc.status)?;
    writeln!(w, "  Submitted: {}", timestamp(&kyc.submitted_at))?;
    writeln!(w, "  CNIC front: {}", kyc.cnic_front)?;
    writeln!(w, "  CNIC back:  {}", kyc.cnic_back)?;
    writeln!(w, "  Selfie:     {}", kyc.selfie)?;
    if let (Some(at), Some(by)) = (&kyc.approved_at, &kyc.approved_by) {
        writeln!(w, "  Approved:  {} by {by}", timestamp(at))?;
    }
    if let (Some(at), Some(by)) = (&kyc.rejected_at, &kyc.rejected_by) {
        writeln!(w, "  Rejected:  {} by {by}", timestamp(at))?;
    }
    if let Some(reason) = &kyc.rejection_reason {
        writeln!(w, "  Reason:    {reason}")?;
    }
    Ok(())
}

pub fn write_kyc_row(w: &mut impl Write, kyc: &KycSubmission) -> io::Result<()> {
    writeln!(
        w,
        "{:<36} {:<20} {:<9} {}",
        kyc.id,
        truncate(&kyc.user_id, 20),
        kyc.status.as_str(),
        timestamp(&kyc.submitted_at),
    )
}

pub fn write_review(w: &mut impl Write, review: &Review) -> io::Result<()> {
    let who = review.customer_name.as_deref().unwrap_or("Anonymous");
    writeln!(
        w,
        "{} {}  {}",
        stars(review.rating),
        who,
        review.created_at.format("%Y-%m-%d")
    )?;
    for line in review.comment.lines() {
        writeln!(w, "    {line}")?;
    }
    if !review.photos.is_empty() {
        writeln!(w, "    ({} photo(s))", review.photos.len())?;
    }
    Ok(())
}

/// "2.4km away, ~6 min" at `speed_kmh`.
pub fn distance_and_eta(from: Coordinates, to: Coordinates, speed_kmh: f64) -> String {
    let km = from.distance_km(&to);
    format!(
        "{} away, ~{}",
        format_distance(km),
        format_eta(travel_minutes(km, speed_kmh))
    )
}

pub fn price(amount: f64) -> String {
    format!("Rs. {amount:.0}")
}

pub fn timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

fn stars(rating: u8) -> String {
    let filled = usize::from(rating.min(5));
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}

/// Cut `s` to at most `max` chars, ending in `…` when shortened.
pub fn truncate(s: &str, max: usize) -> String {
    let count = s.chars().count();
    if count <= max {
        s.to_string()
    } else if max == 0 {
        String::new()
    } else {
        format!("{}…", s.chars().take(max - 1).collect::<String>())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use mechhub_core::model::{
        Location, OfferStatus, RequestStatus, ServiceCategory, Urgency,
    };

    use super::*;

    fn offer(id: &str, status: OfferStatus) -> Offer {
        Offer {
            id: id.into(),
            request_id: "r1".into(),
            mechanic_id: format!("m-{id}"),
            mechanic_name: "Asif".into(),
            mechanic_rating: 4.5,
            estimated_price: 1200.0,
            estimated_time: "1 hour".into(),
            message: None,
            status,
            created_at: Utc.with_ymd_and_hms(2024, 3, 13, 10, 5, 0).unwrap(),
        }
    }

    fn request(offers: Vec<Offer>) -> ServiceRequest {
        ServiceRequest {
            id: "r1".into(),
            customer_id: "c1".into(),
            category: ServiceCategory::Plumber,
            description: "Leaking pipe\nunder the sink".into(),
            location: Location::address("Gulberg III, Lahore"),
            requested_price: 1500.0,
            urgency: Urgency::Urgent,
            status: RequestStatus::Accepted,
            offers,
            created_at: Utc.with_ymd_and_hms(2024, 3, 13, 10, 0, 0).unwrap(),
        }
    }

    fn render(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn truncate_counts_chars() {
        assert_eq!(truncate("Plumber", 10), "Plumber");
        assert_eq!(truncate("Gulberg III, Lahore", 8), "Gulberg…");
        assert_eq!(truncate("ذاتی معلومات", 5), "ذاتی…");
        assert_eq!(truncate("Plumber", 1), "…");
        assert_eq!(truncate("Plumber", 0), "");
        assert_eq!(truncate("", 0), "");
    }

    #[test]
    fn request_detail_shows_hired_mechanic() {
        let req = request(vec![
            offer("a", OfferStatus::Pending),
            offer("b", OfferStatus::Accepted),
        ]);
        let out = render(|w| write_request_detail(w, &req));
        assert!(out.contains("  Status:    accepted"));
        assert!(out.contains("  Price:     Rs. 1500"));
        assert!(out.contains("  Hired:     Asif (Rs. 1200)"));
        assert!(out.contains("  under the sink"));
    }

    #[test]
    fn losing_offer_renders_as_void() {
        let req = request(vec![
            offer("a", OfferStatus::Pending),
            offer("b", OfferStatus::Accepted),
        ]);
        let a = &req.offers[0];
        let out = render(|w| write_offer_row(w, 1, a, a.is_void(&req)));
        assert!(out.trim_end().ends_with("void"));
        let b = &req.offers[1];
        let out = render(|w| write_offer_row(w, 2, b, b.is_void(&req)));
        assert!(out.trim_end().ends_with("accepted"));
    }

    #[test]
    fn offers_listed_in_arrival_order() {
        let mut early = offer("z", OfferStatus::Pending);
        early.created_at = Utc.with_ymd_and_hms(2024, 3, 13, 10, 1, 0).unwrap();
        let req = request(vec![offer("a", OfferStatus::Accepted), early]);
        let out = render(|w| write_offers(w, &req));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("1   z"));
        assert!(lines[2].starts_with("2   a"));

        let empty = request(Vec::new());
        assert_eq!(render(|w| write_offers(w, &empty)), "No offers yet.\n");
    }

    #[test]
    fn mechanic_row_distance_needs_both_points() {
        let mut m = MechanicProfile {
            id: "m1".into(),
            name: "Usman".into(),
            rating: 4.8,
            categories: vec![ServiceCategory::Electrician],
            completed_jobs: 31,
            location: None,
            diamonds: None,
        };
        let here = Coordinates::new(31.5204, 74.3587);
        let out = render(|w| write_mechanic_row(w, &m, Some(here)));
        assert!(out.trim_end().ends_with('-'));

        m.location = Some(Coordinates::new(31.5204, 74.3687));
        let out = render(|w| write_mechanic_row(w, &m, Some(here)));
        assert!(out.trim_end().ends_with("948m"));
    }

    #[test]
    fn distance_and_eta_reads_naturally() {
        let lahore = Coordinates::new(31.5204, 74.3587);
        let nearby = Coordinates::new(31.5204, 74.3687);
        assert_eq!(distance_and_eta(lahore, nearby, 25.0), "948m away, ~2 min");
    }

    #[test]
    fn stars_are_clamped() {
        assert_eq!(stars(4), "★★★★☆");
        assert_eq!(stars(9), "★★★★★");
    }
}

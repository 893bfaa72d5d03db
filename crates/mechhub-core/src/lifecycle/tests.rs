//! Tests for the request/offer lifecycle.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::Duration;

use super::{BookConfig, RequestBook};
use crate::clock::ManualClock;
use crate::error::Error;
use crate::model::{
    Location, MechanicSnapshot, NewOffer, NewRequest, OfferStatus, RequestStatus,
    ServiceCategory, ServiceRequest, Urgency,
};

const CUSTOMER: &str = "cust-1";

fn book() -> (RequestBook, ManualClock) {
    let clock = ManualClock::default();
    let book = RequestBook::with_clock(BookConfig::default(), Arc::new(clock.clone()));
    (book, clock)
}

fn plumber_request() -> NewRequest {
    NewRequest {
        customer_id: CUSTOMER.into(),
        category: ServiceCategory::Plumber,
        description: "Kitchen sink pipe is leaking".into(),
        location: Location::address("House 12, Gulberg III, Lahore"),
        requested_price: 1500.0,
        urgency: Urgency::Urgent,
    }
}

fn offer_from(request_id: &str, mechanic_id: &str, price: f64) -> NewOffer {
    NewOffer {
        request_id: request_id.into(),
        mechanic: MechanicSnapshot {
            id: mechanic_id.into(),
            name: format!("Mechanic {mechanic_id}"),
            rating: 4.5,
        },
        estimated_price: price,
        estimated_time: "1 hour".into(),
        message: None,
    }
}

/// Request with offers from A (1200) then B (1000), one second apart.
fn with_two_offers() -> (RequestBook, ManualClock, String, String, String) {
    let (mut book, clock) = book();
    let request = book.create_request(plumber_request()).unwrap();
    let a = book.submit_offer(offer_from(&request.id, "mech-a", 1200.0)).unwrap();
    clock.advance(Duration::seconds(1));
    let b = book.submit_offer(offer_from(&request.id, "mech-b", 1000.0)).unwrap();
    (book, clock, request.id, a.id, b.id)
}

fn status(book: &RequestBook, id: &str) -> RequestStatus {
    book.get(id).unwrap().status
}

fn accepted_count(book: &RequestBook, id: &str) -> usize {
    book.get(id)
        .unwrap()
        .offers
        .iter()
        .filter(|o| o.status == OfferStatus::Accepted)
        .count()
}

// =============================================================================
// Creation and offers
// =============================================================================

#[test]
fn new_request_is_pending_without_offers() {
    let (mut book, _clock) = book();
    let request = book.create_request(plumber_request()).unwrap();

    assert_eq!(request.status, RequestStatus::Pending);
    assert_eq!(request.category, ServiceCategory::Plumber);
    assert_eq!(request.urgency, Urgency::Urgent);
    assert!(request.offers.is_empty());
    assert_eq!(book.list_offers(&request.id).unwrap().len(), 0);
}

#[test]
fn invalid_request_is_not_recorded() {
    let (mut book, _clock) = book();
    let mut input = plumber_request();
    input.description = String::new();

    assert!(matches!(book.create_request(input), Err(Error::Validation(_))));
    assert!(book.is_empty());
}

#[test]
fn first_offer_moves_request_to_offered() {
    let (book, _clock, request_id, a, b) = with_two_offers();

    assert_eq!(status(&book, &request_id), RequestStatus::Offered);
    let listed: Vec<_> = book
        .list_offers(&request_id)
        .unwrap()
        .map(|o| (o.id.clone(), o.estimated_price))
        .collect();
    assert_eq!(listed, vec![(a, 1200.0), (b, 1000.0)]);
}

#[test]
fn offer_on_unknown_request_is_not_found() {
    let (mut book, _clock) = book();
    let err = book.submit_offer(offer_from("nope", "mech-a", 900.0)).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn customer_cannot_bid_on_own_request() {
    let (mut book, _clock) = book();
    let request = book.create_request(plumber_request()).unwrap();
    let err = book.submit_offer(offer_from(&request.id, CUSTOMER, 900.0)).unwrap_err();
    assert!(matches!(err, Error::InvalidTransition(_)));
}

#[test]
fn second_live_offer_from_same_mechanic_is_duplicate() {
    let (mut book, _clock, request_id, _a, _b) = with_two_offers();
    let err = book.submit_offer(offer_from(&request_id, "mech-a", 1100.0)).unwrap_err();
    assert!(matches!(err, Error::DuplicateOffer { ref mechanic_id, .. } if mechanic_id == "mech-a"));
    assert_eq!(book.list_offers(&request_id).unwrap().len(), 2);
}

#[test]
fn offers_are_capped_per_request() {
    let clock = ManualClock::default();
    let config = BookConfig {
        max_offers_per_request: 2,
        ..BookConfig::default()
    };
    let mut book = RequestBook::with_clock(config, Arc::new(clock));
    let request = book.create_request(plumber_request()).unwrap();
    book.submit_offer(offer_from(&request.id, "m1", 900.0)).unwrap();
    book.submit_offer(offer_from(&request.id, "m2", 950.0)).unwrap();

    let err = book.submit_offer(offer_from(&request.id, "m3", 800.0)).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[test]
fn equal_timestamps_are_ordered_by_id() {
    let (mut book, _clock) = book();
    let request = book.create_request(plumber_request()).unwrap();
    for m in ["m1", "m2", "m3", "m4"] {
        book.submit_offer(offer_from(&request.id, m, 1000.0)).unwrap();
    }

    let ids: Vec<_> = book
        .list_offers(&request.id)
        .unwrap()
        .map(|o| o.id.clone())
        .collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
}

#[test]
fn cursor_is_restartable_and_exact_size() {
    let (book, _clock, request_id, a, b) = with_two_offers();
    let mut cursor = book.list_offers(&request_id).unwrap();

    assert_eq!(cursor.len(), 2);
    assert_eq!(cursor.next().unwrap().id, a);
    assert_eq!(cursor.len(), 1);
    let snapshot = cursor.clone();
    assert_eq!(cursor.next().unwrap().id, b);
    assert!(cursor.next().is_none());
    assert!(cursor.next().is_none());

    cursor.restart();
    assert_eq!(cursor.next().unwrap().id, a);
    assert_eq!(snapshot.map(|o| o.id.clone()).collect::<Vec<_>>(), vec![b]);
}

// =============================================================================
// Acceptance
// =============================================================================

#[test]
fn accepting_hires_one_mechanic_and_voids_siblings() {
    let (mut book, _clock, request_id, a, b) = with_two_offers();

    let request = book.accept_offer(&request_id, &b, CUSTOMER).unwrap();
    assert_eq!(request.status, RequestStatus::Accepted);
    assert_eq!(request.accepted_offer().unwrap().id, b);

    let loser = request.offer(&a).unwrap();
    assert_eq!(loser.status, OfferStatus::Pending);
    assert!(loser.is_void(&request));
    assert_eq!(request.live_offers().count(), 1);
}

#[test]
fn second_accept_fails_and_changes_nothing() {
    let (mut book, _clock, request_id, a, b) = with_two_offers();
    book.accept_offer(&request_id, &b, CUSTOMER).unwrap();
    let before = book.get(&request_id).unwrap().clone();

    for offer in [&a, &b] {
        let err = book.accept_offer(&request_id, offer, CUSTOMER).unwrap_err();
        assert!(matches!(err, Error::InvalidTransition(_)));
    }
    assert_eq!(book.get(&request_id).unwrap(), &before);
}

#[test]
fn only_customer_may_accept() {
    let (mut book, _clock, request_id, a, _b) = with_two_offers();
    let err = book.accept_offer(&request_id, &a, "mech-b").unwrap_err();
    assert!(matches!(err, Error::InvalidTransition(_)));
    assert_eq!(status(&book, &request_id), RequestStatus::Offered);
}

#[test]
fn accepting_unknown_offer_is_not_found() {
    let (mut book, _clock, request_id, _a, _b) = with_two_offers();
    let err = book.accept_offer(&request_id, "ghost", CUSTOMER).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn offers_refused_once_request_leaves_open_states() {
    let (mut book, _clock, request_id, _a, b) = with_two_offers();
    book.accept_offer(&request_id, &b, CUSTOMER).unwrap();
    let late = |book: &mut RequestBook| book.submit_offer(offer_from(&request_id, "mech-c", 700.0));

    assert!(matches!(late(&mut book), Err(Error::InvalidTransition(_))));
    book.start_work(&request_id, "mech-b").unwrap();
    assert!(matches!(late(&mut book), Err(Error::InvalidTransition(_))));
    book.complete_work(&request_id, CUSTOMER).unwrap();
    assert!(matches!(late(&mut book), Err(Error::InvalidTransition(_))));
    assert_eq!(book.list_offers(&request_id).unwrap().len(), 2);
}

// =============================================================================
// Work and cancellation
// =============================================================================

#[test]
fn hired_mechanic_drives_work_to_completion() {
    let (mut book, _clock, request_id, a, b) = with_two_offers();
    assert_eq!(accepted_count(&book, &request_id), 0);
    book.accept_offer(&request_id, &b, CUSTOMER).unwrap();
    assert_eq!(accepted_count(&book, &request_id), 1);

    assert!(matches!(
        book.start_work(&request_id, "mech-a"),
        Err(Error::InvalidTransition(_))
    ));
    book.start_work(&request_id, "mech-b").unwrap();
    assert_eq!(status(&book, &request_id), RequestStatus::InProgress);
    assert_eq!(accepted_count(&book, &request_id), 1);

    assert!(matches!(
        book.complete_work(&request_id, "stranger"),
        Err(Error::InvalidTransition(_))
    ));
    book.complete_work(&request_id, "mech-b").unwrap();
    assert_eq!(status(&book, &request_id), RequestStatus::Completed);
    assert_eq!(accepted_count(&book, &request_id), 1);

    let request = book.get(&request_id).unwrap();
    assert_eq!(request.offer(&a).unwrap().status, OfferStatus::Pending);
    assert_eq!(request.accepted_offer().unwrap().id, b);
}

#[test]
fn work_cannot_skip_states() {
    let (mut book, _clock, request_id, _a, _b) = with_two_offers();
    assert!(matches!(
        book.start_work(&request_id, "mech-a"),
        Err(Error::InvalidTransition(_))
    ));
    assert!(matches!(
        book.complete_work(&request_id, CUSTOMER),
        Err(Error::InvalidTransition(_))
    ));
}

#[test]
fn cancelled_request_rejects_everything() {
    let (mut book, _clock, request_id, a, _b) = with_two_offers();
    book.cancel_request(&request_id, CUSTOMER).unwrap();
    assert_eq!(status(&book, &request_id), RequestStatus::Cancelled);

    let request = book.get(&request_id).unwrap();
    assert_eq!(request.live_offers().count(), 0);

    assert!(matches!(
        book.submit_offer(offer_from(&request_id, "mech-c", 700.0)),
        Err(Error::InvalidTransition(_))
    ));
    assert!(matches!(
        book.accept_offer(&request_id, &a, CUSTOMER),
        Err(Error::InvalidTransition(_))
    ));
    assert!(matches!(
        book.cancel_request(&request_id, CUSTOMER),
        Err(Error::InvalidTransition(_))
    ));
}

#[test]
fn hired_request_cannot_be_cancelled_by_customer() {
    let (mut book, _clock, request_id, a, _b) = with_two_offers();
    book.accept_offer(&request_id, &a, CUSTOMER).unwrap();
    assert!(matches!(
        book.cancel_request(&request_id, CUSTOMER),
        Err(Error::InvalidTransition(_))
    ));
}

#[test]
fn only_customer_may_cancel() {
    let (mut book, _clock) = book();
    let request = book.create_request(plumber_request()).unwrap();
    assert!(matches!(
        book.cancel_request(&request.id, "mech-a"),
        Err(Error::InvalidTransition(_))
    ));
    assert_eq!(status(&book, &request.id), RequestStatus::Pending);
}

// =============================================================================
// Timeout and server sync
// =============================================================================

#[test]
fn stale_requests_expire_after_timeout() {
    let (mut book, clock) = book();
    let old = book.create_request(plumber_request()).unwrap();
    clock.advance(Duration::minutes(20));
    let fresh = book.create_request(plumber_request()).unwrap();

    assert!(book.expire_stale().is_empty());
    clock.advance(Duration::minutes(10));
    assert_eq!(book.expire_stale(), vec![old.id.clone()]);
    assert_eq!(status(&book, &old.id), RequestStatus::Cancelled);
    assert_eq!(status(&book, &fresh.id), RequestStatus::Pending);
}

#[test]
fn expiry_skips_terminal_requests_and_can_be_disabled() {
    let clock = ManualClock::default();
    let config = BookConfig {
        offer_timeout: None,
        ..BookConfig::default()
    };
    let mut book = RequestBook::with_clock(config, Arc::new(clock.clone()));
    book.create_request(plumber_request()).unwrap();
    clock.advance(Duration::days(2));
    assert!(book.expire_stale().is_empty());

    let (mut book, clock, request_id, a, _b) = with_two_offers();
    book.accept_offer(&request_id, &a, CUSTOMER).unwrap();
    book.start_work(&request_id, "mech-a").unwrap();
    book.complete_work(&request_id, "mech-a").unwrap();
    clock.advance(Duration::hours(1));
    assert!(book.expire_stale().is_empty());
    assert_eq!(status(&book, &request_id), RequestStatus::Completed);
}

#[test]
fn reconcile_takes_server_snapshot() {
    let (mut book, _clock, request_id, a, _b) = with_two_offers();
    let mut snapshot: ServiceRequest = book.get(&request_id).unwrap().clone();
    snapshot.status = RequestStatus::Accepted;
    snapshot.offers[0].status = OfferStatus::Accepted;

    book.reconcile(snapshot);
    let request = book.get(&request_id).unwrap();
    assert_eq!(request.status, RequestStatus::Accepted);
    assert_eq!(request.accepted_offer().unwrap().id, a);

    let mut unknown = request.clone();
    unknown.id = "from-server".into();
    book.reconcile(unknown);
    assert_eq!(book.len(), 2);
    assert_eq!(book.forget("from-server").unwrap().id, "from-server");
    assert_eq!(book.requests().len(), 1);
}

#[test]
fn sibling_of_server_accepted_offer_cannot_be_accepted() {
    let (mut book, _clock, request_id, a, b) = with_two_offers();
    let mut snapshot = book.get(&request_id).unwrap().clone();
    snapshot.status = RequestStatus::Accepted;
    snapshot.offers[0].status = OfferStatus::Accepted;
    book.reconcile(snapshot);

    let before = book.get(&request_id).unwrap().clone();
    assert!(matches!(
        book.accept_offer(&request_id, &b, CUSTOMER),
        Err(Error::InvalidTransition(_))
    ));
    assert_eq!(book.get(&request_id).unwrap(), &before);
    assert_eq!(accepted_count(&book, &request_id), 1);
    assert_eq!(book.get(&request_id).unwrap().accepted_offer().unwrap().id, a);
}

mod common;

use chrono::Duration;
use common::{passenger, world, ALICE, BOB};
use skybook_booking::CreateBookingRequest;
use skybook_core::{
    BookingError, BookingStatus, BookingStore, ErrorKind, FlightStatus, Money, PaymentStatus,
};

#[tokio::test]
async fn test_second_claim_on_a_seat_conflicts() {
    let w = world(&[("12A", 30_000), ("12B", 30_000)]);
    let seat_12a = w.seats[0].id;

    let first = w.services.bookings.create_booking(ALICE, w.request(&[0])).await.unwrap();
    assert_eq!(first.cost, Money::new(30_000, "USD"));

    let err = w
        .services
        .bookings
        .create_booking(BOB, w.request(&[0]))
        .await
        .unwrap_err();
    assert_eq!(err, BookingError::SeatConflict(vec![seat_12a]));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(err.details().unwrap()["seat_ids"][0], seat_12a.to_string());

    assert!(w.services.bookings.list_bookings(BOB).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_payment_must_match_cost_exactly() {
    let w = world(&[("12A", 30_000), ("12B", 60_000)]);
    let booking = w
        .services
        .bookings
        .create_booking(ALICE, w.request(&[0, 1]))
        .await
        .unwrap()
        .booking;

    let err = w
        .services
        .payments
        .process_payment(ALICE, booking.id, Money::new(89_900, "USD"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_PAYMENT_AMOUNT");
    let details = err.details().unwrap();
    assert_eq!(details["provided"]["amount"], 89_900);
    assert_eq!(details["expected"]["amount"], 90_000);

    let still_pending = w.store.booking(booking.id).await.unwrap().unwrap();
    assert_eq!(still_pending.status, BookingStatus::Pending);

    let receipt = w
        .services
        .payments
        .process_payment(ALICE, booking.id, Money::new(90_000, "USD"))
        .await
        .unwrap();
    assert_eq!(receipt.amount, Money::new(90_000, "USD"));
    assert_eq!(receipt.booking_status, BookingStatus::Confirmed);

    let details = w.services.bookings.get_booking(ALICE, booking.id).await.unwrap();
    assert_eq!(details.amount_paid, Money::new(90_000, "USD"));
    assert_eq!(details.balance_due, Money::new(0, "USD"));
}

#[tokio::test]
async fn test_cancel_outside_window_refunds_in_full() {
    let w = world(&[("12A", 30_000), ("12B", 60_000)]);
    let booking = w
        .services
        .bookings
        .create_booking(ALICE, w.request(&[0, 1]))
        .await
        .unwrap()
        .booking;
    w.services
        .payments
        .process_payment(ALICE, booking.id, Money::new(90_000, "USD"))
        .await
        .unwrap();

    w.at_hours_before_departure(30);
    let outcome = w.services.bookings.cancel_booking(ALICE, booking.id).await.unwrap();
    assert_eq!(outcome.booking.status, BookingStatus::Cancelled);
    let refund = outcome.refund.unwrap();
    assert_eq!(refund.refund.money(), Money::new(-90_000, "USD"));
    assert_eq!(refund.original.status, PaymentStatus::Refunded);

    let ledger = w.services.payments.payments(ALICE, booking.id).await.unwrap();
    assert_eq!(ledger.len(), 2);
    assert!(ledger.iter().all(|p| p.status == PaymentStatus::Refunded));
    assert_eq!(ledger.iter().map(|p| p.amount).sum::<i64>(), 0);
    assert_eq!(
        ledger.iter().find(|p| p.is_refund()).unwrap().refund_of,
        Some(refund.original.id)
    );

    // both seats are back on sale
    let map = w.services.inventory.seat_map(w.flight.id).await.unwrap();
    assert!(map.iter().all(|s| s.available));

    let again = w.services.bookings.cancel_booking(ALICE, booking.id).await.unwrap_err();
    assert_eq!(again.code(), "ALREADY_CANCELLED");
}

#[tokio::test]
async fn test_cancel_inside_window_is_denied() {
    let w = world(&[("12A", 30_000), ("12B", 60_000)]);
    let booking = w
        .services
        .bookings
        .create_booking(ALICE, w.request(&[0, 1]))
        .await
        .unwrap()
        .booking;
    w.services
        .payments
        .process_payment(ALICE, booking.id, Money::new(90_000, "USD"))
        .await
        .unwrap();

    w.at_hours_before_departure(10);
    let err = w.services.bookings.cancel_booking(ALICE, booking.id).await.unwrap_err();
    assert_eq!(err.code(), "CANCELLATION_NOT_ALLOWED");
    assert_eq!(err.kind(), ErrorKind::PolicyDenied);

    let unchanged = w.store.booking(booking.id).await.unwrap().unwrap();
    assert_eq!(unchanged.status, BookingStatus::Confirmed);
    let ledger = w.store.payments(booking.id).await.unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].status, PaymentStatus::Completed);
}

#[tokio::test]
async fn test_only_passenger_cannot_be_removed() {
    let w = world(&[("12A", 30_000)]);
    let snapshot = w
        .services
        .bookings
        .create_booking(ALICE, w.request(&[0]))
        .await
        .unwrap();

    let err = w
        .services
        .bookings
        .remove_passenger(ALICE, snapshot.booking.id, snapshot.passengers[0].id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "LAST_PASSENGER");
    assert_eq!(w.store.passengers(snapshot.booking.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_window_flips_exactly_at_boundary() {
    let w = world(&[("12A", 30_000)]);
    let booking = w
        .services
        .bookings
        .create_booking(ALICE, w.request(&[0]))
        .await
        .unwrap()
        .booking;

    w.clock.set(w.flight.departure_time - Duration::hours(24) - Duration::seconds(1));
    assert!(w.services.bookings.can_modify(ALICE, booking.id).await.unwrap());

    w.clock.advance(Duration::seconds(1));
    assert!(!w.services.bookings.can_modify(ALICE, booking.id).await.unwrap());
}

#[tokio::test]
async fn test_cost_tracks_modifications() {
    let w = world(&[("1A", 50_000), ("1B", 50_000), ("20F", 12_000)]);
    let snapshot = w
        .services
        .bookings
        .create_booking(ALICE, w.request(&[0, 1]))
        .await
        .unwrap();
    let booking_id = snapshot.booking.id;
    assert_eq!(snapshot.cost, Money::new(100_000, "USD"));

    let moved = w
        .services
        .bookings
        .change_seat(ALICE, booking_id, snapshot.passengers[0].id, w.seats[2].id)
        .await
        .unwrap();
    assert_eq!(moved.cost, Money::new(62_000, "USD"));

    let removed = w
        .services
        .bookings
        .remove_passenger(ALICE, booking_id, snapshot.passengers[1].id)
        .await
        .unwrap();
    assert_eq!(removed.cost, Money::new(12_000, "USD"));
    assert_eq!(
        w.services.bookings.booking_cost(ALICE, booking_id).await.unwrap(),
        removed.cost
    );
}

#[tokio::test]
async fn test_full_lifecycle_to_completion() {
    let w = world(&[("3C", 25_000)]);
    let booking = w
        .services
        .bookings
        .create_booking(ALICE, w.request(&[0]))
        .await
        .unwrap()
        .booking;
    w.services
        .payments
        .process_payment(ALICE, booking.id, Money::new(25_000, "USD"))
        .await
        .unwrap();

    w.clock.set(w.flight.arrival_time + Duration::hours(1));
    w.store.set_flight_status(w.flight.id, FlightStatus::Arrived).unwrap();
    let completed = w.services.bookings.complete_booking(booking.id).await.unwrap();
    assert_eq!(completed.status, BookingStatus::Completed);

    let err = w.services.bookings.cancel_booking(ALICE, booking.id).await.unwrap_err();
    assert_eq!(err.code(), "CANCELLATION_NOT_ALLOWED");
    let err = w.services.payments.process_refund(booking.id).await.unwrap_err();
    assert_eq!(err.code(), "INVALID_TRANSITION");
}

#[tokio::test]
async fn test_request_body_shape() {
    let w = world(&[("12A", 30_000)]);
    let body = serde_json::json!({
        "flight_id": w.flight.id,
        "passengers": [{
            "first_name": "Ada",
            "last_name": "Lovelace",
            "date_of_birth": "1990-12-10",
            "passport_number": "AB123456",
            "nationality": "GB",
            "seat_id": w.seats[0].id,
        }]
    });
    let request: CreateBookingRequest = serde_json::from_value(body).unwrap();
    assert!(!request.support && !request.fast_track);

    let snapshot = w.services.bookings.create_booking(ALICE, request).await.unwrap();
    assert_eq!(snapshot.passengers[0].passport_number.expose(), "AB123456");
    // masked in logs
    assert!(!format!("{:?}", snapshot.passengers[0]).contains("AB123456"));

    let mixed = CreateBookingRequest {
        flight_id: w.flight.id,
        support: false,
        fast_track: false,
        passengers: vec![passenger("", w.seats[0].id)],
    };
    let err = w.services.bookings.create_booking(ALICE, mixed).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

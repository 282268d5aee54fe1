mod common;

use common::{passenger, world, ALICE};
use skybook_core::{BookingError, BookingStore, Money, PaymentStatus};
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_bookings_never_share_a_seat() {
    let w = Arc::new(world(&[("12A", 30_000)]));

    let mut handles = Vec::new();
    for n in 0..16 {
        let w = w.clone();
        handles.push(tokio::spawn(async move {
            let client = format!("client-{}", n);
            w.services.bookings.create_booking(&client, w.request(&[0])).await
        }));
    }

    let mut won = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => won += 1,
            Err(err) => assert_eq!(err, BookingError::SeatConflict(vec![w.seats[0].id])),
        }
    }
    assert_eq!(won, 1);

    let occupied = w
        .store
        .occupied_seats(w.flight.id, &[w.seats[0].id])
        .await
        .unwrap();
    assert_eq!(occupied, vec![w.seats[0].id]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_seat_changes_and_additions_race_for_one_seat() {
    let layout: Vec<(String, i64)> = (0..9).map(|n| (format!("{}C", n + 1), 20_000)).collect();
    let layout: Vec<(&str, i64)> = layout.iter().map(|(number, price)| (number.as_str(), *price)).collect();
    let w = Arc::new(world(&layout));
    let target = w.seats[8].id;

    let mut snapshots = Vec::new();
    for n in 0..8 {
        let client = format!("client-{}", n);
        let snapshot = w
            .services
            .bookings
            .create_booking(&client, w.request(&[n]))
            .await
            .unwrap();
        snapshots.push((client, snapshot));
    }

    let mut handles = Vec::new();
    for (n, (client, snapshot)) in snapshots.iter().enumerate() {
        let w = w.clone();
        let client = client.clone();
        let booking_id = snapshot.booking.id;
        let passenger_id = snapshot.passengers[0].id;
        handles.push(tokio::spawn(async move {
            if n % 2 == 0 {
                w.services
                    .bookings
                    .change_seat(&client, booking_id, passenger_id, target)
                    .await
            } else {
                w.services
                    .bookings
                    .add_passenger(&client, booking_id, passenger("Extra", target))
                    .await
            }
        }));
    }

    let mut won = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => won += 1,
            Err(err) => assert_eq!(err.code(), "SEAT_CONFLICT", "unexpected error {}", err),
        }
    }
    assert_eq!(won, 1);

    let mut holders = 0;
    for (_, snapshot) in &snapshots {
        holders += w
            .store
            .passengers(snapshot.booking.id)
            .await
            .unwrap()
            .iter()
            .filter(|p| p.seat_id == target)
            .count();
    }
    assert_eq!(holders, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_payments_charge_once() {
    let w = Arc::new(world(&[("12A", 30_000), ("12B", 30_000)]));
    let booking_id = w
        .services
        .bookings
        .create_booking(ALICE, w.request(&[0, 1]))
        .await
        .unwrap()
        .booking
        .id;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let w = w.clone();
        handles.push(tokio::spawn(async move {
            w.services
                .payments
                .process_payment(ALICE, booking_id, Money::new(60_000, "USD"))
                .await
        }));
    }

    let mut paid = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            paid += 1;
        }
    }
    assert_eq!(paid, 1);

    let completed = w
        .store
        .payments(booking_id)
        .await
        .unwrap()
        .into_iter()
        .filter(|p| p.status == PaymentStatus::Completed)
        .count();
    assert_eq!(completed, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_refunds_reverse_once() {
    let w = Arc::new(world(&[("12A", 30_000)]));
    let booking_id = w
        .services
        .bookings
        .create_booking(ALICE, w.request(&[0]))
        .await
        .unwrap()
        .booking
        .id;
    w.services
        .payments
        .process_payment(ALICE, booking_id, Money::new(30_000, "USD"))
        .await
        .unwrap();
    w.at_hours_before_departure(48);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let w = w.clone();
        handles.push(tokio::spawn(async move {
            w.services.bookings.cancel_booking(ALICE, booking_id).await
        }));
    }

    let mut refunded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(outcome) => {
                assert!(outcome.refund.is_some());
                refunded += 1;
            }
            Err(err) => assert!(
                matches!(
                    err.code(),
                    "ALREADY_CANCELLED" | "NO_REFUNDABLE_PAYMENT" | "INVALID_TRANSITION"
                ),
                "unexpected error {}",
                err
            ),
        }
    }
    assert_eq!(refunded, 1);

    let ledger = w.store.payments(booking_id).await.unwrap();
    assert_eq!(ledger.len(), 2);
    assert_eq!(ledger.iter().map(|p| p.amount).sum::<i64>(), 0);
}

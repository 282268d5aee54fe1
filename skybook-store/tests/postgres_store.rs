//! Runs against a real database when `SKYBOOK_TEST_DATABASE_URL` is set and
//! is skipped otherwise.

use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use skybook_core::pii::Masked;
use skybook_core::{
    Booking, BookingStatus, BookingStore, FlightDirectory, Passenger, Payment, PaymentStatus,
    StoreError,
};
use skybook_store::app_config::DatabaseConfig;
use skybook_store::{DbClient, PostgresStore};

struct Fixture {
    store: PostgresStore,
    flight_id: Uuid,
    seat_ids: Vec<Uuid>,
}

async fn fixture() -> Option<Fixture> {
    let url = std::env::var("SKYBOOK_TEST_DATABASE_URL").ok()?;
    let db = DbClient::new(&DatabaseConfig {
        url,
        max_connections: 8,
    })
    .await
    .unwrap();
    db.migrate().await.unwrap();

    let suffix = Uuid::new_v4().simple().to_string();
    let origin = Uuid::new_v4();
    let destination = Uuid::new_v4();
    for (id, code) in [(origin, &suffix[..3]), (destination, &suffix[3..6])] {
        sqlx::query("INSERT INTO airports (id, code, name, city, country) VALUES ($1, $2, 'Test', 'Test', 'NL')")
            .bind(id)
            .bind(code.to_uppercase())
            .execute(&db.pool)
            .await
            .unwrap();
    }

    let airplane_id = Uuid::new_v4();
    sqlx::query("INSERT INTO airplanes (id, model, registration) VALUES ($1, 'A320', $2)")
        .bind(airplane_id)
        .bind(&suffix)
        .execute(&db.pool)
        .await
        .unwrap();

    let flight_id = Uuid::new_v4();
    let departure = Utc::now() + Duration::days(10);
    sqlx::query(
        r#"
        INSERT INTO flights (id, flight_number, departure_time, arrival_time, status,
                             airplane_id, origin_airport_id, destination_airport_id)
        VALUES ($1, 'SB900', $2, $3, 'Scheduled', $4, $5, $6)
        "#,
    )
    .bind(flight_id)
    .bind(departure)
    .bind(departure + Duration::hours(2))
    .bind(airplane_id)
    .bind(origin)
    .bind(destination)
    .execute(&db.pool)
    .await
    .unwrap();

    let mut seat_ids = Vec::new();
    for (number, price) in [("12A", 30_000i64), ("12B", 60_000)] {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO seats (id, airplane_id, seat_number, class, price, currency) VALUES ($1, $2, $3, 'Economy', $4, 'USD')",
        )
        .bind(id)
        .bind(airplane_id)
        .bind(number)
        .bind(price)
        .execute(&db.pool)
        .await
        .unwrap();
        seat_ids.push(id);
    }

    Some(Fixture {
        store: PostgresStore::new(db.pool.clone()),
        flight_id,
        seat_ids,
    })
}

fn booking(flight_id: Uuid) -> Booking {
    let now = Utc::now();
    Booking {
        id: Uuid::new_v4(),
        booking_number: format!("T{}", &Uuid::new_v4().simple().to_string()[..7]).to_uppercase(),
        client_id: "client-1".to_string(),
        flight_id,
        status: BookingStatus::Pending,
        support: false,
        fast_track: false,
        created_at: now,
        updated_at: now,
    }
}

fn passenger(booking: &Booking, seat_id: Uuid) -> Passenger {
    Passenger {
        id: Uuid::new_v4(),
        booking_id: booking.id,
        flight_id: booking.flight_id,
        seat_id,
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        date_of_birth: chrono::NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
        passport_number: Masked::new("AB123456".to_string()),
        nationality: "GB".to_string(),
    }
}

#[tokio::test]
async fn test_concurrent_claims_commit_once() {
    let Some(f) = fixture().await else { return };
    let store = Arc::new(f.store);
    let seat = f.seat_ids[0];

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        let flight_id = f.flight_id;
        handles.push(tokio::spawn(async move {
            let b = booking(flight_id);
            let p = passenger(&b, seat);
            store.insert_booking(&b, &[p]).await
        }));
    }

    let mut committed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => committed += 1,
            Err(err) => assert_eq!(err, StoreError::SeatTaken(vec![seat])),
        }
    }
    assert_eq!(committed, 1);
    assert_eq!(store.occupied_seats(f.flight_id, &[seat]).await.unwrap(), vec![seat]);
}

#[tokio::test]
async fn test_payment_and_refund_ledger() {
    let Some(f) = fixture().await else { return };
    let b = booking(f.flight_id);
    let passengers = vec![passenger(&b, f.seat_ids[0]), passenger(&b, f.seat_ids[1])];
    f.store.insert_booking(&b, &passengers).await.unwrap();

    let seats = f.store.seats(&f.seat_ids).await.unwrap();
    assert_eq!(seats.len(), 2);

    let mut payment = Payment {
        id: Uuid::new_v4(),
        booking_id: b.id,
        amount: 89_900,
        currency: "USD".to_string(),
        status: PaymentStatus::Pending,
        reference: Some("auth_test".to_string()),
        refund_of: None,
        created_at: Utc::now(),
    };
    assert!(matches!(
        f.store.record_payment(&payment).await,
        Err(StoreError::AmountMismatch { .. })
    ));

    let declined = Payment {
        id: Uuid::new_v4(),
        amount: 90_000,
        reference: Some("declined 90000 USD: card expired".to_string()),
        ..payment.clone()
    };
    f.store.record_failed_payment(&declined).await.unwrap();

    payment.amount = 90_000;
    let confirmed = f.store.record_payment(&payment).await.unwrap();
    assert_eq!(confirmed.status, BookingStatus::Confirmed);

    let record = f.store.record_refund(b.id, Uuid::new_v4(), Utc::now()).await.unwrap();
    assert_eq!(record.refund.amount, -90_000);
    assert_eq!(record.booking.status, BookingStatus::Cancelled);

    let ledger = f.store.payments(b.id).await.unwrap();
    assert_eq!(ledger.len(), 3);
    assert!(ledger
        .iter()
        .any(|p| p.status == PaymentStatus::Failed && p.amount == 0));
    assert_eq!(ledger.iter().map(|p| p.amount).sum::<i64>(), 0);
    assert!(f
        .store
        .occupied_seats(f.flight_id, &f.seat_ids)
        .await
        .unwrap()
        .is_empty());

    assert!(matches!(
        f.store.record_refund(b.id, Uuid::new_v4(), Utc::now()).await,
        Err(StoreError::BookingClosed { .. })
    ));
}

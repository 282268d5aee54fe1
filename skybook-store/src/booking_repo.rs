use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use std::collections::HashSet;
use tracing::{debug, warn};
use uuid::Uuid;

use skybook_core::cost::booking_cost;
use skybook_core::{
    Booking, BookingEvent, BookingStatus, BookingStore, Flight, Money, Passenger, Payment,
    PaymentEvent, PaymentStatus, RefundRecord, Seat, ServiceFlags, StoreError, StoreResult,
};

use crate::rows::{
    backend, convert_all, unique_violation, BookingRow, FlightRow, PassengerRow, PaymentRow,
    SeatRow, BOOKING_NUMBER_KEY, COMPLETED_PAYMENT_INDEX, SEAT_INDEX,
};

/// PostgreSQL-backed store. Every mutating operation runs in its own
/// transaction; seat claims hold the flight row lock while they re-check
/// occupancy, payment and refund writes hold the booking row lock.
#[derive(Clone)]
pub struct PostgresStore {
    pub(crate) pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const BOOKING_COLUMNS: &str = "id, booking_number, client_id, flight_id, status, support, fast_track, created_at, updated_at";

async fn lock_flight(conn: &mut PgConnection, flight_id: Uuid) -> StoreResult<Flight> {
    let row = sqlx::query_as::<_, FlightRow>(
        r#"
        SELECT id, flight_number, departure_time, arrival_time, status,
               airplane_id, origin_airport_id, destination_airport_id
        FROM flights
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(flight_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(backend)?
    .ok_or(StoreError::FlightNotFound(flight_id))?;

    Flight::try_from(row)
}

async fn lock_booking(conn: &mut PgConnection, booking_id: Uuid) -> StoreResult<Booking> {
    let row = sqlx::query_as::<_, BookingRow>(&format!(
        "SELECT {} FROM bookings WHERE id = $1 FOR UPDATE",
        BOOKING_COLUMNS
    ))
    .bind(booking_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(backend)?
    .ok_or(StoreError::BookingNotFound(booking_id))?;

    Booking::try_from(row)
}

/// Lock a booking that must still accept changes
async fn lock_open_booking(conn: &mut PgConnection, booking_id: Uuid) -> StoreResult<Booking> {
    let booking = lock_booking(conn, booking_id).await?;
    if booking.status.is_terminal() {
        return Err(StoreError::BookingClosed {
            booking_id,
            status: booking.status,
        });
    }
    Ok(booking)
}

/// Seats in `seat_ids` that cannot be claimed on `flight`: unknown, from
/// another airplane, held by an active passenger other than `moving`, or
/// requested twice. Call with the flight row locked.
async fn unclaimable(
    conn: &mut PgConnection,
    flight: &Flight,
    seat_ids: &[Uuid],
    moving: Option<Uuid>,
) -> StoreResult<Vec<Uuid>> {
    let on_airplane: HashSet<Uuid> =
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM seats WHERE id = ANY($1) AND airplane_id = $2")
            .bind(seat_ids)
            .bind(flight.airplane_id)
            .fetch_all(&mut *conn)
            .await
            .map_err(backend)?
            .into_iter()
            .collect();

    let held: HashSet<Uuid> = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT seat_id FROM passengers
        WHERE flight_id = $1 AND active AND seat_id = ANY($2)
          AND ($3::uuid IS NULL OR id <> $3)
        "#,
    )
    .bind(flight.id)
    .bind(seat_ids)
    .bind(moving)
    .fetch_all(&mut *conn)
    .await
    .map_err(backend)?
    .into_iter()
    .collect();

    let mut seen = HashSet::new();
    let mut taken = Vec::new();
    for seat_id in seat_ids {
        let duplicate = !seen.insert(*seat_id);
        if (!on_airplane.contains(seat_id) || held.contains(seat_id) || duplicate)
            && !taken.contains(seat_id)
        {
            taken.push(*seat_id);
        }
    }
    Ok(taken)
}

async fn booking_passengers(conn: &mut PgConnection, booking_id: Uuid) -> StoreResult<Vec<Passenger>> {
    let rows = sqlx::query_as::<_, PassengerRow>(
        r#"
        SELECT id, booking_id, flight_id, seat_id, first_name, last_name,
               date_of_birth, passport_number, nationality
        FROM passengers
        WHERE booking_id = $1
        ORDER BY created_at, id
        "#,
    )
    .bind(booking_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(backend)?;

    Ok(rows.into_iter().map(Passenger::from).collect())
}

async fn cost_in_tx(conn: &mut PgConnection, booking_id: Uuid) -> StoreResult<Money> {
    let passengers = booking_passengers(conn, booking_id).await?;
    let seat_ids: Vec<Uuid> = passengers.iter().map(|p| p.seat_id).collect();
    let rows = sqlx::query_as::<_, SeatRow>(
        "SELECT id, airplane_id, seat_number, class, price, currency FROM seats WHERE id = ANY($1)",
    )
    .bind(&seat_ids)
    .fetch_all(&mut *conn)
    .await
    .map_err(backend)?;
    let seats: Vec<Seat> = convert_all(rows)?;

    Ok(booking_cost(&passengers, &seats)?)
}

async fn completed_payment(conn: &mut PgConnection, booking_id: Uuid) -> StoreResult<Option<Payment>> {
    let row = sqlx::query_as::<_, PaymentRow>(
        r#"
        SELECT id, booking_id, amount, currency, status, reference, refund_of, created_at
        FROM payments
        WHERE booking_id = $1 AND status = 'completed'
        FOR UPDATE
        "#,
    )
    .bind(booking_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(backend)?;

    row.map(Payment::try_from).transpose()
}

async fn insert_payment(conn: &mut PgConnection, payment: &Payment) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO payments (id, booking_id, amount, currency, status, reference, refund_of, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(payment.id)
    .bind(payment.booking_id)
    .bind(payment.amount)
    .bind(&payment.currency)
    .bind(payment.status.as_str())
    .bind(&payment.reference)
    .bind(payment.refund_of)
    .bind(payment.created_at)
    .execute(&mut *conn)
    .await
    .map_err(|err| match unique_violation(&err).as_deref() {
        Some(COMPLETED_PAYMENT_INDEX) => StoreError::PaymentExists(payment.booking_id),
        _ => backend(err),
    })?;
    Ok(())
}

async fn insert_passenger(conn: &mut PgConnection, passenger: &Passenger) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO passengers (id, booking_id, flight_id, seat_id, first_name, last_name,
                                date_of_birth, passport_number, nationality)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(passenger.id)
    .bind(passenger.booking_id)
    .bind(passenger.flight_id)
    .bind(passenger.seat_id)
    .bind(&passenger.first_name)
    .bind(&passenger.last_name)
    .bind(passenger.date_of_birth)
    .bind(passenger.passport_number.expose())
    .bind(&passenger.nationality)
    .execute(&mut *conn)
    .await
    .map_err(|err| match unique_violation(&err).as_deref() {
        Some(SEAT_INDEX) => StoreError::SeatTaken(vec![passenger.seat_id]),
        _ => backend(err),
    })?;
    Ok(())
}

async fn set_status(
    conn: &mut PgConnection,
    booking_id: Uuid,
    status: BookingStatus,
    now: DateTime<Utc>,
) -> StoreResult<Booking> {
    let row = sqlx::query_as::<_, BookingRow>(&format!(
        "UPDATE bookings SET status = $2, updated_at = $3 WHERE id = $1 RETURNING {}",
        BOOKING_COLUMNS
    ))
    .bind(booking_id)
    .bind(status.as_str())
    .bind(now)
    .fetch_one(&mut *conn)
    .await
    .map_err(backend)?;

    Booking::try_from(row)
}

async fn touch(conn: &mut PgConnection, booking_id: Uuid, now: DateTime<Utc>) -> StoreResult<()> {
    sqlx::query("UPDATE bookings SET updated_at = $2 WHERE id = $1")
        .bind(booking_id)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(backend)?;
    Ok(())
}

async fn release_seats(conn: &mut PgConnection, booking_id: Uuid) -> StoreResult<()> {
    sqlx::query("UPDATE passengers SET active = FALSE WHERE booking_id = $1")
        .bind(booking_id)
        .execute(&mut *conn)
        .await
        .map_err(backend)?;
    Ok(())
}

#[async_trait]
impl BookingStore for PostgresStore {
    async fn occupied_seats(&self, flight_id: Uuid, seat_ids: &[Uuid]) -> StoreResult<Vec<Uuid>> {
        let held: HashSet<Uuid> = sqlx::query_scalar::<_, Uuid>(
            "SELECT seat_id FROM passengers WHERE flight_id = $1 AND active AND seat_id = ANY($2)",
        )
        .bind(flight_id)
        .bind(seat_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?
        .into_iter()
        .collect();

        let mut occupied = Vec::new();
        for seat_id in seat_ids {
            if held.contains(seat_id) && !occupied.contains(seat_id) {
                occupied.push(*seat_id);
            }
        }
        Ok(occupied)
    }

    async fn insert_booking(&self, booking: &Booking, passengers: &[Passenger]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let flight = lock_flight(&mut tx, booking.flight_id).await?;
        let seat_ids: Vec<Uuid> = passengers.iter().map(|p| p.seat_id).collect();
        let taken = unclaimable(&mut tx, &flight, &seat_ids, None).await?;
        if !taken.is_empty() {
            warn!("Seats {:?} already claimed on flight {}", taken, flight.flight_number);
            return Err(StoreError::SeatTaken(taken));
        }

        sqlx::query(
            r#"
            INSERT INTO bookings (id, booking_number, client_id, flight_id, status, support, fast_track, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(booking.id)
        .bind(&booking.booking_number)
        .bind(&booking.client_id)
        .bind(booking.flight_id)
        .bind(booking.status.as_str())
        .bind(booking.support)
        .bind(booking.fast_track)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|err| match unique_violation(&err).as_deref() {
            Some(BOOKING_NUMBER_KEY) => {
                StoreError::DuplicateBookingNumber(booking.booking_number.clone())
            }
            _ => backend(err),
        })?;

        for passenger in passengers {
            insert_passenger(&mut tx, passenger).await?;
        }

        tx.commit().await.map_err(backend)?;
        debug!("Booking {} persisted", booking.booking_number);
        Ok(())
    }

    async fn booking(&self, booking_id: Uuid) -> StoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE id = $1",
            BOOKING_COLUMNS
        ))
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(Booking::try_from).transpose()
    }

    async fn bookings_for_client(&self, client_id: &str) -> StoreResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE client_id = $1 ORDER BY created_at DESC",
            BOOKING_COLUMNS
        ))
        .bind(client_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        convert_all(rows)
    }

    async fn passengers(&self, booking_id: Uuid) -> StoreResult<Vec<Passenger>> {
        let mut conn = self.pool.acquire().await.map_err(backend)?;
        booking_passengers(&mut conn, booking_id).await
    }

    async fn update_services(
        &self,
        booking_id: Uuid,
        services: ServiceFlags,
        now: DateTime<Utc>,
    ) -> StoreResult<Booking> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        lock_open_booking(&mut tx, booking_id).await?;

        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "UPDATE bookings SET support = $2, fast_track = $3, updated_at = $4 WHERE id = $1 RETURNING {}",
            BOOKING_COLUMNS
        ))
        .bind(booking_id)
        .bind(services.support)
        .bind(services.fast_track)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(backend)?;

        tx.commit().await.map_err(backend)?;
        Booking::try_from(row)
    }

    async fn change_seat(
        &self,
        booking_id: Uuid,
        passenger_id: Uuid,
        seat_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Passenger> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let booking = lock_open_booking(&mut tx, booking_id).await?;
        let flight = lock_flight(&mut tx, booking.flight_id).await?;

        let mut passenger = booking_passengers(&mut tx, booking_id)
            .await?
            .into_iter()
            .find(|p| p.id == passenger_id)
            .ok_or(StoreError::PassengerNotFound(passenger_id))?;
        if passenger.seat_id == seat_id {
            return Ok(passenger);
        }

        let taken = unclaimable(&mut tx, &flight, &[seat_id], Some(passenger_id)).await?;
        if !taken.is_empty() {
            return Err(StoreError::SeatTaken(taken));
        }

        sqlx::query("UPDATE passengers SET seat_id = $2 WHERE id = $1")
            .bind(passenger_id)
            .bind(seat_id)
            .execute(&mut *tx)
            .await
            .map_err(|err| match unique_violation(&err).as_deref() {
                Some(SEAT_INDEX) => StoreError::SeatTaken(vec![seat_id]),
                _ => backend(err),
            })?;
        touch(&mut tx, booking_id, now).await?;

        tx.commit().await.map_err(backend)?;
        passenger.seat_id = seat_id;
        Ok(passenger)
    }

    async fn add_passenger(&self, passenger: &Passenger, now: DateTime<Utc>) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let booking = lock_open_booking(&mut tx, passenger.booking_id).await?;
        if booking.flight_id != passenger.flight_id {
            return Err(StoreError::Inconsistent(format!(
                "passenger {} is not on the booking's flight",
                passenger.id
            )));
        }

        let flight = lock_flight(&mut tx, booking.flight_id).await?;
        let taken = unclaimable(&mut tx, &flight, &[passenger.seat_id], None).await?;
        if !taken.is_empty() {
            return Err(StoreError::SeatTaken(taken));
        }

        insert_passenger(&mut tx, passenger).await?;
        touch(&mut tx, booking.id, now).await?;
        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    async fn remove_passenger(
        &self,
        booking_id: Uuid,
        passenger_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        lock_open_booking(&mut tx, booking_id).await?;

        let passengers = booking_passengers(&mut tx, booking_id).await?;
        if !passengers.iter().any(|p| p.id == passenger_id) {
            return Err(StoreError::PassengerNotFound(passenger_id));
        }
        if passengers.len() <= 1 {
            return Err(StoreError::LastPassenger {
                booking_id,
                passenger_id,
            });
        }

        sqlx::query("DELETE FROM passengers WHERE id = $1 AND booking_id = $2")
            .bind(passenger_id)
            .bind(booking_id)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        touch(&mut tx, booking_id, now).await?;
        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    async fn payments(&self, booking_id: Uuid) -> StoreResult<Vec<Payment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT id, booking_id, amount, currency, status, reference, refund_of, created_at
            FROM payments
            WHERE booking_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        convert_all(rows)
    }

    async fn record_payment(&self, payment: &Payment) -> StoreResult<Booking> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let booking = lock_booking(&mut tx, payment.booking_id).await?;

        if completed_payment(&mut tx, booking.id).await?.is_some() {
            return Err(StoreError::PaymentExists(booking.id));
        }
        if booking.status != BookingStatus::Pending {
            return Err(StoreError::NotPending {
                booking_id: booking.id,
                status: booking.status,
            });
        }
        let next = booking.status.apply(BookingEvent::PaymentCompleted)?;

        let expected = cost_in_tx(&mut tx, booking.id).await?;
        if payment.money() != expected {
            return Err(StoreError::AmountMismatch {
                provided: payment.money(),
                expected,
            });
        }

        let mut row = payment.clone();
        row.status = payment.status.apply(PaymentEvent::Captured)?;
        insert_payment(&mut tx, &row).await?;
        let confirmed = set_status(&mut tx, booking.id, next, payment.created_at).await?;

        tx.commit().await.map_err(backend)?;
        Ok(confirmed)
    }

    async fn record_failed_payment(&self, payment: &Payment) -> StoreResult<()> {
        let mut row = payment.clone();
        if row.status != PaymentStatus::Failed {
            row.status = row.status.apply(PaymentEvent::Declined)?;
        }
        row.amount = 0;
        let mut conn = self.pool.acquire().await.map_err(backend)?;
        insert_payment(&mut conn, &row).await
    }

    async fn record_refund(
        &self,
        booking_id: Uuid,
        refund_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<RefundRecord> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let booking = lock_booking(&mut tx, booking_id).await?;
        if booking.status == BookingStatus::Cancelled {
            return Err(StoreError::BookingClosed {
                booking_id,
                status: booking.status,
            });
        }

        let mut original = completed_payment(&mut tx, booking_id)
            .await?
            .ok_or(StoreError::NoCompletedPayment(booking_id))?;
        let next = booking.status.apply(BookingEvent::Refund)?;
        original.status = original.status.apply(PaymentEvent::Reversed)?;

        sqlx::query("UPDATE payments SET status = $2 WHERE id = $1")
            .bind(original.id)
            .bind(original.status.as_str())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        let reversal = original.money().negated();
        let refund = Payment {
            id: refund_id,
            booking_id,
            amount: reversal.amount,
            currency: reversal.currency,
            status: PaymentStatus::Refunded,
            reference: original.reference.clone(),
            refund_of: Some(original.id),
            created_at: now,
        };
        insert_payment(&mut tx, &refund).await?;

        let booking = set_status(&mut tx, booking_id, next, now).await?;
        release_seats(&mut tx, booking_id).await?;

        tx.commit().await.map_err(backend)?;
        Ok(RefundRecord {
            original,
            refund,
            booking,
        })
    }

    async fn cancel_unpaid(&self, booking_id: Uuid, now: DateTime<Utc>) -> StoreResult<Booking> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let booking = lock_booking(&mut tx, booking_id).await?;
        if booking.status == BookingStatus::Cancelled {
            return Err(StoreError::BookingClosed {
                booking_id,
                status: booking.status,
            });
        }
        if completed_payment(&mut tx, booking_id).await?.is_some() {
            return Err(StoreError::PaymentExists(booking_id));
        }
        let next = booking.status.apply(BookingEvent::Cancel)?;

        let cancelled = set_status(&mut tx, booking_id, next, now).await?;
        release_seats(&mut tx, booking_id).await?;
        tx.commit().await.map_err(backend)?;
        Ok(cancelled)
    }

    async fn complete_booking(&self, booking_id: Uuid, now: DateTime<Utc>) -> StoreResult<Booking> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let booking = lock_booking(&mut tx, booking_id).await?;
        let next = booking.status.apply(BookingEvent::FlightServiced)?;

        let completed = set_status(&mut tx, booking_id, next, now).await?;
        tx.commit().await.map_err(backend)?;
        Ok(completed)
    }
}

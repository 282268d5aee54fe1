use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use skybook_core::pii::Masked;
use skybook_core::{Booking, Flight, Passenger, Payment, Seat, StoreError};

// Internal structs for type-safe querying. Status columns are text and are
// parsed into the closed enums here; an unknown value is an error, never a
// default.

#[derive(sqlx::FromRow)]
pub(crate) struct FlightRow {
    id: Uuid,
    flight_number: String,
    departure_time: DateTime<Utc>,
    arrival_time: DateTime<Utc>,
    status: String,
    airplane_id: Uuid,
    origin_airport_id: Uuid,
    destination_airport_id: Uuid,
}

impl TryFrom<FlightRow> for Flight {
    type Error = StoreError;

    fn try_from(row: FlightRow) -> Result<Self, Self::Error> {
        Ok(Flight {
            id: row.id,
            flight_number: row.flight_number,
            departure_time: row.departure_time,
            arrival_time: row.arrival_time,
            status: row.status.parse()?,
            airplane_id: row.airplane_id,
            origin_airport_id: row.origin_airport_id,
            destination_airport_id: row.destination_airport_id,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct SeatRow {
    id: Uuid,
    airplane_id: Uuid,
    seat_number: String,
    class: String,
    price: i64,
    currency: String,
}

impl TryFrom<SeatRow> for Seat {
    type Error = StoreError;

    fn try_from(row: SeatRow) -> Result<Self, Self::Error> {
        Ok(Seat {
            id: row.id,
            airplane_id: row.airplane_id,
            seat_number: row.seat_number,
            class: row.class.parse()?,
            price: row.price,
            currency: row.currency,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct BookingRow {
    id: Uuid,
    booking_number: String,
    client_id: String,
    flight_id: Uuid,
    status: String,
    support: bool,
    fast_track: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.id,
            booking_number: row.booking_number,
            client_id: row.client_id,
            flight_id: row.flight_id,
            status: row.status.parse()?,
            support: row.support,
            fast_track: row.fast_track,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct PassengerRow {
    id: Uuid,
    booking_id: Uuid,
    flight_id: Uuid,
    seat_id: Uuid,
    first_name: String,
    last_name: String,
    date_of_birth: NaiveDate,
    passport_number: String,
    nationality: String,
}

impl From<PassengerRow> for Passenger {
    fn from(row: PassengerRow) -> Self {
        Passenger {
            id: row.id,
            booking_id: row.booking_id,
            flight_id: row.flight_id,
            seat_id: row.seat_id,
            first_name: row.first_name,
            last_name: row.last_name,
            date_of_birth: row.date_of_birth,
            passport_number: Masked::new(row.passport_number),
            nationality: row.nationality,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct PaymentRow {
    id: Uuid,
    booking_id: Uuid,
    amount: i64,
    currency: String,
    status: String,
    reference: Option<String>,
    refund_of: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = StoreError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: row.id,
            booking_id: row.booking_id,
            amount: row.amount,
            currency: row.currency,
            status: row.status.parse()?,
            reference: row.reference,
            refund_of: row.refund_of,
            created_at: row.created_at,
        })
    }
}

pub(crate) fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

pub(crate) const SEAT_INDEX: &str = "passengers_active_seat_idx";
pub(crate) const COMPLETED_PAYMENT_INDEX: &str = "payments_completed_idx";
pub(crate) const BOOKING_NUMBER_KEY: &str = "bookings_booking_number_key";

/// Name of the unique constraint `err` violated, if that is what it is.
pub(crate) fn unique_violation(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            db.constraint().map(str::to_string)
        }
        _ => None,
    }
}

pub(crate) fn backend(err: sqlx::Error) -> StoreError {
    tracing::error!("Database error: {}", err);
    StoreError::Backend(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use skybook_core::{BookingStatus, FlightStatus, SeatClass};

    #[test]
    fn test_rows_parse_closed_enums() {
        let now = Utc::now();
        let row = BookingRow {
            id: Uuid::new_v4(),
            booking_number: "SBQ7K2MX".to_string(),
            client_id: "client-1".to_string(),
            flight_id: Uuid::new_v4(),
            status: "confirmed".to_string(),
            support: true,
            fast_track: false,
            created_at: now,
            updated_at: now,
        };
        let booking = Booking::try_from(row).unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);

        let seat = Seat::try_from(SeatRow {
            id: Uuid::new_v4(),
            airplane_id: Uuid::new_v4(),
            seat_number: "3C".to_string(),
            class: "Premium Economy".to_string(),
            price: 42_000,
            currency: "USD".to_string(),
        })
        .unwrap();
        assert_eq!(seat.class, SeatClass::PremiumEconomy);

        let flight = Flight::try_from(FlightRow {
            id: Uuid::new_v4(),
            flight_number: "SB7".to_string(),
            departure_time: now,
            arrival_time: now,
            status: "Boarding".to_string(),
            airplane_id: Uuid::new_v4(),
            origin_airport_id: Uuid::new_v4(),
            destination_airport_id: Uuid::new_v4(),
        })
        .unwrap();
        assert_eq!(flight.status, FlightStatus::Boarding);
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let row = PaymentRow {
            id: Uuid::new_v4(),
            booking_id: Uuid::new_v4(),
            amount: 100,
            currency: "USD".to_string(),
            status: "SUCCEEDED".to_string(),
            reference: None,
            refund_of: None,
            created_at: Utc::now(),
        };
        assert!(matches!(Payment::try_from(row), Err(StoreError::Transition(_))));
    }
}

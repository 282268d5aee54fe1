use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Booking, Flight, Money, Passenger, Payment, Seat, ServiceFlags};
use crate::status::{BookingStatus, TransitionError};

/// Failures a store reports. Every backend translates its driver errors into
/// these before they reach the booking services.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("flight {0} not found")]
    FlightNotFound(Uuid),

    #[error("booking {0} not found")]
    BookingNotFound(Uuid),

    #[error("passenger {0} not found")]
    PassengerNotFound(Uuid),

    #[error("seats already claimed on this flight: {0:?}")]
    SeatTaken(Vec<Uuid>),

    #[error("booking {booking_id} is {status}")]
    BookingClosed {
        booking_id: Uuid,
        status: BookingStatus,
    },

    #[error("booking {booking_id} is {status}, not pending")]
    NotPending {
        booking_id: Uuid,
        status: BookingStatus,
    },

    #[error("booking {0} already has a completed payment")]
    PaymentExists(Uuid),

    #[error("booking {0} has no completed payment")]
    NoCompletedPayment(Uuid),

    #[error("payment of {provided} does not match booking cost {expected}")]
    AmountMismatch { provided: Money, expected: Money },

    #[error("passenger {passenger_id} is the only passenger of booking {booking_id}")]
    LastPassenger { booking_id: Uuid, passenger_id: Uuid },

    #[error("booking number {0} already exists")]
    DuplicateBookingNumber(String),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("inconsistent data: {0}")]
    Inconsistent(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of the refund transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefundRecord {
    /// The reversed payment, now `refunded`
    pub original: Payment,
    /// The new negative ledger row
    pub refund: Payment,
    /// The booking after the refund, now `cancelled`
    pub booking: Booking,
}

/// Read-only access to flights and airplane seat layouts.
#[async_trait]
pub trait FlightDirectory: Send + Sync {
    async fn flight(&self, flight_id: Uuid) -> StoreResult<Option<Flight>>;

    /// Every seat in the airplane's layout, ordered by seat number
    async fn airplane_seats(&self, airplane_id: Uuid) -> StoreResult<Vec<Seat>>;

    /// The subset of `seat_ids` that exist. Unknown ids are silently skipped.
    async fn seats(&self, seat_ids: &[Uuid]) -> StoreResult<Vec<Seat>>;
}

/// Transactional persistence for bookings, passengers and payments.
///
/// Every mutating method is one atomic unit: it either commits all of its
/// writes or none. Methods that claim a seat re-check occupancy inside that
/// unit and return [`StoreError::SeatTaken`] when another active passenger on
/// the same flight already holds it. Methods that mutate a booking re-read it
/// under lock and refuse to touch a booking in a terminal status.
#[async_trait]
pub trait BookingStore: FlightDirectory {
    /// Which of `seat_ids` are held by an active passenger on the flight
    async fn occupied_seats(&self, flight_id: Uuid, seat_ids: &[Uuid]) -> StoreResult<Vec<Uuid>>;

    async fn insert_booking(&self, booking: &Booking, passengers: &[Passenger]) -> StoreResult<()>;

    async fn booking(&self, booking_id: Uuid) -> StoreResult<Option<Booking>>;

    async fn bookings_for_client(&self, client_id: &str) -> StoreResult<Vec<Booking>>;

    async fn passengers(&self, booking_id: Uuid) -> StoreResult<Vec<Passenger>>;

    async fn update_services(
        &self,
        booking_id: Uuid,
        services: ServiceFlags,
        now: DateTime<Utc>,
    ) -> StoreResult<Booking>;

    /// Move a passenger to `seat_id`, releasing the old seat
    async fn change_seat(
        &self,
        booking_id: Uuid,
        passenger_id: Uuid,
        seat_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Passenger>;

    async fn add_passenger(&self, passenger: &Passenger, now: DateTime<Utc>) -> StoreResult<()>;

    /// Fails with [`StoreError::LastPassenger`] rather than leave a booking empty
    async fn remove_passenger(
        &self,
        booking_id: Uuid,
        passenger_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<()>;

    async fn payments(&self, booking_id: Uuid) -> StoreResult<Vec<Payment>>;

    /// Insert a `completed` payment and confirm the booking. The booking must be
    /// pending, have no completed payment, and its cost (recomputed inside
    /// the transaction) must equal the payment's amount and currency.
    async fn record_payment(&self, payment: &Payment) -> StoreResult<Booking>;

    /// Append a `failed` payment row. Booking status is untouched. Failed rows
    /// move no money: the amount is stored as zero and the attempted charge is
    /// described by `reference`.
    async fn record_failed_payment(&self, payment: &Payment) -> StoreResult<()>;

    /// Reverse the booking's completed payment: append the negated row, mark
    /// the original `refunded`, cancel the booking and release its seats.
    async fn record_refund(
        &self,
        booking_id: Uuid,
        refund_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<RefundRecord>;

    /// Cancel a booking with no completed payment and release its seats
    async fn cancel_unpaid(&self, booking_id: Uuid, now: DateTime<Utc>) -> StoreResult<Booking>;

    /// `confirmed -> completed`
    async fn complete_booking(&self, booking_id: Uuid, now: DateTime<Utc>) -> StoreResult<Booking>;
}

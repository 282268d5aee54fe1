use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::{FlightStatus, Money};
use crate::repository::StoreError;
use crate::status::{BookingStatus, TransitionError};

/// Coarse classification every caller maps to a response shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    Validation,
    Conflict,
    PolicyDenied,
    AccessDenied,
    Internal,
}

/// A single field-level problem with one passenger of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassengerIssue {
    /// Position of the passenger in the request
    pub index: usize,
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BookingError {
    #[error("Flight not found: {0}")]
    FlightNotFound(Uuid),

    #[error("Booking not found: {0}")]
    BookingNotFound(Uuid),

    #[error("Passenger not found: {0}")]
    PassengerNotFound(Uuid),

    #[error("Flight {flight_id} is {status} and not open for booking")]
    FlightNotAvailable {
        flight_id: Uuid,
        status: FlightStatus,
    },

    #[error("Flight {flight_id} departed at {departure_time}")]
    FlightDeparted {
        flight_id: Uuid,
        departure_time: DateTime<Utc>,
    },

    #[error("Passenger validation failed ({} issues)", .0.len())]
    PassengerValidation(Vec<PassengerIssue>),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Seats not available: {0:?}")]
    SeatConflict(Vec<Uuid>),

    #[error("Invalid payment amount: provided {provided}, expected {expected}")]
    InvalidPaymentAmount { provided: Money, expected: Money },

    #[error("Booking {0} already has a completed payment")]
    PaymentAlreadyCompleted(Uuid),

    #[error("Booking {booking_id} is {status}, payment requires a pending booking")]
    BookingNotPending {
        booking_id: Uuid,
        status: BookingStatus,
    },

    #[error("Booking {0} has no completed payment to refund")]
    NoRefundablePayment(Uuid),

    #[error("Booking {0} is already cancelled")]
    AlreadyCancelled(Uuid),

    #[error("Booking {booking_id} cannot be cancelled: {reason}")]
    CancellationNotAllowed { booking_id: Uuid, reason: String },

    #[error("Booking {booking_id} cannot be modified: {reason}")]
    ModificationNotAllowed { booking_id: Uuid, reason: String },

    #[error("Passenger {passenger_id} is the last one on booking {booking_id}; cancel the booking instead")]
    LastPassenger { booking_id: Uuid, passenger_id: Uuid },

    #[error("Flight {flight_id} has not been serviced yet ({status})")]
    FlightNotServiced {
        flight_id: Uuid,
        status: FlightStatus,
    },

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("Booking number collision: {0}")]
    BookingNumberCollision(String),

    #[error("Payment declined: {0}")]
    PaymentDeclined(String),

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Access denied to booking {0}")]
    AccessDenied(Uuid),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type BookingResult<T> = Result<T, BookingError>;

impl BookingError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            BookingError::FlightNotFound(_) => "FLIGHT_NOT_FOUND",
            BookingError::BookingNotFound(_) => "BOOKING_NOT_FOUND",
            BookingError::PassengerNotFound(_) => "PASSENGER_NOT_FOUND",
            BookingError::FlightNotAvailable { .. } => "FLIGHT_NOT_AVAILABLE",
            BookingError::FlightDeparted { .. } => "FLIGHT_DEPARTED",
            BookingError::PassengerValidation(_) => "PASSENGER_VALIDATION_ERROR",
            BookingError::InvalidInput(_) => "INVALID_INPUT",
            BookingError::SeatConflict(_) => "SEAT_CONFLICT",
            BookingError::InvalidPaymentAmount { .. } => "INVALID_PAYMENT_AMOUNT",
            BookingError::PaymentAlreadyCompleted(_) => "PAYMENT_ALREADY_COMPLETED",
            BookingError::BookingNotPending { .. } => "BOOKING_NOT_PENDING",
            BookingError::NoRefundablePayment(_) => "NO_REFUNDABLE_PAYMENT",
            BookingError::AlreadyCancelled(_) => "ALREADY_CANCELLED",
            BookingError::CancellationNotAllowed { .. } => "CANCELLATION_NOT_ALLOWED",
            BookingError::ModificationNotAllowed { .. } => "MODIFICATION_NOT_ALLOWED",
            BookingError::LastPassenger { .. } => "LAST_PASSENGER",
            BookingError::FlightNotServiced { .. } => "FLIGHT_NOT_SERVICED",
            BookingError::InvalidTransition(_) => "INVALID_TRANSITION",
            BookingError::BookingNumberCollision(_) => "BOOKING_NUMBER_COLLISION",
            BookingError::PaymentDeclined(_) => "PAYMENT_DECLINED",
            BookingError::Gateway(_) => "PAYMENT_GATEWAY_ERROR",
            BookingError::AccessDenied(_) => "ACCESS_DENIED",
            BookingError::Storage(_) => "STORAGE_ERROR",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BookingError::FlightNotFound(_)
            | BookingError::BookingNotFound(_)
            | BookingError::PassengerNotFound(_) => ErrorKind::NotFound,

            BookingError::PassengerValidation(_) | BookingError::InvalidInput(_) => {
                ErrorKind::Validation
            }

            BookingError::SeatConflict(_)
            | BookingError::PaymentAlreadyCompleted(_)
            | BookingError::BookingNotPending { .. }
            | BookingError::NoRefundablePayment(_)
            | BookingError::AlreadyCancelled(_)
            | BookingError::InvalidTransition(_)
            | BookingError::BookingNumberCollision(_) => ErrorKind::Conflict,

            BookingError::FlightNotAvailable { .. }
            | BookingError::FlightDeparted { .. }
            | BookingError::InvalidPaymentAmount { .. }
            | BookingError::CancellationNotAllowed { .. }
            | BookingError::ModificationNotAllowed { .. }
            | BookingError::LastPassenger { .. }
            | BookingError::FlightNotServiced { .. }
            | BookingError::PaymentDeclined(_) => ErrorKind::PolicyDenied,

            BookingError::AccessDenied(_) => ErrorKind::AccessDenied,

            BookingError::Gateway(_) | BookingError::Storage(_) => ErrorKind::Internal,
        }
    }

    /// Structured payload for callers that reconcile client-side state
    /// (offending seats, both payment amounts, per-passenger issues).
    pub fn details(&self) -> Option<Value> {
        match self {
            BookingError::SeatConflict(seat_ids) => Some(json!({ "seat_ids": seat_ids })),
            BookingError::PassengerValidation(issues) => Some(json!({ "issues": issues })),
            BookingError::InvalidPaymentAmount { provided, expected } => Some(json!({
                "provided": provided,
                "expected": expected,
            })),
            BookingError::FlightNotAvailable { status, .. } => Some(json!({ "flight_status": status })),
            BookingError::FlightDeparted { departure_time, .. } => {
                Some(json!({ "departure_time": departure_time }))
            }
            BookingError::BookingNotPending { status, .. } => Some(json!({ "booking_status": status })),
            _ => None,
        }
    }
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::FlightNotFound(id) => BookingError::FlightNotFound(id),
            StoreError::BookingNotFound(id) => BookingError::BookingNotFound(id),
            StoreError::PassengerNotFound(id) => BookingError::PassengerNotFound(id),
            StoreError::SeatTaken(seat_ids) => BookingError::SeatConflict(seat_ids),
            StoreError::BookingClosed { booking_id, status } => match status {
                BookingStatus::Cancelled => BookingError::AlreadyCancelled(booking_id),
                other => BookingError::ModificationNotAllowed {
                    booking_id,
                    reason: format!("booking is {}", other),
                },
            },
            StoreError::NotPending { booking_id, status } => {
                BookingError::BookingNotPending { booking_id, status }
            }
            StoreError::PaymentExists(id) => BookingError::PaymentAlreadyCompleted(id),
            StoreError::NoCompletedPayment(id) => BookingError::NoRefundablePayment(id),
            StoreError::AmountMismatch { provided, expected } => {
                BookingError::InvalidPaymentAmount { provided, expected }
            }
            StoreError::LastPassenger {
                booking_id,
                passenger_id,
            } => BookingError::LastPassenger {
                booking_id,
                passenger_id,
            },
            StoreError::DuplicateBookingNumber(number) => {
                BookingError::BookingNumberCollision(number)
            }
            StoreError::Transition(err) => BookingError::InvalidTransition(err),
            StoreError::Inconsistent(msg) | StoreError::Backend(msg) => BookingError::Storage(msg),
        }
    }
}

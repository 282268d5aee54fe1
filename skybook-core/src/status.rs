use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Booking lifecycle
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

/// Things that can happen to a booking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingEvent {
    PaymentCompleted,
    FlightServiced,
    Cancel,
    Refund,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    /// The full transition table. Anything not listed is rejected.
    pub fn apply(self, event: BookingEvent) -> Result<BookingStatus, TransitionError> {
        match (self, event) {
            (BookingStatus::Pending, BookingEvent::PaymentCompleted) => Ok(BookingStatus::Confirmed),
            (BookingStatus::Confirmed, BookingEvent::FlightServiced) => Ok(BookingStatus::Completed),
            (BookingStatus::Pending, BookingEvent::Cancel) => Ok(BookingStatus::Cancelled),
            (BookingStatus::Confirmed, BookingEvent::Refund) => Ok(BookingStatus::Cancelled),
            (from, event) => Err(TransitionError::Booking { from, event }),
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = TransitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(TransitionError::UnknownStatus(other.to_string())),
        }
    }
}

// ============================================================================
// Payment lifecycle
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Refunded,
    Failed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentEvent {
    Captured,
    Declined,
    Reversed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn apply(self, event: PaymentEvent) -> Result<PaymentStatus, TransitionError> {
        match (self, event) {
            (PaymentStatus::Pending, PaymentEvent::Captured) => Ok(PaymentStatus::Completed),
            (PaymentStatus::Pending, PaymentEvent::Declined) => Ok(PaymentStatus::Failed),
            (PaymentStatus::Completed, PaymentEvent::Reversed) => Ok(PaymentStatus::Refunded),
            (from, event) => Err(TransitionError::Payment { from, event }),
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = TransitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "refunded" => Ok(PaymentStatus::Refunded),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(TransitionError::UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("booking in status {from} cannot accept {event:?}")]
    Booking {
        from: BookingStatus,
        event: BookingEvent,
    },

    #[error("payment in status {from} cannot accept {event:?}")]
    Payment {
        from: PaymentStatus,
        event: PaymentEvent,
    },

    #[error("unknown status `{0}`")]
    UnknownStatus(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_lifecycle() {
        let status = BookingStatus::Pending;
        let status = status.apply(BookingEvent::PaymentCompleted).unwrap();
        assert_eq!(status, BookingStatus::Confirmed);
        let status = status.apply(BookingEvent::FlightServiced).unwrap();
        assert_eq!(status, BookingStatus::Completed);
        assert!(status.is_terminal());
    }

    #[test]
    fn test_booking_cancel_paths() {
        assert_eq!(
            BookingStatus::Pending.apply(BookingEvent::Cancel),
            Ok(BookingStatus::Cancelled)
        );
        assert_eq!(
            BookingStatus::Confirmed.apply(BookingEvent::Refund),
            Ok(BookingStatus::Cancelled)
        );
        // A paid booking only leaves `confirmed` through a refund
        assert!(BookingStatus::Confirmed.apply(BookingEvent::Cancel).is_err());
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        let events = [
            BookingEvent::PaymentCompleted,
            BookingEvent::FlightServiced,
            BookingEvent::Cancel,
            BookingEvent::Refund,
        ];
        for terminal in [BookingStatus::Cancelled, BookingStatus::Completed] {
            for event in events {
                assert_eq!(
                    terminal.apply(event),
                    Err(TransitionError::Booking { from: terminal, event })
                );
            }
        }
    }

    #[test]
    fn test_pending_cannot_skip_to_completed() {
        assert!(BookingStatus::Pending.apply(BookingEvent::FlightServiced).is_err());
        assert!(BookingStatus::Pending.apply(BookingEvent::Refund).is_err());
    }

    #[test]
    fn test_payment_transitions() {
        assert_eq!(
            PaymentStatus::Pending.apply(PaymentEvent::Captured),
            Ok(PaymentStatus::Completed)
        );
        assert_eq!(
            PaymentStatus::Pending.apply(PaymentEvent::Declined),
            Ok(PaymentStatus::Failed)
        );
        assert_eq!(
            PaymentStatus::Completed.apply(PaymentEvent::Reversed),
            Ok(PaymentStatus::Refunded)
        );
        assert!(PaymentStatus::Refunded.apply(PaymentEvent::Reversed).is_err());
        assert!(PaymentStatus::Failed.apply(PaymentEvent::Captured).is_err());
    }

    #[test]
    fn test_status_strings() {
        assert_eq!("confirmed".parse::<BookingStatus>(), Ok(BookingStatus::Confirmed));
        assert_eq!("refunded".parse::<PaymentStatus>(), Ok(PaymentStatus::Refunded));
        assert_eq!(
            "CONFIRMED".parse::<BookingStatus>(),
            Err(TransitionError::UnknownStatus("CONFIRMED".to_string()))
        );
        assert_eq!(
            serde_json::to_string(&BookingStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
    }
}

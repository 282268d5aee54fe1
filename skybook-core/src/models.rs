use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::pii::Masked;
use crate::status::{BookingStatus, PaymentStatus, TransitionError};

// ============================================================================
// Flight directory (read-only to the booking core)
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FlightStatus {
    Scheduled,
    Delayed,
    Cancelled,
    Boarding,
    Departed,
    Arrived,
    Completed,
}

impl FlightStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlightStatus::Scheduled => "Scheduled",
            FlightStatus::Delayed => "Delayed",
            FlightStatus::Cancelled => "Cancelled",
            FlightStatus::Boarding => "Boarding",
            FlightStatus::Departed => "Departed",
            FlightStatus::Arrived => "Arrived",
            FlightStatus::Completed => "Completed",
        }
    }

    /// The flight has been flown and its bookings can be closed out.
    pub fn is_serviced(&self) -> bool {
        matches!(self, FlightStatus::Arrived | FlightStatus::Completed)
    }
}

impl fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlightStatus {
    type Err = TransitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Scheduled" => Ok(FlightStatus::Scheduled),
            "Delayed" => Ok(FlightStatus::Delayed),
            "Cancelled" => Ok(FlightStatus::Cancelled),
            "Boarding" => Ok(FlightStatus::Boarding),
            "Departed" => Ok(FlightStatus::Departed),
            "Arrived" => Ok(FlightStatus::Arrived),
            "Completed" => Ok(FlightStatus::Completed),
            other => Err(TransitionError::UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Flight {
    pub id: Uuid,
    pub flight_number: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub status: FlightStatus,
    pub airplane_id: Uuid,
    pub origin_airport_id: Uuid,
    pub destination_airport_id: Uuid,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SeatClass {
    Economy,
    #[serde(rename = "Premium Economy")]
    PremiumEconomy,
    Business,
    First,
}

impl SeatClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatClass::Economy => "Economy",
            SeatClass::PremiumEconomy => "Premium Economy",
            SeatClass::Business => "Business",
            SeatClass::First => "First",
        }
    }
}

impl FromStr for SeatClass {
    type Err = TransitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Economy" => Ok(SeatClass::Economy),
            "Premium Economy" => Ok(SeatClass::PremiumEconomy),
            "Business" => Ok(SeatClass::Business),
            "First" => Ok(SeatClass::First),
            other => Err(TransitionError::UnknownStatus(other.to_string())),
        }
    }
}

/// A seat in an airplane's fixed layout. Not flight specific: occupancy on a
/// given flight comes from that flight's active passengers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Seat {
    pub id: Uuid,
    pub airplane_id: Uuid,
    pub seat_number: String,
    pub class: SeatClass,
    /// Minor currency units
    pub price: i64,
    pub currency: String,
}

impl Seat {
    pub fn price(&self) -> Money {
        Money::new(self.price, &self.currency)
    }
}

// ============================================================================
// Money
// ============================================================================

/// An amount in minor units. Two amounts are equal only when both the figure
/// and the currency match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Money {
    pub amount: i64,
    pub currency: String,
}

impl Money {
    pub fn new(amount: i64, currency: &str) -> Self {
        Self {
            amount,
            currency: currency.to_string(),
        }
    }

    pub fn negated(&self) -> Self {
        Self {
            amount: -self.amount,
            currency: self.currency.clone(),
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

// ============================================================================
// Bookings
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Booking {
    pub id: Uuid,
    pub booking_number: String,
    pub client_id: String,
    pub flight_id: Uuid,
    pub status: BookingStatus,
    pub support: bool,
    pub fast_track: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceFlags {
    pub support: bool,
    pub fast_track: bool,
}

impl Booking {
    pub fn services(&self) -> ServiceFlags {
        ServiceFlags {
            support: self.support,
            fast_track: self.fast_track,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Passenger {
    pub id: Uuid,
    pub booking_id: Uuid,
    /// Always the owning booking's flight
    pub flight_id: Uuid,
    pub seat_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub passport_number: Masked<String>,
    pub nationality: String,
}

/// Passenger details as they arrive from a caller, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassengerInput {
    pub first_name: String,
    pub last_name: String,
    /// `YYYY-MM-DD`
    pub date_of_birth: String,
    pub passport_number: Masked<String>,
    pub nationality: String,
    pub seat_id: Uuid,
}

// ============================================================================
// Payments
// ============================================================================

/// One ledger row. Refunds are separate rows with a negative amount that point
/// back at the payment they reverse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub reference: Option<String>,
    pub refund_of: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn money(&self) -> Money {
        Money::new(self.amount, &self.currency)
    }

    pub fn is_refund(&self) -> bool {
        self.refund_of.is_some()
    }
}

use std::collections::HashMap;
use uuid::Uuid;

use crate::error::BookingError;
use crate::models::{Money, Passenger, Seat};
use crate::repository::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CostError {
    #[error("booking has no passengers")]
    NoPassengers,

    #[error("seat {0} referenced by a passenger does not exist")]
    UnknownSeat(Uuid),

    #[error("seat prices mix currencies {0} and {1}")]
    MixedCurrencies(String, String),

    #[error("booking cost overflows in {0}")]
    Overflow(String),
}

/// Sum of the seat prices held by `passengers`. `seats` must contain every
/// seat they reference; extra seats are ignored.
pub fn booking_cost(passengers: &[Passenger], seats: &[Seat]) -> Result<Money, CostError> {
    let by_id: HashMap<Uuid, &Seat> = seats.iter().map(|s| (s.id, s)).collect();

    let mut total: Option<Money> = None;
    for passenger in passengers {
        let seat = by_id
            .get(&passenger.seat_id)
            .ok_or(CostError::UnknownSeat(passenger.seat_id))?;

        total = Some(match total {
            None => seat.price(),
            Some(mut acc) => {
                if acc.currency != seat.currency {
                    return Err(CostError::MixedCurrencies(acc.currency, seat.currency.clone()));
                }
                acc.amount = acc
                    .amount
                    .checked_add(seat.price)
                    .ok_or_else(|| CostError::Overflow(acc.currency.clone()))?;
                acc
            }
        });
    }

    total.ok_or(CostError::NoPassengers)
}

impl From<CostError> for StoreError {
    fn from(err: CostError) -> Self {
        StoreError::Inconsistent(err.to_string())
    }
}

impl From<CostError> for BookingError {
    fn from(err: CostError) -> Self {
        BookingError::Storage(err.to_string())
    }
}

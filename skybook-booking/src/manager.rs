use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use skybook_core::validation::validate_passengers;
use skybook_core::{
    Booking, BookingError, BookingResult, BookingRules, BookingStatus, BookingStore, Clock,
    Flight, FlightStatus, Money, Passenger, PassengerInput, Payment, PaymentStatus, StoreError,
};

use crate::cost::CostCalculator;
use crate::inventory::SeatInventory;
use crate::orchestrator::PaymentOrchestrator;

const BOOKING_NUMBER_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const BOOKING_NUMBER_LEN: usize = 6;
const BOOKING_NUMBER_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingRequest {
    pub flight_id: Uuid,
    #[serde(default)]
    pub support: bool,
    #[serde(default)]
    pub fast_track: bool,
    pub passengers: Vec<PassengerInput>,
}

/// A booking as committed, with its authoritative cost.
#[derive(Debug, Clone, Serialize)]
pub struct BookingSnapshot {
    pub booking: Booking,
    pub passengers: Vec<Passenger>,
    pub cost: Money,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingDetails {
    pub booking: Booking,
    pub passengers: Vec<Passenger>,
    pub cost: Money,
    pub payments: Vec<Payment>,
    /// Net of charges and refunds
    pub amount_paid: Money,
    pub balance_due: Money,
    pub can_modify: bool,
}

/// Creates, reads and closes out bookings. Modifications live in
/// `changes.rs` and cancellation in `cancellation.rs`.
pub struct BookingManager {
    pub(crate) store: Arc<dyn BookingStore>,
    pub(crate) inventory: SeatInventory,
    pub(crate) costs: CostCalculator,
    pub(crate) payments: Arc<PaymentOrchestrator>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) rules: BookingRules,
}

impl BookingManager {
    pub fn new(
        store: Arc<dyn BookingStore>,
        payments: Arc<PaymentOrchestrator>,
        clock: Arc<dyn Clock>,
        rules: BookingRules,
    ) -> Self {
        Self {
            inventory: SeatInventory::new(store.clone()),
            costs: CostCalculator::new(store.clone()),
            store,
            payments,
            clock,
            rules,
        }
    }

    /// Create a `pending` booking with one passenger per entry.
    ///
    /// Checks run in a fixed order and the first failure wins: flight exists,
    /// flight is open and in the future, passenger records are valid, every
    /// seat is free, no seat is requested twice. The store re-checks seats in
    /// the same unit of work that inserts them.
    pub async fn create_booking(
        &self,
        client_id: &str,
        request: CreateBookingRequest,
    ) -> BookingResult<BookingSnapshot> {
        let now = self.clock.now();

        let flight = self.flight(request.flight_id).await?;
        if flight.status != FlightStatus::Scheduled {
            return Err(BookingError::FlightNotAvailable {
                flight_id: flight.id,
                status: flight.status,
            });
        }
        if flight.departure_time <= now {
            return Err(BookingError::FlightDeparted {
                flight_id: flight.id,
                departure_time: flight.departure_time,
            });
        }

        let dates = validate_passengers(&request.passengers, &self.rules, now.date_naive())?;

        let seat_ids: Vec<Uuid> = request.passengers.iter().map(|p| p.seat_id).collect();
        let taken = self.inventory.conflicts(&flight, &seat_ids).await?;
        if !taken.is_empty() {
            warn!("Seats {:?} unavailable on flight {}", taken, flight.flight_number);
            return Err(BookingError::SeatConflict(taken));
        }
        let repeated = repeated_seats(&seat_ids);
        if !repeated.is_empty() {
            return Err(BookingError::SeatConflict(repeated));
        }

        let mut attempts = 0;
        loop {
            attempts += 1;
            let booking = Booking {
                id: Uuid::new_v4(),
                booking_number: generate_booking_number(&self.rules.booking_number_prefix),
                client_id: client_id.to_string(),
                flight_id: flight.id,
                status: BookingStatus::Pending,
                support: request.support,
                fast_track: request.fast_track,
                created_at: now,
                updated_at: now,
            };
            let passengers: Vec<Passenger> = request
                .passengers
                .iter()
                .zip(&dates)
                .map(|(input, dob)| new_passenger(&booking, input, *dob))
                .collect();

            match self.store.insert_booking(&booking, &passengers).await {
                Ok(()) => {
                    let cost = self.costs.cost_of(&passengers).await?;
                    info!(
                        "Booking {} created on flight {} for {} passenger(s), cost {}",
                        booking.booking_number,
                        flight.flight_number,
                        passengers.len(),
                        cost
                    );
                    return Ok(BookingSnapshot {
                        booking,
                        passengers,
                        cost,
                    });
                }
                Err(StoreError::DuplicateBookingNumber(number))
                    if attempts < BOOKING_NUMBER_ATTEMPTS =>
                {
                    warn!("Booking number {} already taken, regenerating", number);
                }
                Err(StoreError::SeatTaken(seats)) => {
                    warn!(
                        "Seats {:?} claimed concurrently on flight {}",
                        seats, flight.flight_number
                    );
                    return Err(BookingError::SeatConflict(seats));
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    pub async fn get_booking(&self, client_id: &str, booking_id: Uuid) -> BookingResult<BookingDetails> {
        let booking = self.load_owned_booking(client_id, booking_id).await?;
        let flight = self.flight(booking.flight_id).await?;
        let passengers = self.store.passengers(booking.id).await?;
        let cost = self.costs.cost_of(&passengers).await?;
        let payments = self.payments.payments(client_id, booking.id).await?;

        let paid: i64 = payments
            .iter()
            .filter(|p| matches!(p.status, PaymentStatus::Completed | PaymentStatus::Refunded))
            .map(|p| p.amount)
            .sum();
        let amount_paid = Money::new(paid, &cost.currency);
        let balance_due = if booking.status == BookingStatus::Cancelled {
            Money::new(0, &cost.currency)
        } else {
            Money::new(cost.amount - paid, &cost.currency)
        };
        let can_modify = self.rules.can_modify(&booking, &flight, self.clock.now());

        Ok(BookingDetails {
            booking,
            passengers,
            cost,
            payments,
            amount_paid,
            balance_due,
            can_modify,
        })
    }

    /// The caller's bookings, newest first.
    pub async fn list_bookings(&self, client_id: &str) -> BookingResult<Vec<Booking>> {
        Ok(self.store.bookings_for_client(client_id).await?)
    }

    pub async fn booking_cost(&self, client_id: &str, booking_id: Uuid) -> BookingResult<Money> {
        let booking = self.load_owned_booking(client_id, booking_id).await?;
        self.costs.booking_cost(booking.id).await
    }

    pub async fn can_modify(&self, client_id: &str, booking_id: Uuid) -> BookingResult<bool> {
        let booking = self.load_owned_booking(client_id, booking_id).await?;
        let flight = self.flight(booking.flight_id).await?;
        Ok(self.rules.can_modify(&booking, &flight, self.clock.now()))
    }

    /// Operator flow: close out a confirmed booking once its flight has flown.
    pub async fn complete_booking(&self, booking_id: Uuid) -> BookingResult<Booking> {
        let booking = self
            .store
            .booking(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound(booking_id))?;
        let flight = self.flight(booking.flight_id).await?;
        if !flight.status.is_serviced() {
            return Err(BookingError::FlightNotServiced {
                flight_id: flight.id,
                status: flight.status,
            });
        }

        let completed = self
            .store
            .complete_booking(booking.id, self.clock.now())
            .await?;
        info!("Booking {} completed", completed.booking_number);
        Ok(completed)
    }

    pub(crate) async fn load_owned_booking(
        &self,
        client_id: &str,
        booking_id: Uuid,
    ) -> BookingResult<Booking> {
        load_owned_booking(self.store.as_ref(), client_id, booking_id).await
    }

    pub(crate) async fn flight(&self, flight_id: Uuid) -> BookingResult<Flight> {
        self.store
            .flight(flight_id)
            .await?
            .ok_or(BookingError::FlightNotFound(flight_id))
    }
}

pub(crate) async fn load_owned_booking(
    store: &dyn BookingStore,
    client_id: &str,
    booking_id: Uuid,
) -> BookingResult<Booking> {
    let booking = store
        .booking(booking_id)
        .await?
        .ok_or(BookingError::BookingNotFound(booking_id))?;
    if booking.client_id != client_id {
        return Err(BookingError::AccessDenied(booking_id));
    }
    Ok(booking)
}

pub(crate) fn new_passenger(
    booking: &Booking,
    input: &PassengerInput,
    date_of_birth: chrono::NaiveDate,
) -> Passenger {
    Passenger {
        id: Uuid::new_v4(),
        booking_id: booking.id,
        flight_id: booking.flight_id,
        seat_id: input.seat_id,
        first_name: input.first_name.trim().to_string(),
        last_name: input.last_name.trim().to_string(),
        date_of_birth,
        passport_number: input.passport_number.clone(),
        nationality: input.nationality.trim().to_string(),
    }
}

/// Seats requested by more than one passenger, in first-seen order.
fn repeated_seats(seat_ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    let mut repeated = Vec::new();
    for id in seat_ids {
        if !seen.insert(*id) && !repeated.contains(id) {
            repeated.push(*id);
        }
    }
    repeated
}

/// `prefix` followed by six characters that avoid the easily confused
/// `0`/`O` and `1`/`I`.
pub fn generate_booking_number(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..BOOKING_NUMBER_LEN)
        .map(|_| BOOKING_NUMBER_ALPHABET[rng.gen_range(0..BOOKING_NUMBER_ALPHABET.len())] as char)
        .collect();
    format!("{}{}", prefix, suffix)
}

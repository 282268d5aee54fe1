use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use skybook_core::cost::booking_cost;
use skybook_core::{
    Booking, BookingEvent, BookingStatus, BookingStore, Flight, FlightDirectory, FlightStatus,
    Money, Passenger, Payment, PaymentEvent, PaymentStatus, RefundRecord, Seat, ServiceFlags,
    StoreError, StoreResult,
};

#[derive(Debug, Clone)]
struct PassengerRow {
    passenger: Passenger,
    /// Cleared when the booking is cancelled, which frees the seat
    active: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    flights: HashMap<Uuid, Flight>,
    seats: HashMap<Uuid, Seat>,
    bookings: HashMap<Uuid, Booking>,
    passengers: Vec<PassengerRow>,
    payments: Vec<Payment>,
}

/// In-process store. Every operation runs under one mutex guard, so a seat
/// check and the write that claims it can never interleave with another
/// request's.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }

    pub fn insert_flight(&self, flight: Flight) -> StoreResult<()> {
        self.lock()?.flights.insert(flight.id, flight);
        Ok(())
    }

    pub fn insert_seat(&self, seat: Seat) -> StoreResult<()> {
        self.lock()?.seats.insert(seat.id, seat);
        Ok(())
    }

    pub fn set_flight_status(&self, flight_id: Uuid, status: FlightStatus) -> StoreResult<()> {
        let mut state = self.lock()?;
        let flight = state
            .flights
            .get_mut(&flight_id)
            .ok_or(StoreError::FlightNotFound(flight_id))?;
        flight.status = status;
        Ok(())
    }

    /// Reprice a seat in the airplane layout. Affects every flight flown by
    /// that airplane.
    pub fn set_seat_price(&self, seat_id: Uuid, price: i64) -> StoreResult<()> {
        let mut state = self.lock()?;
        let seat = state
            .seats
            .get_mut(&seat_id)
            .ok_or_else(|| StoreError::Inconsistent(format!("seat {} not found", seat_id)))?;
        seat.price = price;
        Ok(())
    }
}

impl MemoryState {
    fn flight(&self, flight_id: Uuid) -> StoreResult<&Flight> {
        self.flights
            .get(&flight_id)
            .ok_or(StoreError::FlightNotFound(flight_id))
    }

    fn booking(&self, booking_id: Uuid) -> StoreResult<&Booking> {
        self.bookings
            .get(&booking_id)
            .ok_or(StoreError::BookingNotFound(booking_id))
    }

    /// A booking that still accepts changes
    fn open_booking(&self, booking_id: Uuid) -> StoreResult<&Booking> {
        let booking = self.booking(booking_id)?;
        if booking.status.is_terminal() {
            return Err(StoreError::BookingClosed {
                booking_id,
                status: booking.status,
            });
        }
        Ok(booking)
    }

    fn touch(&mut self, booking_id: Uuid, now: DateTime<Utc>) {
        if let Some(booking) = self.bookings.get_mut(&booking_id) {
            booking.updated_at = now;
        }
    }

    /// Seats in `seat_ids` that cannot be claimed on `flight`: unknown, from
    /// another airplane, already held by an active passenger, or requested
    /// twice. `moving` is a passenger whose own current seat does not count.
    fn unclaimable(&self, flight: &Flight, seat_ids: &[Uuid], moving: Option<Uuid>) -> Vec<Uuid> {
        let held: HashSet<Uuid> = self
            .passengers
            .iter()
            .filter(|row| row.active && row.passenger.flight_id == flight.id)
            .filter(|row| Some(row.passenger.id) != moving)
            .map(|row| row.passenger.seat_id)
            .collect();

        let mut seen = HashSet::new();
        let mut taken = Vec::new();
        for seat_id in seat_ids {
            let exists = self
                .seats
                .get(seat_id)
                .is_some_and(|seat| seat.airplane_id == flight.airplane_id);
            let duplicate = !seen.insert(*seat_id);
            if (!exists || held.contains(seat_id) || duplicate) && !taken.contains(seat_id) {
                taken.push(*seat_id);
            }
        }
        taken
    }

    fn booking_passengers(&self, booking_id: Uuid) -> Vec<Passenger> {
        self.passengers
            .iter()
            .filter(|row| row.passenger.booking_id == booking_id)
            .map(|row| row.passenger.clone())
            .collect()
    }

    fn cost(&self, booking_id: Uuid) -> StoreResult<Money> {
        let passengers = self.booking_passengers(booking_id);
        let seats: Vec<Seat> = passengers
            .iter()
            .filter_map(|p| self.seats.get(&p.seat_id).cloned())
            .collect();
        Ok(booking_cost(&passengers, &seats)?)
    }

    fn completed_payment(&self, booking_id: Uuid) -> Option<usize> {
        self.payments
            .iter()
            .position(|p| p.booking_id == booking_id && p.status == PaymentStatus::Completed)
    }

    fn release_seats(&mut self, booking_id: Uuid) {
        for row in self
            .passengers
            .iter_mut()
            .filter(|row| row.passenger.booking_id == booking_id)
        {
            row.active = false;
        }
    }

    fn set_status(
        &mut self,
        booking_id: Uuid,
        status: BookingStatus,
        now: DateTime<Utc>,
    ) -> StoreResult<Booking> {
        let booking = self
            .bookings
            .get_mut(&booking_id)
            .ok_or(StoreError::BookingNotFound(booking_id))?;
        booking.status = status;
        booking.updated_at = now;
        Ok(booking.clone())
    }
}

#[async_trait]
impl FlightDirectory for MemoryStore {
    async fn flight(&self, flight_id: Uuid) -> StoreResult<Option<Flight>> {
        Ok(self.lock()?.flights.get(&flight_id).cloned())
    }

    async fn airplane_seats(&self, airplane_id: Uuid) -> StoreResult<Vec<Seat>> {
        let state = self.lock()?;
        let mut seats: Vec<Seat> = state
            .seats
            .values()
            .filter(|seat| seat.airplane_id == airplane_id)
            .cloned()
            .collect();
        seats.sort_by(|a, b| a.seat_number.cmp(&b.seat_number));
        Ok(seats)
    }

    async fn seats(&self, seat_ids: &[Uuid]) -> StoreResult<Vec<Seat>> {
        let state = self.lock()?;
        Ok(seat_ids
            .iter()
            .filter_map(|id| state.seats.get(id).cloned())
            .collect())
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn occupied_seats(&self, flight_id: Uuid, seat_ids: &[Uuid]) -> StoreResult<Vec<Uuid>> {
        let state = self.lock()?;
        let held: HashSet<Uuid> = state
            .passengers
            .iter()
            .filter(|row| row.active && row.passenger.flight_id == flight_id)
            .map(|row| row.passenger.seat_id)
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
        let mut state = self.lock()?;

        if state
            .bookings
            .values()
            .any(|b| b.booking_number == booking.booking_number)
        {
            return Err(StoreError::DuplicateBookingNumber(booking.booking_number.clone()));
        }

        let flight = state.flight(booking.flight_id)?;
        let seat_ids: Vec<Uuid> = passengers.iter().map(|p| p.seat_id).collect();
        let taken = state.unclaimable(flight, &seat_ids, None);
        if !taken.is_empty() {
            return Err(StoreError::SeatTaken(taken));
        }

        state.bookings.insert(booking.id, booking.clone());
        state.passengers.extend(passengers.iter().map(|p| PassengerRow {
            passenger: p.clone(),
            active: true,
        }));
        Ok(())
    }

    async fn booking(&self, booking_id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self.lock()?.bookings.get(&booking_id).cloned())
    }

    async fn bookings_for_client(&self, client_id: &str) -> StoreResult<Vec<Booking>> {
        let state = self.lock()?;
        let mut bookings: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| b.client_id == client_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn passengers(&self, booking_id: Uuid) -> StoreResult<Vec<Passenger>> {
        Ok(self.lock()?.booking_passengers(booking_id))
    }

    async fn update_services(
        &self,
        booking_id: Uuid,
        services: ServiceFlags,
        now: DateTime<Utc>,
    ) -> StoreResult<Booking> {
        let mut state = self.lock()?;
        state.open_booking(booking_id)?;
        let booking = state
            .bookings
            .get_mut(&booking_id)
            .ok_or(StoreError::BookingNotFound(booking_id))?;
        booking.support = services.support;
        booking.fast_track = services.fast_track;
        booking.updated_at = now;
        Ok(booking.clone())
    }

    async fn change_seat(
        &self,
        booking_id: Uuid,
        passenger_id: Uuid,
        seat_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Passenger> {
        let mut state = self.lock()?;
        let flight_id = state.open_booking(booking_id)?.flight_id;
        let index = state
            .passengers
            .iter()
            .position(|row| row.passenger.id == passenger_id && row.passenger.booking_id == booking_id)
            .ok_or(StoreError::PassengerNotFound(passenger_id))?;

        if state.passengers[index].passenger.seat_id != seat_id {
            let flight = state.flight(flight_id)?;
            let taken = state.unclaimable(flight, &[seat_id], Some(passenger_id));
            if !taken.is_empty() {
                return Err(StoreError::SeatTaken(taken));
            }
            state.passengers[index].passenger.seat_id = seat_id;
            state.touch(booking_id, now);
        }

        Ok(state.passengers[index].passenger.clone())
    }

    async fn add_passenger(&self, passenger: &Passenger, now: DateTime<Utc>) -> StoreResult<()> {
        let mut state = self.lock()?;
        let flight_id = state.open_booking(passenger.booking_id)?.flight_id;
        if flight_id != passenger.flight_id {
            return Err(StoreError::Inconsistent(format!(
                "passenger {} is not on the booking's flight",
                passenger.id
            )));
        }

        let flight = state.flight(flight_id)?;
        let taken = state.unclaimable(flight, &[passenger.seat_id], None);
        if !taken.is_empty() {
            return Err(StoreError::SeatTaken(taken));
        }

        state.passengers.push(PassengerRow {
            passenger: passenger.clone(),
            active: true,
        });
        state.touch(passenger.booking_id, now);
        Ok(())
    }

    async fn remove_passenger(
        &self,
        booking_id: Uuid,
        passenger_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut state = self.lock()?;
        state.open_booking(booking_id)?;

        let on_booking = state
            .passengers
            .iter()
            .filter(|row| row.passenger.booking_id == booking_id)
            .count();
        let index = state
            .passengers
            .iter()
            .position(|row| row.passenger.id == passenger_id && row.passenger.booking_id == booking_id)
            .ok_or(StoreError::PassengerNotFound(passenger_id))?;

        if on_booking <= 1 {
            return Err(StoreError::LastPassenger {
                booking_id,
                passenger_id,
            });
        }

        state.passengers.remove(index);
        state.touch(booking_id, now);
        Ok(())
    }

    async fn payments(&self, booking_id: Uuid) -> StoreResult<Vec<Payment>> {
        let state = self.lock()?;
        Ok(state
            .payments
            .iter()
            .filter(|p| p.booking_id == booking_id)
            .cloned()
            .collect())
    }

    async fn record_payment(&self, payment: &Payment) -> StoreResult<Booking> {
        let mut state = self.lock()?;
        let booking = state.booking(payment.booking_id)?;
        if state.completed_payment(booking.id).is_some() {
            return Err(StoreError::PaymentExists(booking.id));
        }
        if booking.status != BookingStatus::Pending {
            return Err(StoreError::NotPending {
                booking_id: booking.id,
                status: booking.status,
            });
        }
        let next = booking.status.apply(BookingEvent::PaymentCompleted)?;

        let expected = state.cost(payment.booking_id)?;
        if payment.money() != expected {
            return Err(StoreError::AmountMismatch {
                provided: payment.money(),
                expected,
            });
        }

        let mut row = payment.clone();
        row.status = payment.status.apply(PaymentEvent::Captured)?;
        state.payments.push(row);
        state.set_status(payment.booking_id, next, payment.created_at)
    }

    async fn record_failed_payment(&self, payment: &Payment) -> StoreResult<()> {
        let mut state = self.lock()?;
        state.booking(payment.booking_id)?;
        let mut row = payment.clone();
        if row.status != PaymentStatus::Failed {
            row.status = row.status.apply(PaymentEvent::Declined)?;
        }
        row.amount = 0;
        state.payments.push(row);
        Ok(())
    }

    async fn record_refund(
        &self,
        booking_id: Uuid,
        refund_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<RefundRecord> {
        let mut state = self.lock()?;
        let booking = state.booking(booking_id)?;
        if booking.status == BookingStatus::Cancelled {
            return Err(StoreError::BookingClosed {
                booking_id,
                status: booking.status,
            });
        }
        let status = booking.status;
        let index = state
            .completed_payment(booking_id)
            .ok_or(StoreError::NoCompletedPayment(booking_id))?;
        let next = status.apply(BookingEvent::Refund)?;
        let reversed = state.payments[index].status.apply(PaymentEvent::Reversed)?;
        state.payments[index].status = reversed;
        let original = state.payments[index].clone();

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
        state.payments.push(refund.clone());

        let booking = state.set_status(booking_id, next, now)?;
        state.release_seats(booking_id);

        Ok(RefundRecord {
            original,
            refund,
            booking,
        })
    }

    async fn cancel_unpaid(&self, booking_id: Uuid, now: DateTime<Utc>) -> StoreResult<Booking> {
        let mut state = self.lock()?;
        let booking = state.booking(booking_id)?;
        if booking.status == BookingStatus::Cancelled {
            return Err(StoreError::BookingClosed {
                booking_id,
                status: booking.status,
            });
        }
        let status = booking.status;
        if state.completed_payment(booking_id).is_some() {
            return Err(StoreError::PaymentExists(booking_id));
        }
        let next = status.apply(BookingEvent::Cancel)?;

        let booking = state.set_status(booking_id, next, now)?;
        state.release_seats(booking_id);
        Ok(booking)
    }

    async fn complete_booking(&self, booking_id: Uuid, now: DateTime<Utc>) -> StoreResult<Booking> {
        let mut state = self.lock()?;
        let next = state.booking(booking_id)?.status.apply(BookingEvent::FlightServiced)?;
        state.set_status(booking_id, next, now)
    }
}

use std::slice;
use tracing::{info, warn};
use uuid::Uuid;

use skybook_core::validation::validate_passengers;
use skybook_core::{Booking, BookingError, BookingResult, Flight, PassengerInput, ServiceFlags};

use crate::manager::{new_passenger, BookingManager, BookingSnapshot};

impl BookingManager {
    /// Every change goes through here: the booking must be live and its flight
    /// must leave later than the modification window.
    fn ensure_modifiable(&self, booking: &Booking, flight: &Flight) -> BookingResult<()> {
        if self.rules.can_modify(booking, flight, self.clock.now()) {
            return Ok(());
        }
        let reason = if booking.status.is_terminal() {
            format!("booking is {}", booking.status)
        } else {
            format!(
                "flight departs within {} hours",
                self.rules.modification_window_hours
            )
        };
        Err(BookingError::ModificationNotAllowed {
            booking_id: booking.id,
            reason,
        })
    }

    async fn modifiable_booking(
        &self,
        client_id: &str,
        booking_id: Uuid,
    ) -> BookingResult<(Booking, Flight)> {
        let booking = self.load_owned_booking(client_id, booking_id).await?;
        let flight = self.flight(booking.flight_id).await?;
        self.ensure_modifiable(&booking, &flight)?;
        Ok((booking, flight))
    }

    pub async fn update_services(
        &self,
        client_id: &str,
        booking_id: Uuid,
        services: ServiceFlags,
    ) -> BookingResult<Booking> {
        let (booking, _) = self.modifiable_booking(client_id, booking_id).await?;
        Ok(self
            .store
            .update_services(booking.id, services, self.clock.now())
            .await?)
    }

    /// Move one passenger to another seat on the same flight. The old seat is
    /// released and the new one claimed in one store operation.
    pub async fn change_seat(
        &self,
        client_id: &str,
        booking_id: Uuid,
        passenger_id: Uuid,
        seat_id: Uuid,
    ) -> BookingResult<BookingSnapshot> {
        let (booking, flight) = self.modifiable_booking(client_id, booking_id).await?;
        let passenger = self
            .store
            .passengers(booking.id)
            .await?
            .into_iter()
            .find(|p| p.id == passenger_id)
            .ok_or(BookingError::PassengerNotFound(passenger_id))?;

        if passenger.seat_id != seat_id {
            let taken = self.inventory.conflicts(&flight, &[seat_id]).await?;
            if !taken.is_empty() {
                warn!("Seat {} unavailable on flight {}", seat_id, flight.flight_number);
                return Err(BookingError::SeatConflict(taken));
            }
            self.store
                .change_seat(booking.id, passenger.id, seat_id, self.clock.now())
                .await?;
            info!(
                "Booking {}: passenger {} moved to seat {}",
                booking.booking_number, passenger.id, seat_id
            );
        }

        self.snapshot(booking.id).await
    }

    pub async fn add_passenger(
        &self,
        client_id: &str,
        booking_id: Uuid,
        input: PassengerInput,
    ) -> BookingResult<BookingSnapshot> {
        let (booking, flight) = self.modifiable_booking(client_id, booking_id).await?;
        let dates = validate_passengers(slice::from_ref(&input), &self.rules, self.clock.now().date_naive())?;

        let taken = self.inventory.conflicts(&flight, &[input.seat_id]).await?;
        if !taken.is_empty() {
            warn!("Seat {} unavailable on flight {}", input.seat_id, flight.flight_number);
            return Err(BookingError::SeatConflict(taken));
        }

        let passenger = new_passenger(&booking, &input, dates[0]);
        self.store.add_passenger(&passenger, self.clock.now()).await?;
        info!(
            "Booking {}: passenger {} added on seat {}",
            booking.booking_number, passenger.id, passenger.seat_id
        );

        self.snapshot(booking.id).await
    }

    /// Rejected for the only passenger of a booking; cancel the booking instead.
    pub async fn remove_passenger(
        &self,
        client_id: &str,
        booking_id: Uuid,
        passenger_id: Uuid,
    ) -> BookingResult<BookingSnapshot> {
        let (booking, _) = self.modifiable_booking(client_id, booking_id).await?;
        self.store
            .remove_passenger(booking.id, passenger_id, self.clock.now())
            .await?;
        info!(
            "Booking {}: passenger {} removed",
            booking.booking_number, passenger_id
        );

        self.snapshot(booking.id).await
    }

    pub(crate) async fn snapshot(&self, booking_id: Uuid) -> BookingResult<BookingSnapshot> {
        let booking = self
            .store
            .booking(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound(booking_id))?;
        let passengers = self.store.passengers(booking.id).await?;
        let cost = self.costs.cost_of(&passengers).await?;
        Ok(BookingSnapshot {
            booking,
            passengers,
            cost,
        })
    }
}

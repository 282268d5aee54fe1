use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use skybook_core::{BookingError, BookingResult, BookingStore, Flight, Money, SeatClass};

/// Whether one seat can be claimed on one flight.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SeatAvailability {
    pub seat_id: Uuid,
    /// `None` when the seat id is unknown on the flight's airplane
    pub seat_number: Option<String>,
    pub class: Option<SeatClass>,
    pub price: Option<Money>,
    pub available: bool,
}

impl SeatAvailability {
    fn unknown(seat_id: Uuid) -> Self {
        Self {
            seat_id,
            seat_number: None,
            class: None,
            price: None,
            available: false,
        }
    }
}

/// Per-flight seat occupancy, derived from the active passengers of the store.
#[derive(Clone)]
pub struct SeatInventory {
    store: Arc<dyn BookingStore>,
}

impl SeatInventory {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    /// One entry per requested id, in request order. Unknown seats and seats
    /// of another airplane come back as unavailable rather than as an error.
    pub async fn check_availability(
        &self,
        flight: &Flight,
        seat_ids: &[Uuid],
    ) -> BookingResult<Vec<SeatAvailability>> {
        let seats: HashMap<Uuid, _> = self
            .store
            .seats(seat_ids)
            .await?
            .into_iter()
            .filter(|seat| seat.airplane_id == flight.airplane_id)
            .map(|seat| (seat.id, seat))
            .collect();

        let occupied: HashSet<Uuid> = self
            .store
            .occupied_seats(flight.id, seat_ids)
            .await?
            .into_iter()
            .collect();

        Ok(seat_ids
            .iter()
            .map(|id| match seats.get(id) {
                Some(seat) => SeatAvailability {
                    seat_id: *id,
                    seat_number: Some(seat.seat_number.clone()),
                    class: Some(seat.class),
                    price: Some(seat.price()),
                    available: !occupied.contains(id),
                },
                None => SeatAvailability::unknown(*id),
            })
            .collect())
    }

    /// Same as [`check_availability`](Self::check_availability), looking the
    /// flight up first.
    pub async fn check_flight_seats(
        &self,
        flight_id: Uuid,
        seat_ids: &[Uuid],
    ) -> BookingResult<Vec<SeatAvailability>> {
        let flight = self.flight(flight_id).await?;
        self.check_availability(&flight, seat_ids).await
    }

    /// The unavailable subset of `seat_ids`, deduplicated, in request order.
    pub async fn conflicts(&self, flight: &Flight, seat_ids: &[Uuid]) -> BookingResult<Vec<Uuid>> {
        let mut conflicts = Vec::new();
        for entry in self.check_availability(flight, seat_ids).await? {
            if !entry.available && !conflicts.contains(&entry.seat_id) {
                conflicts.push(entry.seat_id);
            }
        }
        Ok(conflicts)
    }

    /// Every seat of the flight's airplane, ordered by seat number.
    pub async fn seat_map(&self, flight_id: Uuid) -> BookingResult<Vec<SeatAvailability>> {
        let flight = self.flight(flight_id).await?;
        let seats = self.store.airplane_seats(flight.airplane_id).await?;
        let ids: Vec<Uuid> = seats.iter().map(|s| s.id).collect();
        let occupied: HashSet<Uuid> = self
            .store
            .occupied_seats(flight.id, &ids)
            .await?
            .into_iter()
            .collect();

        Ok(seats
            .into_iter()
            .map(|seat| SeatAvailability {
                seat_id: seat.id,
                available: !occupied.contains(&seat.id),
                price: Some(seat.price()),
                class: Some(seat.class),
                seat_number: Some(seat.seat_number),
            })
            .collect())
    }

    async fn flight(&self, flight_id: Uuid) -> BookingResult<Flight> {
        self.store
            .flight(flight_id)
            .await?
            .ok_or(BookingError::FlightNotFound(flight_id))
    }
}

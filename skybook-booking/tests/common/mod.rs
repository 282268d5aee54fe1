#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;
use uuid::Uuid;

use skybook_booking::{BookingServices, CreateBookingRequest, MemoryStore};
use skybook_core::payment::ApprovingGateway;
use skybook_core::pii::Masked;
use skybook_core::{BookingRules, FixedClock, Flight, FlightStatus, PassengerInput, Seat, SeatClass};

pub const ALICE: &str = "alice";
pub const BOB: &str = "bob";

pub struct World {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<FixedClock>,
    pub services: BookingServices,
    pub flight: Flight,
    pub seats: Vec<Seat>,
}

pub fn departure() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 7, 1, 9, 0, 0).unwrap()
}

/// One scheduled flight with the given `(seat number, price in cents)`
/// layout. The clock starts three days before departure.
pub fn world(layout: &[(&str, i64)]) -> World {
    let store = Arc::new(MemoryStore::new());
    let airplane_id = Uuid::new_v4();
    let flight = Flight {
        id: Uuid::new_v4(),
        flight_number: "SB204".to_string(),
        departure_time: departure(),
        arrival_time: departure() + Duration::hours(5),
        status: FlightStatus::Scheduled,
        airplane_id,
        origin_airport_id: Uuid::new_v4(),
        destination_airport_id: Uuid::new_v4(),
    };
    store.insert_flight(flight.clone()).unwrap();

    let seats: Vec<Seat> = layout
        .iter()
        .map(|(number, price)| Seat {
            id: Uuid::new_v4(),
            airplane_id,
            seat_number: number.to_string(),
            class: SeatClass::Economy,
            price: *price,
            currency: "USD".to_string(),
        })
        .collect();
    for seat in &seats {
        store.insert_seat(seat.clone()).unwrap();
    }

    let clock = Arc::new(FixedClock::new(departure() - Duration::days(3)));
    let services = BookingServices::new(
        store.clone(),
        Arc::new(ApprovingGateway),
        clock.clone(),
        BookingRules::default(),
    );

    World {
        store,
        clock,
        services,
        flight,
        seats,
    }
}

pub fn passenger(first_name: &str, seat_id: Uuid) -> PassengerInput {
    PassengerInput {
        first_name: first_name.to_string(),
        last_name: "Traveller".to_string(),
        date_of_birth: "1988-03-14".to_string(),
        passport_number: Masked::new("X1234567".to_string()),
        nationality: "NL".to_string(),
        seat_id,
    }
}

impl World {
    pub fn request(&self, seats: &[usize]) -> CreateBookingRequest {
        CreateBookingRequest {
            flight_id: self.flight.id,
            support: false,
            fast_track: false,
            passengers: seats
                .iter()
                .enumerate()
                .map(|(n, i)| passenger(&format!("Passenger{}", n), self.seats[*i].id))
                .collect(),
        }
    }

    pub fn at_hours_before_departure(&self, hours: i64) {
        self.clock.set(departure() - Duration::hours(hours));
    }
}

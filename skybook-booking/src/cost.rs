use std::sync::Arc;
use uuid::Uuid;

use skybook_core::cost::booking_cost;
use skybook_core::{BookingResult, BookingStore, Money, Passenger};

/// Authoritative booking cost, always recomputed from current seat prices.
#[derive(Clone)]
pub struct CostCalculator {
    store: Arc<dyn BookingStore>,
}

impl CostCalculator {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    pub async fn booking_cost(&self, booking_id: Uuid) -> BookingResult<Money> {
        let passengers = self.store.passengers(booking_id).await?;
        self.cost_of(&passengers).await
    }

    pub async fn cost_of(&self, passengers: &[Passenger]) -> BookingResult<Money> {
        let seat_ids: Vec<Uuid> = passengers.iter().map(|p| p.seat_id).collect();
        let seats = self.store.seats(&seat_ids).await?;
        Ok(booking_cost(passengers, &seats)?)
    }
}

pub mod cancellation;
pub mod changes;
pub mod cost;
pub mod inventory;
pub mod manager;
pub mod memory;
pub mod orchestrator;

pub use cancellation::CancellationOutcome;
pub use cost::CostCalculator;
pub use inventory::{SeatAvailability, SeatInventory};
pub use manager::{BookingDetails, BookingManager, BookingSnapshot, CreateBookingRequest};
pub use memory::MemoryStore;
pub use orchestrator::{PaymentOrchestrator, PaymentReceipt};

use skybook_core::payment::PaymentGateway;
use skybook_core::{BookingRules, BookingStore, Clock};
use std::sync::Arc;

/// The booking services wired over one shared store.
#[derive(Clone)]
pub struct BookingServices {
    pub bookings: Arc<BookingManager>,
    pub payments: Arc<PaymentOrchestrator>,
    pub inventory: SeatInventory,
}

impl BookingServices {
    pub fn new(
        store: Arc<dyn BookingStore>,
        gateway: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
        rules: BookingRules,
    ) -> Self {
        let payments = Arc::new(PaymentOrchestrator::new(
            store.clone(),
            gateway,
            clock.clone(),
        ));
        let bookings = Arc::new(BookingManager::new(
            store.clone(),
            payments.clone(),
            clock,
            rules,
        ));
        Self {
            bookings,
            payments,
            inventory: SeatInventory::new(store),
        }
    }
}

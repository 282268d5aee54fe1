use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use skybook_core::{Booking, BookingError, BookingResult, BookingStatus, RefundRecord};

use crate::manager::BookingManager;

#[derive(Debug, Clone, Serialize)]
pub struct CancellationOutcome {
    pub booking: Booking,
    /// Present when a completed payment was reversed
    pub refund: Option<RefundRecord>,
}

impl BookingManager {
    /// Unpaid bookings can be dropped at any time before they are closed. A
    /// paid booking is refunded, and only while it can still be modified.
    pub async fn cancel_booking(
        &self,
        client_id: &str,
        booking_id: Uuid,
    ) -> BookingResult<CancellationOutcome> {
        let booking = self.load_owned_booking(client_id, booking_id).await?;
        match booking.status {
            BookingStatus::Cancelled => return Err(BookingError::AlreadyCancelled(booking.id)),
            BookingStatus::Completed => {
                return Err(BookingError::CancellationNotAllowed {
                    booking_id: booking.id,
                    reason: "booking is completed".to_string(),
                })
            }
            BookingStatus::Pending | BookingStatus::Confirmed => {}
        }

        if self.payments.completed_payment(booking.id).await?.is_none() {
            let cancelled = self
                .store
                .cancel_unpaid(booking.id, self.clock.now())
                .await?;
            info!("Booking {} cancelled before payment", cancelled.booking_number);
            return Ok(CancellationOutcome {
                booking: cancelled,
                refund: None,
            });
        }

        let flight = self.flight(booking.flight_id).await?;
        if !self.rules.can_modify(&booking, &flight, self.clock.now()) {
            return Err(BookingError::CancellationNotAllowed {
                booking_id: booking.id,
                reason: format!(
                    "flight departs within {} hours",
                    self.rules.modification_window_hours
                ),
            });
        }

        let record = self.payments.refund(&booking).await?;
        info!("Booking {} cancelled with refund", record.booking.booking_number);
        Ok(CancellationOutcome {
            booking: record.booking.clone(),
            refund: Some(record),
        })
    }
}

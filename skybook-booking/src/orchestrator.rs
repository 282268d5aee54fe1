use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use skybook_core::payment::{ChargeRequest, GatewayOutcome, PaymentGateway};
use skybook_core::{
    Booking, BookingError, BookingResult, BookingStatus, BookingStore, Clock, Money, Payment,
    PaymentStatus, RefundRecord,
};

use crate::cost::CostCalculator;
use crate::manager::load_owned_booking;

/// What a caller gets back for a successful charge.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub payment_id: Uuid,
    pub booking_id: Uuid,
    pub booking_number: String,
    pub amount: Money,
    pub reference: Option<String>,
    pub paid_at: DateTime<Utc>,
    pub booking_status: BookingStatus,
}

/// Validates payment amounts against the recomputed booking cost and records
/// charges and refunds in the payment ledger.
pub struct PaymentOrchestrator {
    store: Arc<dyn BookingStore>,
    costs: CostCalculator,
    gateway: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Clock>,
}

impl PaymentOrchestrator {
    pub fn new(
        store: Arc<dyn BookingStore>,
        gateway: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            costs: CostCalculator::new(store.clone()),
            store,
            gateway,
            clock,
        }
    }

    /// Returns the expected amount when `amount` matches it exactly.
    pub async fn validate_amount(
        &self,
        client_id: &str,
        booking_id: Uuid,
        amount: &Money,
    ) -> BookingResult<Money> {
        let booking = load_owned_booking(self.store.as_ref(), client_id, booking_id).await?;
        let expected = self.costs.booking_cost(booking.id).await?;
        ensure_exact(amount, &expected)?;
        Ok(expected)
    }

    pub async fn process_payment(
        &self,
        client_id: &str,
        booking_id: Uuid,
        amount: Money,
    ) -> BookingResult<PaymentReceipt> {
        let booking = load_owned_booking(self.store.as_ref(), client_id, booking_id).await?;
        if self.completed_payment(booking.id).await?.is_some() {
            return Err(BookingError::PaymentAlreadyCompleted(booking.id));
        }
        if booking.status != BookingStatus::Pending {
            return Err(BookingError::BookingNotPending {
                booking_id: booking.id,
                status: booking.status,
            });
        }

        let expected = self.costs.booking_cost(booking.id).await?;
        ensure_exact(&amount, &expected)?;

        let request = ChargeRequest {
            payment_id: Uuid::new_v4(),
            booking_id: booking.id,
            booking_number: booking.booking_number.clone(),
            amount,
        };
        let outcome = self
            .gateway
            .authorize(&request)
            .await
            .map_err(|e| BookingError::Gateway(e.0))?;

        match outcome {
            GatewayOutcome::Declined { reason } => {
                warn!(
                    "Payment for booking {} declined: {}",
                    booking.booking_number, reason
                );
                let attempt = format!("declined {}: {}", request.amount, reason);
                let payment = self.ledger_row(&request, Some(attempt));
                self.store.record_failed_payment(&payment).await?;
                Err(BookingError::PaymentDeclined(reason))
            }
            GatewayOutcome::Approved { reference } => {
                let payment = self.ledger_row(&request, Some(reference.clone()));
                match self.store.record_payment(&payment).await {
                    Ok(confirmed) => {
                        info!(
                            "Booking {} paid {} ({})",
                            confirmed.booking_number, request.amount, reference
                        );
                        Ok(PaymentReceipt {
                            payment_id: payment.id,
                            booking_id: confirmed.id,
                            booking_number: confirmed.booking_number,
                            amount: request.amount,
                            reference: Some(reference),
                            paid_at: payment.created_at,
                            booking_status: confirmed.status,
                        })
                    }
                    Err(err) => {
                        if let Err(void_err) = self.gateway.void(&reference).await {
                            error!(
                                "Failed to void authorization {} for booking {}: {}",
                                reference, booking.booking_number, void_err
                            );
                        }
                        Err(err.into())
                    }
                }
            }
        }
    }

    /// Operator refund, outside the customer cancellation window.
    pub async fn process_refund(&self, booking_id: Uuid) -> BookingResult<RefundRecord> {
        let booking = self
            .store
            .booking(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound(booking_id))?;
        self.refund(&booking).await
    }

    /// The booking's ledger, oldest first.
    pub async fn payments(&self, client_id: &str, booking_id: Uuid) -> BookingResult<Vec<Payment>> {
        let booking = load_owned_booking(self.store.as_ref(), client_id, booking_id).await?;
        let mut payments = self.store.payments(booking.id).await?;
        payments.sort_by_key(|p| p.created_at);
        Ok(payments)
    }

    pub(crate) async fn completed_payment(&self, booking_id: Uuid) -> BookingResult<Option<Payment>> {
        Ok(self
            .store
            .payments(booking_id)
            .await?
            .into_iter()
            .find(|p| p.status == PaymentStatus::Completed))
    }

    pub(crate) async fn refund(&self, booking: &Booking) -> BookingResult<RefundRecord> {
        if booking.status == BookingStatus::Cancelled {
            return Err(BookingError::AlreadyCancelled(booking.id));
        }
        let record = self
            .store
            .record_refund(booking.id, Uuid::new_v4(), self.clock.now())
            .await?;
        info!(
            "Refunded {} on booking {}",
            record.refund.money(),
            record.booking.booking_number
        );
        Ok(record)
    }

    fn ledger_row(&self, request: &ChargeRequest, reference: Option<String>) -> Payment {
        Payment {
            id: request.payment_id,
            booking_id: request.booking_id,
            amount: request.amount.amount,
            currency: request.amount.currency.clone(),
            status: PaymentStatus::Pending,
            reference,
            refund_of: None,
            created_at: self.clock.now(),
        }
    }
}

fn ensure_exact(provided: &Money, expected: &Money) -> BookingResult<()> {
    if provided != expected {
        return Err(BookingError::InvalidPaymentAmount {
            provided: provided.clone(),
            expected: expected.clone(),
        });
    }
    Ok(())
}

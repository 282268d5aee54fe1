use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Money;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeRequest {
    pub payment_id: Uuid,
    pub booking_id: Uuid,
    pub booking_number: String,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayOutcome {
    Approved { reference: String },
    Declined { reason: String },
}

#[derive(Debug, thiserror::Error)]
#[error("payment gateway unavailable: {0}")]
pub struct GatewayError(pub String);

/// The single synchronous call that moves money for a booking.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charge the amount. A decline is an `Ok` outcome; `Err` means the
    /// gateway could not be asked at all.
    async fn authorize(&self, request: &ChargeRequest) -> Result<GatewayOutcome, GatewayError>;

    /// Release an approved charge that could not be recorded
    async fn void(&self, reference: &str) -> Result<(), GatewayError>;
}

/// Approves every charge. The default for deployments where card capture
/// happens before the booking core is called.
#[derive(Debug, Default, Clone, Copy)]
pub struct ApprovingGateway;

#[async_trait]
impl PaymentGateway for ApprovingGateway {
    async fn authorize(&self, request: &ChargeRequest) -> Result<GatewayOutcome, GatewayError> {
        tracing::debug!(
            "Approving {} for booking {}",
            request.amount,
            request.booking_number
        );
        Ok(GatewayOutcome::Approved {
            reference: format!("auth_{}", request.payment_id.simple()),
        })
    }

    async fn void(&self, reference: &str) -> Result<(), GatewayError> {
        tracing::debug!("Voiding authorization {}", reference);
        Ok(())
    }
}

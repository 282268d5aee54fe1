use axum::{
    extract::{rejection::PathRejection, Path, State},
    routing::post,
    Extension, Json, Router,
};
use tracing::info;
use uuid::Uuid;

use skybook_core::{Booking, RefundRecord};

use crate::error::AppError;
use crate::middleware::AdminClaims;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/bookings/{id}/refund", post(refund_booking))
        .route("/v1/admin/bookings/{id}/complete", post(complete_booking))
}

async fn refund_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<AdminClaims>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<RefundRecord>, AppError> {
    let Path(id) = path?;
    let record = state.services.payments.process_refund(id).await?;
    info!("Operator {} refunded booking {}", claims.sub, record.booking.booking_number);
    Ok(Json(record))
}

async fn complete_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<AdminClaims>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Booking>, AppError> {
    let Path(id) = path?;
    let booking = state.services.bookings.complete_booking(id).await?;
    info!("Operator {} completed booking {}", claims.sub, booking.booking_number);
    Ok(Json(booking))
}

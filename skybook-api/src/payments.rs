use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::post,
    Extension, Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use skybook_booking::PaymentReceipt;
use skybook_core::{Money, Payment};

use crate::error::AppError;
use crate::middleware::CustomerClaims;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct AmountCheck {
    pub valid: bool,
    pub expected: Money,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings/{id}/payments/validate", post(validate_amount))
        .route("/v1/bookings/{id}/payments", post(process_payment).get(list_payments))
}

async fn validate_amount(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<Money>, JsonRejection>,
) -> Result<Json<AmountCheck>, AppError> {
    let Path(id) = path?;
    let Json(amount) = payload?;
    let expected = state
        .services
        .payments
        .validate_amount(&claims.sub, id, &amount)
        .await?;
    Ok(Json(AmountCheck {
        valid: true,
        expected,
    }))
}

async fn process_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<Money>, JsonRejection>,
) -> Result<(StatusCode, Json<PaymentReceipt>), AppError> {
    let Path(id) = path?;
    let Json(amount) = payload?;
    let receipt = state
        .services
        .payments
        .process_payment(&claims.sub, id, amount)
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn list_payments(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Vec<Payment>>, AppError> {
    let Path(id) = path?;
    let payments = state.services.payments.payments(&claims.sub, id).await?;
    Ok(Json(payments))
}

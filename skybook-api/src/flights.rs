use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use skybook_booking::SeatAvailability;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AvailabilityRequest {
    pub seat_ids: Vec<Uuid>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/flights/{flight_id}/seats", get(seat_map))
        .route("/v1/flights/{flight_id}/seats/availability", post(check_availability))
}

async fn seat_map(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Vec<SeatAvailability>>, AppError> {
    let Path(flight_id) = path?;
    let seats = state.services.inventory.seat_map(flight_id).await?;
    Ok(Json(seats))
}

async fn check_availability(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<AvailabilityRequest>, JsonRejection>,
) -> Result<Json<Vec<SeatAvailability>>, AppError> {
    let Path(flight_id) = path?;
    let Json(req) = payload?;
    let seats = state
        .services
        .inventory
        .check_flight_seats(flight_id, &req.seat_ids)
        .await?;
    Ok(Json(seats))
}

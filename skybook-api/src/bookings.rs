use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{delete, get, patch, post, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use skybook_booking::{BookingDetails, BookingSnapshot, CancellationOutcome, CreateBookingRequest};
use skybook_core::{Booking, Money, PassengerInput, ServiceFlags};

use crate::error::AppError;
use crate::middleware::CustomerClaims;
use crate::state::AppState;

/// Fields left out keep their current value.
#[derive(Debug, Deserialize)]
pub struct ServicesPatch {
    pub support: Option<bool>,
    pub fast_track: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SeatChange {
    pub seat_id: Uuid,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking).get(list_bookings))
        .route("/v1/bookings/{id}", get(get_booking))
        .route("/v1/bookings/{id}/services", patch(update_services))
        .route("/v1/bookings/{id}/passengers", post(add_passenger))
        .route("/v1/bookings/{id}/passengers/{passenger_id}", delete(remove_passenger))
        .route("/v1/bookings/{id}/passengers/{passenger_id}/seat", put(change_seat))
        .route("/v1/bookings/{id}/cancel", post(cancel_booking))
        .route("/v1/bookings/{id}/cost", get(booking_cost))
}

async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    payload: Result<Json<CreateBookingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BookingSnapshot>), AppError> {
    let Json(req) = payload?;
    let snapshot = state.services.bookings.create_booking(&claims.sub, req).await?;
    info!("Client {} created booking {}", claims.sub, snapshot.booking.booking_number);
    Ok((StatusCode::CREATED, Json(snapshot)))
}

async fn list_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let bookings = state.services.bookings.list_bookings(&claims.sub).await?;
    Ok(Json(bookings))
}

async fn get_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<BookingDetails>, AppError> {
    let Path(id) = path?;
    let details = state.services.bookings.get_booking(&claims.sub, id).await?;
    Ok(Json(details))
}

async fn update_services(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ServicesPatch>, JsonRejection>,
) -> Result<Json<Booking>, AppError> {
    let Path(id) = path?;
    let Json(patch) = payload?;
    let current = state.services.bookings.get_booking(&claims.sub, id).await?.booking;
    let services = ServiceFlags {
        support: patch.support.unwrap_or(current.support),
        fast_track: patch.fast_track.unwrap_or(current.fast_track),
    };
    let booking = state
        .services
        .bookings
        .update_services(&claims.sub, id, services)
        .await?;
    Ok(Json(booking))
}

async fn add_passenger(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<PassengerInput>, JsonRejection>,
) -> Result<(StatusCode, Json<BookingSnapshot>), AppError> {
    let Path(id) = path?;
    let Json(input) = payload?;
    let snapshot = state.services.bookings.add_passenger(&claims.sub, id, input).await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

async fn remove_passenger(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    path: Result<Path<(Uuid, Uuid)>, PathRejection>,
) -> Result<Json<BookingSnapshot>, AppError> {
    let Path((id, passenger_id)) = path?;
    let snapshot = state
        .services
        .bookings
        .remove_passenger(&claims.sub, id, passenger_id)
        .await?;
    Ok(Json(snapshot))
}

async fn change_seat(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    path: Result<Path<(Uuid, Uuid)>, PathRejection>,
    payload: Result<Json<SeatChange>, JsonRejection>,
) -> Result<Json<BookingSnapshot>, AppError> {
    let Path((id, passenger_id)) = path?;
    let Json(change) = payload?;
    let snapshot = state
        .services
        .bookings
        .change_seat(&claims.sub, id, passenger_id, change.seat_id)
        .await?;
    Ok(Json(snapshot))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<CancellationOutcome>, AppError> {
    let Path(id) = path?;
    let outcome = state.services.bookings.cancel_booking(&claims.sub, id).await?;
    Ok(Json(outcome))
}

async fn booking_cost(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Money>, AppError> {
    let Path(id) = path?;
    let cost = state.services.bookings.booking_cost(&claims.sub, id).await?;
    Ok(Json(cost))
}

use axum::{
    extract::State,
    http::{Method, StatusCode},
    middleware::from_fn_with_state,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod admin;
pub mod bookings;
pub mod error;
pub mod flights;
pub mod middleware;
pub mod payments;
pub mod state;

pub use state::{AppState, AuthConfig};

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    let customer = Router::new()
        .merge(flights::routes())
        .merge(bookings::routes())
        .merge(payments::routes())
        .route_layer(from_fn_with_state(state.clone(), middleware::customer_auth_middleware));

    let operator = admin::routes()
        .route_layer(from_fn_with_state(state.clone(), middleware::admin_auth_middleware));

    Router::new()
        .route("/health", get(health))
        .merge(customer)
        .merge(operator)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match &state.db {
        Some(db) => match db.ping().await {
            Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok", "database": "up" }))),
            Err(err) => {
                tracing::error!("Health check failed: {}", err);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({ "status": "degraded", "database": "down" })),
                )
            }
        },
        None => (StatusCode::OK, Json(json!({ "status": "ok" }))),
    }
}

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use skybook_core::{BookingError, ErrorKind};

#[derive(Debug)]
pub enum AppError {
    Booking(BookingError),
    AuthenticationError(String),
    AuthorizationError(String),
    BadRequest(String),
    Anyhow(anyhow::Error),
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String, Option<Value>) {
        match self {
            AppError::Booking(err) => {
                let status = match (err.kind(), err) {
                    (_, BookingError::PaymentDeclined(_)) => StatusCode::PAYMENT_REQUIRED,
                    (_, BookingError::PassengerValidation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
                    (ErrorKind::NotFound, _) => StatusCode::NOT_FOUND,
                    (ErrorKind::Validation, _) => StatusCode::BAD_REQUEST,
                    (ErrorKind::Conflict, _) => StatusCode::CONFLICT,
                    (ErrorKind::PolicyDenied, _) => StatusCode::UNPROCESSABLE_ENTITY,
                    (ErrorKind::AccessDenied, _) => StatusCode::FORBIDDEN,
                    (ErrorKind::Internal, _) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!("Internal Server Error: {}", err);
                    return (status, err.code(), "Internal Server Error".to_string(), None);
                }
                (status, err.code(), err.to_string(), err.details())
            }
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone(), None),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone(), None),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "INVALID_INPUT", msg.clone(), None),
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal Server Error".to_string(),
                    None,
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = self.parts();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
                "details": details,
            }
        }));

        (status, body).into_response()
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        Self::Booking(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Anyhow(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_status_by_taxonomy() {
        let id = Uuid::new_v4();
        let cases = [
            (BookingError::BookingNotFound(id), StatusCode::NOT_FOUND),
            (BookingError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (BookingError::PassengerValidation(vec![]), StatusCode::UNPROCESSABLE_ENTITY),
            (BookingError::SeatConflict(vec![id]), StatusCode::CONFLICT),
            (BookingError::AlreadyCancelled(id), StatusCode::CONFLICT),
            (
                BookingError::CancellationNotAllowed {
                    booking_id: id,
                    reason: "window".into(),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (BookingError::PaymentDeclined("no".into()), StatusCode::PAYMENT_REQUIRED),
            (BookingError::AccessDenied(id), StatusCode::FORBIDDEN),
            (BookingError::Storage("down".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }
}

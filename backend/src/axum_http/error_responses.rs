use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use charges::domain::errors::ChargeError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ChargeError> for AppError {
    fn from(err: ChargeError) -> Self {
        match err {
            ChargeError::Validation(message) => AppError::BadRequest(message),
            ChargeError::ChargeNotFound(_) | ChargeError::CustomerNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            ChargeError::Operation { .. } => AppError::Conflict(err.to_string()),
            // Methods are parsed at the edge, so reaching here is a contract violation.
            ChargeError::UnsupportedMethod(_) => AppError::Internal(anyhow::Error::new(err)),
            ChargeError::Internal(err) => AppError::Internal(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match self {
            AppError::Unauthorized(msg)
            | AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => msg,
            AppError::Internal(err) => {
                error!(error = ?err, "http: internal error");
                // Don't leak internal error detail to client
                "Internal server error".to_string()
            }
        };

        let body = Json(ErrorResponse {
            code: status.as_u16(),
            message,
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charges::domain::value_objects::enums::charge_statuses::ChargeStatus;

    #[test]
    fn domain_errors_map_to_status_codes() {
        let cases = [
            (ChargeError::validation("amount must be positive"), StatusCode::BAD_REQUEST),
            (ChargeError::ChargeNotFound("ch_1".to_string()), StatusCode::NOT_FOUND),
            (ChargeError::CustomerNotFound("cus_1".to_string()), StatusCode::NOT_FOUND),
            (
                ChargeError::Operation {
                    operation: "refund",
                    status: ChargeStatus::Pending,
                },
                StatusCode::CONFLICT,
            ),
            (
                ChargeError::UnsupportedMethod("CRYPTO".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status_code(), status);
        }
    }

    #[test]
    fn operation_message_is_kept() {
        let err = AppError::from(ChargeError::Operation {
            operation: "pay",
            status: ChargeStatus::Expired,
        });
        assert!(matches!(err, AppError::Conflict(msg) if msg == "cannot pay charge with status EXPIRED"));
    }
}

use thiserror::Error;

use crate::domain::value_objects::enums::charge_statuses::ChargeStatus;

#[derive(Debug, Error)]
pub enum ChargeError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("charge {0} not found")]
    ChargeNotFound(String),
    #[error("customer {0} not found")]
    CustomerNotFound(String),
    #[error("cannot {operation} charge with status {status}")]
    Operation {
        operation: &'static str,
        status: ChargeStatus,
    },
    #[error("unsupported payment method: {0}")]
    UnsupportedMethod(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ChargeError {
    pub fn validation(message: impl Into<String>) -> Self {
        ChargeError::Validation(message.into())
    }
}

pub type ChargeResult<T> = std::result::Result<T, ChargeError>;

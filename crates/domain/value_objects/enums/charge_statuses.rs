use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::domain::errors::ChargeError;

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChargeStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Expired,
    Cancelled,
    Refunded,
}

impl ChargeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChargeStatus::Pending => "PENDING",
            ChargeStatus::Paid => "PAID",
            ChargeStatus::Failed => "FAILED",
            ChargeStatus::Expired => "EXPIRED",
            ChargeStatus::Cancelled => "CANCELLED",
            ChargeStatus::Refunded => "REFUNDED",
        }
    }

    pub fn from_str(value: &str) -> Result<Self, ChargeError> {
        match value {
            "PENDING" => Ok(ChargeStatus::Pending),
            "PAID" => Ok(ChargeStatus::Paid),
            "FAILED" => Ok(ChargeStatus::Failed),
            "EXPIRED" => Ok(ChargeStatus::Expired),
            "CANCELLED" => Ok(ChargeStatus::Cancelled),
            "REFUNDED" => Ok(ChargeStatus::Refunded),
            other => Err(ChargeError::validation(format!(
                "invalid charge status: {other}"
            ))),
        }
    }
}

impl Display for ChargeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

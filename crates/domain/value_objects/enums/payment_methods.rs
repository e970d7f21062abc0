use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::domain::errors::ChargeError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Pix,
    CreditCard,
    Boleto,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Pix => "PIX",
            PaymentMethod::CreditCard => "CREDIT_CARD",
            PaymentMethod::Boleto => "BOLETO",
        }
    }

    /// Parses the wire value. Anything outside the three rails is an
    /// `UnsupportedMethod` error.
    pub fn from_str(value: &str) -> Result<Self, ChargeError> {
        match value {
            "PIX" => Ok(PaymentMethod::Pix),
            "CREDIT_CARD" => Ok(PaymentMethod::CreditCard),
            "BOLETO" => Ok(PaymentMethod::Boleto),
            other => Err(ChargeError::UnsupportedMethod(other.to_string())),
        }
    }
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_values_parse() {
        for method in [
            PaymentMethod::Pix,
            PaymentMethod::CreditCard,
            PaymentMethod::Boleto,
        ] {
            assert_eq!(PaymentMethod::from_str(method.as_str()).unwrap(), method);
        }
    }

    #[test]
    fn unknown_method_is_unsupported() {
        let err = PaymentMethod::from_str("BITCOIN").unwrap_err();
        assert!(matches!(err, ChargeError::UnsupportedMethod(ref v) if v == "BITCOIN"));
    }

    #[test]
    fn serde_uses_screaming_snake_case() {
        let json = serde_json::to_string(&PaymentMethod::CreditCard).unwrap();
        assert_eq!(json, "\"CREDIT_CARD\"");
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::ChargeError;
use crate::domain::value_objects::enums::{card_brands::CardBrand, payment_methods::PaymentMethod};

pub const MIN_INSTALLMENTS: i32 = 1;
pub const MAX_INSTALLMENTS: i32 = 12;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PixDetails {
    pub qr_code: String,
    pub qr_code_base64: Option<String>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreditCardDetails {
    pub last_four_digits: String,
    pub brand: CardBrand,
    pub holder_name: String,
    pub installments: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BoletoDetails {
    pub barcode: String,
    pub url: String,
    pub due_date: DateTime<Utc>,
}

/// Method-specific artifacts of a charge. Exactly one rail per charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentDetails {
    Pix(PixDetails),
    CreditCard(CreditCardDetails),
    Boleto(BoletoDetails),
}

impl PaymentDetails {
    pub fn payment_method(&self) -> PaymentMethod {
        match self {
            PaymentDetails::Pix(_) => PaymentMethod::Pix,
            PaymentDetails::CreditCard(_) => PaymentMethod::CreditCard,
            PaymentDetails::Boleto(_) => PaymentMethod::Boleto,
        }
    }

    /// Moment after which an unpaid charge using these details is overdue.
    /// Card charges have none.
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        match self {
            PaymentDetails::Pix(pix) => Some(pix.expires_at),
            PaymentDetails::CreditCard(_) => None,
            PaymentDetails::Boleto(boleto) => Some(boleto.due_date),
        }
    }

    pub fn validate_for(&self, method: PaymentMethod) -> Result<(), ChargeError> {
        if self.payment_method() != method {
            return Err(ChargeError::validation(format!(
                "payment details for {} do not match payment method {}",
                self.payment_method(),
                method
            )));
        }

        match self {
            PaymentDetails::Pix(pix) => {
                if pix.qr_code.trim().is_empty() {
                    return Err(ChargeError::validation("PIX qr code is required"));
                }
            }
            PaymentDetails::CreditCard(card) => {
                if card.last_four_digits.len() != 4
                    || !card.last_four_digits.chars().all(|c| c.is_ascii_digit())
                {
                    return Err(ChargeError::validation(
                        "card last four digits must be exactly 4 digits",
                    ));
                }
                if !(MIN_INSTALLMENTS..=MAX_INSTALLMENTS).contains(&card.installments) {
                    return Err(ChargeError::validation(format!(
                        "installments must be between {MIN_INSTALLMENTS} and {MAX_INSTALLMENTS}"
                    )));
                }
            }
            PaymentDetails::Boleto(boleto) => {
                if boleto.barcode.trim().is_empty() {
                    return Err(ChargeError::validation("boleto barcode is required"));
                }
                if boleto.url.trim().is_empty() {
                    return Err(ChargeError::validation("boleto url is required"));
                }
            }
        }

        Ok(())
    }
}

/// Response shape: one nullable slot per rail, only the charge's own rail filled.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetailsDto {
    pub pix: Option<PixDetails>,
    pub credit_card: Option<CreditCardDetails>,
    pub boleto: Option<BoletoDetails>,
}

impl From<Option<&PaymentDetails>> for PaymentDetailsDto {
    fn from(value: Option<&PaymentDetails>) -> Self {
        match value {
            Some(PaymentDetails::Pix(pix)) => Self {
                pix: Some(pix.clone()),
                ..Self::default()
            },
            Some(PaymentDetails::CreditCard(card)) => Self {
                credit_card: Some(card.clone()),
                ..Self::default()
            },
            Some(PaymentDetails::Boleto(boleto)) => Self {
                boleto: Some(boleto.clone()),
                ..Self::default()
            },
            None => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(last_four: &str, installments: i32) -> PaymentDetails {
        PaymentDetails::CreditCard(CreditCardDetails {
            last_four_digits: last_four.to_string(),
            brand: CardBrand::Visa,
            holder_name: "Maria Silva".to_string(),
            installments,
        })
    }

    #[test]
    fn mismatched_rail_is_rejected() {
        let err = card("1486", 1)
            .validate_for(PaymentMethod::Pix)
            .unwrap_err();
        assert!(matches!(err, ChargeError::Validation(_)));
    }

    #[test]
    fn card_requires_four_digits_and_installment_range() {
        assert!(card("1486", 1).validate_for(PaymentMethod::CreditCard).is_ok());
        assert!(card("148", 1).validate_for(PaymentMethod::CreditCard).is_err());
        assert!(card("14a6", 1).validate_for(PaymentMethod::CreditCard).is_err());
        assert!(card("1486", 0).validate_for(PaymentMethod::CreditCard).is_err());
        assert!(card("1486", 13).validate_for(PaymentMethod::CreditCard).is_err());
    }

    #[test]
    fn dto_fills_only_the_matching_slot() {
        let details = PaymentDetails::Boleto(BoletoDetails {
            barcode: "2025010100000150001234".to_string(),
            url: "https://boleto.example.com/view?barcode=1".to_string(),
            due_date: Utc::now(),
        });
        let dto = PaymentDetailsDto::from(Some(&details));
        assert!(dto.pix.is_none());
        assert!(dto.credit_card.is_none());
        assert!(dto.boleto.is_some());
    }
}

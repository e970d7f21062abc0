use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::{
    domain::value_objects::{
        enums::card_brands::CardBrand,
        payment_details::{BoletoDetails, CreditCardDetails, PaymentDetails, PixDetails},
    },
    infra::db::postgres::schema::{
        boleto_payment_details, credit_card_payment_details, pix_payment_details,
    },
};

#[derive(Debug, Clone, Identifiable, Selectable, Queryable, Insertable)]
#[diesel(table_name = pix_payment_details)]
pub struct PixDetailEntity {
    pub id: String,
    pub charge_id: String,
    pub qr_code: String,
    pub qr_code_base64: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<PixDetailEntity> for PixDetails {
    fn from(value: PixDetailEntity) -> Self {
        Self {
            qr_code: value.qr_code,
            qr_code_base64: value.qr_code_base64,
            expires_at: value.expires_at,
        }
    }
}

/// Only the card summary is stored; the full number never reaches this table.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable, Insertable)]
#[diesel(table_name = credit_card_payment_details)]
pub struct CreditCardDetailEntity {
    pub id: String,
    pub charge_id: String,
    pub last_four_digits: String,
    pub brand: String,
    pub holder_name: String,
    pub installments: i32,
    pub created_at: DateTime<Utc>,
}

impl From<CreditCardDetailEntity> for CreditCardDetails {
    fn from(value: CreditCardDetailEntity) -> Self {
        Self {
            last_four_digits: value.last_four_digits,
            brand: CardBrand::from_str(&value.brand),
            holder_name: value.holder_name,
            installments: value.installments,
        }
    }
}

#[derive(Debug, Clone, Identifiable, Selectable, Queryable, Insertable)]
#[diesel(table_name = boleto_payment_details)]
pub struct BoletoDetailEntity {
    pub id: String,
    pub charge_id: String,
    pub barcode: String,
    pub url: String,
    pub due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<BoletoDetailEntity> for BoletoDetails {
    fn from(value: BoletoDetailEntity) -> Self {
        Self {
            barcode: value.barcode,
            url: value.url,
            due_date: value.due_date,
        }
    }
}

/// The single detail row a charge owns, in whichever table its method uses.
#[derive(Debug, Clone)]
pub enum PaymentDetailRow {
    Pix(PixDetailEntity),
    CreditCard(CreditCardDetailEntity),
    Boleto(BoletoDetailEntity),
}

impl PaymentDetailRow {
    pub fn new(
        id: String,
        charge_id: &str,
        details: &PaymentDetails,
        created_at: DateTime<Utc>,
    ) -> Self {
        let charge_id = charge_id.to_string();
        match details {
            PaymentDetails::Pix(pix) => PaymentDetailRow::Pix(PixDetailEntity {
                id,
                charge_id,
                qr_code: pix.qr_code.clone(),
                qr_code_base64: pix.qr_code_base64.clone(),
                expires_at: pix.expires_at,
                created_at,
            }),
            PaymentDetails::CreditCard(card) => {
                PaymentDetailRow::CreditCard(CreditCardDetailEntity {
                    id,
                    charge_id,
                    last_four_digits: card.last_four_digits.clone(),
                    brand: card.brand.to_string(),
                    holder_name: card.holder_name.clone(),
                    installments: card.installments,
                    created_at,
                })
            }
            PaymentDetails::Boleto(boleto) => PaymentDetailRow::Boleto(BoletoDetailEntity {
                id,
                charge_id,
                barcode: boleto.barcode.clone(),
                url: boleto.url.clone(),
                due_date: boleto.due_date,
                created_at,
            }),
        }
    }

    pub fn charge_id(&self) -> &str {
        match self {
            PaymentDetailRow::Pix(row) => &row.charge_id,
            PaymentDetailRow::CreditCard(row) => &row.charge_id,
            PaymentDetailRow::Boleto(row) => &row.charge_id,
        }
    }
}

impl From<PaymentDetailRow> for PaymentDetails {
    fn from(value: PaymentDetailRow) -> Self {
        match value {
            PaymentDetailRow::Pix(row) => PaymentDetails::Pix(row.into()),
            PaymentDetailRow::CreditCard(row) => PaymentDetails::CreditCard(row.into()),
            PaymentDetailRow::Boleto(row) => PaymentDetails::Boleto(row.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_row_keeps_brand_wire_name() {
        let details = PaymentDetails::CreditCard(CreditCardDetails {
            last_four_digits: "0004".to_string(),
            brand: CardBrand::Mastercard,
            holder_name: "Joao Souza".to_string(),
            installments: 12,
        });

        let row = PaymentDetailRow::new("det_1".to_string(), "ch_1", &details, Utc::now());
        let PaymentDetailRow::CreditCard(card) = &row else {
            panic!("expected card row");
        };
        assert_eq!(card.brand, "mastercard");
        assert_eq!(row.charge_id(), "ch_1");

        assert_eq!(PaymentDetails::from(row), details);
    }

    #[test]
    fn boleto_row_round_trips() {
        let details = PaymentDetails::Boleto(BoletoDetails {
            barcode: "202501010000015050123456".to_string(),
            url: "https://boleto.example.com/view?barcode=202501010000015050123456".to_string(),
            due_date: Utc::now(),
        });
        let row = PaymentDetailRow::new("det_2".to_string(), "ch_2", &details, Utc::now());
        assert!(matches!(row, PaymentDetailRow::Boleto(_)));
        assert_eq!(PaymentDetails::from(row), details);
    }
}

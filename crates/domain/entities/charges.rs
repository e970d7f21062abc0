use anyhow::Result;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

use crate::{
    domain::{
        aggregates::charge::{Charge, ChargeState},
        value_objects::{
            charges::Metadata,
            enums::{charge_statuses::ChargeStatus, payment_methods::PaymentMethod},
            money::{from_minor_units, to_minor_units},
            payment_details::PaymentDetails,
        },
    },
    infra::db::postgres::schema::charges,
};

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = charges)]
pub struct ChargeEntity {
    pub id: String,
    pub customer_id: String,
    pub merchant_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub payment_method: String,
    pub status: String,
    pub description: Option<String>,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub expired_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
}

impl ChargeEntity {
    /// Rebuilds the aggregate from the header row and its detail row.
    pub fn into_charge(self, payment_details: Option<PaymentDetails>) -> Result<Charge> {
        let metadata = match self.metadata {
            Value::Object(map) => map,
            _ => Metadata::new(),
        };

        let charge = Charge::rehydrate(ChargeState {
            id: self.id,
            customer_id: self.customer_id,
            merchant_id: self.merchant_id,
            amount: from_minor_units(self.amount_minor),
            currency: self.currency,
            payment_method: PaymentMethod::from_str(&self.payment_method)?,
            status: ChargeStatus::from_str(&self.status)?,
            description: self.description,
            payment_details,
            metadata,
            created_at: self.created_at,
            updated_at: self.updated_at,
            paid_at: self.paid_at,
            expired_at: self.expired_at,
            failure_reason: self.failure_reason,
        })?;

        Ok(charge)
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = charges)]
pub struct InsertChargeEntity {
    pub id: String,
    pub customer_id: String,
    pub merchant_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub payment_method: String,
    pub status: String,
    pub description: Option<String>,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub expired_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
}

impl TryFrom<&Charge> for InsertChargeEntity {
    type Error = anyhow::Error;

    fn try_from(charge: &Charge) -> Result<Self> {
        Ok(Self {
            id: charge.id().to_string(),
            customer_id: charge.customer_id().to_string(),
            merchant_id: charge.merchant_id().to_string(),
            amount_minor: to_minor_units(charge.amount())?,
            currency: charge.currency().to_string(),
            payment_method: charge.payment_method().to_string(),
            status: charge.status().to_string(),
            description: charge.description().map(str::to_string),
            metadata: Value::Object(charge.metadata().clone()),
            created_at: charge.created_at(),
            updated_at: charge.updated_at(),
            paid_at: charge.paid_at(),
            expired_at: charge.expired_at(),
            failure_reason: charge.failure_reason().map(str::to_string),
        })
    }
}

/// Mutable header columns. `None` clears the column.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = charges, treat_none_as_null = true)]
pub struct UpdateChargeEntity {
    pub amount_minor: i64,
    pub status: String,
    pub description: Option<String>,
    pub metadata: Value,
    pub updated_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub expired_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
}

impl TryFrom<&Charge> for UpdateChargeEntity {
    type Error = anyhow::Error;

    fn try_from(charge: &Charge) -> Result<Self> {
        Ok(Self {
            amount_minor: to_minor_units(charge.amount())?,
            status: charge.status().to_string(),
            description: charge.description().map(str::to_string),
            metadata: Value::Object(charge.metadata().clone()),
            updated_at: charge.updated_at(),
            paid_at: charge.paid_at(),
            expired_at: charge.expired_at(),
            failure_reason: charge.failure_reason().map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        aggregates::charge::NewCharge,
        value_objects::{enums::card_brands::CardBrand, payment_details::CreditCardDetails},
    };
    use rust_decimal::Decimal;
    use serde_json::json;

    fn card_charge() -> Charge {
        let mut metadata = Metadata::new();
        metadata.insert("idempotencyKey".to_string(), json!("order-42"));
        Charge::create(NewCharge {
            id: Some("ch_1".to_string()),
            customer_id: "cus_1".to_string(),
            merchant_id: "mer_1".to_string(),
            amount: Decimal::new(150_50, 2),
            currency: None,
            payment_method: PaymentMethod::CreditCard,
            description: Some("Order 42".to_string()),
            payment_details: Some(PaymentDetails::CreditCard(CreditCardDetails {
                last_four_digits: "1486".to_string(),
                brand: CardBrand::Visa,
                holder_name: "Maria Silva".to_string(),
                installments: 3,
            })),
            metadata: Some(metadata),
        })
        .unwrap()
    }

    #[test]
    fn insert_row_uses_minor_units_and_wire_names() {
        let row = InsertChargeEntity::try_from(&card_charge()).unwrap();
        assert_eq!(row.amount_minor, 15050);
        assert_eq!(row.payment_method, "CREDIT_CARD");
        assert_eq!(row.status, "PENDING");
        assert_eq!(row.currency, "BRL");
        assert_eq!(row.metadata["idempotencyKey"], "order-42");
    }

    #[test]
    fn header_row_rebuilds_the_aggregate() {
        let charge = card_charge();
        let row = InsertChargeEntity::try_from(&charge).unwrap();
        let entity = ChargeEntity {
            id: row.id,
            customer_id: row.customer_id,
            merchant_id: row.merchant_id,
            amount_minor: row.amount_minor,
            currency: row.currency,
            payment_method: row.payment_method,
            status: row.status,
            description: row.description,
            metadata: row.metadata,
            created_at: row.created_at,
            updated_at: row.updated_at,
            paid_at: row.paid_at,
            expired_at: row.expired_at,
            failure_reason: row.failure_reason,
        };

        let rebuilt = entity
            .into_charge(charge.payment_details().cloned())
            .unwrap();
        assert_eq!(rebuilt, charge);
    }

    #[test]
    fn unknown_status_in_row_is_rejected() {
        let charge = card_charge();
        let row = InsertChargeEntity::try_from(&charge).unwrap();
        let entity = ChargeEntity {
            id: row.id,
            customer_id: row.customer_id,
            merchant_id: row.merchant_id,
            amount_minor: row.amount_minor,
            currency: row.currency,
            payment_method: row.payment_method,
            status: "SETTLED".to_string(),
            description: None,
            metadata: Value::Null,
            created_at: row.created_at,
            updated_at: row.updated_at,
            paid_at: None,
            expired_at: None,
            failure_reason: None,
        };
        assert!(entity.into_charge(None).is_err());
    }
}

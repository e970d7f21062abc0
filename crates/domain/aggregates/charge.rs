use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::{
    errors::ChargeError,
    value_objects::{
        charges::{IDEMPOTENCY_KEY_FIELD, Metadata},
        enums::{charge_statuses::ChargeStatus, payment_methods::PaymentMethod},
        payment_details::PaymentDetails,
        timestamps,
    },
};

pub const DEFAULT_CURRENCY: &str = "BRL";
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(999_999_999, 0, 0, false, 0);
const AMOUNT_SCALE: u32 = 2;

/// Input for [`Charge::create`]. Everything the caller may choose; status and
/// timestamps are not part of it.
#[derive(Debug, Clone)]
pub struct NewCharge {
    pub id: Option<String>,
    pub customer_id: String,
    pub merchant_id: String,
    pub amount: Decimal,
    pub currency: Option<String>,
    pub payment_method: PaymentMethod,
    pub description: Option<String>,
    pub payment_details: Option<PaymentDetails>,
    pub metadata: Option<Metadata>,
}

/// Full persisted state, used by the store to rebuild an aggregate.
#[derive(Debug, Clone)]
pub struct ChargeState {
    pub id: String,
    pub customer_id: String,
    pub merchant_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub status: ChargeStatus,
    pub description: Option<String>,
    pub payment_details: Option<PaymentDetails>,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub expired_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
}

/// Charge aggregate root.
///
/// Fields are private: status, amount and the lifecycle timestamps only move
/// through the transition methods below, each of which checks its source
/// state first.
///
/// ```text
/// PENDING --pay--> PAID --refund--> REFUNDED
///    |--fail----> FAILED
///    |--expire--> EXPIRED
///    `--cancel--> CANCELLED
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Charge {
    id: String,
    customer_id: String,
    merchant_id: String,
    amount: Decimal,
    currency: String,
    payment_method: PaymentMethod,
    status: ChargeStatus,
    description: Option<String>,
    payment_details: Option<PaymentDetails>,
    metadata: Metadata,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
    expired_at: Option<DateTime<Utc>>,
    failure_reason: Option<String>,
}

impl Charge {
    pub fn create(new_charge: NewCharge) -> Result<Self, ChargeError> {
        let now = timestamps::now();
        let charge = Self {
            id: new_charge
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| Uuid::new_v4().simple().to_string()),
            customer_id: new_charge.customer_id,
            merchant_id: new_charge.merchant_id,
            amount: new_charge.amount,
            currency: new_charge
                .currency
                .filter(|currency| !currency.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            payment_method: new_charge.payment_method,
            status: ChargeStatus::Pending,
            description: new_charge.description,
            payment_details: new_charge.payment_details,
            metadata: new_charge.metadata.unwrap_or_default(),
            created_at: now,
            updated_at: now,
            paid_at: None,
            expired_at: None,
            failure_reason: None,
        };

        charge.validate()?;
        Ok(charge)
    }

    pub fn rehydrate(state: ChargeState) -> Result<Self, ChargeError> {
        let charge = Self {
            id: state.id,
            customer_id: state.customer_id,
            merchant_id: state.merchant_id,
            amount: state.amount,
            currency: state.currency,
            payment_method: state.payment_method,
            status: state.status,
            description: state.description,
            payment_details: state.payment_details,
            metadata: state.metadata,
            created_at: state.created_at,
            updated_at: state.updated_at,
            paid_at: state.paid_at,
            expired_at: state.expired_at,
            failure_reason: state.failure_reason,
        };

        charge.validate()?;
        Ok(charge)
    }

    fn validate(&self) -> Result<(), ChargeError> {
        validate_amount(self.amount)?;

        if self.id.trim().is_empty() {
            return Err(ChargeError::validation("charge id is required"));
        }
        if self.customer_id.trim().is_empty() {
            return Err(ChargeError::validation("customer id is required"));
        }
        if self.merchant_id.trim().is_empty() {
            return Err(ChargeError::validation("merchant id is required"));
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ChargeError::validation(
                "currency must be a 3-letter ISO code",
            ));
        }

        if let Some(details) = &self.payment_details {
            details.validate_for(self.payment_method)?;
        }

        Ok(())
    }

    pub fn pay(&mut self) -> Result<(), ChargeError> {
        self.ensure_status(ChargeStatus::Pending, "pay")?;
        let now = timestamps::now();
        self.status = ChargeStatus::Paid;
        self.paid_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), ChargeError> {
        self.ensure_status(ChargeStatus::Pending, "fail")?;
        self.status = ChargeStatus::Failed;
        self.failure_reason = Some(reason.into());
        self.updated_at = timestamps::now();
        Ok(())
    }

    pub fn expire(&mut self) -> Result<(), ChargeError> {
        self.ensure_status(ChargeStatus::Pending, "expire")?;
        let now = timestamps::now();
        self.status = ChargeStatus::Expired;
        self.expired_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), ChargeError> {
        self.ensure_status(ChargeStatus::Pending, "cancel")?;
        self.status = ChargeStatus::Cancelled;
        self.updated_at = timestamps::now();
        Ok(())
    }

    pub fn refund(&mut self, reason: Option<String>) -> Result<(), ChargeError> {
        self.ensure_status(ChargeStatus::Paid, "refund")?;
        self.status = ChargeStatus::Refunded;
        self.failure_reason = reason;
        self.updated_at = timestamps::now();
        Ok(())
    }

    pub fn update_amount(&mut self, new_amount: Decimal) -> Result<(), ChargeError> {
        self.ensure_status(ChargeStatus::Pending, "update amount of")?;
        validate_amount(new_amount)?;
        self.amount = new_amount;
        self.updated_at = timestamps::now();
        Ok(())
    }

    pub fn update_description(&mut self, description: Option<String>) {
        self.description = description;
        self.updated_at = timestamps::now();
    }

    /// Shallow-merges `patch` into the metadata. The idempotency key is fixed
    /// at creation and cannot be changed or removed here.
    pub fn merge_metadata(&mut self, patch: Metadata) -> Result<(), ChargeError> {
        if let Some(new_key) = patch.get(IDEMPOTENCY_KEY_FIELD) {
            let current = self.metadata.get(IDEMPOTENCY_KEY_FIELD);
            if current != Some(new_key) {
                return Err(ChargeError::validation(
                    "idempotencyKey cannot be changed after creation",
                ));
            }
        }

        self.metadata.extend(patch);
        self.updated_at = timestamps::now();
        Ok(())
    }

    fn ensure_status(&self, expected: ChargeStatus, operation: &'static str) -> Result<(), ChargeError> {
        if self.status != expected {
            return Err(ChargeError::Operation {
                operation,
                status: self.status,
            });
        }
        Ok(())
    }

    pub fn is_pending(&self) -> bool {
        self.status == ChargeStatus::Pending
    }

    pub fn is_paid(&self) -> bool {
        self.status == ChargeStatus::Paid
    }

    pub fn is_failed(&self) -> bool {
        self.status == ChargeStatus::Failed
    }

    pub fn is_expired(&self) -> bool {
        self.status == ChargeStatus::Expired
    }

    pub fn can_be_paid(&self) -> bool {
        self.status == ChargeStatus::Pending
    }

    pub fn can_be_cancelled(&self) -> bool {
        self.status == ChargeStatus::Pending
    }

    pub fn can_be_refunded(&self) -> bool {
        self.status == ChargeStatus::Paid
    }

    /// True when the charge is still pending and its PIX expiry or boleto due
    /// date is at or before `now`.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_pending()
            && self
                .payment_details
                .as_ref()
                .and_then(PaymentDetails::deadline)
                .is_some_and(|deadline| deadline <= now)
    }

    pub fn idempotency_key(&self) -> Option<&str> {
        self.metadata
            .get(IDEMPOTENCY_KEY_FIELD)
            .and_then(Value::as_str)
            .filter(|key| !key.is_empty())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    pub fn merchant_id(&self) -> &str {
        &self.merchant_id
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn status(&self) -> ChargeStatus {
        self.status
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn payment_details(&self) -> Option<&PaymentDetails> {
        self.payment_details.as_ref()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    pub fn expired_at(&self) -> Option<DateTime<Utc>> {
        self.expired_at
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }
}

pub fn validate_amount(amount: Decimal) -> Result<(), ChargeError> {
    if amount <= Decimal::ZERO {
        return Err(ChargeError::validation("amount must be positive"));
    }
    if amount > MAX_AMOUNT {
        return Err(ChargeError::validation("amount exceeds maximum"));
    }
    if amount.normalize().scale() > AMOUNT_SCALE {
        return Err(ChargeError::validation(
            "amount must have at most 2 decimal places",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{
        enums::card_brands::CardBrand,
        payment_details::{CreditCardDetails, PixDetails},
    };
    use chrono::Duration;
    use rust_decimal::prelude::FromPrimitive;
    use serde_json::json;

    fn pix_details() -> PaymentDetails {
        PaymentDetails::Pix(PixDetails {
            qr_code: "pix://eyJ0eCI6IjEifQ==".to_string(),
            qr_code_base64: None,
            expires_at: Utc::now() + Duration::hours(24),
        })
    }

    fn new_pix_charge(amount: Decimal) -> NewCharge {
        NewCharge {
            id: None,
            customer_id: "cus_1".to_string(),
            merchant_id: "mer_1".to_string(),
            amount,
            currency: None,
            payment_method: PaymentMethod::Pix,
            description: Some("order #42".to_string()),
            payment_details: Some(pix_details()),
            metadata: None,
        }
    }

    fn pending_charge() -> Charge {
        Charge::create(new_pix_charge(Decimal::new(15050, 2))).unwrap()
    }

    #[test]
    fn create_applies_defaults() {
        let charge = pending_charge();
        assert!(!charge.id().is_empty());
        assert_eq!(charge.status(), ChargeStatus::Pending);
        assert_eq!(charge.currency(), DEFAULT_CURRENCY);
        assert!(charge.metadata().is_empty());
        assert_eq!(charge.created_at(), charge.updated_at());
    }

    #[test]
    fn timestamps_are_kept_at_microsecond_precision() {
        let mut charge = pending_charge();
        charge.pay().unwrap();

        for timestamp in [charge.created_at(), charge.updated_at(), charge.paid_at().unwrap()] {
            assert_eq!(timestamp.timestamp_subsec_nanos() % 1_000, 0);
        }
    }

    #[test]
    fn create_keeps_supplied_id() {
        let mut input = new_pix_charge(Decimal::ONE);
        input.id = Some("ch_fixed".to_string());
        assert_eq!(Charge::create(input).unwrap().id(), "ch_fixed");
    }

    #[test]
    fn amount_bounds_are_enforced() {
        for bad in [Decimal::ZERO, Decimal::NEGATIVE_ONE, Decimal::from(1_000_000_000)] {
            let err = Charge::create(new_pix_charge(bad)).unwrap_err();
            assert!(matches!(err, ChargeError::Validation(_)), "{bad} should fail");
        }

        let max = Charge::create(new_pix_charge(Decimal::from(999_999_999))).unwrap();
        assert_eq!(max.amount(), MAX_AMOUNT);
    }

    #[test]
    fn amount_messages_name_the_problem() {
        let err = Charge::create(new_pix_charge(Decimal::ZERO)).unwrap_err();
        assert!(err.to_string().contains("amount must be positive"));

        let err = Charge::create(new_pix_charge(Decimal::from(1_000_000_000))).unwrap_err();
        assert!(err.to_string().contains("amount exceeds maximum"));
    }

    #[test]
    fn sub_cent_amounts_are_rejected() {
        let amount = Decimal::from_f64(10.005).unwrap();
        assert!(Charge::create(new_pix_charge(amount)).is_err());
        // trailing zeros beyond two places are fine
        assert!(Charge::create(new_pix_charge(Decimal::new(10_5000, 4))).is_ok());
    }

    #[test]
    fn empty_customer_or_merchant_is_rejected() {
        let mut input = new_pix_charge(Decimal::ONE);
        input.customer_id = String::new();
        assert!(Charge::create(input).is_err());

        let mut input = new_pix_charge(Decimal::ONE);
        input.merchant_id = "  ".to_string();
        assert!(Charge::create(input).is_err());
    }

    #[test]
    fn details_must_match_method() {
        let mut input = new_pix_charge(Decimal::ONE);
        input.payment_method = PaymentMethod::CreditCard;
        assert!(matches!(
            Charge::create(input).unwrap_err(),
            ChargeError::Validation(_)
        ));

        let mut input = new_pix_charge(Decimal::ONE);
        input.payment_method = PaymentMethod::CreditCard;
        input.payment_details = Some(PaymentDetails::CreditCard(CreditCardDetails {
            last_four_digits: "1486".to_string(),
            brand: CardBrand::Visa,
            holder_name: "Maria Silva".to_string(),
            installments: 3,
        }));
        assert!(Charge::create(input).is_ok());
    }

    #[test]
    fn pay_moves_pending_to_paid() {
        let mut charge = pending_charge();
        let before = charge.updated_at();

        charge.pay().unwrap();

        assert_eq!(charge.status(), ChargeStatus::Paid);
        assert!(charge.paid_at().is_some());
        assert!(charge.updated_at() >= before);
        assert!(charge.can_be_refunded());
        assert!(!charge.can_be_paid());
    }

    #[test]
    fn refund_requires_paid() {
        let mut charge = pending_charge();
        let err = charge.refund(None).unwrap_err();
        assert!(matches!(
            err,
            ChargeError::Operation {
                operation: "refund",
                status: ChargeStatus::Pending
            }
        ));
        assert_eq!(err.to_string(), "cannot refund charge with status PENDING");

        charge.pay().unwrap();
        charge.refund(Some("customer request".to_string())).unwrap();
        assert_eq!(charge.status(), ChargeStatus::Refunded);
        assert_eq!(charge.failure_reason(), Some("customer request"));
    }

    #[test]
    fn fail_expire_cancel_only_from_pending() {
        let mut failed = pending_charge();
        failed.fail("insufficient funds").unwrap();
        assert!(failed.is_failed());
        assert_eq!(failed.failure_reason(), Some("insufficient funds"));

        let mut expired = pending_charge();
        expired.expire().unwrap();
        assert!(expired.is_expired());
        assert!(expired.expired_at().is_some());

        let mut cancelled = pending_charge();
        cancelled.cancel().unwrap();
        assert_eq!(cancelled.status(), ChargeStatus::Cancelled);

        for mut terminal in [failed, expired, cancelled] {
            assert!(terminal.pay().is_err());
            assert!(terminal.cancel().is_err());
            assert!(terminal.expire().is_err());
            assert!(terminal.fail("again").is_err());
            assert!(terminal.refund(None).is_err());
        }
    }

    #[test]
    fn refunded_is_terminal() {
        let mut charge = pending_charge();
        charge.pay().unwrap();
        charge.refund(None).unwrap();

        assert!(charge.refund(None).is_err());
        assert!(charge.pay().is_err());
        assert!(!charge.can_be_cancelled());
    }

    #[test]
    fn update_amount_revalidates_and_needs_pending() {
        let mut charge = pending_charge();
        charge.update_amount(Decimal::new(99_90, 2)).unwrap();
        assert_eq!(charge.amount(), Decimal::new(99_90, 2));

        assert!(charge.update_amount(Decimal::ZERO).is_err());
        assert_eq!(charge.amount(), Decimal::new(99_90, 2));

        charge.pay().unwrap();
        let err = charge.update_amount(Decimal::ONE).unwrap_err();
        assert!(err.to_string().contains("PAID"));
    }

    #[test]
    fn idempotency_key_comes_from_metadata() {
        let mut input = new_pix_charge(Decimal::ONE);
        input.metadata = Some(
            json!({ "idempotencyKey": "key-123", "orderId": 7 })
                .as_object()
                .cloned()
                .unwrap(),
        );
        let mut charge = Charge::create(input).unwrap();
        assert_eq!(charge.idempotency_key(), Some("key-123"));

        let patch = json!({ "idempotencyKey": "other" }).as_object().cloned().unwrap();
        assert!(charge.merge_metadata(patch).is_err());

        let patch = json!({ "note": "vip" }).as_object().cloned().unwrap();
        charge.merge_metadata(patch).unwrap();
        assert_eq!(charge.metadata().get("note"), Some(&json!("vip")));
        assert_eq!(charge.idempotency_key(), Some("key-123"));
    }

    #[test]
    fn overdue_only_when_pending_and_past_deadline() {
        let charge = pending_charge();
        assert!(!charge.is_overdue(Utc::now()));
        assert!(charge.is_overdue(Utc::now() + Duration::hours(25)));

        let mut paid = pending_charge();
        paid.pay().unwrap();
        assert!(!paid.is_overdue(Utc::now() + Duration::hours(25)));
    }
}

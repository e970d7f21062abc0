use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{
    aggregates::charge::Charge,
    value_objects::{
        enums::{charge_statuses::ChargeStatus, payment_methods::PaymentMethod},
        money::from_minor_units,
        payment_details::PaymentDetailsDto,
    },
};

/// Open, string-keyed metadata attached to a charge. Stored as JSONB.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

pub const IDEMPOTENCY_KEY_FIELD: &str = "idempotencyKey";

pub const DEFAULT_PAGE_LIMIT: i64 = 10;
pub const MAX_PAGE_LIMIT: i64 = 100;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PixRequest {
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Raw card data as sent by the caller. Only ever used to derive the stored
/// summary; the full number is never persisted.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreditCardRequest {
    pub number: String,
    pub holder_name: String,
    #[serde(default)]
    pub expiry_month: Option<String>,
    #[serde(default)]
    pub expiry_year: Option<String>,
    #[serde(default)]
    pub cvv: Option<String>,
    #[serde(default)]
    pub installments: Option<i32>,
}

impl std::fmt::Debug for CreditCardRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreditCardRequest")
            .field("number", &"[redacted]")
            .field("holder_name", &self.holder_name)
            .field("installments", &self.installments)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BoletoRequest {
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetailsRequest {
    #[serde(default)]
    pub pix: Option<PixRequest>,
    #[serde(default)]
    pub credit_card: Option<CreditCardRequest>,
    #[serde(default)]
    pub boleto: Option<BoletoRequest>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChargeRequest {
    pub customer_id: String,
    pub amount: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
    pub payment_method: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub payment_details: Option<PaymentDetailsRequest>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

/// What the creation use case receives: the request plus the tenant it runs for.
#[derive(Debug, Clone)]
pub struct CreateChargeCommand {
    pub merchant_id: String,
    pub customer_id: String,
    pub amount: Decimal,
    pub currency: Option<String>,
    pub payment_method: String,
    pub description: Option<String>,
    pub payment_details: Option<PaymentDetailsRequest>,
    pub metadata: Option<Metadata>,
}

impl CreateChargeCommand {
    pub fn new(merchant_id: String, request: CreateChargeRequest) -> Self {
        Self {
            merchant_id,
            customer_id: request.customer_id,
            amount: request.amount,
            currency: request.currency,
            payment_method: request.payment_method,
            description: request.description,
            payment_details: request.payment_details,
            metadata: request.metadata,
        }
    }

    pub fn idempotency_key(&self) -> Option<&str> {
        self.metadata
            .as_ref()?
            .get(IDEMPOTENCY_KEY_FIELD)?
            .as_str()
            .filter(|key| !key.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChargeRequest {
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefundChargeRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FailChargeRequest {
    pub reason: String,
}

/// Paging and filtering for the list queries of the store. `merchant_id`
/// narrows customer listings to one tenant.
#[derive(Debug, Clone, PartialEq)]
pub struct ListChargesFilter {
    pub merchant_id: Option<String>,
    pub page: i64,
    pub limit: i64,
    pub status: Option<ChargeStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl Default for ListChargesFilter {
    fn default() -> Self {
        Self {
            merchant_id: None,
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
            status: None,
            payment_method: None,
            start_date: None,
            end_date: None,
        }
    }
}

impl ListChargesFilter {
    pub fn page(&self) -> i64 {
        self.page.max(1)
    }

    /// Requested limit clamped to `1..=MAX_PAGE_LIMIT`.
    pub fn limit(&self) -> i64 {
        self.limit.clamp(1, MAX_PAGE_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChargePage {
    pub charges: Vec<Charge>,
    pub total: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListChargesQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub customer_id: Option<String>,
    pub status: Option<ChargeStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl ListChargesQuery {
    pub fn to_filter(&self) -> ListChargesFilter {
        ListChargesFilter {
            merchant_id: None,
            page: self.page.unwrap_or(1),
            limit: self.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
            status: self.status,
            payment_method: self.payment_method,
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsQuery {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let total_pages = if limit > 0 { (total + limit - 1) / limit } else { 0 };
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListChargesResponse {
    pub charges: Vec<ChargeResponse>,
    pub pagination: Pagination,
}

/// Per-status counts and amounts over a filtered set of charges.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChargeStatistics {
    pub total_charges: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub paid_charges: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub paid_amount: Decimal,
    pub pending_charges: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub pending_amount: Decimal,
    pub failed_charges: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub failed_amount: Decimal,
}

/// Row count and summed minor units for one slice of charges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MinorTotal {
    pub count: i64,
    pub amount_minor: i64,
}

impl ChargeStatistics {
    pub fn from_minor_totals(
        total: MinorTotal,
        paid: MinorTotal,
        pending: MinorTotal,
        failed: MinorTotal,
    ) -> Self {
        Self {
            total_charges: total.count,
            total_amount: from_minor_units(total.amount_minor),
            paid_charges: paid.count,
            paid_amount: from_minor_units(paid.amount_minor),
            pending_charges: pending.count,
            pending_amount: from_minor_units(pending.amount_minor),
            failed_charges: failed.count,
            failed_amount: from_minor_units(failed.amount_minor),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChargeResponse {
    pub id: String,
    pub customer_id: String,
    pub merchant_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub status: ChargeStatus,
    pub description: Option<String>,
    pub payment_details: PaymentDetailsDto,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub expired_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
}

impl From<&Charge> for ChargeResponse {
    fn from(charge: &Charge) -> Self {
        Self {
            id: charge.id().to_string(),
            customer_id: charge.customer_id().to_string(),
            merchant_id: charge.merchant_id().to_string(),
            amount: charge.amount(),
            currency: charge.currency().to_string(),
            payment_method: charge.payment_method(),
            status: charge.status(),
            description: charge.description().map(str::to_string),
            payment_details: PaymentDetailsDto::from(charge.payment_details()),
            metadata: charge.metadata().clone(),
            created_at: charge.created_at(),
            updated_at: charge.updated_at(),
            paid_at: charge.paid_at(),
            expired_at: charge.expired_at(),
            failure_reason: charge.failure_reason().map(str::to_string),
        }
    }
}

impl From<Charge> for ChargeResponse {
    fn from(charge: Charge) -> Self {
        Self::from(&charge)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpireOverdueResponse {
    pub expired_charges: usize,
}

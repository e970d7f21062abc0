use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;

use crate::domain::{
    aggregates::charge::Charge,
    value_objects::charges::{ChargePage, ChargeStatistics, ListChargesFilter},
};

/// Persistence contract for charges. Implementations own the mapping between
/// the aggregate and its rows; every read returns a freshly rebuilt aggregate.
#[async_trait]
#[automock]
pub trait ChargeRepository {
    /// Writes the header, its detail row and the idempotency record in one
    /// transaction. When the charge carries an idempotency key that its merchant
    /// already recorded, the previously stored charge is returned instead.
    async fn create(&self, charge: Charge) -> Result<Charge>;

    async fn find_by_id(&self, charge_id: String) -> Result<Option<Charge>>;

    async fn find_by_customer_id(
        &self,
        customer_id: String,
        filter: ListChargesFilter,
    ) -> Result<ChargePage>;

    async fn find_by_merchant_id(
        &self,
        merchant_id: String,
        filter: ListChargesFilter,
    ) -> Result<ChargePage>;

    async fn update(&self, charge: Charge) -> Result<Charge>;

    async fn delete(&self, charge_id: String) -> Result<()>;

    /// Keys are scoped to the merchant: the same key sent by two merchants
    /// names two different charges.
    async fn find_by_idempotency_key(
        &self,
        merchant_id: String,
        key: String,
    ) -> Result<Option<Charge>>;

    /// The merchant's pending charges, oldest first.
    async fn find_pending_charges(&self, merchant_id: String) -> Result<Vec<Charge>>;

    async fn get_statistics(
        &self,
        merchant_id: Option<String>,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
    ) -> Result<ChargeStatistics>;
}

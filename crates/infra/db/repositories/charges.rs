use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{
    PgConnection, RunQueryDsl, delete, insert_into,
    dsl::sql,
    pg::Pg,
    prelude::*,
    result::{DatabaseErrorKind, Error as DieselError},
    sql_types::BigInt,
    update,
};
use std::{collections::HashMap, sync::Arc};
use tracing::{info, warn};

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{
            boleto_payment_details, charges, credit_card_payment_details, idempotency_keys,
            pix_payment_details,
        },
    },
};
use domain::{
    aggregates::charge::Charge,
    entities::{
        charges::{ChargeEntity, InsertChargeEntity, UpdateChargeEntity},
        idempotency_keys::IdempotencyKeyEntity,
        payment_details::{
            BoletoDetailEntity, CreditCardDetailEntity, PaymentDetailRow, PixDetailEntity,
        },
    },
    repositories::charges::ChargeRepository,
    services::id_generator::IdGenerator,
    value_objects::{
        charges::{ChargePage, ChargeStatistics, ListChargesFilter, MinorTotal},
        enums::{charge_statuses::ChargeStatus, payment_methods::PaymentMethod},
        payment_details::PaymentDetails,
        timestamps,
    },
};

const IDEMPOTENCY_KEY_CONSTRAINT: &str = "idempotency_keys_merchant_key_unique";

enum CreateOutcome {
    Created,
    Replayed(String),
}

#[derive(Clone, Copy)]
enum ChargeOwner<'a> {
    Customer(&'a str),
    Merchant(&'a str),
}

pub struct ChargePostgres {
    db_pool: Arc<PgPoolSquad>,
    id_generator: Arc<dyn IdGenerator>,
}

impl ChargePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>, id_generator: Arc<dyn IdGenerator>) -> Self {
        Self {
            db_pool,
            id_generator,
        }
    }

    fn load_by_id(conn: &mut PgConnection, charge_id: &str) -> Result<Option<Charge>> {
        let entity = charges::table
            .filter(charges::id.eq(charge_id))
            .select(ChargeEntity::as_select())
            .first::<ChargeEntity>(conn)
            .optional()?;

        match entity {
            Some(entity) => Ok(Self::rebuild(conn, vec![entity])?.pop()),
            None => Ok(None),
        }
    }

    fn load_by_idempotency_key(
        conn: &mut PgConnection,
        merchant_id: &str,
        key: &str,
    ) -> Result<Option<Charge>> {
        let charge_id = Self::recorded_charge_id(conn, merchant_id, key)?;

        match charge_id {
            Some(charge_id) => Self::load_by_id(conn, &charge_id),
            None => Ok(None),
        }
    }

    fn recorded_charge_id(
        conn: &mut PgConnection,
        merchant_id: &str,
        key: &str,
    ) -> QueryResult<Option<String>> {
        idempotency_keys::table
            .filter(idempotency_keys::merchant_id.eq(merchant_id))
            .filter(idempotency_keys::key.eq(key))
            .select(idempotency_keys::charge_id)
            .first::<String>(conn)
            .optional()
    }

    /// Attaches detail rows to headers, one query per method table, and
    /// rebuilds each aggregate. Order of `entities` is kept.
    fn rebuild(conn: &mut PgConnection, entities: Vec<ChargeEntity>) -> Result<Vec<Charge>> {
        let mut details = Self::load_details(conn, &entities)?;

        entities
            .into_iter()
            .map(|entity| {
                let payment_details = details.remove(&entity.id).map(PaymentDetails::from);
                entity.into_charge(payment_details)
            })
            .collect()
    }

    fn load_details(
        conn: &mut PgConnection,
        entities: &[ChargeEntity],
    ) -> Result<HashMap<String, PaymentDetailRow>> {
        let mut pix_ids = Vec::new();
        let mut card_ids = Vec::new();
        let mut boleto_ids = Vec::new();

        for entity in entities {
            let ids = match PaymentMethod::from_str(&entity.payment_method)? {
                PaymentMethod::Pix => &mut pix_ids,
                PaymentMethod::CreditCard => &mut card_ids,
                PaymentMethod::Boleto => &mut boleto_ids,
            };
            ids.push(entity.id.as_str());
        }

        let mut rows = Vec::with_capacity(entities.len());

        if !pix_ids.is_empty() {
            let pix_rows = pix_payment_details::table
                .filter(pix_payment_details::charge_id.eq_any(pix_ids))
                .select(PixDetailEntity::as_select())
                .load::<PixDetailEntity>(conn)?;
            rows.extend(pix_rows.into_iter().map(PaymentDetailRow::Pix));
        }

        if !card_ids.is_empty() {
            let card_rows = credit_card_payment_details::table
                .filter(credit_card_payment_details::charge_id.eq_any(card_ids))
                .select(CreditCardDetailEntity::as_select())
                .load::<CreditCardDetailEntity>(conn)?;
            rows.extend(card_rows.into_iter().map(PaymentDetailRow::CreditCard));
        }

        if !boleto_ids.is_empty() {
            let boleto_rows = boleto_payment_details::table
                .filter(boleto_payment_details::charge_id.eq_any(boleto_ids))
                .select(BoletoDetailEntity::as_select())
                .load::<BoletoDetailEntity>(conn)?;
            rows.extend(boleto_rows.into_iter().map(PaymentDetailRow::Boleto));
        }

        Ok(rows
            .into_iter()
            .map(|row| (row.charge_id().to_string(), row))
            .collect())
    }

    fn insert_detail(tx: &mut PgConnection, row: &PaymentDetailRow) -> QueryResult<usize> {
        match row {
            PaymentDetailRow::Pix(row) => insert_into(pix_payment_details::table)
                .values(row)
                .execute(tx),
            PaymentDetailRow::CreditCard(row) => insert_into(credit_card_payment_details::table)
                .values(row)
                .execute(tx),
            PaymentDetailRow::Boleto(row) => insert_into(boleto_payment_details::table)
                .values(row)
                .execute(tx),
        }
    }

    fn update_detail(
        tx: &mut PgConnection,
        charge_id: &str,
        details: &PaymentDetails,
    ) -> QueryResult<usize> {
        match details {
            PaymentDetails::Pix(pix) => update(pix_payment_details::table)
                .filter(pix_payment_details::charge_id.eq(charge_id))
                .set((
                    pix_payment_details::qr_code.eq(&pix.qr_code),
                    pix_payment_details::qr_code_base64.eq(pix.qr_code_base64.as_deref()),
                    pix_payment_details::expires_at.eq(pix.expires_at),
                ))
                .execute(tx),
            PaymentDetails::CreditCard(card) => update(credit_card_payment_details::table)
                .filter(credit_card_payment_details::charge_id.eq(charge_id))
                .set((
                    credit_card_payment_details::last_four_digits.eq(&card.last_four_digits),
                    credit_card_payment_details::brand.eq(card.brand.as_str()),
                    credit_card_payment_details::holder_name.eq(&card.holder_name),
                    credit_card_payment_details::installments.eq(card.installments),
                ))
                .execute(tx),
            PaymentDetails::Boleto(boleto) => update(boleto_payment_details::table)
                .filter(boleto_payment_details::charge_id.eq(charge_id))
                .set((
                    boleto_payment_details::barcode.eq(&boleto.barcode),
                    boleto_payment_details::url.eq(&boleto.url),
                    boleto_payment_details::due_date.eq(boleto.due_date),
                ))
                .execute(tx),
        }
    }

    fn filtered_query<'a>(
        owner: ChargeOwner<'a>,
        filter: &'a ListChargesFilter,
    ) -> charges::BoxedQuery<'a, Pg> {
        let mut query = charges::table.into_boxed();

        query = match owner {
            ChargeOwner::Customer(customer_id) => {
                query.filter(charges::customer_id.eq(customer_id))
            }
            ChargeOwner::Merchant(merchant_id) => {
                query.filter(charges::merchant_id.eq(merchant_id))
            }
        };

        if let Some(merchant_id) = filter.merchant_id.as_deref() {
            query = query.filter(charges::merchant_id.eq(merchant_id));
        }

        if let Some(status) = filter.status {
            query = query.filter(charges::status.eq(status.as_str()));
        }

        if let Some(payment_method) = filter.payment_method {
            query = query.filter(charges::payment_method.eq(payment_method.as_str()));
        }

        if let Some(start_date) = filter.start_date {
            query = query.filter(charges::created_at.ge(start_date));
        }

        if let Some(end_date) = filter.end_date {
            query = query.filter(charges::created_at.le(end_date));
        }

        query
    }

    fn find_page(&self, owner: ChargeOwner<'_>, filter: &ListChargesFilter) -> Result<ChargePage> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let total = Self::filtered_query(owner, filter)
            .count()
            .get_result::<i64>(&mut conn)?;

        let entities = Self::filtered_query(owner, filter)
            .order(charges::created_at.desc())
            .limit(filter.limit())
            .offset(filter.offset())
            .select(ChargeEntity::as_select())
            .load::<ChargeEntity>(&mut conn)?;

        let charges = Self::rebuild(&mut conn, entities)?;

        Ok(ChargePage { charges, total })
    }
}

#[async_trait]
impl ChargeRepository for ChargePostgres {
    async fn create(&self, charge: Charge) -> Result<Charge> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let now = timestamps::now();
        let header = InsertChargeEntity::try_from(&charge)?;
        let detail = charge
            .payment_details()
            .map(|details| PaymentDetailRow::new(self.id_generator.next_id(), charge.id(), details, now));
        let key = charge.idempotency_key().map(str::to_string);
        let idempotency_record = key.as_ref().map(|key| IdempotencyKeyEntity {
            id: self.id_generator.next_id(),
            merchant_id: charge.merchant_id().to_string(),
            key: key.clone(),
            charge_id: charge.id().to_string(),
            created_at: now,
        });

        let outcome = conn.transaction::<CreateOutcome, DieselError, _>(|tx| {
            if let Some(key) = &key {
                if let Some(charge_id) = Self::recorded_charge_id(tx, charge.merchant_id(), key)? {
                    return Ok(CreateOutcome::Replayed(charge_id));
                }
            }

            insert_into(charges::table).values(&header).execute(tx)?;

            if let Some(detail) = &detail {
                Self::insert_detail(tx, detail)?;
            }

            if let Some(record) = &idempotency_record {
                insert_into(idempotency_keys::table)
                    .values(record)
                    .execute(tx)?;
            }

            Ok(CreateOutcome::Created)
        });

        match outcome {
            Ok(CreateOutcome::Created) => {
                info!(
                    charge_id = %charge.id(),
                    merchant_id = %charge.merchant_id(),
                    payment_method = %charge.payment_method(),
                    "charges: created"
                );
                Ok(charge)
            }
            Ok(CreateOutcome::Replayed(charge_id)) => {
                info!(%charge_id, "charges: idempotency key already recorded, replaying");
                Self::load_by_id(&mut conn, &charge_id)?
                    .ok_or_else(|| anyhow!("charge {charge_id} referenced by idempotency key is missing"))
            }
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, db_info))
                if db_info.constraint_name() == Some(IDEMPOTENCY_KEY_CONSTRAINT) =>
            {
                let key = key.unwrap_or_default();
                warn!(
                    merchant_id = %charge.merchant_id(),
                    idempotency_key = %key,
                    "charges: concurrent creation with same idempotency key, replaying winner"
                );
                Self::load_by_idempotency_key(&mut conn, charge.merchant_id(), &key)?
                    .ok_or_else(|| anyhow!("idempotency key {key} conflicted but no charge was found"))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn find_by_id(&self, charge_id: String) -> Result<Option<Charge>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        Self::load_by_id(&mut conn, &charge_id)
    }

    async fn find_by_customer_id(
        &self,
        customer_id: String,
        filter: ListChargesFilter,
    ) -> Result<ChargePage> {
        self.find_page(ChargeOwner::Customer(&customer_id), &filter)
    }

    async fn find_by_merchant_id(
        &self,
        merchant_id: String,
        filter: ListChargesFilter,
    ) -> Result<ChargePage> {
        self.find_page(ChargeOwner::Merchant(&merchant_id), &filter)
    }

    async fn update(&self, charge: Charge) -> Result<Charge> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let changes = UpdateChargeEntity::try_from(&charge)?;

        let updated = conn.transaction::<usize, DieselError, _>(|tx| {
            let updated = update(charges::table)
                .filter(charges::id.eq(charge.id()))
                .set(&changes)
                .execute(tx)?;

            if let Some(details) = charge.payment_details() {
                Self::update_detail(tx, charge.id(), details)?;
            }

            Ok(updated)
        })?;

        if updated == 0 {
            bail!("charge {} does not exist", charge.id());
        }

        info!(
            charge_id = %charge.id(),
            status = %charge.status(),
            "charges: updated"
        );

        Ok(charge)
    }

    async fn delete(&self, charge_id: String) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        conn.transaction::<(), DieselError, _>(|tx| {
            delete(pix_payment_details::table)
                .filter(pix_payment_details::charge_id.eq(&charge_id))
                .execute(tx)?;
            delete(credit_card_payment_details::table)
                .filter(credit_card_payment_details::charge_id.eq(&charge_id))
                .execute(tx)?;
            delete(boleto_payment_details::table)
                .filter(boleto_payment_details::charge_id.eq(&charge_id))
                .execute(tx)?;
            delete(idempotency_keys::table)
                .filter(idempotency_keys::charge_id.eq(&charge_id))
                .execute(tx)?;
            delete(charges::table)
                .filter(charges::id.eq(&charge_id))
                .execute(tx)?;

            Ok(())
        })?;

        info!(%charge_id, "charges: deleted");

        Ok(())
    }

    async fn find_by_idempotency_key(
        &self,
        merchant_id: String,
        key: String,
    ) -> Result<Option<Charge>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        Self::load_by_idempotency_key(&mut conn, &merchant_id, &key)
    }

    async fn find_pending_charges(&self, merchant_id: String) -> Result<Vec<Charge>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let entities = charges::table
            .filter(charges::merchant_id.eq(&merchant_id))
            .filter(charges::status.eq(ChargeStatus::Pending.as_str()))
            .order(charges::created_at.asc())
            .select(ChargeEntity::as_select())
            .load::<ChargeEntity>(&mut conn)?;

        Self::rebuild(&mut conn, entities)
    }

    async fn get_statistics(
        &self,
        merchant_id: Option<String>,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
    ) -> Result<ChargeStatistics> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let mut query = charges::table
            .select(sql::<StatisticsRow>(&statistics_select()))
            .into_boxed();

        if let Some(merchant_id) = &merchant_id {
            query = query.filter(charges::merchant_id.eq(merchant_id));
        }

        if let Some(start_date) = start_date {
            query = query.filter(charges::created_at.ge(start_date));
        }

        if let Some(end_date) = end_date {
            query = query.filter(charges::created_at.le(end_date));
        }

        let (total, total_minor, paid, paid_minor, pending, pending_minor, failed, failed_minor) =
            query.get_result::<(i64, i64, i64, i64, i64, i64, i64, i64)>(&mut conn)?;

        Ok(ChargeStatistics::from_minor_totals(
            MinorTotal {
                count: total,
                amount_minor: total_minor,
            },
            MinorTotal {
                count: paid,
                amount_minor: paid_minor,
            },
            MinorTotal {
                count: pending,
                amount_minor: pending_minor,
            },
            MinorTotal {
                count: failed,
                amount_minor: failed_minor,
            },
        ))
    }
}

type StatisticsRow = (
    BigInt,
    BigInt,
    BigInt,
    BigInt,
    BigInt,
    BigInt,
    BigInt,
    BigInt,
);

/// Counts and minor-unit sums per status in a single pass over the filtered
/// rows.
fn statistics_select() -> String {
    let mut columns = vec![
        "COUNT(*)".to_string(),
        "COALESCE(SUM(amount_minor), 0)::BIGINT".to_string(),
    ];
    for status in [ChargeStatus::Paid, ChargeStatus::Pending, ChargeStatus::Failed] {
        columns.push(format!("COUNT(*) FILTER (WHERE status = '{status}')"));
        columns.push(format!(
            "COALESCE(SUM(amount_minor) FILTER (WHERE status = '{status}'), 0)::BIGINT"
        ));
    }
    columns.join(", ")
}


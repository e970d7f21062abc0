use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::infra::db::postgres::schema::idempotency_keys;

/// Links a caller-supplied key to the charge it first created. Written once,
/// never updated.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable, Insertable)]
#[diesel(table_name = idempotency_keys)]
pub struct IdempotencyKeyEntity {
    pub id: String,
    pub merchant_id: String,
    pub key: String,
    pub charge_id: String,
    pub created_at: DateTime<Utc>,
}

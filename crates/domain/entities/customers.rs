use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::infra::db::postgres::schema::customers;

#[derive(Debug, Clone, PartialEq, Eq, Identifiable, Selectable, Queryable, Insertable)]
#[diesel(table_name = customers)]
pub struct CustomerEntity {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub document: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

use anyhow::{Result, anyhow};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::info;

use super::postgres_connection::PgPoolSquad;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub fn run_pending_migrations(db_pool: &PgPoolSquad) -> Result<()> {
    let mut conn = db_pool.get()?;

    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|err| anyhow!("failed to run migrations: {err}"))?;

    for version in &applied {
        info!(%version, "migrations: applied");
    }
    info!(count = applied.len(), "migrations: schema up to date");

    Ok(())
}

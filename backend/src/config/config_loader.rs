use anyhow::{Context, Result};
use charges::domain::services::payment_details::{
    DEFAULT_BOLETO_BASE_URL, DEFAULT_BOLETO_DUE_HOURS, DEFAULT_PIX_EXPIRATION_HOURS,
};
use url::Url;

use super::{
    config_model::{BackendServer, Database, DotEnvyConfig, PaymentDetailSettings},
    stage::Stage,
};

const DEFAULT_MAX_CONNECTIONS: u32 = 10;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    from_lookup(|key| std::env::var(key).ok())
}

fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<DotEnvyConfig> {
    let required = |key: &str| lookup(key).with_context(|| format!("{key} is invalid"));

    let backend_server = BackendServer {
        port: required("SERVER_PORT_BACKEND")?
            .parse()
            .context("SERVER_PORT_BACKEND is invalid")?,
        body_limit: required("SERVER_BODY_LIMIT")?
            .parse()
            .context("SERVER_BODY_LIMIT is invalid")?,
        timeout: required("SERVER_TIMEOUT")?
            .parse()
            .context("SERVER_TIMEOUT is invalid")?,
    };

    let database = Database {
        url: required("DATABASE_URL")?,
        max_connections: match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw.parse().context("DATABASE_MAX_CONNECTIONS is invalid")?,
            None => DEFAULT_MAX_CONNECTIONS,
        },
        run_migrations: lookup("RUN_MIGRATIONS")
            .map(|raw| matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false),
    };

    let payment_details = PaymentDetailSettings {
        boleto_base_url: Url::parse(
            &lookup("BOLETO_BASE_URL").unwrap_or_else(|| DEFAULT_BOLETO_BASE_URL.to_string()),
        )
        .context("BOLETO_BASE_URL is invalid")?,
        pix_expiration_hours: match lookup("PIX_EXPIRATION_HOURS") {
            Some(raw) => raw.parse().context("PIX_EXPIRATION_HOURS is invalid")?,
            None => DEFAULT_PIX_EXPIRATION_HOURS,
        },
        boleto_due_hours: match lookup("BOLETO_DUE_HOURS") {
            Some(raw) => raw.parse().context("BOLETO_DUE_HOURS is invalid")?,
            None => DEFAULT_BOLETO_DUE_HOURS,
        },
    };

    let stage = lookup("STAGE")
        .and_then(|raw| Stage::try_from(&raw).ok())
        .unwrap_or_default();

    Ok(DotEnvyConfig {
        backend_server,
        database,
        payment_details,
        stage,
    })
}

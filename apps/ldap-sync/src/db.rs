use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, PgConnection};
use tracing::info;

use crate::config::StoreConfig;
use crate::errors::SyncError;

pub fn connect_options(config: &StoreConfig) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .database(&config.database)
        .username(&config.user)
        .password(&config.password)
}

/// Opens a single PostgreSQL connection. The caller is responsible for closing it.
pub async fn connect(config: &StoreConfig) -> Result<PgConnection, SyncError> {
    info!("Connecting to PostgreSQL {}", config.host);

    let conn = PgConnection::connect_with(&connect_options(config))
        .await
        .map_err(|e| {
            SyncError::store(format!(
                "failed to connect to {}:{}/{}: {e}",
                config.host, config.port, config.database
            ))
        })?;

    info!("PostgreSQL connection established");
    Ok(conn)
}

//! Store Synchronizer. Bootstraps the `users` table and applies a batch of
//! records as one all-or-nothing upsert keyed by username.

pub mod upsert;

use async_trait::async_trait;
use sqlx::{Connection, PgConnection};
use tracing::{debug, info, instrument, warn};

use crate::config::StoreConfig;
use crate::db;
use crate::errors::SyncError;
use crate::models::user::{StoredUser, UserRecord};

use self::upsert::{build_upsert, dedupe_last_wins, CREATE_USERS_TABLE, MAX_ROWS_PER_STATEMENT};

/// Destination for user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Upserts `records` and returns the number of distinct usernames written.
    async fn sync_users(&self, records: &[UserRecord]) -> Result<u64, SyncError>;
}

/// [`UserStore`] backed by PostgreSQL. Each call opens and closes its own connection.
#[derive(Debug, Clone)]
pub struct PgUserStore {
    config: StoreConfig,
}

impl PgUserStore {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    /// Reads back every row, ordered by id.
    pub async fn list_users(&self) -> Result<Vec<StoredUser>, SyncError> {
        let mut conn = db::connect(&self.config).await?;
        let result = fetch_all_users(&mut conn).await;
        close(conn).await;
        result
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    #[instrument(skip(self, records), fields(host = %self.config.host, batch = records.len()))]
    async fn sync_users(&self, records: &[UserRecord]) -> Result<u64, SyncError> {
        let mut conn = db::connect(&self.config).await?;
        let result = sync_on(&mut conn, records).await;
        close(conn).await;

        let synced = result?;
        info!("Synchronized {synced} users");
        Ok(synced)
    }
}

/// Ensures the table exists, then upserts every record inside one transaction.
///
/// Any error drops the transaction uncommitted, which rolls it back.
pub async fn sync_on(conn: &mut PgConnection, records: &[UserRecord]) -> Result<u64, SyncError> {
    sqlx::query(CREATE_USERS_TABLE).execute(&mut *conn).await?;

    let unique = dedupe_last_wins(records);
    if unique.len() < records.len() {
        debug!(
            duplicates = records.len() - unique.len(),
            "Collapsed duplicate usernames, last entry wins"
        );
    }
    if unique.is_empty() {
        return Ok(0);
    }

    let mut tx = conn.begin().await?;
    for chunk in unique.chunks(MAX_ROWS_PER_STATEMENT) {
        let affected = build_upsert(chunk)
            .build()
            .execute(&mut *tx)
            .await?
            .rows_affected();
        debug!(rows = chunk.len(), affected, "Upsert statement applied");
    }
    tx.commit().await?;

    Ok(unique.len() as u64)
}

pub async fn fetch_all_users(conn: &mut PgConnection) -> Result<Vec<StoredUser>, SyncError> {
    Ok(sqlx::query_as::<_, StoredUser>(
        "SELECT id, username, first_name, last_name, email FROM users ORDER BY id",
    )
    .fetch_all(&mut *conn)
    .await?)
}

async fn close(conn: PgConnection) {
    if let Err(e) = conn.close().await {
        warn!(error = %e, "Error closing PostgreSQL connection");
    }
}

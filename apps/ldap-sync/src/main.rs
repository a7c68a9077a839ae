use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ldap_sync::config::Config;
use ldap_sync::directory::LdapDirectory;
use ldap_sync::store::PgUserStore;
use ldap_sync::sync;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("ldap_sync={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ldap-sync v{}", env!("CARGO_PKG_VERSION"));

    let directory = LdapDirectory::new(config.directory.clone());
    let store = PgUserStore::new(config.store.clone());

    let report = sync::run(&directory, &store).await?;

    info!(
        fetched = report.fetched,
        skipped = report.skipped,
        synchronized = report.synchronized,
        "Sync complete"
    );
    Ok(())
}

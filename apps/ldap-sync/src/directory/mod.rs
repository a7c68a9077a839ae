//! Directory Reader. Performs one bind and one subtree search against the LDAP
//! server, with every entry normalized into a [`UserRecord`].
//!
//! The connection is unbound on every path once it has been opened.

pub mod entry;

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError, Scope, SearchEntry};
use tracing::{debug, info, instrument, warn};

use crate::config::DirectoryConfig;
use crate::errors::SyncError;
use crate::models::user::UserRecord;

pub use entry::{map_entries, DirectoryEntry, MappedEntries, USER_ATTRIBUTES};

/// LDAP result code for a rejected bind.
const RC_INVALID_CREDENTIALS: u32 = 49;

/// Outcome of one directory fetch.
#[derive(Debug, Default)]
pub struct FetchedUsers {
    pub records: Vec<UserRecord>,
    /// Entries skipped because they could not be normalized (e.g. no `cn`).
    pub skipped: usize,
}

/// Source of user records for a sync run.
#[async_trait]
pub trait DirectorySource: Send + Sync {
    async fn fetch_users(&self) -> Result<FetchedUsers, SyncError>;
}

/// [`DirectorySource`] backed by an LDAP server.
#[derive(Debug, Clone)]
pub struct LdapDirectory {
    config: DirectoryConfig,
}

impl LdapDirectory {
    pub fn new(config: DirectoryConfig) -> Self {
        Self { config }
    }

    async fn connect(&self) -> Result<Ldap, SyncError> {
        let mut settings = LdapConnSettings::new();
        if let Some(timeout) = self.config.timeout {
            settings = settings.set_conn_timeout(timeout);
        }

        let (conn, ldap) = LdapConnAsync::with_settings(settings, &self.config.server)
            .await
            .map_err(|e| {
                SyncError::directory(format!(
                    "failed to connect to {}: {e}",
                    self.config.server
                ))
            })?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        Ok(ldap)
    }

    async fn bind(&self, ldap: &mut Ldap) -> Result<(), SyncError> {
        let (bind_dn, password) = match &self.config.credentials {
            Some(creds) => (creds.bind_dn.as_str(), creds.password.as_str()),
            None => ("", ""),
        };
        debug!(bind_dn = %bind_dn, anonymous = bind_dn.is_empty(), "Performing LDAP bind");

        if let Some(timeout) = self.config.timeout {
            ldap.with_timeout(timeout);
        }
        let result = ldap
            .simple_bind(bind_dn, password)
            .await
            .map_err(|e| SyncError::directory(format!("LDAP bind failed: {e}")))?;

        match result.rc {
            0 => Ok(()),
            RC_INVALID_CREDENTIALS => Err(SyncError::directory(format!(
                "invalid credentials for '{bind_dn}'"
            ))),
            rc => Err(SyncError::directory(format!(
                "LDAP bind failed with code {rc}: {}",
                result.text
            ))),
        }
    }

    async fn search(&self, ldap: &mut Ldap) -> Result<Vec<DirectoryEntry>, SyncError> {
        info!(filter = %self.config.filter, base_dn = %self.config.base_dn, "Fetching users");

        if let Some(timeout) = self.config.timeout {
            ldap.with_timeout(timeout);
        }
        let (entries, _) = ldap
            .search(
                &self.config.base_dn,
                Scope::Subtree,
                &self.config.filter,
                USER_ATTRIBUTES.to_vec(),
            )
            .await
            .and_then(|result| result.success())
            .map_err(|e: LdapError| SyncError::directory(format!("LDAP search failed: {e}")))?;

        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(DirectoryEntry::from)
            .collect())
    }

    async fn bind_and_search(&self, ldap: &mut Ldap) -> Result<Vec<DirectoryEntry>, SyncError> {
        self.bind(ldap).await?;
        self.search(ldap).await
    }
}

#[async_trait]
impl DirectorySource for LdapDirectory {
    #[instrument(skip(self), fields(server = %self.config.server))]
    async fn fetch_users(&self) -> Result<FetchedUsers, SyncError> {
        info!("Connecting to LDAP {}", self.config.server);
        let mut ldap = self.connect().await?;

        let result = self.bind_and_search(&mut ldap).await;

        if let Err(e) = ldap.unbind().await {
            warn!(error = %e, "Error during LDAP unbind");
        }

        let mapped = map_entries(result?);
        for rejected in &mapped.rejected {
            warn!("Skipping entry: {rejected}");
        }

        info!("Fetched {} users", mapped.records.len());
        Ok(FetchedUsers {
            records: mapped.records,
            skipped: mapped.rejected.len(),
        })
    }
}

use std::fmt;
use std::time::Duration;

use anyhow::{bail, Context, Result};

pub const DEFAULT_LDAP_SERVER: &str = "ldap://localhost";
pub const DEFAULT_USER_FILTER: &str = "(objectClass=person)";

/// Application configuration loaded from environment variables.
/// Every variable has a default suitable for a local development setup.
#[derive(Clone)]
pub struct Config {
    pub directory: DirectoryConfig,
    pub store: StoreConfig,
    pub rust_log: String,
}

/// Connection and search parameters for the LDAP directory.
#[derive(Clone)]
pub struct DirectoryConfig {
    pub server: String,
    /// Bind DN and password. `None` means an anonymous bind.
    pub credentials: Option<BindCredentials>,
    pub base_dn: String,
    pub filter: String,
    /// Connect and per-operation timeout. `None` keeps the client default.
    pub timeout: Option<Duration>,
}

#[derive(Clone)]
pub struct BindCredentials {
    pub bind_dn: String,
    pub password: String,
}

/// Connection parameters for the PostgreSQL store.
#[derive(Clone)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        // Empty values count as unset so `LDAP_USER=` in a .env file still means anonymous.
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let credentials = match (non_empty("LDAP_USER"), non_empty("LDAP_PASSWORD")) {
            (Some(bind_dn), Some(password)) => Some(BindCredentials { bind_dn, password }),
            // A simple bind with a DN and no password is an unauthenticated bind,
            // which servers answer as anonymous.
            (Some(_), None) => bail!("LDAP_USER is set but LDAP_PASSWORD is not"),
            (None, Some(_)) => bail!("LDAP_PASSWORD is set but LDAP_USER is not"),
            (None, None) => None,
        };

        let timeout = non_empty("LDAP_TIMEOUT_SECS")
            .map(|v| {
                v.parse::<u64>()
                    .context("LDAP_TIMEOUT_SECS must be a whole number of seconds")
            })
            .transpose()?
            .map(Duration::from_secs);

        let filter = non_empty("LDAP_USER_FILTER").unwrap_or_else(|| DEFAULT_USER_FILTER.to_string());

        Ok(Config {
            directory: DirectoryConfig {
                server: var_or("LDAP_SERVER", DEFAULT_LDAP_SERVER),
                credentials,
                base_dn: var_or("LDAP_BASE_DN", ""),
                filter,
                timeout,
            },
            store: StoreConfig {
                host: var_or("PGHOST", "localhost"),
                port: var_or("PGPORT", "5432")
                    .parse::<u16>()
                    .context("PGPORT must be a valid port number")?,
                database: var_or("PGDATABASE", "agendador"),
                user: var_or("PGUSER", "postgres"),
                password: var_or("PGPASSWORD", ""),
            },
            rust_log: var_or("RUST_LOG", "info"),
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("directory", &self.directory)
            .field("store", &self.store)
            .field("rust_log", &self.rust_log)
            .finish()
    }
}

impl fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("server", &self.server)
            .field(
                "bind_dn",
                &self.credentials.as_ref().map(|c| c.bind_dn.as_str()),
            )
            .field("base_dn", &self.base_dn)
            .field("filter", &self.filter)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl fmt::Debug for BindCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindCredentials")
            .field("bind_dn", &self.bind_dn)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

use thiserror::Error;

/// Which external service a connection error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Directory,
    Store,
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Directory => f.write_str("LDAP directory"),
            Target::Store => f.write_str("PostgreSQL store"),
        }
    }
}

/// Errors raised by the fetch-then-sync pipeline.
///
/// `Connection` and `Persistence` are fatal and abort the run.
/// `Data` describes a single malformed directory entry; the reader logs
/// it and skips the entry.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{target} connection error: {message}")]
    Connection { target: Target, message: String },

    #[error("Persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("Malformed directory entry {dn}: {message}")]
    Data { dn: String, message: String },
}

impl SyncError {
    pub fn directory(message: impl Into<String>) -> Self {
        SyncError::Connection {
            target: Target::Directory,
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        SyncError::Connection {
            target: Target::Store,
            message: message.into(),
        }
    }
}

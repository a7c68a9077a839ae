use std::collections::HashMap;

use ldap3::SearchEntry;

use crate::errors::SyncError;
use crate::models::user::UserRecord;

pub const ATTR_USERNAME: &str = "cn";
pub const ATTR_FIRST_NAME: &str = "givenName";
pub const ATTR_LAST_NAME: &str = "sn";
pub const ATTR_EMAIL: &str = "mail";

/// The attributes requested from the directory for every user entry.
pub const USER_ATTRIBUTES: [&str; 4] = [ATTR_USERNAME, ATTR_FIRST_NAME, ATTR_LAST_NAME, ATTR_EMAIL];

/// A directory entry as an explicit attribute-name → values mapping.
///
/// LDAP attribute names are case-insensitive, so names are stored lowercased.
#[derive(Debug, Clone, Default)]
pub struct DirectoryEntry {
    pub dn: String,
    attrs: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attrs: HashMap::new(),
        }
    }

    pub fn with_attr(mut self, name: &str, values: Vec<String>) -> Self {
        self.attrs.insert(name.to_ascii_lowercase(), values);
        self
    }

    /// First value of `name`, or `None` when the attribute is absent or has no values.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// First value of `name`, or `""` when the attribute is absent or has no values.
    pub fn attr_or_empty(&self, name: &str) -> String {
        self.attr(name).unwrap_or_default().to_string()
    }

    /// Normalizes the entry into a [`UserRecord`].
    ///
    /// `cn` is the join key and must be present and non-blank; every other
    /// attribute falls back to an empty string.
    pub fn to_user_record(&self) -> Result<UserRecord, SyncError> {
        let username = self
            .attr(ATTR_USERNAME)
            .filter(|cn| !cn.trim().is_empty())
            .ok_or_else(|| SyncError::Data {
                dn: self.dn.clone(),
                message: format!("missing required attribute '{ATTR_USERNAME}'"),
            })?;

        Ok(UserRecord {
            username: username.to_string(),
            first_name: self.attr_or_empty(ATTR_FIRST_NAME),
            last_name: self.attr_or_empty(ATTR_LAST_NAME),
            email: self.attr_or_empty(ATTR_EMAIL),
        })
    }
}

impl From<SearchEntry> for DirectoryEntry {
    fn from(entry: SearchEntry) -> Self {
        let attrs = entry
            .attrs
            .into_iter()
            .map(|(name, values)| (name.to_ascii_lowercase(), values))
            .collect();
        Self {
            dn: entry.dn,
            attrs,
        }
    }
}

/// Result of normalizing a batch of entries: the usable records plus the
/// entries that were skipped as malformed.
#[derive(Debug, Default)]
pub struct MappedEntries {
    pub records: Vec<UserRecord>,
    pub rejected: Vec<SyncError>,
}

/// Maps every entry, keeping directory order. Malformed entries are collected
/// in `rejected` instead of aborting the batch.
pub fn map_entries(entries: impl IntoIterator<Item = DirectoryEntry>) -> MappedEntries {
    let mut mapped = MappedEntries::default();
    for entry in entries {
        match entry.to_user_record() {
            Ok(record) => mapped.records.push(record),
            Err(e) => mapped.rejected.push(e),
        }
    }
    mapped
}

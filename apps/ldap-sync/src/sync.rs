//! The fetch-then-sync pipeline: read the directory once, then hand the
//! whole batch to the store. An empty fetch never touches the store.

use tracing::info;

use crate::directory::DirectorySource;
use crate::errors::SyncError;
use crate::store::UserStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub fetched: usize,
    pub skipped: usize,
    pub synchronized: u64,
}

pub async fn run(
    directory: &dyn DirectorySource,
    store: &dyn UserStore,
) -> Result<SyncReport, SyncError> {
    let fetched = directory.fetch_users().await?;

    let mut report = SyncReport {
        fetched: fetched.records.len(),
        skipped: fetched.skipped,
        synchronized: 0,
    };

    if fetched.records.is_empty() {
        info!("Directory returned no users; store left untouched");
        return Ok(report);
    }

    report.synchronized = store.sync_users(&fetched.records).await?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::directory::{map_entries, DirectoryEntry, FetchedUsers};
    use crate::models::user::UserRecord;
    use crate::store::upsert::dedupe_last_wins;

    struct FakeDirectory {
        entries: Vec<DirectoryEntry>,
        fail: bool,
    }

    impl FakeDirectory {
        fn with(entries: Vec<DirectoryEntry>) -> Self {
            Self {
                entries,
                fail: false,
            }
        }
    }

    #[async_trait]
    impl DirectorySource for FakeDirectory {
        async fn fetch_users(&self) -> Result<FetchedUsers, SyncError> {
            if self.fail {
                return Err(SyncError::directory("invalid credentials for 'cn=admin'"));
            }
            let mapped = map_entries(self.entries.clone());
            Ok(FetchedUsers {
                records: mapped.records,
                skipped: mapped.rejected.len(),
            })
        }
    }

    /// In-memory table keyed by username, with surrogate ids assigned on insert.
    #[derive(Default)]
    struct FakeStore {
        calls: Mutex<usize>,
        rows: Mutex<Vec<(i32, UserRecord)>>,
        fail: bool,
    }

    impl FakeStore {
        fn row(&self, username: &str) -> Option<(i32, UserRecord)> {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .find(|(_, r)| r.username == username)
                .cloned()
        }
    }

    #[async_trait]
    impl UserStore for FakeStore {
        async fn sync_users(&self, records: &[UserRecord]) -> Result<u64, SyncError> {
            *self.calls.lock().unwrap() += 1;
            if self.fail {
                return Err(SyncError::Persistence(sqlx::Error::PoolClosed));
            }
            let unique = dedupe_last_wins(records);
            let mut rows = self.rows.lock().unwrap();
            for record in &unique {
                match rows.iter_mut().find(|(_, r)| r.username == record.username) {
                    Some((_, existing)) => *existing = (*record).clone(),
                    None => {
                        let id = rows.len() as i32 + 1;
                        rows.push((id, (*record).clone()));
                    }
                }
            }
            Ok(unique.len() as u64)
        }
    }

    fn person(cn: &str, given: &str, sn: &str, mail: &str) -> DirectoryEntry {
        DirectoryEntry::new(format!("cn={cn},ou=people,dc=x,dc=com"))
            .with_attr("cn", vec![cn.to_string()])
            .with_attr("givenName", vec![given.to_string()])
            .with_attr("sn", vec![sn.to_string()])
            .with_attr("mail", vec![mail.to_string()])
    }

    #[tokio::test]
    async fn test_empty_fetch_never_contacts_store() {
        let directory = FakeDirectory::with(Vec::new());
        let store = FakeStore::default();

        let report = run(&directory, &store).await.unwrap();

        assert_eq!(report, SyncReport::default());
        assert_eq!(*store.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_only_malformed_entries_never_contacts_store() {
        let directory = FakeDirectory::with(vec![DirectoryEntry::new("uid=nocn,dc=x,dc=com")]);
        let store = FakeStore::default();

        let report = run(&directory, &store).await.unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(*store.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_directory_failure_aborts_before_store() {
        let directory = FakeDirectory {
            entries: vec![person("jdoe", "Jane", "Doe", "jdoe@x.com")],
            fail: true,
        };
        let store = FakeStore::default();

        let err = run(&directory, &store).await.unwrap_err();

        assert!(matches!(err, SyncError::Connection { .. }));
        assert_eq!(*store.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_as_error() {
        let directory = FakeDirectory::with(vec![person("jdoe", "Jane", "Doe", "jdoe@x.com")]);
        let store = FakeStore {
            fail: true,
            ..FakeStore::default()
        };

        let err = run(&directory, &store).await.unwrap_err();
        assert!(matches!(err, SyncError::Persistence(_)));
    }

    #[tokio::test]
    async fn test_end_to_end_update_keeps_id() {
        let store = FakeStore::default();

        let first = FakeDirectory::with(vec![person("jdoe", "Jane", "Doe", "jdoe@x.com")]);
        let report = run(&first, &store).await.unwrap();
        assert_eq!(report.synchronized, 1);
        let (id_before, row) = store.row("jdoe").unwrap();
        assert_eq!(row.last_name, "Doe");

        let second = FakeDirectory::with(vec![person("jdoe", "Jane", "Smith", "jdoe@x.com")]);
        run(&second, &store).await.unwrap();
        let (id_after, row) = store.row("jdoe").unwrap();
        assert_eq!(row.last_name, "Smith");
        assert_eq!(id_before, id_after);
        assert_eq!(store.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_usernames_last_entry_wins() {
        let directory = FakeDirectory::with(vec![
            person("jdoe", "Jane", "Doe", "old@x.com"),
            person("jdoe", "Jane", "Doe", "new@x.com"),
        ]);
        let store = FakeStore::default();

        let report = run(&directory, &store).await.unwrap();

        assert_eq!(report.fetched, 2);
        assert_eq!(report.synchronized, 1);
        assert_eq!(store.row("jdoe").unwrap().1.email, "new@x.com");
    }
}

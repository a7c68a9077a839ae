use sqlx::FromRow;

/// A directory user normalized for the store. `username` is the natural key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// A row of the `users` table as persisted.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct StoredUser {
    pub id: i32,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

impl StoredUser {
    /// The record this row represents, with NULL columns read as empty strings.
    pub fn to_record(&self) -> UserRecord {
        UserRecord {
            username: self.username.clone(),
            first_name: self.first_name.clone().unwrap_or_default(),
            last_name: self.last_name.clone().unwrap_or_default(),
            email: self.email.clone().unwrap_or_default(),
        }
    }
}

use std::collections::HashMap;

use sqlx::{Postgres, QueryBuilder};

use crate::models::user::UserRecord;

pub const CREATE_USERS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id SERIAL PRIMARY KEY,
        username TEXT UNIQUE,
        first_name TEXT,
        last_name TEXT,
        email TEXT
    )
"#;

const INSERT_PREFIX: &str = "INSERT INTO users (username, first_name, last_name, email) ";

const ON_CONFLICT_UPDATE: &str = " ON CONFLICT (username) DO UPDATE SET \
    first_name = EXCLUDED.first_name, \
    last_name = EXCLUDED.last_name, \
    email = EXCLUDED.email";

/// PostgreSQL caps a statement at 65535 bind parameters.
const MAX_BIND_PARAMS: usize = 65_535;
const PARAMS_PER_ROW: usize = 4;
pub const MAX_ROWS_PER_STATEMENT: usize = MAX_BIND_PARAMS / PARAMS_PER_ROW;

/// Collapses records sharing a username so the last one wins.
///
/// A single `INSERT ... ON CONFLICT DO UPDATE` may not touch the same key
/// twice, so duplicates have to be resolved before the statement is built.
/// Output order follows the first appearance of each username.
pub fn dedupe_last_wins(records: &[UserRecord]) -> Vec<&UserRecord> {
    let mut slots: HashMap<&str, usize> = HashMap::with_capacity(records.len());
    let mut unique: Vec<&UserRecord> = Vec::with_capacity(records.len());

    for record in records {
        match slots.get(record.username.as_str()) {
            Some(&slot) => unique[slot] = record,
            None => {
                slots.insert(record.username.as_str(), unique.len());
                unique.push(record);
            }
        }
    }
    unique
}

/// Builds one multi-row upsert for `rows`. `rows` must be non-empty and free
/// of duplicate usernames.
pub fn build_upsert<'a>(rows: &[&'a UserRecord]) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new(INSERT_PREFIX);
    qb.push_values(rows.iter().copied(), |mut row, record| {
        row.push_bind(record.username.as_str())
            .push_bind(record.first_name.as_str())
            .push_bind(record.last_name.as_str())
            .push_bind(record.email.as_str());
    });
    qb.push(ON_CONFLICT_UPDATE);
    qb
}

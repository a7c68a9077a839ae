//! Synchronizes LDAP user entries into a PostgreSQL `users` table.
//!
//! One run is one batch: a single directory search followed by a single
//! upsert transaction keyed by username.

pub mod config;
pub mod db;
pub mod directory;
pub mod errors;
pub mod models;
pub mod store;
pub mod sync;

//! Read side of the lock schedule.

use crate::db::{with_connection, Database};
use crate::error::AppError;
use crate::models::LockRecord;
use std::sync::{Arc, Mutex};

/// A parsed lock as the engine sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockEntry {
    pub locked_until_ms: i64,
    pub message: Option<String>,
}

/// Point lookups keyed by application identifier.
pub trait LockStore: Send + Sync {
    /// `Ok(None)` when no lock was ever written for `application_id`.
    /// Unparseable stored data is an `AppError::MalformedLock`.
    fn get(&self, application_id: &str) -> Result<Option<LockEntry>, AppError>;
}

pub struct SqliteLockStore {
    db: Arc<Mutex<Database>>,
}

impl SqliteLockStore {
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }
}

impl LockStore for SqliteLockStore {
    fn get(&self, application_id: &str) -> Result<Option<LockEntry>, AppError> {
        let record = with_connection(&self.db, "load lock", |conn| {
            LockRecord::find_by_application(conn, application_id)
        })?;

        record
            .map(|r| {
                Ok(LockEntry {
                    locked_until_ms: r.locked_until_ms()?,
                    message: r.message,
                })
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_db;

    fn store_with(records: &[(&str, &str, Option<&str>)]) -> (SqliteLockStore, tempfile::TempDir) {
        let (db, dir) = setup_test_db();
        for (app, until, message) in records {
            db.connection()
                .execute(
                    "INSERT INTO locks (application_id, locked_until, message, updated_at)
                     VALUES (?1, ?2, ?3, 0)",
                    rusqlite::params![app, until, message],
                )
                .unwrap();
        }
        (SqliteLockStore::new(Arc::new(Mutex::new(db))), dir)
    }

    #[test]
    fn test_get_absent() {
        let (store, _dir) = store_with(&[]);
        assert_eq!(store.get("com.example.game").unwrap(), None);
    }

    #[test]
    fn test_get_parses_expiry_and_message() {
        let (store, _dir) = store_with(&[("com.example.game", "1700000000000", Some("later"))]);
        assert_eq!(
            store.get("com.example.game").unwrap(),
            Some(LockEntry {
                locked_until_ms: 1_700_000_000_000,
                message: Some("later".into()),
            })
        );
    }

    #[test]
    fn test_get_malformed_expiry_is_error() {
        let (store, _dir) = store_with(&[("com.example.game", "soon", None)]);
        assert!(matches!(
            store.get("com.example.game"),
            Err(AppError::MalformedLock { .. })
        ));
    }

    #[test]
    fn test_get_only_matches_exact_identifier() {
        let (store, _dir) = store_with(&[("com.example.game", "1", None)]);
        assert_eq!(store.get("com.example").unwrap(), None);
        assert_eq!(store.get("com.example.game2").unwrap(), None);
    }
}

use crate::error::AppError;
use crate::validation::{validate_application_id, validate_lock_message, validate_locked_until};
use rusqlite::{params, Connection, OptionalExtension, Result};
use std::time::{SystemTime, UNIX_EPOCH};

/// A restriction on one application, as persisted.
///
/// `locked_until` is kept exactly as stored; it is parsed on demand so that a
/// corrupt value only affects the record it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRecord {
    pub application_id: String,
    pub locked_until: String,
    pub message: Option<String>,
    pub updated_at: i64,
}

fn current_timestamp_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| i64::try_from(d.as_secs()).ok())
        .unwrap_or(0)
}

impl LockRecord {
    pub fn new(application_id: &str, locked_until_ms: i64, message: Option<&str>) -> Self {
        Self {
            application_id: application_id.to_string(),
            locked_until: locked_until_ms.to_string(),
            message: message.map(str::to_string),
            updated_at: current_timestamp_secs(),
        }
    }

    /// Validate and persist a lock, replacing any previous lock for the same application.
    pub fn create(
        conn: &Connection,
        application_id: &str,
        locked_until_ms: i64,
        message: Option<&str>,
    ) -> std::result::Result<Self, AppError> {
        let application_id = validate_application_id(application_id)?;
        validate_locked_until(locked_until_ms)?;
        validate_lock_message(message)?;

        let record = Self::new(application_id, locked_until_ms, message);
        record.save(conn)?;
        Ok(record)
    }

    /// Insert or replace; the table is keyed by application id.
    pub fn save(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            "INSERT INTO locks (application_id, locked_until, message, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(application_id) DO UPDATE SET
                locked_until = excluded.locked_until,
                message = excluded.message,
                updated_at = excluded.updated_at",
            params![
                self.application_id,
                self.locked_until,
                self.message,
                self.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn find_by_application(conn: &Connection, application_id: &str) -> Result<Option<Self>> {
        conn.query_row(
            "SELECT application_id, locked_until, message, updated_at
             FROM locks WHERE application_id = ?1",
            [application_id],
            Self::from_row,
        )
        .optional()
    }

    pub fn find_all(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT application_id, locked_until, message, updated_at
             FROM locks ORDER BY application_id",
        )?;

        let rows = stmt.query_map([], Self::from_row)?;
        rows.collect()
    }

    /// Returns true if a record was removed.
    pub fn delete(conn: &Connection, application_id: &str) -> Result<bool> {
        let affected = conn.execute("DELETE FROM locks WHERE application_id = ?1", [application_id])?;
        Ok(affected > 0)
    }

    /// Parse the stored expiry as epoch milliseconds.
    pub fn locked_until_ms(&self) -> std::result::Result<i64, AppError> {
        self.locked_until
            .trim()
            .parse::<i64>()
            .map_err(|e| AppError::MalformedLock {
                application_id: self.application_id.clone(),
                reason: format!("locked_until {:?}: {e}", self.locked_until),
            })
    }

    fn from_row(row: &rusqlite::Row<'_>) -> Result<Self> {
        Ok(Self {
            application_id: row.get(0)?,
            locked_until: row.get(1)?,
            message: row.get(2)?,
            updated_at: row.get(3)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_db;

    #[test]
    fn test_find_by_application_none_when_empty() {
        let (db, _dir) = setup_test_db();
        let found = LockRecord::find_by_application(db.connection(), "com.example.game").unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_create_and_find() {
        let (db, _dir) = setup_test_db();
        let conn = db.connection();

        LockRecord::create(conn, "com.example.game", 1_000_000, Some("Homework first")).unwrap();

        let found = LockRecord::find_by_application(conn, "com.example.game")
            .unwrap()
            .unwrap();
        assert_eq!(found.locked_until_ms().unwrap(), 1_000_000);
        assert_eq!(found.message.as_deref(), Some("Homework first"));
    }

    #[test]
    fn test_create_trims_application_id() {
        let (db, _dir) = setup_test_db();
        let record = LockRecord::create(db.connection(), " com.example.game ", 5, None).unwrap();
        assert_eq!(record.application_id, "com.example.game");
    }

    #[test]
    fn test_create_rejects_invalid_input() {
        let (db, _dir) = setup_test_db();
        let conn = db.connection();

        assert!(matches!(
            LockRecord::create(conn, "", 5, None),
            Err(AppError::InvalidInput { field: "application_id", .. })
        ));
        assert!(matches!(
            LockRecord::create(conn, "com.example.game", -5, None),
            Err(AppError::InvalidInput { field: "locked_until", .. })
        ));
        assert!(LockRecord::find_all(conn).unwrap().is_empty());
    }

    #[test]
    fn test_save_replaces_existing_record() {
        let (db, _dir) = setup_test_db();
        let conn = db.connection();

        LockRecord::create(conn, "com.example.game", 100, Some("first")).unwrap();
        LockRecord::create(conn, "com.example.game", 200, None).unwrap();

        let all = LockRecord::find_all(conn).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].locked_until_ms().unwrap(), 200);
        assert!(all[0].message.is_none());
    }

    #[test]
    fn test_find_all_ordered_by_application() {
        let (db, _dir) = setup_test_db();
        let conn = db.connection();

        LockRecord::create(conn, "org.video", 1, None).unwrap();
        LockRecord::create(conn, "com.game", 1, None).unwrap();

        let ids: Vec<_> = LockRecord::find_all(conn)
            .unwrap()
            .into_iter()
            .map(|r| r.application_id)
            .collect();
        assert_eq!(ids, vec!["com.game", "org.video"]);
    }

    #[test]
    fn test_delete() {
        let (db, _dir) = setup_test_db();
        let conn = db.connection();

        LockRecord::create(conn, "com.example.game", 100, None).unwrap();
        assert!(LockRecord::delete(conn, "com.example.game").unwrap());
        assert!(!LockRecord::delete(conn, "com.example.game").unwrap());
        assert!(LockRecord::find_by_application(conn, "com.example.game")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_locked_until_ms_malformed() {
        let record = LockRecord {
            application_id: "com.example.game".into(),
            locked_until: "tomorrow".into(),
            message: None,
            updated_at: 0,
        };
        assert!(matches!(
            record.locked_until_ms(),
            Err(AppError::MalformedLock { .. })
        ));
    }
}

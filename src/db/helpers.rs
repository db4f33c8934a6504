// src/db/helpers.rs

use crate::db::Database;
use crate::error::AppError;
use log::{error, warn};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

/// Execute a database operation with lock recovery and error logging.
///
/// A poisoned mutex is recovered rather than propagated: the connection
/// itself is still usable after a panic in another holder.
///
/// # Example
/// ```ignore
/// with_connection(&db, "load lock", |conn| {
///     LockRecord::find_by_application(conn, "com.example.game")
/// })
/// ```
pub fn with_connection<F, T>(db: &Arc<Mutex<Database>>, operation: &str, f: F) -> Result<T, AppError>
where
    F: FnOnce(&Connection) -> rusqlite::Result<T>,
{
    let db = db.lock().unwrap_or_else(|poisoned| {
        warn!("Database mutex was poisoned during {operation}, recovering");
        poisoned.into_inner()
    });

    f(db.connection()).map_err(|e| {
        error!("Failed to {operation}: {e}");
        AppError::Database(e)
    })
}

pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS locks (
    application_id TEXT PRIMARY KEY,
    locked_until TEXT NOT NULL,
    message TEXT,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_locks_locked_until ON locks(locked_until);
";

/// Bumped whenever `SCHEMA` changes shape.
pub const SCHEMA_VERSION: i32 = 1;

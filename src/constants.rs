// src/constants.rs

/// Milliseconds in one minute (60 * 1000)
pub const MS_PER_MINUTE: i64 = 60_000;

/// How long a blocking notice stays up before it dismisses itself
pub const NOTICE_DISMISS_MS: u64 = 3000;

/// Default cadence for polling the foreground application
pub const FOREGROUND_POLL_MS: u64 = 250;

/// Maximum application identifier length
pub const MAX_APPLICATION_ID_LEN: usize = 255;

/// Maximum custom lock message length
pub const MAX_LOCK_MESSAGE_LEN: usize = 500;

/// Bridge messages larger than this are rejected (1 MiB)
pub const MAX_BRIDGE_MESSAGE_SIZE: usize = 1024 * 1024;

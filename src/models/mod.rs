pub mod lock_record;

pub use lock_record::LockRecord;

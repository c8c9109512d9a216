pub mod json_backend;
pub mod memory;

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{AttendanceEntry, CalendarDay};

pub use json_backend::{JsonLedgerStore, LedgerFile, CURRENT_SCHEMA_VERSION};
pub use memory::InMemoryLedgerStore;

/// Failures reported by a [`LedgerStore`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store busy: {0}")]
    Busy(String),
    #[error("Write conflict: {0}")]
    Conflict(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Storage I/O error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serde(String),
}

impl StoreError {
    /// Busy and conflicting writes clear up on their own and may be retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Busy(_) | StoreError::Conflict(_))
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serde(err.to_string())
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Persistence contract the engine needs from the ledger's backing store.
///
/// Every call is synchronous and may fail. Inserts must reject an id that is
/// already taken with [`StoreError::Conflict`].
pub trait LedgerStore: Send + Sync {
    fn list_calendar_days(&self) -> StoreResult<Vec<CalendarDay>>;
    fn insert_calendar_day(&self, day: &CalendarDay) -> StoreResult<()>;
    /// Removes the day together with every entry that references it.
    fn delete_calendar_day(&self, day: &CalendarDay) -> StoreResult<()>;
    fn list_entries(&self) -> StoreResult<Vec<AttendanceEntry>>;
    fn insert_entry(&self, entry: &AttendanceEntry) -> StoreResult<()>;
    fn update_entry(&self, entry: &AttendanceEntry) -> StoreResult<()>;
    fn delete_entry(&self, entry: &AttendanceEntry) -> StoreResult<()>;
    /// Dates flagged by holiday marking.
    fn list_holidays(&self) -> StoreResult<Vec<NaiveDate>>;
    /// Rejects a date that is already flagged with [`StoreError::Conflict`].
    fn insert_holiday(&self, date: NaiveDate) -> StoreResult<()>;
    fn delete_holiday(&self, date: NaiveDate) -> StoreResult<()>;
}

use thiserror::Error;

use crate::storage::StoreError;

/// Error type surfaced by ledger reconciliation and the services built on it.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Write failed after {attempts} attempt(s): {reason}")]
    WriteFailed { attempts: u32, reason: String },
    #[error("Ledger invariant violated: {0}")]
    InvariantViolation(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Edit was cancelled before it reached the ledger")]
    Cancelled,
}

impl LedgerError {
    /// Transient store failures are worth another attempt; everything else is final.
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Store(err) if err.is_transient())
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_busy_and_conflict_are_transient() {
        assert!(LedgerError::from(StoreError::Busy("locked".into())).is_transient());
        assert!(LedgerError::from(StoreError::Conflict("dup id".into())).is_transient());
        assert!(!LedgerError::from(StoreError::Io("disk".into())).is_transient());
        assert!(!LedgerError::InvariantViolation("two days".into()).is_transient());
    }
}

#![doc(test(attr(deny(warnings))))]

//! Attendance Core turns per-student daily time punches into attendance
//! statuses, keeps the calendar-day and attendance-entry ledger consistent
//! under concurrent edits, and aggregates statuses into payroll credit.
//!
//! Callers open a [`LedgerContext`](crate::core::LedgerContext) over a
//! [`LedgerStore`](crate::storage::LedgerStore) and pass it to the services in
//! [`services`](crate::core::services).

pub mod config;
pub mod core;
pub mod domain;
pub mod errors;
pub mod storage;
pub mod utils;

use std::sync::Once;

pub use errors::{LedgerError, Result};

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        let build = utils::build_info::BUILD;
        tracing::info!(build = %build.summary(), "Attendance Core tracing initialized.");
    });
}

pub mod ledger_context;
pub mod reconcile;
pub mod retry;
pub mod services;
pub mod status_cache;
pub mod utils;

pub use ledger_context::{EditGate, LedgerContext};
pub use retry::RetryPolicy;
pub use status_cache::{CacheSettings, StatusCache};

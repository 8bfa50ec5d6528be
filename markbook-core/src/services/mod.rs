// src/services/mod.rs

pub mod audit;   // JSONL logbook + tracing for domain events
pub mod retry;   // bounded backoff for storage I/O
pub mod store;   // the ONLY ledger file writer

// Public API
pub use audit::Audit;
pub use retry::RetryPolicy;
pub use store::LedgerStore;

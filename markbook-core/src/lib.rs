// markbook-core/src/lib.rs
//! Subject ledger, flat-file store and credit-weighted mark reports.
//!
//! - `ledger`   : the in-memory model (`Subject`, `Ledger`) and its two mutations.
//! - `report`   : pure rendering of a ledger snapshot into the results table.
//! - `services` : file-backed `LedgerStore`, retry policy, audit logbook.
//! - `commands` : the chat-facing surface (conversation state + replies).

pub mod commands;
pub mod config;
pub mod error;
pub mod ledger;
pub mod report;
pub mod services;
pub mod utils;

pub use error::{LedgerError, LedgerResult};
pub use ledger::{Identity, Ledger, Subject};
pub use report::{summarize, Report};

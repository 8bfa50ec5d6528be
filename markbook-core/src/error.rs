// src/error.rs
use std::path::PathBuf;

use thiserror::Error;

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// User text that does not match the expected shape.
    #[error("could not parse input: {0}")]
    Parse(String),

    #[error("subject `{0}` already exists")]
    DuplicateSubject(String),

    #[error("subject `{0}` not found")]
    SubjectNotFound(String),

    #[error("invalid delta for `{name}`: {got}/{max}")]
    InvalidDelta { name: String, got: f64, max: f64 },

    #[error("invalid credits for `{name}`: {credits}")]
    InvalidCredits { name: String, credits: f64 },

    #[error("invalid identity `{0}`")]
    InvalidIdentity(String),

    #[error("corrupt ledger {path:?} line {line}: {reason}")]
    CorruptLedger {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("storage unavailable at {path:?}: {source}")]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LedgerError {
    /// True for errors caused by user input; these are answered with a short
    /// reply and leave stored state untouched. Everything else is a hard failure.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LedgerError::Parse(_)
                | LedgerError::DuplicateSubject(_)
                | LedgerError::SubjectNotFound(_)
                | LedgerError::InvalidDelta { .. }
                | LedgerError::InvalidCredits { .. }
        )
    }

    /// Short stable label used in the logbook.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::Parse(_) => "parse",
            LedgerError::DuplicateSubject(_) => "duplicate_subject",
            LedgerError::SubjectNotFound(_) => "subject_not_found",
            LedgerError::InvalidDelta { .. } => "invalid_delta",
            LedgerError::InvalidCredits { .. } => "invalid_credits",
            LedgerError::InvalidIdentity(_) => "invalid_identity",
            LedgerError::CorruptLedger { .. } => "corrupt_ledger",
            LedgerError::StorageUnavailable { .. } => "storage_unavailable",
        }
    }
}

use crate::config::Scope;
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::Identity;

pub const SHARED_FILE: &str = "marks.txt";

/// Identities become part of a file name, so only `[A-Za-z0-9_-]` is allowed,
/// at most 64 characters.
/// A leading `-` is fine (Telegram group chats have negative ids).
pub fn sanitize_identity(identity: &Identity) -> LedgerResult<&str> {
    let s = identity.as_str();
    let ok = !s.is_empty()
        && s.len() <= 64
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !ok {
        return Err(LedgerError::InvalidIdentity(s.to_string()));
    }
    Ok(s)
}

/// File name (relative to the store directory) backing `identity`.
pub fn ledger_file_name(scope: Scope, identity: &Identity) -> LedgerResult<String> {
    match scope {
        Scope::PerChat => Ok(format!("marks_{}.txt", sanitize_identity(identity)?)),
        Scope::Shared => Ok(SHARED_FILE.to_string()),
    }
}

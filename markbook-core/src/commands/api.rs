// src/commands/api.rs
//! Chat-facing surface of the ledger.
//!
//! Every entry point returns the reply text. Errors never escape: user
//! mistakes get a short fixed reply, storage failures get a generic apology
//! plus an error log and a logbook entry.

use anyhow::Result;
use serde_json::json;

use crate::commands::conversation::{ConversationState, Sessions};
use crate::commands::parse::{parse_add, parse_update};
use crate::config::CoreConfig;
use crate::error::LedgerError;
use crate::ledger::{Identity, Subject};
use crate::report::summarize;
use crate::services::{Audit, LedgerStore, RetryPolicy};

pub mod replies {
    pub const WELCOME: &str = "Welcome to Mark Manager!\nUse /add, /update, or /show";
    pub const ADD_PROMPT: &str = "Send subject name and credits (e.g. 'Math 4')";
    pub const UPDATE_PROMPT: &str = "Send update like 'Math 7/10'";
    pub const ADD_FORMAT_ERROR: &str = "❌ Format error. Use 'Name Credits'.";
    pub const UPDATE_FORMAT_ERROR: &str = "❌ Format error. Use 'Name got/max'.";
    pub const NOT_FOUND: &str = "❌ Subject not found.";
    pub const INVALID_DELTA: &str = "❌ Marks can only be added. Use non-negative numbers.";
    pub const INVALID_CREDITS: &str = "❌ Credits must be a non-negative number.";
    pub const OUT_OF_RANGE: &str = "❌ That number is too large to keep track of.";
    pub const STORAGE_FAILURE: &str =
        "⚠️ Could not access your marks right now. Please try again later.";
    pub const CANCELLED: &str = "Cancelled.";
    pub const IDLE_HINT: &str = "Use /add, /update, or /show";
    pub const UNKNOWN_COMMAND: &str = "Unknown command. Use /add, /update, or /show";
}

pub struct Commands {
    store: LedgerStore,
    sessions: Sessions,
    audit: Audit,
}

impl Commands {
    pub fn new(config: &CoreConfig) -> Result<Self> {
        let store = LedgerStore::open(&config.store, RetryPolicy::from_config(&config.retry))?;
        Ok(Self::from_parts(store, Audit::from_config(&config.logbook)))
    }

    pub fn from_parts(store: LedgerStore, audit: Audit) -> Self {
        Self {
            store,
            sessions: Sessions::new(),
            audit,
        }
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    pub fn state(&self, identity: &Identity) -> ConversationState {
        self.sessions.state(identity)
    }

    /// Route one incoming chat message and produce the reply.
    pub fn handle_message(&self, identity: &Identity, text: &str) -> String {
        let text = text.trim();
        if let Some(cmd_line) = text.strip_prefix('/') {
            let (cmd, args) = match cmd_line.split_once(char::is_whitespace) {
                Some((c, a)) => (c, a.trim()),
                None => (cmd_line, ""),
            };
            // "/add@MarkBot" in group chats
            let cmd = cmd.split('@').next().unwrap_or_default().to_ascii_lowercase();
            return self.handle_command(identity, &cmd, args);
        }

        match self.sessions.take(identity) {
            ConversationState::AwaitingAddDetails => self.on_add_requested(identity, text),
            ConversationState::AwaitingUpdateDetails => self.on_update_requested(identity, text),
            ConversationState::Idle => replies::IDLE_HINT.to_string(),
        }
    }

    fn handle_command(&self, identity: &Identity, cmd: &str, args: &str) -> String {
        self.sessions.set(identity, ConversationState::Idle);
        match cmd {
            "start" | "help" => self.on_start(),
            "add" if args.is_empty() => {
                self.sessions.set(identity, ConversationState::AwaitingAddDetails);
                replies::ADD_PROMPT.to_string()
            }
            "add" => self.on_add_requested(identity, args),
            "update" if args.is_empty() => {
                self.sessions.set(identity, ConversationState::AwaitingUpdateDetails);
                replies::UPDATE_PROMPT.to_string()
            }
            "update" => self.on_update_requested(identity, args),
            "show" => self.on_show_requested(identity),
            "cancel" => replies::CANCELLED.to_string(),
            _ => replies::UNKNOWN_COMMAND.to_string(),
        }
    }

    pub fn on_start(&self) -> String {
        replies::WELCOME.to_string()
    }

    /// `raw` is `"<name> <credits>"`.
    pub fn on_add_requested(&self, identity: &Identity, raw: &str) -> String {
        let (name, credits) = match parse_add(raw) {
            Ok(parsed) => parsed,
            Err(_) => return replies::ADD_FORMAT_ERROR.to_string(),
        };

        let outcome = self.store.with_ledger(identity, |ledger| {
            ledger.apply_add(name, credits)?;
            Ok(summarize(ledger))
        });
        match outcome {
            Ok(report) => {
                self.audit.record(
                    "subject_added",
                    &json!({ "identity": identity.as_str(), "name": name, "credits": credits }),
                );
                format!("✅ Added subject {name} ({credits} credits).\n\n{report}")
            }
            Err(e) => self.failure_reply(identity, "add", e, replies::ADD_FORMAT_ERROR),
        }
    }

    /// `raw` is `"<name> <got>/<max>"`.
    pub fn on_update_requested(&self, identity: &Identity, raw: &str) -> String {
        let (name, got, max) = match parse_update(raw) {
            Ok(parsed) => parsed,
            Err(_) => return replies::UPDATE_FORMAT_ERROR.to_string(),
        };

        let outcome = self.store.with_ledger(identity, |ledger| {
            let subject: Subject = ledger.apply_update(name, got, max)?.clone();
            Ok((subject, summarize(ledger)))
        });
        match outcome {
            Ok((subject, report)) => {
                self.audit.record(
                    "marks_updated",
                    &json!({
                        "identity": identity.as_str(),
                        "name": name,
                        "got_delta": got,
                        "max_delta": max,
                        "got": subject.got,
                        "max": subject.max,
                    }),
                );
                format!(
                    "✅ Updated {name}: now {}/{}\n\n{report}",
                    subject.got, subject.max
                )
            }
            Err(e) => self.failure_reply(identity, "update", e, replies::UPDATE_FORMAT_ERROR),
        }
    }

    pub fn on_show_requested(&self, identity: &Identity) -> String {
        match self.store.load(identity) {
            Ok(ledger) => summarize(&ledger).render(),
            Err(e) => self.failure_reply(identity, "show", e, replies::STORAGE_FAILURE),
        }
    }

    fn failure_reply(&self, identity: &Identity, op: &str, err: LedgerError, format_reply: &str) -> String {
        match &err {
            LedgerError::Parse(_) => format_reply.to_string(),
            LedgerError::DuplicateSubject(name) => format!("❌ Subject {name} already exists."),
            LedgerError::SubjectNotFound(_) => replies::NOT_FOUND.to_string(),
            LedgerError::InvalidDelta { got, max, .. } if non_negative(*got) && non_negative(*max) => {
                replies::OUT_OF_RANGE.to_string()
            }
            LedgerError::InvalidDelta { .. } => replies::INVALID_DELTA.to_string(),
            LedgerError::InvalidCredits { credits, .. } if non_negative(*credits) => {
                replies::OUT_OF_RANGE.to_string()
            }
            LedgerError::InvalidCredits { .. } => replies::INVALID_CREDITS.to_string(),
            LedgerError::InvalidIdentity(_)
            | LedgerError::CorruptLedger { .. }
            | LedgerError::StorageUnavailable { .. } => {
                tracing::error!(identity = %identity, op, error = %err, "ledger operation failed");
                self.audit.record(
                    "ledger_failure",
                    &json!({
                        "identity": identity.as_str(),
                        "op": op,
                        "kind": err.kind(),
                        "error": err.to_string(),
                    }),
                );
                replies::STORAGE_FAILURE.to_string()
            }
        }
    }
}

// A rejected value that is itself well-formed means the running totals overflowed.
fn non_negative(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

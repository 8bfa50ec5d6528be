//! Per-identity conversation state.
//!
//! `/add` and `/update` without arguments prompt for details; the next plain
//! message from the same chat is consumed as those details. Any command
//! resets the state.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::ledger::Identity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversationState {
    #[default]
    Idle,
    AwaitingAddDetails,
    AwaitingUpdateDetails,
}

#[derive(Debug, Default)]
pub struct Sessions {
    states: Mutex<HashMap<Identity, ConversationState>>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, identity: &Identity) -> ConversationState {
        let states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        states.get(identity).copied().unwrap_or_default()
    }

    pub fn set(&self, identity: &Identity, state: ConversationState) {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        if state == ConversationState::Idle {
            states.remove(identity);
        } else {
            states.insert(identity.clone(), state);
        }
    }

    /// Return the current state and reset it to `Idle` in one step.
    pub fn take(&self, identity: &Identity) -> ConversationState {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        states.remove(identity).unwrap_or_default()
    }
}

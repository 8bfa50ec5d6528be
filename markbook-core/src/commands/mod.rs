// src/commands/mod.rs
pub mod init;
pub mod parse;
mod api;
mod conversation;

pub use api::{replies, Commands};
pub use conversation::{ConversationState, Sessions};
pub use init::{ensure_initialized_at, markbook_root, InitReport};

use std::fs;

use markbook_core::commands::{replies, Commands, ConversationState};
use markbook_core::config::{CoreConfig, Scope};
use markbook_core::Identity;
use serde_json::Value;
use tempfile::TempDir;

fn commands() -> (TempDir, Commands, CoreConfig) {
    let tmp = tempfile::tempdir().expect("tempdir");
    let cfg = CoreConfig::rooted_default(tmp.path());
    let cmds = Commands::new(&cfg).expect("commands");
    (tmp, cmds, cfg)
}

fn logbook_events(cfg: &CoreConfig) -> Vec<String> {
    let text = fs::read_to_string(&cfg.logbook.path).unwrap_or_default();
    text.lines()
        .map(|l| {
            let v: Value = serde_json::from_str(l).expect("jsonl line");
            v["event"].as_str().unwrap_or_default().to_string()
        })
        .collect()
}

#[test]
fn start_resets_and_welcomes() {
    let (_tmp, cmds, _) = commands();
    let chat = Identity::from(1);
    cmds.handle_message(&chat, "/add");
    assert_eq!(cmds.handle_message(&chat, "/start"), replies::WELCOME);
    assert_eq!(cmds.state(&chat), ConversationState::Idle);
}

#[test]
fn add_prompt_then_details_adds_subject() {
    let (_tmp, cmds, _) = commands();
    let chat = Identity::from(1);

    assert_eq!(cmds.handle_message(&chat, "/add"), replies::ADD_PROMPT);
    assert_eq!(cmds.state(&chat), ConversationState::AwaitingAddDetails);

    let reply = cmds.handle_message(&chat, "Math 4");
    assert!(reply.starts_with("✅ Added subject Math (4 credits).\n\n📊 *YOUR RESULTS:*"), "{reply}");
    assert!(reply.contains("Math — got 0/0 (0.00%), credits: 4"));
    assert_eq!(cmds.state(&chat), ConversationState::Idle);

    // Prompt is one-shot: the next plain message is not an add.
    assert_eq!(cmds.handle_message(&chat, "Physics 2"), replies::IDLE_HINT);
}

#[test]
fn update_prompt_then_details_accumulates() {
    let (_tmp, cmds, _) = commands();
    let chat = Identity::from(2);
    cmds.handle_message(&chat, "/add Math 4");

    assert_eq!(cmds.handle_message(&chat, "/update"), replies::UPDATE_PROMPT);
    assert_eq!(cmds.state(&chat), ConversationState::AwaitingUpdateDetails);
    let first = cmds.handle_message(&chat, "Math 7/10");
    assert!(first.starts_with("✅ Updated Math: now 7/10\n\n"), "{first}");

    let second = cmds.handle_message(&chat, "/update Math 8/10");
    assert!(second.starts_with("✅ Updated Math: now 15/20"), "{second}");
    assert!(second.contains("Your mark: 15.00 / 20\nMax possible: 20.00 / 20"));
}

#[test]
fn show_reports_sentinel_then_table() {
    let (_tmp, cmds, _) = commands();
    let chat = Identity::from(3);
    assert_eq!(cmds.handle_message(&chat, "/show"), "No subjects yet.");

    cmds.handle_message(&chat, "/add Math 4");
    cmds.handle_message(&chat, "/add Physics 2");
    cmds.handle_message(&chat, "/update Math 8/10");
    cmds.handle_message(&chat, "/update Physics 5/10");

    let table = cmds.on_show_requested(&chat);
    assert!(table.contains("Math — got 8/10 (80.00%), credits: 4"));
    assert!(table.contains("Physics — got 5/10 (50.00%), credits: 2"));
    assert!(table.ends_with("Your mark: 7.00 / 20\nMax possible: 10.00 / 20"));
}

#[test]
fn format_errors_use_fixed_replies() {
    let (_tmp, cmds, _) = commands();
    let chat = Identity::from(4);
    assert_eq!(cmds.on_add_requested(&chat, "Math"), replies::ADD_FORMAT_ERROR);
    assert_eq!(cmds.on_add_requested(&chat, "Math four"), replies::ADD_FORMAT_ERROR);
    assert_eq!(cmds.on_add_requested(&chat, "Linear Algebra 4"), replies::ADD_FORMAT_ERROR);
    assert_eq!(cmds.on_update_requested(&chat, "Math 7"), replies::UPDATE_FORMAT_ERROR);
    assert_eq!(cmds.on_update_requested(&chat, "Math 7/x"), replies::UPDATE_FORMAT_ERROR);
    assert_eq!(cmds.on_update_requested(&chat, ""), replies::UPDATE_FORMAT_ERROR);
}

#[test]
fn domain_errors_use_short_replies() {
    let (_tmp, cmds, _) = commands();
    let chat = Identity::from(5);
    cmds.on_add_requested(&chat, "Math 4");

    assert_eq!(cmds.on_add_requested(&chat, "Math 2"), "❌ Subject Math already exists.");
    assert_eq!(cmds.on_add_requested(&chat, "Art -1"), replies::INVALID_CREDITS);
    assert_eq!(cmds.on_update_requested(&chat, "Chem 1/2"), replies::NOT_FOUND);
    assert_eq!(cmds.on_update_requested(&chat, "Math -1/2"), replies::INVALID_DELTA);

    let ledger = cmds.store().load(&chat).unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.get("Math").unwrap().got, 0.0);
}

#[test]
fn overflowing_marks_are_refused_and_the_ledger_stays_readable() {
    let (_tmp, cmds, _) = commands();
    let chat = Identity::from(11);
    cmds.on_add_requested(&chat, "Math 4");

    assert_eq!(cmds.on_update_requested(&chat, "Math 1e308/1e308"), replies::OUT_OF_RANGE);
    assert_eq!(cmds.on_update_requested(&chat, "Math 1e308/1e308"), replies::OUT_OF_RANGE);

    let shown = cmds.on_show_requested(&chat);
    assert!(shown.contains("Math — got 0/0 (0.00%), credits: 4"), "{shown}");
    assert!(!shown.contains("inf") && !shown.contains("NaN"), "{shown}");

    let ledger = cmds.store().load(&chat).expect("ledger still loads");
    assert_eq!(ledger.get("Math").unwrap().got, 0.0);
}

#[test]
fn commands_accept_bot_suffix_and_unknown_commands_reset() {
    let (_tmp, cmds, _) = commands();
    let chat = Identity::from(-100200);
    assert_eq!(cmds.handle_message(&chat, "/add@MarkBot"), replies::ADD_PROMPT);
    assert_eq!(cmds.handle_message(&chat, "/frobnicate"), replies::UNKNOWN_COMMAND);
    assert_eq!(cmds.state(&chat), ConversationState::Idle);

    cmds.handle_message(&chat, "/update");
    assert_eq!(cmds.handle_message(&chat, "/cancel"), replies::CANCELLED);
    assert_eq!(cmds.handle_message(&chat, "Math 1/2"), replies::IDLE_HINT);
}

#[test]
fn conversations_are_tracked_per_identity() {
    let (_tmp, cmds, _) = commands();
    let (a, b) = (Identity::from(10), Identity::from(11));
    cmds.handle_message(&a, "/add");
    assert_eq!(cmds.state(&b), ConversationState::Idle);
    assert_eq!(cmds.handle_message(&b, "Math 4"), replies::IDLE_HINT);

    assert!(cmds.handle_message(&a, "Math 4").starts_with("✅"));
    assert!(cmds.store().load(&b).unwrap().is_empty());
}

#[test]
fn corrupt_ledger_becomes_a_reply_not_a_crash() {
    let (_tmp, cmds, cfg) = commands();
    let chat = Identity::from(6);
    let path = cmds.store().path_for(&chat).unwrap();
    fs::write(&path, "Math 4 oops 10 20\n").unwrap();

    assert_eq!(cmds.handle_message(&chat, "/show"), replies::STORAGE_FAILURE);
    assert_eq!(cmds.on_add_requested(&chat, "Art 1"), replies::STORAGE_FAILURE);
    // The corrupt file is left for inspection.
    assert_eq!(fs::read_to_string(&path).unwrap(), "Math 4 oops 10 20\n");
    assert!(logbook_events(&cfg).iter().any(|e| e == "ledger_failure"));
}

#[test]
fn invalid_identity_is_a_storage_failure_reply() {
    let (_tmp, cmds, _) = commands();
    let reply = cmds.on_show_requested(&Identity::new("../../etc/passwd"));
    assert_eq!(reply, replies::STORAGE_FAILURE);
}

#[test]
fn mutations_are_written_to_the_logbook() {
    let (_tmp, cmds, cfg) = commands();
    let chat = Identity::from(8);
    cmds.on_add_requested(&chat, "Math 4");
    cmds.on_update_requested(&chat, "Math 3/5");
    cmds.on_update_requested(&chat, "Nope 3/5");

    assert_eq!(logbook_events(&cfg), ["subject_added", "marks_updated"]);
}

#[test]
fn shared_scope_is_one_ledger_for_all_chats() {
    let tmp = tempfile::tempdir().unwrap();
    let mut cfg = CoreConfig::rooted_default(tmp.path());
    cfg.store.scope = Scope::Shared;
    let cmds = Commands::new(&cfg).unwrap();

    cmds.on_add_requested(&Identity::from(1), "Math 4");
    let seen = cmds.on_show_requested(&Identity::from(2));
    assert!(seen.contains("Math — got 0/0"));
}

// src/utils/logbook.rs
use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use std::{fs, io::Write, path::Path};

#[derive(Serialize)]
struct LogLine<'a> {
    id: String,
    ts: &'a str,
    event: &'a str,
    data: &'a Value,
}

/// Append one JSON line to the logbook at `log_path`, creating it if needed.
pub fn emit_event(log_path: &Path, id: &str, ts_rfc3339: &str, event: &str, data: &Value) -> Result<()> {
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let line = LogLine {
        id: id.to_string(),
        ts: ts_rfc3339,
        event,
        data,
    };
    let json = serde_json::to_string(&line)?;
    let mut f = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;
    writeln!(f, "{}", json)?;
    Ok(())
}

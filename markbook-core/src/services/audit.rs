//! services/audit.rs
//! Domain event log: every ledger mutation and every hard failure.
//!
//! - Always emits a `tracing` event.
//! - When a logbook path is configured, also appends a JSONL line
//!   `{id, ts, event, data}` to it. Logbook write failures are logged and
//!   swallowed; auditing never fails a user request.

use chrono::Utc;
use serde_json::Value;
use std::path::PathBuf;
use uuid::Uuid;

use crate::config::LogbookConfig;
use crate::utils::logbook::emit_event;

#[derive(Debug, Clone, Default)]
pub struct Audit {
    path: Option<PathBuf>,
}

impl Audit {
    pub fn from_config(cfg: &LogbookConfig) -> Self {
        Self {
            path: cfg.enabled.then(|| cfg.path.clone()),
        }
    }

    pub fn record(&self, event: &str, data: &Value) {
        tracing::info!(target: "markbook::audit", event, %data);
        let Some(path) = &self.path else { return };
        let id = Uuid::new_v4().to_string();
        let ts = Utc::now().to_rfc3339();
        if let Err(e) = emit_event(path, &id, &ts, event, data) {
            tracing::warn!(path = %path.display(), error = %e, "logbook append failed");
        }
    }
}

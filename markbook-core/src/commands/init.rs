// markbook-core/src/commands/init.rs

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::CoreConfig;
use crate::utils::atomic::write_atomic;

#[derive(Debug, Clone)]
pub struct InitReport {
    pub root: PathBuf,
    pub created: Vec<String>,
    pub existed: Vec<String>,
    pub config: CoreConfig,
}

/// Resolve the Markbook root. Allow override via MARKBOOK_ROOT.
pub fn markbook_root() -> PathBuf {
    std::env::var_os("MARKBOOK_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".markbook"))
}

/// Create the root, its ledger directory and a default `config.toml`
/// if missing, then load the configuration. Idempotent.
pub fn ensure_initialized_at(root: &Path) -> Result<InitReport> {
    let mut created = Vec::new();
    let mut existed = Vec::new();

    ensure_dir(root, "", &mut created, &mut existed)?;
    ensure_file(root, "config.toml", DEFAULT_CONFIG_TOML, &mut created, &mut existed)?;

    let config = CoreConfig::load(root)?;
    if config.store.dir.exists() {
        existed.push(config.store.dir.display().to_string());
    } else {
        fs::create_dir_all(&config.store.dir)
            .with_context(|| format!("create_dir_all({:?})", config.store.dir))?;
        created.push(config.store.dir.display().to_string());
    }

    tracing::debug!(root = %root.display(), ?created, "markbook root ready");
    Ok(InitReport {
        root: root.to_path_buf(),
        created,
        existed,
        config,
    })
}

fn ensure_dir(
    base: &Path,
    rel: &str,
    created: &mut Vec<String>,
    existed: &mut Vec<String>,
) -> Result<()> {
    let p = if rel.is_empty() { base.to_path_buf() } else { base.join(rel) };
    let label = if rel.is_empty() { ".".to_string() } else { rel.to_string() };
    if p.exists() {
        existed.push(label);
        return Ok(());
    }
    fs::create_dir_all(&p).with_context(|| format!("create_dir_all({:?})", p))?;
    created.push(label);
    Ok(())
}

fn ensure_file(
    base: &Path,
    rel_file: &str,
    content_if_absent: &str,
    created: &mut Vec<String>,
    existed: &mut Vec<String>,
) -> Result<()> {
    let p = base.join(rel_file);
    if p.exists() {
        existed.push(rel_file.to_string());
        return Ok(());
    }
    write_atomic(&p, content_if_absent.as_bytes())
        .with_context(|| format!("write {:?}", p))?;
    created.push(rel_file.to_string());
    Ok(())
}

// ---------- defaults ----------

pub const DEFAULT_CONFIG_TOML: &str = r#"[store]
dir = "ledgers"
# "per_chat": one file per chat. "shared": every chat uses marks.txt.
scope = "per_chat"
strict_lines = true

[retry]
max_attempts = 3
base_delay_ms = 25
max_delay_ms = 500
jitter_pct = 0.2

[logbook]
enabled = true
path = "logbook.jsonl"

[bot]
token_env = "BOT_TOKEN"
api_base = "https://api.telegram.org"
poll_timeout_secs = 30
parse_mode = "Markdown"
"#;

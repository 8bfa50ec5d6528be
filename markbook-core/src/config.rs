use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoreConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub logbook: LogbookConfig,
    #[serde(default)]
    pub bot: BotConfig,
}

impl CoreConfig {
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join("config.toml");
        let mut cfg = if path.exists() {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            Self::from_toml_str(&text)
                .with_context(|| format!("parsing config file {}", path.display()))?
        } else {
            tracing::info!(
                "No config file found at {}. Using CoreConfig::default().",
                path.display()
            );
            CoreConfig::default()
        };
        cfg.resolve_paths(root);
        Ok(cfg)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str::<CoreConfig>(text)?)
    }

    /// Defaults with every relative path anchored at `root`.
    pub fn rooted_default(root: &Path) -> Self {
        let mut cfg = Self::default();
        cfg.resolve_paths(root);
        cfg
    }

    fn resolve_paths(&mut self, root: &Path) {
        self.store.dir = absolutize(root, &self.store.dir);
        self.logbook.path = absolutize(root, &self.logbook.path);
    }
}

/// How identities map onto ledger files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// One `marks_<identity>.txt` per identity.
    #[default]
    PerChat,
    /// A single `marks.txt` shared by everyone.
    Shared,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "StoreConfig::default_dir")]
    pub dir: PathBuf,
    #[serde(default)]
    pub scope: Scope,
    /// Reject ledger lines with fewer than five fields instead of skipping them.
    ///
    /// When `false`, skipped lines are not kept in memory: the next
    /// successful add or update rewrites the file without them.
    #[serde(default = "StoreConfig::default_strict_lines")]
    pub strict_lines: bool,
}

impl StoreConfig {
    fn default_dir() -> PathBuf {
        PathBuf::from("ledgers")
    }

    fn default_strict_lines() -> bool {
        true
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: Self::default_dir(),
            scope: Scope::default(),
            strict_lines: Self::default_strict_lines(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "RetryConfig::default_max_attempts")]
    pub max_attempts: usize,
    #[serde(default = "RetryConfig::default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "RetryConfig::default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "RetryConfig::default_jitter_pct")]
    pub jitter_pct: f64,
}

impl RetryConfig {
    fn default_max_attempts() -> usize {
        3
    }

    fn default_base_delay_ms() -> u64 {
        25
    }

    fn default_max_delay_ms() -> u64 {
        500
    }

    fn default_jitter_pct() -> f64 {
        0.2
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: Self::default_max_attempts(),
            base_delay_ms: Self::default_base_delay_ms(),
            max_delay_ms: Self::default_max_delay_ms(),
            jitter_pct: Self::default_jitter_pct(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogbookConfig {
    #[serde(default = "LogbookConfig::default_enabled")]
    pub enabled: bool,
    #[serde(default = "LogbookConfig::default_path")]
    pub path: PathBuf,
}

impl LogbookConfig {
    fn default_enabled() -> bool {
        true
    }

    fn default_path() -> PathBuf {
        PathBuf::from("logbook.jsonl")
    }
}

impl Default for LogbookConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            path: Self::default_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Name of the environment variable holding the bot token.
    #[serde(default = "BotConfig::default_token_env")]
    pub token_env: String,
    #[serde(default = "BotConfig::default_api_base")]
    pub api_base: String,
    #[serde(default = "BotConfig::default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
    /// Telegram parse mode for replies; empty string sends plain text.
    #[serde(default = "BotConfig::default_parse_mode")]
    pub parse_mode: String,
}

impl BotConfig {
    fn default_token_env() -> String {
        "BOT_TOKEN".to_string()
    }

    fn default_api_base() -> String {
        "https://api.telegram.org".to_string()
    }

    fn default_poll_timeout_secs() -> u64 {
        30
    }

    fn default_parse_mode() -> String {
        "Markdown".to_string()
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token_env: Self::default_token_env(),
            api_base: Self::default_api_base(),
            poll_timeout_secs: Self::default_poll_timeout_secs(),
            parse_mode: Self::default_parse_mode(),
        }
    }
}

fn absolutize(root: &Path, value: &Path) -> PathBuf {
    if value.is_absolute() {
        value.to_path_buf()
    } else {
        root.join(value)
    }
}

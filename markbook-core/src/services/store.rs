// src/services/store.rs
//! LedgerStore: one plain-text file per identity (or one shared file).
//!
//! - File layout: one subject per line, `name credits got max total_max`,
//!   single spaces, numbers in plain decimal.
//! - Missing file == empty ledger.
//! - Saves rewrite the whole file via temp-file + rename.
//! - `with_ledger` holds a per-file lock across load → mutate → save so two
//!   requests for the same chat cannot lose each other's update. Different
//!   files never contend.

use anyhow::Context;
use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use crate::config::{Scope, StoreConfig};
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{Identity, Ledger, Subject};
use crate::services::retry::RetryPolicy;
use crate::utils::atomic::write_atomic;
use crate::utils::path::ledger_file_name;

const FIELDS: usize = 5;

pub struct LedgerStore {
    dir: PathBuf,
    scope: Scope,
    strict_lines: bool,
    retry: RetryPolicy,
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl LedgerStore {
    /// Open (and create, if needed) the ledger directory.
    pub fn open(cfg: &StoreConfig, retry: RetryPolicy) -> anyhow::Result<Self> {
        fs::create_dir_all(&cfg.dir)
            .with_context(|| format!("create ledger dir {}", cfg.dir.display()))?;
        Ok(Self {
            dir: cfg.dir.clone(),
            scope: cfg.scope,
            strict_lines: cfg.strict_lines,
            retry,
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// Absolute path of the file backing `identity` under the configured scope.
    pub fn path_for(&self, identity: &Identity) -> LedgerResult<PathBuf> {
        Ok(self.dir.join(ledger_file_name(self.scope, identity)?))
    }

    pub fn load(&self, identity: &Identity) -> LedgerResult<Ledger> {
        let path = self.path_for(identity)?;
        self.locked(&path, || self.read_ledger(&path).map(|(ledger, _)| ledger))
    }

    pub fn save(&self, identity: &Identity, ledger: &Ledger) -> LedgerResult<()> {
        let path = self.path_for(identity)?;
        self.locked(&path, || self.write_ledger(&path, ledger))
    }

    /// Load, apply `f`, and save, all under the file's lock.
    /// Nothing is written when `f` fails.
    ///
    /// In lenient mode the rewrite drops any short lines the load skipped.
    pub fn with_ledger<T, F>(&self, identity: &Identity, f: F) -> LedgerResult<T>
    where
        F: FnOnce(&mut Ledger) -> LedgerResult<T>,
    {
        let path = self.path_for(identity)?;
        self.locked(&path, || {
            let (mut ledger, skipped) = self.read_ledger(&path)?;
            let out = f(&mut ledger)?;
            if skipped > 0 {
                tracing::warn!(
                    path = %path.display(),
                    skipped,
                    "rewriting ledger without its skipped short lines"
                );
            }
            self.write_ledger(&path, &ledger)?;
            Ok(out)
        })
    }

    /// Files that currently have a lock entry. Entries only live while a
    /// request holds or waits on them.
    pub fn tracked_locks(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Run `f` holding the per-file lock for `path`.
    fn locked<T>(&self, path: &Path, f: impl FnOnce() -> T) -> T {
        let lock = self.lock_for(path);
        let out = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        self.release(path, lock);
        out
    }

    fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(path.to_path_buf()).or_default().clone()
    }

    fn release(&self, path: &Path, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map and `lock` itself: no other request is waiting.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(path);
        }
    }

    /// The ledger plus the number of short lines skipped in lenient mode.
    fn read_ledger(&self, path: &Path) -> LedgerResult<(Ledger, usize)> {
        let bytes = self
            .retry
            .retry(
                |attempt| {
                    if attempt > 0 {
                        tracing::debug!(path = %path.display(), attempt, "retrying ledger read");
                    }
                    match fs::read(path) {
                        Ok(b) => Ok(Some(b)),
                        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                        Err(e) => Err(e),
                    }
                },
                |_| true,
            )
            .map_err(|source| {
                tracing::error!(path = %path.display(), error = %source, "ledger read failed");
                LedgerError::StorageUnavailable { path: path.to_path_buf(), source }
            })?;

        let Some(bytes) = bytes else {
            return Ok((Ledger::new(), 0));
        };
        let text = String::from_utf8(bytes).map_err(|_| LedgerError::CorruptLedger {
            path: path.to_path_buf(),
            line: 0,
            reason: "file is not valid UTF-8".to_string(),
        })?;
        parse_lines(&text, path, self.strict_lines)
    }

    fn write_ledger(&self, path: &Path, ledger: &Ledger) -> LedgerResult<()> {
        let text = render_ledger(ledger);
        self.retry
            .retry(
                |attempt| {
                    if attempt > 0 {
                        tracing::debug!(path = %path.display(), attempt, "retrying ledger write");
                    }
                    write_atomic(path, text.as_bytes())
                },
                |_| true,
            )
            .map_err(|source| {
                tracing::error!(path = %path.display(), error = %source, "ledger write failed");
                LedgerError::StorageUnavailable { path: path.to_path_buf(), source }
            })?;
        tracing::debug!(path = %path.display(), subjects = ledger.len(), "ledger saved");
        Ok(())
    }
}

/// Parse the on-disk text format.
///
/// Lines with fewer than five fields are `CorruptLedger` when `strict`,
/// otherwise skipped with a warning. Extra trailing fields are ignored.
/// An unparsable or non-finite number is always `CorruptLedger`.
/// `path` is only used for error context.
pub fn parse_ledger(text: &str, path: &Path, strict: bool) -> LedgerResult<Ledger> {
    parse_lines(text, path, strict).map(|(ledger, _)| ledger)
}

fn parse_lines(text: &str, path: &Path, strict: bool) -> LedgerResult<(Ledger, usize)> {
    let mut subjects = Vec::new();
    let mut skipped = 0;
    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let fields: Vec<&str> = raw.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() < FIELDS {
            if strict {
                return Err(LedgerError::CorruptLedger {
                    path: path.to_path_buf(),
                    line: line_no,
                    reason: format!("expected {FIELDS} fields, found {}", fields.len()),
                });
            }
            tracing::warn!(path = %path.display(), line = line_no, "skipping short ledger line");
            skipped += 1;
            continue;
        }

        let num = |i: usize, field: &str| -> LedgerResult<f64> {
            fields[i]
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| LedgerError::CorruptLedger {
                    path: path.to_path_buf(),
                    line: line_no,
                    reason: format!("{field} is not a number: {:?}", fields[i]),
                })
        };
        let subject = Subject {
            name: fields[0].to_string(),
            credits: num(1, "credits")?,
            got: num(2, "got")?,
            max: num(3, "max")?,
            total_max: num(4, "total_max")?,
        };
        if subjects.iter().any(|s: &Subject| s.name == subject.name) {
            tracing::warn!(
                path = %path.display(),
                line = line_no,
                name = %subject.name,
                "duplicate subject in ledger file; updates apply to the first"
            );
        }
        subjects.push(subject);
    }
    Ok((Ledger::from_subjects(subjects), skipped))
}

/// Serialize a ledger into the on-disk text format.
pub fn render_ledger(ledger: &Ledger) -> String {
    let mut out = String::new();
    for s in ledger.subjects() {
        out.push_str(&format!(
            "{} {} {} {} {}\n",
            s.name, s.credits, s.got, s.max, s.total_max
        ));
    }
    out
}

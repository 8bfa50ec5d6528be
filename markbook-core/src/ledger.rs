// src/ledger.rs
//! In-memory ledger model.
//!
//! A `Ledger` is the ordered list of subjects tracked for one identity.
//! Insertion order is display order. Subjects are never removed; `apply_add`
//! appends and `apply_update` adds deltas to an existing entry.

use std::fmt;

use crate::error::{LedgerError, LedgerResult};

/// Nominal scale ceiling carried on every subject.
pub const DEFAULT_TOTAL_MAX: f64 = 20.0;

/// External key selecting a ledger (a chat id, usually).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(String);

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<i64> for Identity {
    fn from(chat_id: i64) -> Self {
        Self(chat_id.to_string())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subject {
    pub name: String,
    pub credits: f64,
    pub got: f64,
    pub max: f64,
    pub total_max: f64,
}

impl Subject {
    pub fn new(name: impl Into<String>, credits: f64) -> Self {
        Self {
            name: name.into(),
            credits,
            got: 0.0,
            max: 0.0,
            total_max: DEFAULT_TOTAL_MAX,
        }
    }

    /// `got / max * 100`, or 0 when nothing has been graded yet.
    pub fn percent(&self) -> f64 {
        if self.max > 0.0 {
            self.got / self.max * 100.0
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    subjects: Vec<Subject>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger from already-validated records (store load path).
    pub fn from_subjects(subjects: Vec<Subject>) -> Self {
        Self { subjects }
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn get(&self, name: &str) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.name == name)
    }

    /// Append a new subject with zero marks.
    ///
    /// Fails without touching the ledger when the name is already present,
    /// is empty or contains whitespace, or when `credits` is negative, not
    /// finite, or would push the total credits past `f64::MAX`.
    pub fn apply_add(&mut self, name: &str, credits: f64) -> LedgerResult<&Subject> {
        validate_name(name)?;
        let candidate = Subject::new(name, credits);
        if !credits.is_finite()
            || credits < 0.0
            || !weighted_totals_finite(self.subjects.iter().chain([&candidate]))
        {
            return Err(LedgerError::InvalidCredits {
                name: name.to_string(),
                credits,
            });
        }
        if self.get(name).is_some() {
            return Err(LedgerError::DuplicateSubject(name.to_string()));
        }
        self.subjects.push(candidate);
        let idx = self.subjects.len() - 1;
        Ok(&self.subjects[idx])
    }

    /// Add `got_delta` / `max_delta` to the named subject.
    ///
    /// Deltas accumulate; they never replace. Negative or non-finite deltas
    /// are rejected since marks only ever go up. So is any delta whose
    /// result, or the credit-weighted sums the report is built from, would
    /// overflow to infinity.
    pub fn apply_update(
        &mut self,
        name: &str,
        got_delta: f64,
        max_delta: f64,
    ) -> LedgerResult<&Subject> {
        let valid = |d: f64| d.is_finite() && d >= 0.0;
        let idx = self
            .subjects
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| LedgerError::SubjectNotFound(name.to_string()))?;
        let invalid = || LedgerError::InvalidDelta {
            name: name.to_string(),
            got: got_delta,
            max: max_delta,
        };
        if !valid(got_delta) || !valid(max_delta) {
            return Err(invalid());
        }
        let mut candidate = self.subjects[idx].clone();
        candidate.got += got_delta;
        candidate.max += max_delta;
        let others = self
            .subjects
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != idx)
            .map(|(_, s)| s);
        if !candidate.got.is_finite()
            || !candidate.max.is_finite()
            || !weighted_totals_finite(others.chain([&candidate]))
        {
            return Err(invalid());
        }
        self.subjects[idx] = candidate;
        Ok(&self.subjects[idx])
    }
}

/// True when the sums `summarize` accumulates stay finite.
fn weighted_totals_finite<'a>(subjects: impl Iterator<Item = &'a Subject>) -> bool {
    let (mut got, mut max, mut credits) = (0.0_f64, 0.0_f64, 0.0_f64);
    for s in subjects {
        got += s.got * s.credits;
        max += s.max * s.credits;
        credits += s.credits;
    }
    got.is_finite() && max.is_finite() && credits.is_finite()
}

fn validate_name(name: &str) -> LedgerResult<()> {
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(LedgerError::Parse(format!(
            "subject name must be a single non-empty word, got {name:?}"
        )));
    }
    Ok(())
}

// src/report.rs
//! Results table and credit-weighted averages.
//!
//! `summarize` is a pure function of a ledger snapshot; it owns no state and
//! never fails. Empty ledgers and zero total credits are normal outcomes.

use std::fmt;

use crate::ledger::Ledger;

/// Scale the averages are displayed against.
pub const DISPLAY_SCALE: f64 = 20.0;

pub const NO_SUBJECTS: &str = "No subjects yet.";

#[derive(Debug, Clone, PartialEq)]
pub struct SubjectRow {
    pub name: String,
    pub got: f64,
    pub max: f64,
    pub percent: f64,
    pub credits: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Averages {
    pub mark: f64,
    pub ceiling: f64,
    pub total_credits: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    Empty,
    Populated {
        rows: Vec<SubjectRow>,
        /// `None` when the credits sum to zero.
        averages: Option<Averages>,
    },
}

impl Report {
    pub fn averages(&self) -> Option<Averages> {
        match self {
            Report::Empty => None,
            Report::Populated { averages, .. } => *averages,
        }
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

pub fn summarize(ledger: &Ledger) -> Report {
    if ledger.is_empty() {
        return Report::Empty;
    }

    let mut rows = Vec::with_capacity(ledger.len());
    let (mut weighted_got, mut weighted_max, mut total_credits) = (0.0, 0.0, 0.0);
    for s in ledger.subjects() {
        rows.push(SubjectRow {
            name: s.name.clone(),
            got: s.got,
            max: s.max,
            percent: s.percent(),
            credits: s.credits,
        });
        weighted_got += s.got * s.credits;
        weighted_max += s.max * s.credits;
        total_credits += s.credits;
    }

    let averages = (total_credits > 0.0).then(|| Averages {
        mark: weighted_got / total_credits,
        ceiling: weighted_max / total_credits,
        total_credits,
    });

    Report::Populated { rows, averages }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (rows, averages) = match self {
            Report::Empty => return f.write_str(NO_SUBJECTS),
            Report::Populated { rows, averages } => (rows, averages),
        };

        f.write_str("📊 *YOUR RESULTS:*\n\n")?;
        for r in rows {
            writeln!(
                f,
                "{} — got {}/{} ({:.2}%), credits: {}",
                r.name, r.got, r.max, r.percent, r.credits
            )?;
        }
        if let Some(avg) = averages {
            write!(
                f,
                "\nYour mark: {:.2} / {scale}\nMax possible: {:.2} / {scale}",
                avg.mark,
                avg.ceiling,
                scale = DISPLAY_SCALE
            )?;
        }
        Ok(())
    }
}

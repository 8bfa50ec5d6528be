//! Parsing of the free-text replies users send after `/add` and `/update`.

use crate::error::{LedgerError, LedgerResult};

/// `"<name> <credits>"`, exactly two tokens.
pub fn parse_add(raw: &str) -> LedgerResult<(&str, f64)> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    let &[name, credits] = tokens.as_slice() else {
        return Err(LedgerError::Parse(format!("expected 'Name Credits', got {raw:?}")));
    };
    let credits = parse_number(credits)?;
    Ok((name, credits))
}

/// `"<name> <got>/<max>"`, exactly two tokens.
pub fn parse_update(raw: &str) -> LedgerResult<(&str, f64, f64)> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    let &[name, marks] = tokens.as_slice() else {
        return Err(LedgerError::Parse(format!("expected 'Name got/max', got {raw:?}")));
    };
    let (got, max) = marks
        .split_once('/')
        .ok_or_else(|| LedgerError::Parse(format!("expected got/max, got {marks:?}")))?;
    Ok((name, parse_number(got)?, parse_number(max)?))
}

fn parse_number(s: &str) -> LedgerResult<f64> {
    s.trim()
        .parse::<f64>()
        .map_err(|_| LedgerError::Parse(format!("not a number: {s:?}")))
}

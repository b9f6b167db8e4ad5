use std::cmp::Ordering;

use crate::foundation::error::{SmilError, SmilResult};

/// A SMIL time value in milliseconds, or one of the two sentinel states.
///
/// Ordering is total: every finite value sorts before `Indefinite`, which sorts
/// before `Unresolved`. Sentinels never fire, so "soonest next event" searches
/// naturally skip them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Time {
    Resolved(i64),
    Indefinite,
    Unresolved,
}

impl Time {
    pub const ZERO: Time = Time::Resolved(0);

    pub fn ms(value: i64) -> Self {
        Time::Resolved(value)
    }

    pub fn is_resolved(self) -> bool {
        matches!(self, Time::Resolved(_))
    }

    pub fn value(self) -> Option<i64> {
        match self {
            Time::Resolved(v) => Some(v),
            _ => None,
        }
    }

    /// `self >= other` under the sentinel ordering.
    pub fn greater_than(self, other: Time) -> bool {
        self >= other
    }

    pub fn is_same_time(self, other: Time) -> bool {
        self == other
    }

    /// Adds `offset` to a resolved time. Sentinels are returned unchanged.
    pub fn offset_by(self, offset: i64) -> Time {
        match self {
            Time::Resolved(v) => Time::Resolved(v.saturating_add(offset)),
            other => other,
        }
    }

    /// Offset arithmetic that refuses sentinel operands.
    pub fn checked_offset(self, offset: i64) -> SmilResult<Time> {
        match self {
            Time::Resolved(v) => Ok(Time::Resolved(v.saturating_add(offset))),
            other => Err(SmilError::structure(format!(
                "cannot offset {other:?} by {offset}ms"
            ))),
        }
    }

    fn rank(self) -> u8 {
        match self {
            Time::Resolved(_) => 0,
            Time::Indefinite => 1,
            Time::Unresolved => 2,
        }
    }
}

impl Ord for Time {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Time::Resolved(a), Time::Resolved(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Time {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Time::Resolved(v) => write!(f, "{v}ms"),
            Time::Indefinite => f.write_str("indefinite"),
            Time::Unresolved => f.write_str("unresolved"),
        }
    }
}

const MILLIS_PER_SECOND: f64 = 1000.0;
const MILLIS_PER_MINUTE: f64 = 60.0 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: f64 = 60.0 * MILLIS_PER_MINUTE;

/// Parse a SMIL clock value into milliseconds.
///
/// Accepts full clock (`02:30:03.5`), partial clock (`02:33`, `00:10.25`) and
/// timecount values with an optional metric (`3.2h`, `45min`, `30s`, `5ms`,
/// bare numbers are seconds). Clock values are non-negative.
pub fn parse_clock_value(input: &str) -> SmilResult<i64> {
    let s = input.trim();
    if s.is_empty() {
        return Err(SmilError::validation("empty clock value"));
    }
    let bad = || SmilError::validation(format!("invalid clock value '{input}'"));

    if s.contains(':') {
        let parts: Vec<&str> = s.split(':').collect();
        let (hours, minutes, seconds) = match parts.as_slice() {
            [h, m, sec] => (parse_digits(h).ok_or_else(bad)?, *m, *sec),
            [m, sec] => (0, *m, *sec),
            _ => return Err(bad()),
        };
        if minutes.len() != 2 {
            return Err(bad());
        }
        let minutes = parse_digits(minutes).ok_or_else(bad)?;
        let (whole, frac) = match seconds.split_once('.') {
            Some((w, f)) => (w, Some(f)),
            None => (seconds, None),
        };
        if whole.len() != 2 {
            return Err(bad());
        }
        let whole = parse_digits(whole).ok_or_else(bad)?;
        if minutes >= 60 || whole >= 60 {
            return Err(bad());
        }
        let frac = match frac {
            Some(f) if !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()) => {
                format!("0.{f}").parse::<f64>().map_err(|_| bad())?
            }
            Some(_) => return Err(bad()),
            None => 0.0,
        };
        let total = hours as f64 * MILLIS_PER_HOUR
            + minutes as f64 * MILLIS_PER_MINUTE
            + (whole as f64 + frac) * MILLIS_PER_SECOND;
        return Ok(total.round() as i64);
    }

    let (number, scale) = if let Some(n) = s.strip_suffix("ms") {
        (n, 1.0)
    } else if let Some(n) = s.strip_suffix("min") {
        (n, MILLIS_PER_MINUTE)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, MILLIS_PER_HOUR)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, MILLIS_PER_SECOND)
    } else {
        (s, MILLIS_PER_SECOND)
    };
    if number.is_empty()
        || !number.bytes().all(|b| b.is_ascii_digit() || b == b'.')
        || number.starts_with('.')
        || number.ends_with('.')
    {
        return Err(bad());
    }
    let value = number.parse::<f64>().map_err(|_| bad())?;
    Ok((value * scale).round() as i64)
}

/// Parse a duration attribute: a clock value or `indefinite`.
pub fn parse_duration(input: &str) -> SmilResult<Time> {
    match input.trim() {
        "indefinite" => Ok(Time::Indefinite),
        other => parse_clock_value(other).map(Time::Resolved),
    }
}

fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
#[path = "../../tests/unit/timing/time.rs"]
mod tests;

use crate::{
    foundation::error::{SmilError, SmilResult},
    timing::time::parse_clock_value,
};

/// One entry of a `begin` or `end` attribute list.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimeCondition {
    /// A fixed offset from the container's time origin.
    Offset { offset: i64 },
    /// `id.begin` / `id.end`, plus offset.
    SyncBase {
        id: String,
        begin: bool,
        offset: i64,
    },
    /// `id.event` or a bare `event` on the default event base.
    Event {
        base: Option<String>,
        event: String,
        offset: i64,
    },
    /// `id.repeat(n)`.
    Repeat {
        base: Option<String>,
        iteration: u32,
        offset: i64,
    },
    /// `accessKey(c)`.
    AccessKey { key: char, offset: i64 },
}

impl TimeCondition {
    pub fn offset(&self) -> i64 {
        match self {
            TimeCondition::Offset { offset }
            | TimeCondition::SyncBase { offset, .. }
            | TimeCondition::Event { offset, .. }
            | TimeCondition::Repeat { offset, .. }
            | TimeCondition::AccessKey { offset, .. } => *offset,
        }
    }

    pub fn is_event_based(&self) -> bool {
        matches!(
            self,
            TimeCondition::Event { .. }
                | TimeCondition::Repeat { .. }
                | TimeCondition::AccessKey { .. }
        )
    }
}

/// Parse a `begin`/`end` attribute value.
///
/// An empty `begin` list (only `indefinite` entries aside) yields the default
/// zero offset; an empty `end` list stays empty.
pub fn parse_time_conditions(value: &str, is_begin: bool) -> SmilResult<Vec<TimeCondition>> {
    if value.trim().is_empty() {
        return Err(SmilError::validation("empty begin/end attribute"));
    }
    let mut out = Vec::new();
    let mut saw_indefinite = false;
    for raw in value.split(';') {
        let item = raw.trim();
        if item.is_empty() {
            return Err(SmilError::validation(format!(
                "empty entry in time condition list '{value}'"
            )));
        }
        match parse_condition(item)? {
            Some(c) => out.push(c),
            None => saw_indefinite = true,
        }
    }
    if is_begin && out.is_empty() && !saw_indefinite {
        out.push(TimeCondition::Offset { offset: 0 });
    }
    Ok(out)
}

fn parse_condition(item: &str) -> SmilResult<Option<TimeCondition>> {
    let first = item.chars().next().unwrap_or(' ');
    if first == '+' || first == '-' || first.is_ascii_digit() {
        return Ok(Some(TimeCondition::Offset {
            offset: parse_signed_offset(item)?,
        }));
    }
    if item == "indefinite" {
        return Ok(None);
    }
    if let Some(rest) = item.strip_prefix("accessKey(") {
        let mut chars = rest.chars();
        let key = chars
            .next()
            .filter(|c| *c != ')')
            .ok_or_else(|| SmilError::validation(format!("bad accessKey in '{item}'")))?;
        let tail = chars.as_str();
        let tail = tail
            .strip_prefix(')')
            .ok_or_else(|| SmilError::validation(format!("unterminated accessKey in '{item}'")))?;
        return Ok(Some(TimeCondition::AccessKey {
            key,
            offset: parse_optional_offset(tail)?,
        }));
    }

    let (base, rest) = split_base(item);
    if let Some(args) = rest.strip_prefix("repeat(") {
        let (digits, tail) = args
            .split_once(')')
            .ok_or_else(|| SmilError::validation(format!("unterminated repeat in '{item}'")))?;
        let iteration = digits
            .parse::<u32>()
            .map_err(|_| SmilError::validation(format!("bad repeat iteration in '{item}'")))?;
        return Ok(Some(TimeCondition::Repeat {
            base: base.map(str::to_owned),
            iteration,
            offset: parse_optional_offset(tail)?,
        }));
    }

    let word_len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    if word_len == 0 {
        return Err(SmilError::validation(format!(
            "unsupported time condition '{item}'"
        )));
    }
    let (word, tail) = rest.split_at(word_len);
    let offset = parse_optional_offset(tail)?;
    match (base, word) {
        (Some(id), "begin") | (Some(id), "end") => Ok(Some(TimeCondition::SyncBase {
            id: id.to_owned(),
            begin: word == "begin",
            offset,
        })),
        _ => Ok(Some(TimeCondition::Event {
            base: base.map(str::to_owned),
            event: word.to_owned(),
            offset,
        })),
    }
}

/// Splits `id.rest` on the first dot not preceded by a backslash.
fn split_base(item: &str) -> (Option<&str>, &str) {
    let bytes = item.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'.' && (i == 0 || bytes[i - 1] != b'\\') {
            return (Some(&item[..i]), &item[i + 1..]);
        }
    }
    (None, item)
}

fn parse_optional_offset(tail: &str) -> SmilResult<i64> {
    let tail = tail.trim();
    if tail.is_empty() {
        return Ok(0);
    }
    if !(tail.starts_with('+') || tail.starts_with('-')) {
        return Err(SmilError::validation(format!(
            "unsupported character in offset '{tail}'"
        )));
    }
    parse_signed_offset(tail)
}

fn parse_signed_offset(s: &str) -> SmilResult<i64> {
    let s = s.trim();
    let (negative, body) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let ms = parse_clock_value(body.trim())?;
    Ok(if negative { -ms } else { ms })
}

#[cfg(test)]
#[path = "../../tests/unit/timing/condition.rs"]
mod tests;

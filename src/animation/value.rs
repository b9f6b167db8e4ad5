use crate::foundation::{
    error::{SmilError, SmilResult},
    math::Matrix,
};

/// Value family of an animatable trait. Selects how values are summed,
/// multiplied and interpolated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraitKind {
    /// Numbers, number lists, lengths and colors.
    Float,
    Transform,
    Motion,
    /// Non-interpolable keywords (`display`, `visibility`, ...).
    Text,
}

impl TraitKind {
    pub fn supports_interpolation(self) -> bool {
        !matches!(self, TraitKind::Text)
    }
}

/// Computed or base value of an animated trait.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AnimValue {
    Floats(Vec<f32>),
    Matrix(Matrix),
    Text(String),
}

impl AnimValue {
    pub fn number(v: f32) -> Self {
        Self::Floats(vec![v])
    }

    pub fn as_floats(&self) -> Option<&[f32]> {
        match self {
            Self::Floats(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f32> {
        self.as_floats().and_then(|v| v.first().copied())
    }

    pub fn as_matrix(&self) -> Option<Matrix> {
        match self {
            Self::Matrix(m) => Some(*m),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    fn family(&self) -> &'static str {
        match self {
            Self::Floats(_) => "float",
            Self::Matrix(_) => "transform",
            Self::Text(_) => "string",
        }
    }

    /// `self + other`, where `self` is the underlying value.
    ///
    /// Transforms compose: the result applies `other` first, then `self`.
    pub fn sum(&self, other: &AnimValue) -> SmilResult<AnimValue> {
        match (self, other) {
            (Self::Floats(a), Self::Floats(b)) => {
                if a.len() != b.len() {
                    return Err(SmilError::structure(format!(
                        "cannot add float values of {} and {} components",
                        a.len(),
                        b.len()
                    )));
                }
                Ok(Self::Floats(a.iter().zip(b).map(|(x, y)| x + y).collect()))
            }
            (Self::Matrix(a), Self::Matrix(b)) => Ok(Self::Matrix(a.concat(b))),
            (Self::Text(_), _) | (_, Self::Text(_)) => Err(SmilError::structure(
                "string values cannot be additive or accumulate",
            )),
            (a, b) => Err(SmilError::structure(format!(
                "cannot add a {} value to a {} value",
                b.family(),
                a.family()
            ))),
        }
    }

    /// `self` accumulated `n` times.
    pub fn multiply(&self, n: u32) -> SmilResult<AnimValue> {
        match self {
            Self::Floats(v) => Ok(Self::Floats(v.iter().map(|x| x * n as f32).collect())),
            Self::Matrix(m) => Ok(Self::Matrix(m.pow(n))),
            Self::Text(_) => Err(SmilError::structure(
                "string values cannot be additive or accumulate",
            )),
        }
    }
}

impl std::fmt::Display for AnimValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Floats(v) => {
                for (i, x) in v.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{x}")?;
                }
                Ok(())
            }
            Self::Matrix(m) => {
                let [a, b, c, d, e, g] = m.0;
                write!(f, "matrix({a} {b} {c} {d} {e} {g})")
            }
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Lexical form of a float or keyword trait value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSyntax {
    Number,
    NumberList,
    /// `#rgb`, `#rrggbb`, `rgb(r, g, b)` or one of the 16 basic color keywords.
    Color,
    Keyword,
}

/// Parses one key value for a float or keyword trait.
pub fn parse_value(syntax: ValueSyntax, input: &str) -> SmilResult<AnimValue> {
    let s = input.trim();
    match syntax {
        ValueSyntax::Number => {
            let v = parse_numbers(s)?;
            match v.as_slice() {
                [x] => Ok(AnimValue::number(*x)),
                _ => Err(SmilError::validation(format!("expected one number, got '{input}'"))),
            }
        }
        ValueSyntax::NumberList => {
            let v = parse_numbers(s)?;
            if v.is_empty() {
                return Err(SmilError::validation("empty number list"));
            }
            Ok(AnimValue::Floats(v))
        }
        ValueSyntax::Color => parse_color(s).map(|[r, g, b]| AnimValue::Floats(vec![r, g, b])),
        ValueSyntax::Keyword => {
            if s.is_empty() {
                return Err(SmilError::validation("empty keyword value"));
            }
            Ok(AnimValue::Text(s.to_owned()))
        }
    }
}

/// Numbers separated by commas and/or whitespace.
pub fn parse_numbers(input: &str) -> SmilResult<Vec<f32>> {
    input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.parse::<f32>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| SmilError::validation(format!("invalid number '{t}' in '{input}'")))
        })
        .collect()
}

fn parse_color(s: &str) -> SmilResult<[f32; 3]> {
    let bad = || SmilError::validation(format!("invalid color '{s}'"));
    if let Some(hex) = s.strip_prefix('#') {
        let digit = |c: char| c.to_digit(16).map(|d| d as f32).ok_or_else(bad);
        let chars: Vec<char> = hex.chars().collect();
        return match chars.len() {
            3 => Ok([
                digit(chars[0])? * 17.0,
                digit(chars[1])? * 17.0,
                digit(chars[2])? * 17.0,
            ]),
            6 => Ok([
                digit(chars[0])? * 16.0 + digit(chars[1])?,
                digit(chars[2])? * 16.0 + digit(chars[3])?,
                digit(chars[4])? * 16.0 + digit(chars[5])?,
            ]),
            _ => Err(bad()),
        };
    }
    if let Some(body) = s.strip_prefix("rgb(").and_then(|r| r.strip_suffix(')')) {
        let v = parse_numbers(body)?;
        return match v.as_slice() {
            [r, g, b] => Ok([*r, *g, *b]),
            _ => Err(bad()),
        };
    }
    let rgb = match s.to_ascii_lowercase().as_str() {
        "black" => [0, 0, 0],
        "silver" => [192, 192, 192],
        "gray" | "grey" => [128, 128, 128],
        "white" => [255, 255, 255],
        "maroon" => [128, 0, 0],
        "red" => [255, 0, 0],
        "purple" => [128, 0, 128],
        "fuchsia" => [255, 0, 255],
        "green" => [0, 128, 0],
        "lime" => [0, 255, 0],
        "olive" => [128, 128, 0],
        "yellow" => [255, 255, 0],
        "navy" => [0, 0, 128],
        "blue" => [0, 0, 255],
        "teal" => [0, 128, 128],
        "aqua" => [0, 255, 255],
        _ => return Err(bad()),
    };
    Ok(rgb.map(|c: u8| f32::from(c)))
}

#[cfg(test)]
#[path = "../../tests/unit/animation/value.rs"]
mod tests;

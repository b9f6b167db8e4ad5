use crate::{
    animation::{
        animate::TargetTrait,
        value::{AnimValue, TraitKind, ValueSyntax},
    },
    foundation::{
        error::{SmilError, SmilResult},
        math::Matrix,
    },
};

/// Animatable trait of a scene node, resolved once from its attribute name.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum TraitId {
    Transform,
    /// Supplementary transform written by `animateMotion`.
    Motion,
    X,
    Y,
    Width,
    Height,
    Cx,
    Cy,
    R,
    Rx,
    Ry,
    X1,
    Y1,
    X2,
    Y2,
    Points,
    Fill,
    FillOpacity,
    Stroke,
    StrokeWidth,
    Opacity,
    Display,
    Visibility,
    Href,
}

impl TraitId {
    pub const ALL: [TraitId; 24] = [
        TraitId::Transform,
        TraitId::Motion,
        TraitId::X,
        TraitId::Y,
        TraitId::Width,
        TraitId::Height,
        TraitId::Cx,
        TraitId::Cy,
        TraitId::R,
        TraitId::Rx,
        TraitId::Ry,
        TraitId::X1,
        TraitId::Y1,
        TraitId::X2,
        TraitId::Y2,
        TraitId::Points,
        TraitId::Fill,
        TraitId::FillOpacity,
        TraitId::Stroke,
        TraitId::StrokeWidth,
        TraitId::Opacity,
        TraitId::Display,
        TraitId::Visibility,
        TraitId::Href,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TraitId::Transform => "transform",
            TraitId::Motion => "motion",
            TraitId::X => "x",
            TraitId::Y => "y",
            TraitId::Width => "width",
            TraitId::Height => "height",
            TraitId::Cx => "cx",
            TraitId::Cy => "cy",
            TraitId::R => "r",
            TraitId::Rx => "rx",
            TraitId::Ry => "ry",
            TraitId::X1 => "x1",
            TraitId::Y1 => "y1",
            TraitId::X2 => "x2",
            TraitId::Y2 => "y2",
            TraitId::Points => "points",
            TraitId::Fill => "fill",
            TraitId::FillOpacity => "fill-opacity",
            TraitId::Stroke => "stroke",
            TraitId::StrokeWidth => "stroke-width",
            TraitId::Opacity => "opacity",
            TraitId::Display => "display",
            TraitId::Visibility => "visibility",
            TraitId::Href => "href",
        }
    }

    pub fn from_name(name: &str) -> Option<TraitId> {
        TraitId::ALL.into_iter().find(|t| t.name() == name)
    }

    pub fn kind(self) -> TraitKind {
        match self {
            TraitId::Transform => TraitKind::Transform,
            TraitId::Motion => TraitKind::Motion,
            TraitId::Display | TraitId::Visibility | TraitId::Href => TraitKind::Text,
            _ => TraitKind::Float,
        }
    }

    pub fn syntax(self) -> ValueSyntax {
        match self {
            TraitId::Fill | TraitId::Stroke => ValueSyntax::Color,
            TraitId::Points | TraitId::Transform | TraitId::Motion => ValueSyntax::NumberList,
            TraitId::Display | TraitId::Visibility | TraitId::Href => ValueSyntax::Keyword,
            _ => ValueSyntax::Number,
        }
    }

    pub fn target(self) -> TargetTrait {
        TargetTrait {
            kind: self.kind(),
            syntax: self.syntax(),
        }
    }

    /// Value a node reports for a trait it supports but never had set.
    pub fn initial_value(self) -> AnimValue {
        match self {
            TraitId::Transform | TraitId::Motion => AnimValue::Matrix(Matrix::IDENTITY),
            TraitId::Fill => AnimValue::Floats(vec![0.0, 0.0, 0.0]),
            TraitId::Stroke => AnimValue::Text("none".into()),
            TraitId::FillOpacity | TraitId::Opacity | TraitId::StrokeWidth => {
                AnimValue::number(1.0)
            }
            TraitId::Points => AnimValue::Floats(Vec::new()),
            TraitId::Display => AnimValue::Text("inline".into()),
            TraitId::Visibility => AnimValue::Text("visible".into()),
            TraitId::Href => AnimValue::Text(String::new()),
            _ => AnimValue::number(0.0),
        }
    }

    /// `true` when a change moves or resizes what the node covers on screen,
    /// as opposed to only recoloring it.
    pub fn affects_geometry(self) -> bool {
        !matches!(
            self,
            TraitId::Fill | TraitId::FillOpacity | TraitId::Stroke | TraitId::Opacity
        )
    }

    /// Checks that `value` is a legal value for this trait.
    pub fn validate(self, value: &AnimValue) -> SmilResult<()> {
        let bad = |why: &str| {
            Err(SmilError::structure(format!(
                "invalid value '{value}' for '{}': {why}",
                self.name()
            )))
        };
        match (self, value) {
            (TraitId::Transform | TraitId::Motion, AnimValue::Matrix(m)) => {
                if m.0.iter().all(|v| v.is_finite()) {
                    Ok(())
                } else {
                    bad("non-finite matrix")
                }
            }
            (TraitId::Fill | TraitId::Stroke, AnimValue::Text(s)) if s == "none" => Ok(()),
            (TraitId::Fill | TraitId::Stroke, AnimValue::Floats(v)) => {
                if v.len() == 3 {
                    Ok(())
                } else {
                    bad("expected an rgb triple")
                }
            }
            (TraitId::Points, AnimValue::Floats(v)) => {
                if v.len() % 2 == 0 {
                    Ok(())
                } else {
                    bad("odd number of coordinates")
                }
            }
            (TraitId::Display, AnimValue::Text(s)) => match s.as_str() {
                "inline" | "none" => Ok(()),
                _ => bad("expected 'inline' or 'none'"),
            },
            (TraitId::Visibility, AnimValue::Text(s)) => match s.as_str() {
                "visible" | "hidden" => Ok(()),
                _ => bad("expected 'visible' or 'hidden'"),
            },
            (TraitId::Href, AnimValue::Text(_)) => Ok(()),
            (t, AnimValue::Floats(v)) if t.kind() == TraitKind::Float => match v.as_slice() {
                [x] if !x.is_finite() => bad("non-finite number"),
                [x] if *x < 0.0 && t.non_negative() => bad("negative value"),
                [_] => Ok(()),
                _ => bad("expected one number"),
            },
            _ => bad("wrong value type"),
        }
    }

    fn non_negative(self) -> bool {
        matches!(
            self,
            TraitId::Width
                | TraitId::Height
                | TraitId::R
                | TraitId::Rx
                | TraitId::Ry
                | TraitId::StrokeWidth
        )
    }

    /// Parses an attribute string into a value of this trait.
    pub fn parse(self, input: &str) -> SmilResult<AnimValue> {
        let value = match self {
            TraitId::Transform => AnimValue::Matrix(parse_transform_list(input)?),
            TraitId::Motion => match crate::animation::value::parse_numbers(input)?.as_slice() {
                [x, y] => AnimValue::Matrix(Matrix::translate(*x, *y)),
                _ => {
                    return Err(SmilError::validation(format!(
                        "motion value '{input}' must be an x,y pair"
                    )));
                }
            },
            TraitId::Fill | TraitId::Stroke if input.trim() == "none" => {
                AnimValue::Text("none".into())
            }
            TraitId::Points => AnimValue::Floats(crate::animation::value::parse_numbers(input)?),
            TraitId::Href => AnimValue::Text(input.trim().to_owned()),
            other => crate::animation::value::parse_value(other.syntax(), input)?,
        };
        self.validate(&value)?;
        Ok(value)
    }
}

impl std::fmt::Display for TraitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses an SVG transform list such as `translate(10 20) rotate(45)`.
pub fn parse_transform_list(input: &str) -> SmilResult<Matrix> {
    use crate::animation::segment::TransformType;

    let mut out = Matrix::IDENTITY;
    let mut rest = input.trim();
    while !rest.is_empty() {
        let open = rest
            .find('(')
            .ok_or_else(|| SmilError::validation(format!("invalid transform '{input}'")))?;
        let close = rest
            .find(')')
            .filter(|c| *c > open)
            .ok_or_else(|| SmilError::validation(format!("invalid transform '{input}'")))?;
        let name = rest[..open].trim().trim_start_matches(',').trim();
        let args = crate::animation::value::parse_numbers(&rest[open + 1..close])?;
        let m = match name {
            "matrix" => match args.as_slice() {
                [a, b, c, d, e, f] => Matrix([*a, *b, *c, *d, *e, *f]),
                _ => {
                    return Err(SmilError::validation(format!(
                        "matrix() takes 6 numbers in '{input}'"
                    )));
                }
            },
            "translate" => TransformType::Translate.matrix(TransformType::Translate.normalize(&args)?),
            "scale" => TransformType::Scale.matrix(TransformType::Scale.normalize(&args)?),
            "rotate" => TransformType::Rotate.matrix(TransformType::Rotate.normalize(&args)?),
            "skewX" => TransformType::SkewX.matrix(TransformType::SkewX.normalize(&args)?),
            "skewY" => TransformType::SkewY.matrix(TransformType::SkewY.normalize(&args)?),
            other => {
                return Err(SmilError::validation(format!(
                    "unknown transform '{other}'"
                )));
            }
        };
        out = out.concat(&m);
        rest = rest[close + 1..].trim_start();
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/model/traits.rs"]
mod tests;

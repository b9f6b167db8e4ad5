use crate::{
    animation::value::AnimValue,
    foundation::{
        core::Point,
        error::{SmilError, SmilResult},
        math::Matrix,
    },
};

/// `animateTransform` type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformType {
    Translate,
    Scale,
    Rotate,
    SkewX,
    SkewY,
}

impl TransformType {
    /// Expands a parameter list to three slots, applying SVG defaults
    /// (`ty = 0`, `sy = sx`, `cx = cy = 0`).
    pub fn normalize(self, params: &[f32]) -> SmilResult<[f32; 3]> {
        let bad = || {
            SmilError::validation(format!(
                "{self:?} takes {} parameters, got {}",
                self.max_params(),
                params.len()
            ))
        };
        if params.is_empty() || params.len() > self.max_params() {
            return Err(bad());
        }
        Ok(match self {
            TransformType::Translate => [params[0], params.get(1).copied().unwrap_or(0.0), 0.0],
            TransformType::Scale => {
                [params[0], params.get(1).copied().unwrap_or(params[0]), 0.0]
            }
            TransformType::Rotate => match params.len() {
                1 => [params[0], 0.0, 0.0],
                3 => [params[0], params[1], params[2]],
                _ => return Err(bad()),
            },
            TransformType::SkewX | TransformType::SkewY => [params[0], 0.0, 0.0],
        })
    }

    fn max_params(self) -> usize {
        match self {
            TransformType::Translate | TransformType::Scale => 2,
            TransformType::Rotate => 3,
            TransformType::SkewX | TransformType::SkewY => 1,
        }
    }

    /// Angles are in degrees.
    pub fn matrix(self, p: [f32; 3]) -> Matrix {
        match self {
            TransformType::Translate => Matrix::translate(p[0], p[1]),
            TransformType::Scale => Matrix::scale(p[0], p[1]),
            TransformType::Rotate => Matrix::rotate(p[0].to_radians(), p[1], p[2]),
            TransformType::SkewX => Matrix::skew_x(p[0].to_radians()),
            TransformType::SkewY => Matrix::skew_y(p[0].to_radians()),
        }
    }

    /// Best-effort parameters reproducing `m` for this type.
    pub fn params_from_matrix(self, m: &Matrix) -> [f32; 3] {
        let [a, b, c, d, e, f] = m.0;
        match self {
            TransformType::Translate => [e, f, 0.0],
            TransformType::Scale => [a, d, 0.0],
            TransformType::Rotate => [b.atan2(a).to_degrees(), 0.0, 0.0],
            TransformType::SkewX => [c.atan().to_degrees(), 0.0, 0.0],
            TransformType::SkewY => [b.atan().to_degrees(), 0.0, 0.0],
        }
    }

    /// Parameter-space distance, with angles measured in radians.
    fn distance(self, a: [f32; 3], b: [f32; 3]) -> f32 {
        let scale0 = match self {
            TransformType::Rotate | TransformType::SkewX | TransformType::SkewY => {
                std::f32::consts::PI / 180.0
            }
            _ => 1.0,
        };
        let d0 = (b[0] - a[0]) * scale0;
        let d1 = b[1] - a[1];
        let d2 = b[2] - a[2];
        (d0 * d0 + d1 * d1 + d2 * d2).sqrt()
    }
}

/// Interpolation between two key values of one trait family.
#[derive(Clone, Debug, PartialEq)]
pub enum LeafSegment {
    Float {
        start: Vec<f32>,
        end: Vec<f32>,
    },
    Transform {
        kind: TransformType,
        start: [f32; 3],
        end: [f32; 3],
    },
    /// Straight motion from `start` to `end`, with a constant rotation in radians.
    Motion {
        start: Point,
        end: Point,
        angle: f64,
    },
    Text {
        start: String,
        end: String,
    },
}

impl LeafSegment {
    pub fn float(start: Vec<f32>, end: Vec<f32>) -> SmilResult<Self> {
        if start.len() != end.len() || start.is_empty() {
            return Err(SmilError::validation(format!(
                "float segment needs matching non-empty values, got {} and {} components",
                start.len(),
                end.len()
            )));
        }
        Ok(Self::Float { start, end })
    }

    pub fn length(&self) -> f32 {
        match self {
            Self::Float { start, end } => start
                .iter()
                .zip(end)
                .map(|(a, b)| (b - a) * (b - a))
                .sum::<f32>()
                .sqrt(),
            Self::Transform { kind, start, end } => kind.distance(*start, *end),
            Self::Motion { start, end, .. } => start.distance(*end) as f32,
            Self::Text { start, end } => {
                if start == end {
                    0.0
                } else {
                    1.0
                }
            }
        }
    }

    pub fn compute(&self, p: f32) -> AnimValue {
        match self {
            Self::Float { start, end } => {
                AnimValue::Floats(start.iter().zip(end).map(|(a, b)| mix(*a, *b, p)).collect())
            }
            Self::Transform { kind, start, end } => {
                let lerp = |i: usize| mix(start[i], end[i], p);
                AnimValue::Matrix(kind.matrix([lerp(0), lerp(1), lerp(2)]))
            }
            Self::Motion { start, end, angle } => {
                let t = f64::from(p);
                let pos = Point::new(
                    start.x * (1.0 - t) + end.x * t,
                    start.y * (1.0 - t) + end.y * t,
                );
                AnimValue::Matrix(motion_matrix(pos, *angle))
            }
            Self::Text { start, end } => {
                AnimValue::Text(if p >= 1.0 { end.clone() } else { start.clone() })
            }
        }
    }

    pub fn start_value(&self) -> AnimValue {
        match self {
            Self::Float { start, .. } => AnimValue::Floats(start.clone()),
            Self::Transform { kind, start, .. } => AnimValue::Matrix(kind.matrix(*start)),
            Self::Motion { start, angle, .. } => AnimValue::Matrix(motion_matrix(*start, *angle)),
            Self::Text { start, .. } => AnimValue::Text(start.clone()),
        }
    }

    pub fn end_value(&self) -> AnimValue {
        self.compute(1.0)
    }

    /// Zero-length segment holding this segment's end value.
    pub(crate) fn hold_end(&self) -> LeafSegment {
        match self {
            Self::Float { end, .. } => Self::Float {
                start: end.clone(),
                end: end.clone(),
            },
            Self::Transform { kind, end, .. } => Self::Transform {
                kind: *kind,
                start: *end,
                end: *end,
            },
            Self::Motion { end, angle, .. } => Self::Motion {
                start: *end,
                end: *end,
                angle: *angle,
            },
            Self::Text { end, .. } => Self::Text {
                start: end.clone(),
                end: end.clone(),
            },
        }
    }

    pub fn is_additive(&self) -> bool {
        !matches!(self, Self::Text { .. })
    }

    /// Replaces the start with an underlying value (to-animation).
    pub(crate) fn set_start(&mut self, value: &AnimValue) -> SmilResult<()> {
        match (self, value) {
            (Self::Float { start, end }, AnimValue::Floats(v)) => {
                if v.len() != end.len() {
                    return Err(SmilError::animation(format!(
                        "underlying value has {} components, animation expects {}",
                        v.len(),
                        end.len()
                    )));
                }
                start.clone_from(v);
            }
            (Self::Transform { kind, start, .. }, AnimValue::Matrix(m)) => {
                *start = kind.params_from_matrix(m);
            }
            (Self::Motion { start, .. }, AnimValue::Matrix(m)) => {
                *start = Point::new(f64::from(m.0[4]), f64::from(m.0[5]));
            }
            (Self::Text { start, .. }, AnimValue::Text(s)) => start.clone_from(s),
            (_, v) => {
                return Err(SmilError::animation(format!(
                    "underlying value {v} does not match the animated trait"
                )));
            }
        }
        Ok(())
    }
}

/// Linear blend that returns `b` exactly at `p == 1`.
fn mix(a: f32, b: f32, p: f32) -> f32 {
    a * (1.0 - p) + b * p
}

pub(crate) fn motion_matrix(pos: Point, angle: f64) -> Matrix {
    let (sin, cos) = angle.sin_cos();
    Matrix([
        cos as f32,
        sin as f32,
        -sin as f32,
        cos as f32,
        pos.x as f32,
        pos.y as f32,
    ])
}

/// A leaf, or a run of leaves traversed by arc length (a flattened curve).
#[derive(Clone, Debug, PartialEq)]
pub enum Segment {
    Leaf(LeafSegment),
    Composite(CompositeSegment),
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompositeSegment {
    children: Vec<LeafSegment>,
    table: Vec<f32>,
    length: f32,
}

impl CompositeSegment {
    pub fn new(children: Vec<LeafSegment>) -> SmilResult<Self> {
        if children.is_empty() {
            return Err(SmilError::structure("composite segment without children"));
        }
        let lengths: Vec<f32> = children.iter().map(LeafSegment::length).collect();
        let (table, length) = normalized_table(&lengths);
        Ok(Self {
            children,
            table,
            length,
        })
    }

    pub fn children(&self) -> &[LeafSegment] {
        &self.children
    }

    fn child_at(&self, p: f32) -> (&LeafSegment, f32) {
        let (i, cp) = locate(&self.table, p);
        (&self.children[i], cp)
    }
}

impl From<LeafSegment> for Segment {
    fn from(leaf: LeafSegment) -> Self {
        Segment::Leaf(leaf)
    }
}

impl Segment {
    pub fn length(&self) -> f32 {
        match self {
            Segment::Leaf(l) => l.length(),
            Segment::Composite(c) => c.length,
        }
    }

    pub fn compute(&self, p: f32) -> AnimValue {
        match self {
            Segment::Leaf(l) => l.compute(p),
            Segment::Composite(c) => {
                let (child, cp) = c.child_at(p);
                child.compute(cp)
            }
        }
    }

    pub fn start_value(&self) -> AnimValue {
        match self {
            Segment::Leaf(l) => l.start_value(),
            Segment::Composite(c) => c.children[0].start_value(),
        }
    }

    pub fn end_value(&self) -> AnimValue {
        self.compute(1.0)
    }

    fn last_leaf(&self) -> &LeafSegment {
        match self {
            Segment::Leaf(l) => l,
            // never empty, checked in `CompositeSegment::new`
            Segment::Composite(c) => &c.children[c.children.len() - 1],
        }
    }

    pub(crate) fn hold_end(&self) -> Segment {
        Segment::Leaf(self.last_leaf().hold_end())
    }

    pub fn is_additive(&self) -> bool {
        self.last_leaf().is_additive()
    }

    pub(crate) fn set_start(&mut self, value: &AnimValue) -> SmilResult<()> {
        match self {
            Segment::Leaf(l) => l.set_start(value),
            Segment::Composite(c) => {
                c.children[0].set_start(value)?;
                let lengths: Vec<f32> = c.children.iter().map(LeafSegment::length).collect();
                (c.table, c.length) = normalized_table(&lengths);
                Ok(())
            }
        }
    }
}

/// Cumulative lengths normalized to `[0, 1]`. The last entry is exactly 1.0;
/// an all-zero input yields a uniform table.
pub(crate) fn normalized_table(lengths: &[f32]) -> (Vec<f32>, f32) {
    let total: f32 = lengths.iter().sum();
    let n = lengths.len();
    let mut table = Vec::with_capacity(n);
    if total > 0.0 && total.is_finite() {
        let mut acc = 0.0;
        for l in lengths {
            acc += l;
            table.push(acc / total);
        }
    } else {
        table.extend((1..=n).map(|i| i as f32 / n as f32));
    }
    if let Some(last) = table.last_mut() {
        *last = 1.0;
    }
    (table, if total.is_finite() { total } else { 0.0 })
}

/// Maps a normalized distance to `(index, local penetration)`. Out of range
/// distances clamp to the first segment start or the last segment end.
pub(crate) fn locate(table: &[f32], dist: f32) -> (usize, f32) {
    if table.is_empty() || dist <= 0.0 {
        return (0, 0.0);
    }
    let mut lower = 0.0;
    for (i, &upper) in table.iter().enumerate() {
        if dist <= upper {
            let span = upper - lower;
            let p = if span > 0.0 { (dist - lower) / span } else { 1.0 };
            return (i, p.clamp(0.0, 1.0));
        }
        lower = upper;
    }
    (table.len() - 1, 1.0)
}

#[cfg(test)]
#[path = "../../tests/unit/animation/segment.rs"]
mod tests;

use kurbo::{BezPath, CubicBez, PathEl, Point, QuadBez};

use crate::{
    animation::{
        segment::{CompositeSegment, LeafSegment, Segment},
        spline::flatten_cubic,
    },
    foundation::error::{SmilError, SmilResult},
};

/// `rotate` attribute of `animateMotion`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MotionRotate {
    Auto,
    AutoReverse,
    /// Fixed angle in degrees.
    Angle(f32),
}

impl Default for MotionRotate {
    fn default() -> Self {
        Self::Angle(0.0)
    }
}

impl MotionRotate {
    pub fn parse(value: &str) -> SmilResult<Self> {
        match value.trim() {
            "auto" => Ok(Self::Auto),
            "auto-reverse" => Ok(Self::AutoReverse),
            other => other
                .parse::<f32>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Self::Angle)
                .ok_or_else(|| SmilError::validation(format!("invalid rotate value '{value}'"))),
        }
    }

    fn angle_for(self, start: Point, end: Point) -> f64 {
        match self {
            Self::Angle(deg) => f64::from(deg).to_radians(),
            Self::Auto => (end.y - start.y).atan2(end.x - start.x),
            Self::AutoReverse => (end.y - start.y).atan2(end.x - start.x) + std::f64::consts::PI,
        }
    }
}

pub fn motion_leaf(start: Point, end: Point, rotate: MotionRotate) -> LeafSegment {
    LeafSegment::Motion {
        start,
        end,
        angle: rotate.angle_for(start, end),
    }
}

/// Straight segments through `points` (`values`, `from`/`to`). A single point
/// yields one zero-length segment.
pub fn segments_from_points(points: &[Point], rotate: MotionRotate) -> SmilResult<Vec<Segment>> {
    match points {
        [] => Err(SmilError::validation("motion needs at least one point")),
        [p] => Ok(vec![motion_leaf(*p, *p, rotate).into()]),
        _ => Ok(points
            .windows(2)
            .map(|w| motion_leaf(w[0], w[1], rotate).into())
            .collect()),
    }
}

/// Motion segments along `path`. Lines and closes become leaves; quadratic and
/// cubic curves are flattened once into composite segments.
pub fn segments_from_path(path: &BezPath, rotate: MotionRotate) -> SmilResult<Vec<Segment>> {
    let mut segments: Vec<Segment> = Vec::new();
    let mut cur = Point::ZERO;
    let mut last_move = Point::ZERO;
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => {
                cur = p;
                last_move = p;
            }
            PathEl::LineTo(p) => {
                segments.push(motion_leaf(cur, p, rotate).into());
                cur = p;
            }
            PathEl::QuadTo(p1, p2) => {
                let cubic = QuadBez::new(cur, p1, p2).raise();
                segments.push(curve_segment(cubic, rotate)?);
                cur = p2;
            }
            PathEl::CurveTo(p1, p2, p3) => {
                segments.push(curve_segment(CubicBez::new(cur, p1, p2, p3), rotate)?);
                cur = p3;
            }
            PathEl::ClosePath => {
                segments.push(motion_leaf(cur, last_move, rotate).into());
                cur = last_move;
            }
        }
    }
    if segments.is_empty() {
        segments.push(motion_leaf(cur, cur, rotate).into());
    }
    Ok(segments)
}

fn curve_segment(curve: CubicBez, rotate: MotionRotate) -> SmilResult<Segment> {
    let mut points = vec![curve.p0];
    flatten_cubic(curve, &mut points);
    let children = points
        .windows(2)
        .map(|w| motion_leaf(w[0], w[1], rotate))
        .collect();
    Ok(Segment::Composite(CompositeSegment::new(children)?))
}

#[cfg(test)]
#[path = "../../tests/unit/animation/motion.rs"]
mod tests;

use kurbo::{CubicBez, ParamCurve, Point};

use crate::foundation::error::{SmilError, SmilResult};

/// Squared distance under which a cubic counts as a straight line.
pub(crate) const MIN_FLATNESS_SQUARE: f64 = 0.0001;

const MAX_SUBDIVISION_DEPTH: u32 = 16;

/// Appends a polyline approximation of `curve` to `out`, excluding its start point.
pub(crate) fn flatten_cubic(curve: CubicBez, out: &mut Vec<Point>) {
    flatten_rec(curve, out, 0);
}

fn flatten_rec(curve: CubicBez, out: &mut Vec<Point>, depth: u32) {
    if depth >= MAX_SUBDIVISION_DEPTH || is_flat(&curve, MIN_FLATNESS_SQUARE) {
        out.push(curve.p3);
        return;
    }
    let (left, right) = curve.subdivide();
    flatten_rec(left, out, depth + 1);
    flatten_rec(right, out, depth + 1);
}

fn is_flat(curve: &CubicBez, flatness: f64) -> bool {
    let d = curve.p3 - curve.p0;
    let div = d.hypot2();
    if div == 0.0 {
        return true;
    }
    let dist_sq = |p: Point| {
        let v = p - curve.p0;
        let cross = d.x * v.y - d.y * v.x;
        cross * cross / div
    };
    dist_sq(curve.p1) <= flatness && dist_sq(curve.p2) <= flatness
}

/// One `keySplines` entry, flattened once into an x-monotonic polyline.
#[derive(Clone, Debug, PartialEq)]
pub struct KeySpline {
    polyline: Vec<Point>,
}

impl KeySpline {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> SmilResult<Self> {
        if [x1, y1, x2, y2].iter().any(|v| !(0.0..=1.0).contains(v)) {
            return Err(SmilError::validation(format!(
                "keySplines control values must be in [0, 1], got {x1} {y1} {x2} {y2}"
            )));
        }
        let curve = CubicBez::new(
            Point::ZERO,
            Point::new(f64::from(x1), f64::from(y1)),
            Point::new(f64::from(x2), f64::from(y2)),
            Point::new(1.0, 1.0),
        );
        let mut polyline = vec![Point::ZERO];
        flatten_cubic(curve, &mut polyline);
        Ok(Self { polyline })
    }

    /// Eased progress for a linear progress `p` in `[0, 1]`.
    pub fn eval(&self, p: f32) -> f32 {
        let p = f64::from(p);
        let i = self
            .polyline
            .iter()
            .position(|pt| p < pt.x)
            .unwrap_or(self.polyline.len());
        if i == 0 || i == self.polyline.len() {
            return if i == 0 { 0.0 } else { 1.0 };
        }
        let from = self.polyline[i - 1];
        let to = self.polyline[i];
        let t = (p - from.x) / (to.x - from.x);
        (from.y + (to.y - from.y) * t) as f32
    }

    pub fn points(&self) -> &[Point] {
        &self.polyline
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/spline.rs"]
mod tests;

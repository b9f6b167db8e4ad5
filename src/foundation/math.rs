use kurbo::Affine;

/// Single-precision 2D affine matrix `[a, b, c, d, e, f]`.
///
/// Maps `(x, y)` to `(a*x + c*y + e, b*x + d*y + f)`, the same layout as
/// SVG `matrix(a b c d e f)`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Matrix(pub [f32; 6]);

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Self = Self([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    pub fn translate(tx: f32, ty: f32) -> Self {
        Self([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    pub fn scale(sx: f32, sy: f32) -> Self {
        Self([sx, 0.0, 0.0, sy, 0.0, 0.0])
    }

    /// Rotation by `angle` radians around `(cx, cy)`.
    pub fn rotate(angle: f32, cx: f32, cy: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self([
            cos,
            sin,
            -sin,
            cos,
            cx - cos * cx + sin * cy,
            cy - sin * cx - cos * cy,
        ])
    }

    pub fn skew_x(angle: f32) -> Self {
        Self([1.0, 0.0, angle.tan(), 1.0, 0.0, 0.0])
    }

    pub fn skew_y(angle: f32) -> Self {
        Self([1.0, angle.tan(), 0.0, 1.0, 0.0, 0.0])
    }

    /// `self * other`: `other` is applied first, then `self`.
    pub fn concat(&self, other: &Matrix) -> Matrix {
        let [a0, a1, a2, a3, a4, a5] = self.0;
        let [b0, b1, b2, b3, b4, b5] = other.0;
        Matrix([
            b0 * a0 + b1 * a2,
            b0 * a1 + b1 * a3,
            b2 * a0 + b3 * a2,
            b2 * a1 + b3 * a3,
            b4 * a0 + b5 * a2 + a4,
            b4 * a1 + b5 * a3 + a5,
        ])
    }

    /// `self` composed with itself `n` times. `n == 0` yields identity.
    pub fn pow(&self, n: u32) -> Matrix {
        let mut out = Matrix::IDENTITY;
        for _ in 0..n {
            out = out.concat(self);
        }
        out
    }

    pub fn determinant(&self) -> f32 {
        self.0[0] * self.0[3] - self.0[1] * self.0[2]
    }

    pub fn is_invertible(&self) -> bool {
        let det = self.determinant();
        det.is_finite() && det.abs() > f32::EPSILON
    }

    pub fn to_affine(self) -> Affine {
        Affine::new(self.0.map(f64::from))
    }

    pub fn from_affine(affine: Affine) -> Self {
        Self(affine.as_coeffs().map(|v| v as f32))
    }
}

pub(crate) fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() <= 1e-4 * (1.0 + a.abs().max(b.abs()))
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;

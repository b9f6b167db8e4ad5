use crate::foundation::core::{Rect, Viewport};

/// Integer device-space rectangle with inclusive max corner, the unit of
/// dirty tracking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl Tile {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            max_x: x + width - 1,
            max_y: y + height - 1,
        }
    }

    /// Smallest tile covering `rect`, padded by one pixel for anti-aliasing.
    /// `None` for empty or non-finite rectangles.
    pub fn covering(rect: Rect) -> Option<Self> {
        if !(rect.x0.is_finite() && rect.y0.is_finite() && rect.x1.is_finite() && rect.y1.is_finite())
        {
            return None;
        }
        let r = rect.abs();
        if r.width() <= 0.0 && r.height() <= 0.0 {
            return None;
        }
        let clamp = |v: f64| v.clamp(f64::from(i32::MIN / 2), f64::from(i32::MAX / 2)) as i32;
        Some(Self {
            x: clamp(r.x0.floor()) - 1,
            y: clamp(r.y0.floor()) - 1,
            max_x: clamp(r.x1.ceil()) + 1,
            max_y: clamp(r.y1.ceil()) + 1,
        })
    }

    pub fn viewport(vp: Viewport) -> Self {
        Self::new(0, 0, vp.width as i32, vp.height as i32)
    }

    pub fn width(&self) -> i32 {
        self.max_x - self.x + 1
    }

    pub fn height(&self) -> i32 {
        self.max_y - self.y + 1
    }

    pub fn is_empty(&self) -> bool {
        self.max_x < self.x || self.max_y < self.y
    }

    pub fn intersects(&self, other: &Tile) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x <= other.max_x
            && other.x <= self.max_x
            && self.y <= other.max_y
            && other.y <= self.max_y
    }

    pub fn contains(&self, other: &Tile) -> bool {
        self.x <= other.x
            && self.y <= other.y
            && self.max_x >= other.max_x
            && self.max_y >= other.max_y
    }

    pub fn union(&self, other: &Tile) -> Tile {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Tile {
            x: self.x.min(other.x),
            y: self.y.min(other.y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    pub fn intersection(&self, other: &Tile) -> Option<Tile> {
        let t = Tile {
            x: self.x.max(other.x),
            y: self.y.max(other.y),
            max_x: self.max_x.min(other.max_x),
            max_y: self.max_y.min(other.max_y),
        };
        (!t.is_empty()).then_some(t)
    }

    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            i64::from(self.width()) * i64::from(self.height())
        }
    }

    pub fn to_rect(&self) -> Rect {
        Rect::new(
            f64::from(self.x),
            f64::from(self.y),
            f64::from(self.max_x + 1),
            f64::from(self.max_y + 1),
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/tile.rs"]
mod tests;

use serde::Deserialize;

/// World-space vector in virtual units, `y` up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn normalized_or_zero(self) -> Self {
        let length = self.length();
        if length <= f64::EPSILON || !length.is_finite() {
            return Self::default();
        }
        Self {
            x: self.x / length,
            y: self.y / length,
        }
    }

    pub fn scaled(self, factor: f64) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
        }
    }
}

/// Axis-aligned box given by its min corner and size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub size: Vec2,
}

impl Aabb {
    pub fn new(min: Vec2, size: Vec2) -> Self {
        Self { min, size }
    }

    pub fn max(&self) -> Vec2 {
        Vec2 {
            x: self.min.x + self.size.x,
            y: self.min.y + self.size.y,
        }
    }

    pub fn center(&self) -> Vec2 {
        Vec2 {
            x: self.min.x + self.size.x * 0.5,
            y: self.min.y + self.size.y * 0.5,
        }
    }

    /// Corner sample points. The max edges are pulled in by a hair so a box
    /// flush against a cell boundary does not sample the neighbouring cell.
    pub fn sample_points(&self) -> [Vec2; 4] {
        let max = self.max();
        let right = inset_max(self.min.x, max.x);
        let top = inset_max(self.min.y, max.y);
        [
            self.min,
            Vec2::new(right, self.min.y),
            Vec2::new(self.min.x, top),
            Vec2::new(right, top),
        ]
    }
}

pub(crate) const EDGE_INSET: f64 = 1e-6;

pub(crate) fn inset_max(min: f64, max: f64) -> f64 {
    (max - EDGE_INSET).max(min)
}

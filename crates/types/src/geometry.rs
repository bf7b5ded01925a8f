use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn zero() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
        }
    }

    /// Scales the size down so that its height does not exceed `max_height`,
    /// keeping the aspect ratio.
    pub fn clamp_height(self, max_height: f32) -> Self {
        if self.height <= max_height || self.height <= 0.0 {
            return self;
        }
        let factor = max_height / self.height;
        Self {
            width: self.width * factor,
            height: max_height,
        }
    }
}

/// Robust floating point comparison for layout calculations.
pub fn fuzzy_eq(a: f32, b: f32) -> bool {
    const EPSILON: f32 = 0.01;
    (a - b).abs() < EPSILON
}

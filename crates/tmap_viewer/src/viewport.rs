//! Viewport rotation and framing.

use serde::{Deserialize, Serialize};

/// Rectangle in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Current rotation and the last region the view was fitted to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Viewport {
    rotation: f64,
    bounds: Option<Rect>,
}

impl Viewport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rotation in degrees, normalized to `[0, 360)`.
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn set_rotation(&mut self, degrees: f64) {
        self.rotation = degrees.rem_euclid(360.0);
        log::debug!("Viewport rotation set to {}", self.rotation);
    }

    pub fn bounds(&self) -> Option<Rect> {
        self.bounds
    }

    /// Frame the view on `rect`.
    pub fn fit_bounds(&mut self, rect: Rect) {
        log::debug!("Viewport fitted to {:?}", rect);
        self.bounds = Some(rect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_is_normalized() {
        let mut viewport = Viewport::new();
        viewport.set_rotation(450.0);
        assert_eq!(viewport.rotation(), 90.0);
        viewport.set_rotation(-90.0);
        assert_eq!(viewport.rotation(), 270.0);
    }

    #[test]
    fn test_fit_bounds() {
        let mut viewport = Viewport::new();
        assert!(viewport.bounds().is_none());
        viewport.fit_bounds(Rect::new(0.1, 0.2, 0.5, 0.4));
        assert_eq!(viewport.bounds(), Some(Rect::new(0.1, 0.2, 0.5, 0.4)));
    }
}

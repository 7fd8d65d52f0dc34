use glam::{Affine2, Vec2};

use curvemap_core::{CurveBounds, Point};

/// An invertible affine map between model space and screen pixels.
///
/// This is owned by whatever draws the curve and should be rebuilt every
/// time the drawable area is resized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenTransform {
    to_screen: Affine2,
    to_model: Affine2,
}

impl ScreenTransform {
    /// Returns `None` if the map can't be inverted.
    pub fn new(to_screen: Affine2) -> Option<Self> {
        let det = to_screen.matrix2.determinant();
        if det == 0.0 || !det.is_finite() || !to_screen.is_finite() {
            return None;
        }

        Some(Self {
            to_screen,
            to_model: to_screen.inverse(),
        })
    }

    /// Map the bounds onto a `width` x `height` pixel area with the origin in
    /// the top-left corner, so that `(min_x, max_y)` lands on `(0, 0)` and
    /// `(max_x, min_y)` lands on `(width, height)`.
    pub fn from_viewport(bounds: &CurveBounds, width: f32, height: f32) -> Option<Self> {
        let scale = Vec2::new(
            width / bounds.width(),
            height / (bounds.min_y - bounds.max_y),
        );

        Self::new(
            Affine2::from_scale(scale) * Affine2::from_translation(Vec2::new(-bounds.min_x, -bounds.max_y)),
        )
    }

    pub fn to_screen(&self, p: Point) -> Vec2 {
        self.to_screen.transform_point2(p)
    }

    pub fn to_model(&self, p: Vec2) -> Point {
        self.to_model.transform_point2(p)
    }
}

impl Default for ScreenTransform {
    fn default() -> Self {
        Self {
            to_screen: Affine2::IDENTITY,
            to_model: Affine2::IDENTITY,
        }
    }
}

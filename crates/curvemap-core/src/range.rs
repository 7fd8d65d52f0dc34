use crate::geometry::Point;

/// The rectangular model-space domain/range a curve spans.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveBounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl CurveBounds {
    /// The full 7-bit MIDI value range on both axes.
    pub const MIDI: Self = Self {
        min_x: 0.0,
        max_x: 127.0,
        min_y: 0.0,
        max_y: 127.0,
    };

    pub fn new(min_x: f32, max_x: f32, min_y: f32, max_y: f32) -> Self {
        assert!(min_x < max_x);
        assert!(min_y < max_y);
        assert!(min_x.is_finite() && max_x.is_finite());
        assert!(min_y.is_finite() && max_y.is_finite());

        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) * 0.5,
            (self.min_y + self.max_y) * 0.5,
        )
    }

    pub fn clamp_x(&self, x: f32) -> f32 {
        x.min(self.max_x).max(self.min_x)
    }

    pub fn clamp_y(&self, y: f32) -> f32 {
        y.min(self.max_y).max(self.min_y)
    }

    pub fn clamp(&self, p: Point) -> Point {
        Point::new(self.clamp_x(p.x), self.clamp_y(p.y))
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    /// Map an x value to `[0.0, 1.0]` across the domain.
    pub fn normalize_x(&self, x: f32) -> f32 {
        (x - self.min_x) / self.width()
    }

    /// Map a y value to `[0.0, 1.0]` across the range.
    pub fn normalize_y(&self, y: f32) -> f32 {
        (y - self.min_y) / self.height()
    }

    /// Map a normalized value in `[0.0, 1.0]` onto the domain.
    pub fn denormalize_x(&self, normalized: f32) -> f32 {
        self.min_x + normalized * self.width()
    }
}

impl Default for CurveBounds {
    fn default() -> Self {
        Self {
            min_x: 0.0,
            max_x: 1.0,
            min_y: 0.0,
            max_y: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_into_bounds() {
        let bounds = CurveBounds::MIDI;

        assert_eq!(bounds.clamp(Point::new(-4.0, 200.0)), Point::new(0.0, 127.0));
        assert_eq!(bounds.clamp(Point::new(64.0, 10.0)), Point::new(64.0, 10.0));
        assert!(bounds.contains(Point::new(0.0, 127.0)));
        assert!(!bounds.contains(Point::new(-0.1, 5.0)));
    }

    #[test]
    fn normalize_round_trip() {
        let bounds = CurveBounds::new(-1.0, 3.0, 0.0, 10.0);

        assert_eq!(bounds.normalize_x(1.0), 0.5);
        assert_eq!(bounds.denormalize_x(0.25), 0.0);
        assert_eq!(bounds.normalize_y(2.5), 0.25);
        assert_eq!(bounds.center(), Point::new(1.0, 5.0));
    }

    #[test]
    #[should_panic]
    fn empty_domain_is_rejected() {
        let _ = CurveBounds::new(1.0, 1.0, 0.0, 1.0);
    }
}

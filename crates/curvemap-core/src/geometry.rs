//! Bézier evaluation on model-space points.

/// A point in model space.
pub type Point = glam::Vec2;

/// The number of evenly spaced `t` samples used when searching a Bézier
/// segment for the parameter closest to an input abscissa.
pub const BEZIER_SEARCH_STEPS: usize = 101;

/// B(t) = (1-t)²·P0 + 2(1-t)t·P1 + t²·P2
#[inline]
pub fn quadratic_bezier(p0: Point, p1: Point, p2: Point, t: f32) -> Point {
    let inv = 1.0 - t;
    inv * inv * p0 + 2.0 * inv * t * p1 + t * t * p2
}

/// B(t) = (1-t)³·P0 + 3(1-t)²t·P1 + 3(1-t)t²·P2 + t³·P3
#[inline]
pub fn cubic_bezier(p0: Point, p1: Point, p2: Point, p3: Point, t: f32) -> Point {
    let inv = 1.0 - t;
    let inv2 = inv * inv;
    let t2 = t * t;
    inv2 * inv * p0 + 3.0 * inv2 * t * p1 + 3.0 * inv * t2 * p2 + t2 * t * p3
}

/// Find the y value of a parametric curve at the abscissa `x`.
///
/// `t` is sampled at [`BEZIER_SEARCH_STEPS`] evenly spaced steps in
/// `[0, 1]`, and the sample whose x lies closest to `x` wins (the first one
/// on ties). The result is exact at `t = 0` and `t = 1`. Anywhere else it is
/// quantized: the error in x is at most the x-distance between two adjacent
/// samples. This keeps the cost fixed and allocation-free.
#[inline]
pub fn sample_y_at_x(x: f32, eval: impl Fn(f32) -> Point) -> f32 {
    let last_step = (BEZIER_SEARCH_STEPS - 1) as f32;

    let mut closest = eval(0.0);
    let mut closest_dist = (closest.x - x).abs();

    for i in 1..BEZIER_SEARCH_STEPS {
        let p = eval(i as f32 / last_step);
        let dist = (p.x - x).abs();
        if dist < closest_dist {
            closest = p;
            closest_dist = dist;
        }
    }

    closest.y
}

use crate::{
    geometry::{cubic_bezier, quadratic_bezier, sample_y_at_x},
    node::{CurveNode, CurveType},
    range::CurveBounds,
};

/// An immutable, ordered copy of a curve, used on the processing path.
///
/// Evaluating a snapshot never allocates, blocks or mutates anything.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveSnapshot {
    bounds: CurveBounds,
    nodes: Vec<CurveNode>,
}

impl CurveSnapshot {
    pub(crate) fn new(bounds: CurveBounds, nodes: Vec<CurveNode>) -> Self {
        debug_assert!(nodes.len() >= 2);

        Self { bounds, nodes }
    }

    pub fn bounds(&self) -> &CurveBounds {
        &self.bounds
    }

    pub fn nodes(&self) -> &[CurveNode] {
        &self.nodes
    }

    /// Map an input value onto the curve.
    ///
    /// See [`CurveModel::evaluate`](crate::model::CurveModel::evaluate) for
    /// the out-of-range policy.
    #[inline]
    pub fn evaluate(&self, input: f32) -> f32 {
        evaluate_nodes(&self.bounds, input, self.nodes.iter())
    }
}

/// Walk the ordered nodes and evaluate the first segment whose right anchor
/// satisfies `input <= anchor.x`.
pub(crate) fn evaluate_nodes<'a>(
    bounds: &CurveBounds,
    input: f32,
    nodes: impl IntoIterator<Item = &'a CurveNode>,
) -> f32 {
    let mut nodes = nodes.into_iter();

    let Some(first) = nodes.next() else {
        debug_assert!(false, "evaluated a curve without nodes");
        return bounds.min_y;
    };

    if input.is_nan() {
        return first.anchor.y;
    }

    let input = bounds.clamp_x(input);

    let mut left = first;
    for right in nodes {
        debug_assert!(left.anchor.x < right.anchor.x);

        if input <= right.anchor.x {
            return evaluate_segment(input, left, right);
        }

        left = right;
    }

    // Only reachable if the sort or boundary invariants are broken.
    debug_assert!(
        false,
        "no segment found for input {} (last anchor x is {})",
        input, left.anchor.x
    );
    left.anchor.y
}

#[inline]
fn evaluate_segment(input: f32, left: &CurveNode, right: &CurveNode) -> f32 {
    let a0 = left.anchor;
    let a1 = right.anchor;

    if input <= a0.x {
        return a0.y;
    }
    if input >= a1.x {
        return a1.y;
    }

    match left.curve_type {
        CurveType::Linear => {
            let slope = (a1.y - a0.y) / (a1.x - a0.x);
            slope * (input - a0.x) + a0.y
        }
        CurveType::Quadratic => {
            let c1 = left.control1;
            sample_y_at_x(input, |t| quadratic_bezier(a0, c1, a1, t))
        }
        CurveType::Cubic => {
            let c1 = left.control1;
            let c2 = left.control2;
            sample_y_at_x(input, |t| cubic_bezier(a0, c1, c2, a1, t))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use approx::assert_abs_diff_eq;

    fn linear_nodes(points: &[(f32, f32)]) -> Vec<CurveNode> {
        points
            .iter()
            .map(|&(x, y)| CurveNode::linear(Point::new(x, y)))
            .collect()
    }

    #[test]
    fn linear_segments() {
        let snapshot = CurveSnapshot::new(
            CurveBounds::MIDI,
            linear_nodes(&[(0.0, 127.0), (27.0, 0.0), (127.0, 100.0)]),
        );

        assert_eq!(snapshot.evaluate(0.0), 127.0);
        assert_eq!(snapshot.evaluate(27.0), 0.0);
        assert_eq!(snapshot.evaluate(127.0), 100.0);
        assert_abs_diff_eq!(snapshot.evaluate(77.0), 50.0, epsilon = 1e-4);
    }

    #[test]
    fn out_of_range_input_is_clamped() {
        let snapshot = CurveSnapshot::new(
            CurveBounds::MIDI,
            linear_nodes(&[(0.0, 10.0), (127.0, 20.0)]),
        );

        assert_eq!(snapshot.evaluate(-50.0), 10.0);
        assert_eq!(snapshot.evaluate(1000.0), 20.0);
        assert_eq!(snapshot.evaluate(f32::NEG_INFINITY), 10.0);
        assert_eq!(snapshot.evaluate(f32::INFINITY), 20.0);
        assert_eq!(snapshot.evaluate(f32::NAN), 10.0);
    }

    #[test]
    fn segment_shape_comes_from_left_node() {
        let mut nodes = linear_nodes(&[(0.0, 0.0), (63.5, 63.5), (127.0, 127.0)]);
        // A curved type on the last node has no effect.
        nodes[2].curve_type = CurveType::Cubic;
        nodes[2].control1 = Point::new(100.0, 0.0);
        nodes[2].control2 = Point::new(100.0, 0.0);

        let snapshot = CurveSnapshot::new(CurveBounds::MIDI, nodes);

        assert_abs_diff_eq!(snapshot.evaluate(100.0), 100.0, epsilon = 1e-4);
    }

    #[test]
    fn cubic_segment_bends_towards_controls() {
        let mut nodes = linear_nodes(&[(0.0, 0.0), (127.0, 127.0)]);
        nodes[0].curve_type = CurveType::Cubic;
        nodes[0].control1 = Point::new(0.0, 127.0);
        nodes[0].control2 = Point::new(0.0, 127.0);

        let snapshot = CurveSnapshot::new(CurveBounds::MIDI, nodes);

        // Both controls pull the curve up, so the midpoint lies above the diagonal.
        assert!(snapshot.evaluate(63.5) > 63.5);
        assert_eq!(snapshot.evaluate(0.0), 0.0);
        assert_eq!(snapshot.evaluate(127.0), 127.0);
    }
}

use std::fmt::Debug;
use std::hash::Hash;

use crate::geometry::Point;

/// The shape of the segment that starts at a node.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurveType {
    #[default]
    Linear,
    Quadratic,
    Cubic,
}

impl CurveType {
    /// The number of supported curve types.
    pub const COUNT: usize = 3;

    /// The integer id used in persisted state.
    pub fn id(&self) -> i32 {
        match self {
            Self::Linear => 0,
            Self::Quadratic => 1,
            Self::Cubic => 2,
        }
    }

    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            0 => Some(Self::Linear),
            1 => Some(Self::Quadratic),
            2 => Some(Self::Cubic),
            _ => None,
        }
    }

    /// The next curve type, wrapping around after [`CurveType::Cubic`].
    pub fn next(&self) -> Self {
        // `id()` is always in `0..COUNT`.
        Self::from_id((self.id() + 1) % Self::COUNT as i32).unwrap_or_default()
    }

    /// Whether the segment following a node of this type uses `control1`.
    pub fn uses_control1(&self) -> bool {
        !matches!(self, Self::Linear)
    }

    /// Whether the segment following a node of this type uses `control2`.
    pub fn uses_control2(&self) -> bool {
        matches!(self, Self::Cubic)
    }
}

/// A stable identifier for a node in a [`CurveModel`](crate::model::CurveModel).
///
/// The identifier is generational: once its node is removed, it will never
/// resolve to another node, even if the storage slot gets reused.
#[derive(Clone, Copy)]
pub struct NodeId {
    pub idx: thunderdome::Index,
}

impl NodeId {
    pub const DANGLING: Self = Self {
        idx: thunderdome::Index::DANGLING,
    };
}

impl Default for NodeId {
    fn default() -> Self {
        Self::DANGLING
    }
}

impl PartialEq for NodeId {
    fn eq(&self, other: &Self) -> bool {
        self.idx == other.idx
    }
}

impl Eq for NodeId {}

impl Hash for NodeId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.idx.hash(state);
    }
}

impl Debug for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node-{}-{}", self.idx.slot(), self.idx.generation())
    }
}

/// Which of a node's three points a [`HandleRef`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    /// The point the curve passes through.
    Anchor,
    /// The first Bézier control point (quadratic and cubic segments).
    Control1,
    /// The second Bézier control point (cubic segments only).
    Control2,
}

/// A short-lived locator for one handle of a node.
///
/// This does not own anything. After the node it points to has been
/// deleted, every operation taking this handle is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleRef {
    pub node: NodeId,
    pub kind: HandleKind,
}

impl HandleRef {
    pub fn new(node: NodeId, kind: HandleKind) -> Self {
        Self { node, kind }
    }

    pub fn anchor(node: NodeId) -> Self {
        Self::new(node, HandleKind::Anchor)
    }

    pub fn is_anchor(&self) -> bool {
        self.kind == HandleKind::Anchor
    }
}

/// The unit of curve structure.
///
/// The curve passes through `anchor`. The segment from this node to the
/// next one is shaped by `curve_type`, using `control1` (and `control2`
/// for cubic segments).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveNode {
    pub anchor: Point,
    pub control1: Point,
    pub control2: Point,
    pub curve_type: CurveType,
}

impl CurveNode {
    /// A linear node with both control handles collapsed onto the anchor.
    pub fn linear(anchor: Point) -> Self {
        Self {
            anchor,
            control1: anchor,
            control2: anchor,
            curve_type: CurveType::Linear,
        }
    }

    pub fn handle(&self, kind: HandleKind) -> Point {
        match kind {
            HandleKind::Anchor => self.anchor,
            HandleKind::Control1 => self.control1,
            HandleKind::Control2 => self.control2,
        }
    }

    /// Whether the given handle takes part in shaping the curve.
    ///
    /// Control handles are only relevant when the node's curve type uses
    /// them, and never on the last node since no segment follows it.
    pub fn handle_is_relevant(&self, kind: HandleKind, is_last: bool) -> bool {
        match kind {
            HandleKind::Anchor => true,
            HandleKind::Control1 => !is_last && self.curve_type.uses_control1(),
            HandleKind::Control2 => !is_last && self.curve_type.uses_control2(),
        }
    }

    /// Move the anchor, carrying both control handles along with it.
    pub fn translate(&mut self, delta: Point) {
        self.anchor += delta;
        self.control1 += delta;
        self.control2 += delta;
    }

    pub fn collapse_controls(&mut self) {
        self.control1 = self.anchor;
        self.control2 = self.anchor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_type_cycles_through_all_types() {
        assert_eq!(CurveType::Linear.next(), CurveType::Quadratic);
        assert_eq!(CurveType::Quadratic.next(), CurveType::Cubic);
        assert_eq!(CurveType::Cubic.next(), CurveType::Linear);
    }

    #[test]
    fn curve_type_ids() {
        for id in 0..CurveType::COUNT as i32 {
            assert_eq!(CurveType::from_id(id).unwrap().id(), id);
        }
        assert_eq!(CurveType::from_id(3), None);
        assert_eq!(CurveType::from_id(-1), None);
    }

    #[test]
    fn translate_keeps_control_offsets() {
        let mut node = CurveNode {
            anchor: Point::new(10.0, 10.0),
            control1: Point::new(15.0, 10.0),
            control2: Point::new(10.0, 12.0),
            curve_type: CurveType::Cubic,
        };

        node.translate(Point::new(-2.0, 3.0));

        assert_eq!(node.anchor, Point::new(8.0, 13.0));
        assert_eq!(node.control1 - node.anchor, Point::new(5.0, 0.0));
        assert_eq!(node.control2 - node.anchor, Point::new(0.0, 2.0));
    }

    #[test]
    fn control_handles_are_not_relevant_on_last_node() {
        let mut node = CurveNode::linear(Point::ZERO);
        assert!(node.handle_is_relevant(HandleKind::Anchor, true));
        assert!(!node.handle_is_relevant(HandleKind::Control1, false));

        node.curve_type = CurveType::Quadratic;
        assert!(node.handle_is_relevant(HandleKind::Control1, false));
        assert!(!node.handle_is_relevant(HandleKind::Control2, false));
        assert!(!node.handle_is_relevant(HandleKind::Control1, true));

        node.curve_type = CurveType::Cubic;
        assert!(node.handle_is_relevant(HandleKind::Control2, false));
        assert!(!node.handle_is_relevant(HandleKind::Control2, true));
    }
}

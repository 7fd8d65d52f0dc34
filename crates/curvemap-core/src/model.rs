use std::sync::{atomic::Ordering, Arc};

use atomic_float::AtomicF32;
use thunderdome::Arena;

use crate::{
    geometry::Point,
    node::{CurveNode, CurveType, HandleKind, HandleRef, NodeId},
    preset::{records_from_json, records_to_json, NodeRecord, PresetError},
    range::CurveBounds,
    snapshot::{evaluate_nodes, CurveSnapshot},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveConfig {
    pub bounds: CurveBounds,
    /// How far a freshly placed control handle sits from its anchor, as a
    /// fraction of the bounds' width (for x offsets) or height (for y
    /// offsets).
    ///
    /// By default this is set to `0.04`.
    pub handle_offset: f32,
    /// The smallest gap kept between an anchor being moved and its
    /// neighbours, as a fraction of the bounds' width.
    ///
    /// By default this is set to `0.001`.
    pub min_anchor_spacing: f32,
    pub initial_node_capacity: usize,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            bounds: CurveBounds::default(),
            handle_offset: 0.04,
            min_anchor_spacing: 0.001,
            initial_node_capacity: 16,
        }
    }
}

impl CurveConfig {
    pub fn with_bounds(bounds: CurveBounds) -> Self {
        Self {
            bounds,
            ..Default::default()
        }
    }
}

/// An ordered, editable piecewise curve spanning a fixed rectangle.
///
/// After every mutation the model guarantees that:
/// * there are at least 2 nodes,
/// * anchors are sorted by strictly increasing x,
/// * the first anchor sits at `min_x` and the last one at `max_x`,
/// * every anchor and control handle lies inside the bounds.
///
/// Requests that would break any of these are clamped or ignored. Nothing
/// here returns an error except loading persisted state.
pub struct CurveModel {
    nodes: Arena<CurveNode>,
    order: Vec<NodeId>,
    config: CurveConfig,
    revision: u64,

    last_input: Arc<AtomicF32>,
}

impl CurveModel {
    /// Create a model with three linear nodes: the bottom-left corner, the
    /// center and the top-right corner of the bounds.
    pub fn new(config: CurveConfig) -> Self {
        let mut model = Self {
            nodes: Arena::with_capacity(config.initial_node_capacity),
            order: Vec::with_capacity(config.initial_node_capacity),
            config,
            revision: 0,
            last_input: Arc::new(AtomicF32::new(config.bounds.min_x)),
        };

        model.push_default_nodes();
        model
    }

    /// Create a model from persisted node records.
    pub fn from_records(config: CurveConfig, records: &[NodeRecord]) -> Result<Self, PresetError> {
        let mut model = Self::new(config);
        model.deserialize(records)?;
        Ok(model)
    }

    fn push_default_nodes(&mut self) {
        let b = self.config.bounds;

        for anchor in [
            Point::new(b.min_x, b.min_y),
            b.center(),
            Point::new(b.max_x, b.max_y),
        ] {
            let id = NodeId {
                idx: self.nodes.insert(CurveNode::linear(anchor)),
            };
            self.order.push(id);
        }
    }

    /// Replace the curve with the default three linear nodes.
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.order.clear();
        self.push_default_nodes();
        self.bump();
    }

    pub fn config(&self) -> &CurveConfig {
        &self.config
    }

    pub fn bounds(&self) -> &CurveBounds {
        &self.config.bounds
    }

    /// A counter that increases with every change to the curve.
    ///
    /// Rejected requests leave it untouched.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// The node ids, ordered by increasing anchor x.
    pub fn node_ids(&self) -> &[NodeId] {
        &self.order
    }

    /// The nodes, ordered by increasing anchor x.
    pub fn nodes(&self) -> impl Iterator<Item = &CurveNode> + '_ {
        self.order.iter().map(move |id| &self.nodes[id.idx])
    }

    pub fn node(&self, id: NodeId) -> Option<&CurveNode> {
        self.nodes.get(id.idx)
    }

    pub fn first_id(&self) -> NodeId {
        self.order[0]
    }

    pub fn last_id(&self) -> NodeId {
        self.order[self.order.len() - 1]
    }

    /// The position of the node in the ordered sequence, or `None` if the
    /// node has been deleted.
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        self.order.iter().position(|&n| n == id)
    }

    /// Whether the node is the first or last node. Boundary nodes can't be
    /// deleted and their anchor x is locked.
    pub fn is_boundary(&self, id: NodeId) -> bool {
        self.index_of(id)
            .is_some_and(|i| i == 0 || i == self.order.len() - 1)
    }

    pub fn handle_position(&self, handle: HandleRef) -> Option<Point> {
        self.node(handle.node).map(|n| n.handle(handle.kind))
    }

    /// Whether the handle exists and currently shapes the curve.
    pub fn handle_is_relevant(&self, handle: HandleRef) -> bool {
        let Some(i) = self.index_of(handle.node) else {
            return false;
        };

        self.nodes[handle.node.idx].handle_is_relevant(handle.kind, i == self.order.len() - 1)
    }

    /// Map an input value onto the curve.
    ///
    /// The input is clamped to `[min_x, max_x]` first, so values left of the
    /// domain map to the first anchor's y and values right of it map to the
    /// last anchor's y. NaN maps to the first anchor's y. At a shared anchor
    /// the segment ending there is used.
    ///
    /// Linear segments are exact. Bézier segments use a sampled search for
    /// the curve parameter, see [`sample_y_at_x`](crate::geometry::sample_y_at_x).
    pub fn evaluate(&self, input: f32) -> f32 {
        evaluate_nodes(&self.config.bounds, input, self.nodes())
    }

    /// Copy the current curve into an immutable snapshot for the processing
    /// path.
    pub fn snapshot(&self) -> CurveSnapshot {
        CurveSnapshot::new(self.config.bounds, self.nodes().copied().collect())
    }

    /// The input value most recently seen by the processing path.
    ///
    /// This is feedback state only. It is not persisted and not part of the
    /// curve.
    pub fn last_input_value(&self) -> f32 {
        self.last_input.load(Ordering::Relaxed)
    }

    pub fn set_last_input_value(&self, value: f32) {
        self.last_input.store(value, Ordering::Relaxed);
    }

    /// A shared handle to the last input value, for the processing path to
    /// write into.
    pub fn shared_last_input(&self) -> Arc<AtomicF32> {
        Arc::clone(&self.last_input)
    }

    /// Insert a new linear node with its anchor at `p`.
    ///
    /// Returns `None` if `p.x` is not strictly inside the domain or if a
    /// node already sits at exactly that x. The y value is clamped into the
    /// range.
    pub fn insert_node(&mut self, p: Point) -> Option<NodeId> {
        let bounds = self.config.bounds;

        if !p.is_finite() || p.x <= bounds.min_x || p.x >= bounds.max_x {
            return None;
        }

        let pos = self
            .order
            .iter()
            .position(|id| self.nodes[id.idx].anchor.x >= p.x)?;

        if self.nodes[self.order[pos].idx].anchor.x == p.x {
            return None;
        }

        let anchor = Point::new(p.x, bounds.clamp_y(p.y));
        let id = NodeId {
            idx: self.nodes.insert(CurveNode::linear(anchor)),
        };
        self.order.insert(pos, id);

        log::debug!("Inserted {:?} at ({}, {})", id, anchor.x, anchor.y);

        self.bump();
        Some(id)
    }

    /// Remove an interior node.
    ///
    /// The first and last node can't be removed. Any [`HandleRef`] to the
    /// removed node becomes stale.
    pub fn delete_node(&mut self, id: NodeId) -> bool {
        let Some(i) = self.index_of(id) else {
            return false;
        };

        if i == 0 || i == self.order.len() - 1 {
            return false;
        }

        self.order.remove(i);
        self.nodes.remove(id.idx);

        log::debug!("Deleted {:?}", id);

        self.bump();
        true
    }

    /// Change the shape of the segment following the node.
    ///
    /// Switching to [`CurveType::Linear`] collapses both control handles
    /// onto the anchor. Switching to a Bézier type places the control
    /// handles a small distance from the anchor (along x for `control1`,
    /// along y for `control2`) so they can be grabbed right away. On the
    /// last node the type is only recorded since no segment follows it.
    pub fn set_curve_type(&mut self, id: NodeId, curve_type: CurveType) -> bool {
        let Some(i) = self.index_of(id) else {
            return false;
        };
        let is_last = i == self.order.len() - 1;

        let bounds = self.config.bounds;
        let offset = self.config.handle_offset;

        let node = &mut self.nodes[id.idx];
        if node.curve_type == curve_type {
            return false;
        }
        node.curve_type = curve_type;

        match curve_type {
            CurveType::Linear => node.collapse_controls(),
            _ if is_last => {}
            CurveType::Quadratic => {
                node.control1 = default_control1(&bounds, offset, node.anchor);
                node.control2 = node.anchor;
            }
            CurveType::Cubic => {
                node.control1 = default_control1(&bounds, offset, node.anchor);
                node.control2 = default_control2(&bounds, offset, node.anchor);
            }
        }

        log::debug!("Set curve type of {:?} to {:?}", id, curve_type);

        self.bump();
        true
    }

    /// Step the node to the next curve type, wrapping around after
    /// [`CurveType::Cubic`].
    pub fn cycle_curve_type(&mut self, id: NodeId) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };

        let next = node.curve_type.next();
        self.set_curve_type(id, next)
    }

    /// Move the node's anchor to `p`, carrying its control handles along.
    ///
    /// The anchor is clamped into the bounds. Boundary nodes keep their x.
    /// Interior nodes can't get closer to their neighbours than the
    /// configured minimum spacing, so dragging an anchor into its neighbour
    /// stops at the neighbour instead of reordering the curve.
    pub fn set_anchor(&mut self, id: NodeId, p: Point) -> bool {
        if !p.is_finite() {
            return false;
        }
        let Some(i) = self.index_of(id) else {
            return false;
        };

        let bounds = self.config.bounds;
        let last = self.order.len() - 1;
        let old = self.nodes[id.idx].anchor;

        let x = if i == 0 {
            bounds.min_x
        } else if i == last {
            bounds.max_x
        } else {
            let prev = self.nodes[self.order[i - 1].idx].anchor.x;
            let next = self.nodes[self.order[i + 1].idx].anchor.x;

            // Never less than one ulp of either neighbour, so the gap
            // survives rounding when the domain sits far from zero.
            let ulp_floor = f32::EPSILON * bounds.width().max(prev.abs()).max(next.abs());
            let spacing = (self.config.min_anchor_spacing * bounds.width()).max(ulp_floor);
            let low = prev + spacing;
            let high = next - spacing;

            if low <= high {
                p.x.max(low).min(high)
            } else {
                old.x
            }
        };

        let new = Point::new(x, bounds.clamp_y(p.y));
        if new == old {
            return false;
        }

        let node = &mut self.nodes[id.idx];
        node.translate(new - old);
        node.anchor = new;
        node.control1 = bounds.clamp(node.control1);
        node.control2 = bounds.clamp(node.control2);

        self.bump();
        true
    }

    /// Move the node's first control handle, clamped into the bounds.
    pub fn set_control1(&mut self, id: NodeId, p: Point) -> bool {
        self.set_control(id, HandleKind::Control1, p)
    }

    /// Move the node's second control handle, clamped into the bounds.
    pub fn set_control2(&mut self, id: NodeId, p: Point) -> bool {
        self.set_control(id, HandleKind::Control2, p)
    }

    /// Move any handle. See [`CurveModel::set_anchor`],
    /// [`CurveModel::set_control1`] and [`CurveModel::set_control2`].
    pub fn set_handle(&mut self, handle: HandleRef, p: Point) -> bool {
        match handle.kind {
            HandleKind::Anchor => self.set_anchor(handle.node, p),
            kind => self.set_control(handle.node, kind, p),
        }
    }

    fn set_control(&mut self, id: NodeId, kind: HandleKind, p: Point) -> bool {
        if !p.is_finite() {
            return false;
        }

        let bounds = self.config.bounds;
        let Some(node) = self.nodes.get_mut(id.idx) else {
            return false;
        };

        let p = bounds.clamp(p);
        let control = match kind {
            HandleKind::Control1 => &mut node.control1,
            HandleKind::Control2 => &mut node.control2,
            HandleKind::Anchor => return false,
        };

        if *control == p {
            return false;
        }
        *control = p;

        self.bump();
        true
    }

    /// The ordered node records to persist.
    pub fn serialize(&self) -> Vec<NodeRecord> {
        self.nodes().map(NodeRecord::from_node).collect()
    }

    /// Replace the curve with persisted node records.
    ///
    /// The records must hold at least 2 finite anchors with strictly
    /// increasing x, and interior anchors must lie strictly inside the
    /// domain. The first and last anchor x snap to the domain edges, and y
    /// values are clamped into the range. If the records are rejected the
    /// model is left untouched.
    pub fn deserialize(&mut self, records: &[NodeRecord]) -> Result<(), PresetError> {
        let nodes = self.validate_records(records)?;

        self.nodes.clear();
        self.order.clear();
        for node in nodes {
            let id = NodeId {
                idx: self.nodes.insert(node),
            };
            self.order.push(id);
        }

        log::debug!("Loaded curve with {} nodes", self.order.len());

        self.bump();
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, PresetError> {
        records_to_json(&self.serialize())
    }

    pub fn load_json(&mut self, json: &str) -> Result<(), PresetError> {
        let records = records_from_json(json)?;
        self.deserialize(&records)
    }

    fn validate_records(&self, records: &[NodeRecord]) -> Result<Vec<CurveNode>, PresetError> {
        if records.len() < 2 {
            return Err(PresetError::TooFewNodes(records.len()));
        }

        let bounds = self.config.bounds;
        let last = records.len() - 1;

        let mut nodes = Vec::with_capacity(records.len().max(self.config.initial_node_capacity));
        let mut prev_x = f32::NEG_INFINITY;

        for (index, record) in records.iter().enumerate() {
            let mut node = record.to_node();

            if !node.anchor.is_finite() {
                return Err(PresetError::NonFinite { index });
            }
            if node.anchor.x <= prev_x {
                return Err(PresetError::NotSorted { index });
            }
            prev_x = node.anchor.x;

            if index == 0 || index == last {
                let x = if index == 0 {
                    bounds.min_x
                } else {
                    bounds.max_x
                };

                if node.anchor.x != x {
                    log::warn!(
                        "Boundary node {} has anchor x {}, snapping to {}",
                        index,
                        node.anchor.x,
                        x
                    );
                    node.anchor.x = x;
                }
            } else if node.anchor.x <= bounds.min_x || node.anchor.x >= bounds.max_x {
                return Err(PresetError::OutOfDomain {
                    index,
                    x: node.anchor.x,
                });
            }

            let clamped = bounds.clamp(node.anchor);
            if clamped != node.anchor {
                log::warn!(
                    "Node {} has anchor y {} outside of the curve's range, clamping",
                    index,
                    node.anchor.y
                );
                node.anchor = clamped;
            }
            node.control1 = bounds.clamp(node.control1);
            node.control2 = bounds.clamp(node.control2);

            nodes.push(node);
        }

        Ok(nodes)
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

impl Default for CurveModel {
    fn default() -> Self {
        Self::new(CurveConfig::default())
    }
}

impl std::fmt::Debug for CurveModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurveModel")
            .field("nodes", &self.nodes().collect::<Vec<_>>())
            .field("bounds", &self.config.bounds)
            .field("revision", &self.revision)
            .field("last_input", &self.last_input_value())
            .finish()
    }
}

fn default_control1(bounds: &CurveBounds, offset: f32, anchor: Point) -> Point {
    let dx = offset * bounds.width();
    let x = if anchor.x + dx <= bounds.max_x {
        anchor.x + dx
    } else {
        anchor.x - dx
    };

    bounds.clamp(Point::new(x, anchor.y))
}

fn default_control2(bounds: &CurveBounds, offset: f32, anchor: Point) -> Point {
    let dy = offset * bounds.height();
    let y = if anchor.y + dy <= bounds.max_y {
        anchor.y + dy
    } else {
        anchor.y - dy
    };

    bounds.clamp(Point::new(anchor.x, y))
}

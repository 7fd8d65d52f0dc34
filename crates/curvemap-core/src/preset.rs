//! The persisted curve layout.
//!
//! A curve is stored as an ordered list of node records:
//!
//! ```json
//! [{ "curveType": 0, "anchor": { "x": 0.0, "y": 0.0 },
//!    "control1": { "x": 0.0, "y": 0.0 }, "control2": { "x": 0.0, "y": 0.0 } }]
//! ```
//!
//! Control handles are stored for every node, including linear ones.
//! Apart from the anchor, missing fields fall back to a safe value instead
//! of failing the load.

use serde::{Deserialize, Serialize};

use crate::{
    geometry::Point,
    node::{CurveNode, CurveType},
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
}

impl From<Point> for PointRecord {
    fn from(p: Point) -> Self {
        Self { x: p.x, y: p.y }
    }
}

impl From<PointRecord> for Point {
    fn from(p: PointRecord) -> Self {
        Point::new(p.x, p.y)
    }
}

/// One persisted node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    #[serde(default)]
    pub curve_type: i32,
    /// Required. A record without one fails to parse.
    pub anchor: PointRecord,
    /// Collapses onto the anchor when missing.
    #[serde(default)]
    pub control1: Option<PointRecord>,
    /// Collapses onto the anchor when missing.
    #[serde(default)]
    pub control2: Option<PointRecord>,
}

impl NodeRecord {
    pub fn from_node(node: &CurveNode) -> Self {
        Self {
            curve_type: node.curve_type.id(),
            anchor: node.anchor.into(),
            control1: Some(node.control1.into()),
            control2: Some(node.control2.into()),
        }
    }

    /// Convert back into a node, without any validation against a model's
    /// bounds.
    ///
    /// Unknown curve type ids load as [`CurveType::Linear`], and missing or
    /// non-finite control handles collapse onto the anchor.
    pub fn to_node(&self) -> CurveNode {
        let anchor: Point = self.anchor.into();

        let curve_type = CurveType::from_id(self.curve_type).unwrap_or_else(|| {
            log::warn!(
                "Unknown curve type id {} in preset, falling back to linear",
                self.curve_type
            );
            CurveType::Linear
        });

        let control = |record: Option<PointRecord>| -> Point {
            match record.map(Point::from) {
                Some(p) if p.is_finite() => p,
                Some(_) => {
                    log::warn!("Non-finite control handle in preset, collapsing onto anchor");
                    anchor
                }
                None => anchor,
            }
        };

        CurveNode {
            anchor,
            control1: control(self.control1),
            control2: control(self.control2),
            curve_type,
        }
    }
}

/// An error occurred while loading a persisted curve.
#[derive(Debug, thiserror::Error)]
pub enum PresetError {
    #[error("Failed to parse curve preset: {0}")]
    Json(#[from] serde_json::Error),
    #[error("A curve needs at least 2 nodes, but the preset contains {0}")]
    TooFewNodes(usize),
    #[error("Node {index} has a non-finite anchor")]
    NonFinite { index: usize },
    #[error("Node {index} is not to the right of the node before it")]
    NotSorted { index: usize },
    #[error("Node {index} has an anchor x of {x}, which is outside of the curve's domain")]
    OutOfDomain { index: usize, x: f32 },
}

pub fn records_to_json(records: &[NodeRecord]) -> Result<String, PresetError> {
    Ok(serde_json::to_string(records)?)
}

pub fn records_from_json(json: &str) -> Result<Vec<NodeRecord>, PresetError> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names_match_persisted_layout() {
        let node = CurveNode {
            anchor: Point::new(1.0, 2.0),
            control1: Point::new(3.0, 4.0),
            control2: Point::new(5.0, 6.0),
            curve_type: CurveType::Cubic,
        };

        let value = serde_json::to_value(NodeRecord::from_node(&node)).unwrap();

        assert_eq!(value["curveType"], 2);
        assert_eq!(value["anchor"]["x"], 1.0);
        assert_eq!(value["control1"]["y"], 4.0);
        assert_eq!(value["control2"]["x"], 5.0);
    }

    #[test]
    fn missing_fields_default_safely() {
        let records = records_from_json(r#"[{ "anchor": { "x": 3.0, "y": 7.0 }, "extra": true }]"#)
            .unwrap();

        let node = records[0].to_node();

        assert_eq!(node.curve_type, CurveType::Linear);
        assert_eq!(node.anchor, Point::new(3.0, 7.0));
        assert_eq!(node.control1, node.anchor);
        assert_eq!(node.control2, node.anchor);
    }

    #[test]
    fn unknown_curve_type_loads_as_linear() {
        let records = records_from_json(
            r#"[{ "curveType": 9, "anchor": { "x": 0.0, "y": 1.0 },
                  "control1": { "x": 4.0, "y": 1.0 } }]"#,
        )
        .unwrap();

        let node = records[0].to_node();

        assert_eq!(node.curve_type, CurveType::Linear);
        assert_eq!(node.control1, Point::new(4.0, 1.0));
    }

    #[test]
    fn missing_anchor_is_an_error() {
        let result = records_from_json(
            r#"[{ "curveType": 0, "anchor": { "x": 0.0, "y": 0.0 } },
                { "curveType": 1 },
                { "curveType": 0, "anchor": { "x": 1.0, "y": 1.0 } }]"#,
        );

        match result {
            Err(PresetError::Json(e)) => assert!(e.to_string().contains("anchor"), "{}", e),
            other => panic!("expected a parse error, got {:?}", other),
        }
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            records_from_json("{ not json"),
            Err(PresetError::Json(_))
        ));
    }
}

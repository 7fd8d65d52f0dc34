pub mod geometry;
pub mod model;
pub mod node;
pub mod preset;
pub mod range;
mod snapshot;
pub mod util;

pub use geometry::Point;
pub use model::{CurveConfig, CurveModel};
pub use node::{CurveNode, CurveType, HandleKind, HandleRef, NodeId};
pub use preset::{NodeRecord, PointRecord, PresetError};
pub use range::CurveBounds;
pub use snapshot::CurveSnapshot;

//! Pointer interaction for editing a [`CurveModel`](curvemap_core::CurveModel)
//! on screen.

mod controller;
mod transform;

pub use controller::{
    EditorConfig, HandleHit, InteractionController, PointerButton, PointerEvent,
};
pub use transform::ScreenTransform;

pub use curvemap_core::*;
pub use curvemap_engine::*;

#[cfg(feature = "editor")]
pub use curvemap_editor::*;

//! Chart aggregate: options, value objects, overlays and the viewport model.

pub mod options;
pub mod overlay;
pub mod value_objects;
pub mod viewport;

pub use options::*;
pub use overlay::{OverlayData, PositionMarker, PositionSide};
pub use value_objects::*;
pub use viewport::{ListenerId, ViewportLimits, ViewportModel};

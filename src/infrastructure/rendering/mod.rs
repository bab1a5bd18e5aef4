//! Surfaces, backends, the compositor and the batch renderers.

pub mod canvas;
pub mod compositor;
pub mod display_list;
pub mod raster;
pub mod renderers;
pub mod scheduler;
pub mod surface;

pub use canvas::{CanvasSurface, CanvasSurfaceFactory};
pub use compositor::{Compositor, FrameStats, PaintContext, SurfacePainter};
pub use display_list::{DisplayList, DisplayListFactory, DrawCommand};
pub use raster::{PixelSurface, RasterSurfaceFactory, Rgba8};
pub use renderers::RenderStats;
pub use scheduler::{CallbackScheduler, FrameScheduler, ManualScheduler};
pub use surface::{DrawTarget, LayerKind, Surface, SurfaceFactory};

//! Batch renderers. Each one is a pure function over a draw target: it
//! culls points outside the panel or the damage region, groups the rest by
//! style and issues one command per group.

pub mod background;
pub mod indicator;
pub mod interaction;
pub mod overlay;
pub mod price;
pub mod volume;

use std::ops::AddAssign;

use crate::domain::chart::{Rect, Viewport};

pub use background::{BackgroundInput, render_background};
pub use indicator::{IndicatorRenderInput, IndicatorStyle, indicator_scale, render_indicator};
pub use interaction::{CrosshairInput, render_crosshair};
pub use overlay::{OverlayRenderInput, render_overlay};
pub use price::{PriceRenderInput, render_candles, render_current_price};
pub use volume::{VolumeRenderInput, render_volume};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub drawn: usize,
    pub culled: usize,
    pub draw_calls: usize,
}

impl AddAssign for RenderStats {
    fn add_assign(&mut self, other: Self) {
        self.drawn += other.drawn;
        self.culled += other.culled;
        self.draw_calls += other.draw_calls;
    }
}

/// Where a renderer may draw: the latest viewport, the panel bounds and the
/// pending damage (`None` = whole surface).
#[derive(Debug, Clone, Copy)]
pub struct RenderFrame<'a> {
    pub viewport: &'a Viewport,
    pub bounds: Rect,
    pub region: Option<Rect>,
}

impl<'a> RenderFrame<'a> {
    pub fn new(viewport: &'a Viewport, bounds: Rect, region: Option<Rect>) -> Self {
        Self { viewport, bounds, region }
    }

    /// Culling test: the footprint must hit the panel and, when a damage
    /// region is given, that region too.
    pub fn admits(&self, footprint: &Rect) -> bool {
        footprint.intersects(&self.bounds)
            && self.region.is_none_or(|region| footprint.intersects(&region))
    }

    pub fn x_of(&self, index: usize) -> f64 {
        self.viewport.index_to_x(index as f64)
    }
}

//! Drawable surfaces and their dirty-region bookkeeping.

use std::any::Any;

use strum::{AsRefStr, Display as StrumDisplay, EnumIter};

use crate::domain::chart::{Color, Rect, Segment};
use crate::domain::errors::ChartResult;

/// Immediate-mode drawing backend. Every call is one batched command, so a
/// renderer issues one call per style group rather than one per point.
pub trait DrawTarget {
    fn size(&self) -> (f64, f64);
    fn resize(&mut self, width: f64, height: f64);
    fn clear_rect(&mut self, rect: &Rect);
    /// Restrict later paint commands to `clip`; `None` lifts the restriction
    fn set_clip(&mut self, clip: Option<Rect>);
    fn fill_rects(&mut self, rects: &[Rect], color: Color);
    fn stroke_segments(&mut self, segments: &[Segment], color: Color, width: f64);
    fn stroke_polyline(&mut self, points: &[(f64, f64)], color: Color, width: f64);
    fn fill_text(&mut self, text: &str, x: f64, y: f64, color: Color, font: &str);
    fn as_any(&self) -> &dyn Any;
}

/// Compositing layer, listed bottom to top
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, StrumDisplay, EnumIter, AsRefStr)]
pub enum LayerKind {
    #[strum(serialize = "background")]
    Background,
    #[strum(serialize = "price")]
    Price,
    #[strum(serialize = "indicators")]
    Indicators,
    #[strum(serialize = "overlay")]
    Overlay,
    #[strum(serialize = "interaction")]
    Interaction,
}

impl LayerKind {
    /// Only the top layer receives pointer events
    pub fn accepts_input(&self) -> bool {
        matches!(self, LayerKind::Interaction)
    }
}

/// Creates backend targets for new surfaces
pub trait SurfaceFactory {
    fn create(
        &mut self,
        name: &str,
        layer: LayerKind,
        width: f64,
        height: f64,
    ) -> ChartResult<Box<dyn DrawTarget>>;

    /// Release backend resources of a destroyed surface
    fn release(&mut self, _name: &str) {}
}

/// One drawable layer plus its pending damage.
///
/// A dirty surface with `region == None` must be fully repainted; otherwise
/// only the bounding box in `region` needs it.
pub struct Surface {
    name: String,
    layer: LayerKind,
    target: Box<dyn DrawTarget>,
    dirty: bool,
    region: Option<Rect>,
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("name", &self.name)
            .field("layer", &self.layer)
            .field("dirty", &self.dirty)
            .field("region", &self.region)
            .finish()
    }
}

impl Surface {
    /// New surfaces start fully dirty
    pub fn new(name: impl Into<String>, layer: LayerKind, target: Box<dyn DrawTarget>) -> Self {
        Self { name: name.into(), layer, target, dirty: true, region: None }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layer(&self) -> LayerKind {
        self.layer
    }

    pub fn accepts_input(&self) -> bool {
        self.layer.accepts_input()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Pending damage; `None` means the whole surface
    pub fn dirty_region(&self) -> Option<Rect> {
        self.region
    }

    pub fn bounds(&self) -> Rect {
        let (width, height) = self.target.size();
        Rect::new(0.0, 0.0, width, height)
    }

    /// Merge damage. A pending full-surface mark stays full.
    pub fn mark_dirty(&mut self, region: Option<Rect>) {
        let region = match region {
            Some(rect) => match rect.intersection(&self.bounds()) {
                Some(clipped) => Some(clipped),
                None => return,
            },
            None => None,
        };
        self.region = match (self.dirty, self.region, region) {
            (false, _, incoming) => incoming,
            (true, None, _) | (true, _, None) => None,
            (true, Some(existing), Some(rect)) => Some(existing.union(&rect)),
        };
        self.dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
        self.region = None;
    }

    /// Erase `region`, or everything
    pub fn clear(&mut self, region: Option<Rect>) {
        let rect = region.unwrap_or_else(|| self.bounds());
        self.target.clear_rect(&rect);
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.target.resize(width, height);
        self.mark_dirty(None);
    }

    pub fn target(&self) -> &dyn DrawTarget {
        self.target.as_ref()
    }

    pub fn target_mut(&mut self) -> &mut dyn DrawTarget {
        self.target.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::rendering::display_list::DisplayList;

    fn surface() -> Surface {
        let mut surface =
            Surface::new("s", LayerKind::Price, Box::new(DisplayList::new(800.0, 600.0)));
        surface.mark_clean();
        surface
    }

    #[test]
    fn regions_merge_to_bounding_box() {
        let mut s = surface();
        s.mark_dirty(Some(Rect::new(10.0, 10.0, 10.0, 10.0)));
        s.mark_dirty(Some(Rect::new(50.0, 40.0, 10.0, 10.0)));
        assert_eq!(s.dirty_region(), Some(Rect::new(10.0, 10.0, 50.0, 40.0)));
    }

    #[test]
    fn full_mark_absorbs_later_regions() {
        let mut s = surface();
        s.mark_dirty(None);
        s.mark_dirty(Some(Rect::new(1.0, 1.0, 2.0, 2.0)));
        assert!(s.is_dirty());
        assert_eq!(s.dirty_region(), None);
    }

    #[test]
    fn off_surface_region_is_ignored() {
        let mut s = surface();
        s.mark_dirty(Some(Rect::new(900.0, 700.0, 10.0, 10.0)));
        assert!(!s.is_dirty());
    }

    #[test]
    fn only_interaction_accepts_input() {
        assert!(LayerKind::Interaction.accepts_input());
        assert!(!LayerKind::Overlay.accepts_input());
    }
}

//! Multi-surface compositor with coalesced, damage-driven redraws.

use super::scheduler::FrameScheduler;
use super::surface::{DrawTarget, LayerKind, Surface};
use crate::domain::chart::{Rect, Viewport, ViewportModel};
use crate::domain::errors::{ChartError, ChartResult};
use crate::domain::logging::LogComponent;
use crate::{log_debug, log_error};

/// What a painter needs to know about the surface being painted
#[derive(Debug, Clone, Copy)]
pub struct PaintContext<'a> {
    pub name: &'a str,
    pub layer: LayerKind,
    /// Latest viewport, read at paint time
    pub viewport: Viewport,
    /// Damage to repaint; `None` means everything
    pub region: Option<Rect>,
    pub bounds: Rect,
}

/// Paints one surface. Implemented by the chart instance.
pub trait SurfacePainter {
    fn paint(&mut self, ctx: &PaintContext<'_>, target: &mut dyn DrawTarget) -> ChartResult<()>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub painted: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Owns the surfaces (bottom to top) and the single viewport model.
///
/// The compositor polls the viewport revision instead of registering a
/// listener on it, so ownership only points one way.
pub struct Compositor {
    surfaces: Vec<Surface>,
    viewport: ViewportModel,
    scheduler: Box<dyn FrameScheduler>,
    frame_pending: bool,
    seen_revision: u64,
    frames: u64,
    destroyed: bool,
}

impl std::fmt::Debug for Compositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compositor")
            .field("surfaces", &self.surfaces)
            .field("viewport", &self.viewport)
            .field("frame_pending", &self.frame_pending)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

impl Compositor {
    pub fn new(viewport: ViewportModel, scheduler: Box<dyn FrameScheduler>) -> Self {
        let seen_revision = viewport.revision();
        Self {
            surfaces: Vec::new(),
            viewport,
            scheduler,
            frame_pending: false,
            seen_revision,
            frames: 0,
            destroyed: false,
        }
    }

    /// Insert a surface above every surface of the same or a lower layer
    pub fn add_surface(&mut self, mut surface: Surface) -> ChartResult<()> {
        if self.destroyed {
            return Err(ChartError::Destroyed);
        }
        if self.surface(surface.name()).is_some() {
            return Err(ChartError::Configuration(format!(
                "surface '{}' already exists",
                surface.name()
            )));
        }
        let at = self.surfaces.iter().take_while(|s| s.layer() <= surface.layer()).count();
        surface.mark_dirty(None);
        log_debug!(
            LogComponent::Infrastructure("Compositor"),
            "surface '{}' added on layer {}",
            surface.name(),
            surface.layer()
        );
        self.surfaces.insert(at, surface);
        self.request_frame();
        Ok(())
    }

    pub fn remove_surface(&mut self, name: &str) -> Option<Surface> {
        let index = self.surfaces.iter().position(|s| s.name() == name)?;
        let removed = self.surfaces.remove(index);
        // whatever it covered must be repainted below
        self.mark_all_dirty();
        Some(removed)
    }

    pub fn surface(&self, name: &str) -> Option<&Surface> {
        self.surfaces.iter().find(|s| s.name() == name)
    }

    pub fn surface_mut(&mut self, name: &str) -> Option<&mut Surface> {
        self.surfaces.iter_mut().find(|s| s.name() == name)
    }

    /// Surface names in paint order
    pub fn surface_names(&self) -> Vec<&str> {
        self.surfaces.iter().map(|s| s.name()).collect()
    }

    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    /// Topmost surface that takes pointer input
    pub fn input_surface(&self) -> Option<&Surface> {
        self.surfaces.iter().rev().find(|s| s.accepts_input())
    }

    pub fn viewport(&self) -> &ViewportModel {
        &self.viewport
    }

    /// Mutate the viewport; any effective change damages every surface
    pub fn with_viewport<R>(&mut self, f: impl FnOnce(&mut ViewportModel) -> R) -> R {
        let result = f(&mut self.viewport);
        self.sync_viewport();
        result
    }

    pub fn mark_layer_dirty(&mut self, name: &str, region: Option<Rect>) -> bool {
        if self.destroyed {
            return false;
        }
        let Some(surface) = self.surfaces.iter_mut().find(|s| s.name() == name) else {
            return false;
        };
        surface.mark_dirty(region);
        self.request_frame();
        true
    }

    /// Damage every surface on `layer`
    pub fn mark_kind_dirty(&mut self, layer: LayerKind, region: Option<Rect>) {
        if self.destroyed {
            return;
        }
        let mut any = false;
        for surface in self.surfaces.iter_mut().filter(|s| s.layer() == layer) {
            surface.mark_dirty(region);
            any = true;
        }
        if any {
            self.request_frame();
        }
    }

    pub fn mark_all_dirty(&mut self) {
        if self.destroyed {
            return;
        }
        for surface in self.surfaces.iter_mut() {
            surface.mark_dirty(None);
        }
        self.request_frame();
    }

    pub fn frame_pending(&self) -> bool {
        self.frame_pending
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        if self.destroyed {
            return;
        }
        for surface in self.surfaces.iter_mut() {
            surface.resize(width, height);
        }
        self.viewport.resize(width, height);
        self.seen_revision = self.viewport.revision();
        self.request_frame();
    }

    /// Paint dirty surfaces in z-order: clear their damage, paint, mark
    /// clean. Clean surfaces are skipped. One surface failing does not stop
    /// the others.
    pub fn run_frame(&mut self, painter: &mut dyn SurfacePainter) -> FrameStats {
        let mut stats = FrameStats::default();
        if self.destroyed {
            return stats;
        }
        // damage found now is painted by this frame, not a new request
        self.frame_pending = true;
        self.sync_viewport();
        self.frame_pending = false;
        self.frames += 1;

        let viewport = self.viewport.viewport();
        for surface in self.surfaces.iter_mut() {
            if !surface.is_dirty() {
                stats.skipped += 1;
                continue;
            }
            let region = surface.dirty_region();
            if region.is_some() {
                // items straddling the damage edge must not touch pixels outside it
                surface.target_mut().set_clip(region);
            }
            surface.clear(region);
            let bounds = surface.bounds();
            let name = surface.name().to_string();
            let ctx = PaintContext { name: &name, layer: surface.layer(), viewport, region, bounds };
            let painted = painter.paint(&ctx, surface.target_mut());
            if region.is_some() {
                surface.target_mut().set_clip(None);
            }
            match painted {
                Ok(()) => stats.painted += 1,
                Err(err) => {
                    stats.failed += 1;
                    log_error!(
                        LogComponent::Infrastructure("Compositor"),
                        "painting surface '{}' failed: {}",
                        name,
                        err
                    );
                }
            }
            surface.mark_clean();
        }
        stats
    }

    /// Release all surfaces and detach viewport listeners. Returns the names
    /// of the released surfaces.
    pub fn destroy(&mut self) -> Vec<String> {
        if self.destroyed {
            return Vec::new();
        }
        self.destroyed = true;
        self.frame_pending = false;
        self.viewport.clear_listeners();
        let names = self.surfaces.drain(..).map(|s| s.name().to_string()).collect();
        log_debug!(LogComponent::Infrastructure("Compositor"), "destroyed");
        names
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn sync_viewport(&mut self) {
        let revision = self.viewport.revision();
        if revision != self.seen_revision {
            self.seen_revision = revision;
            self.mark_all_dirty();
        }
    }

    /// At most one request per tick: only the first damage since the last
    /// frame asks the scheduler.
    fn request_frame(&mut self) {
        if self.destroyed || self.frame_pending {
            return;
        }
        self.frame_pending = true;
        self.scheduler.request_frame();
    }
}

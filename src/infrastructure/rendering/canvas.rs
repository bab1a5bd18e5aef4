//! `<canvas>` 2D backend. Each surface owns one absolutely positioned canvas
//! stacked inside a host container element.

use std::any::Any;

use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, Document, Element, HtmlCanvasElement};

use super::surface::{DrawTarget, LayerKind, SurfaceFactory};
use crate::domain::chart::{Color, Rect, Segment};
use crate::domain::errors::{ChartError, ChartResult};
use crate::domain::logging::LogComponent;
use crate::log_warn;

pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    width: f64,
    height: f64,
    /// A clip is active and must be popped with `restore`
    clipped: bool,
}

impl CanvasSurface {
    /// Acquire the 2D context of `canvas`. Failure is a resource error.
    pub fn new(canvas: HtmlCanvasElement, width: f64, height: f64) -> ChartResult<Self> {
        canvas.set_width(width.max(0.0) as u32);
        canvas.set_height(height.max(0.0) as u32);
        let ctx = canvas
            .get_context("2d")
            .map_err(|_| ChartError::Resource("failed to get 2D context".into()))?
            .ok_or_else(|| ChartError::Resource("2D context unavailable".into()))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| ChartError::Resource("failed to cast to 2D context".into()))?;
        Ok(Self { canvas, ctx, width, height, clipped: false })
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }
}

impl DrawTarget for CanvasSurface {
    fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.canvas.set_width(width.max(0.0) as u32);
        self.canvas.set_height(height.max(0.0) as u32);
        // resizing resets the context state, clip stack included
        self.clipped = false;
    }

    fn clear_rect(&mut self, rect: &Rect) {
        self.ctx.clear_rect(rect.x, rect.y, rect.width, rect.height);
    }

    fn set_clip(&mut self, clip: Option<Rect>) {
        if self.clipped {
            self.ctx.restore();
            self.clipped = false;
        }
        if let Some(rect) = clip {
            self.ctx.save();
            self.ctx.begin_path();
            self.ctx.rect(rect.x, rect.y, rect.width, rect.height);
            self.ctx.clip();
            self.clipped = true;
        }
    }

    fn fill_rects(&mut self, rects: &[Rect], color: Color) {
        self.ctx.set_fill_style_str(&color.to_css());
        self.ctx.begin_path();
        for rect in rects {
            self.ctx.rect(rect.x, rect.y, rect.width, rect.height);
        }
        self.ctx.fill();
    }

    fn stroke_segments(&mut self, segments: &[Segment], color: Color, width: f64) {
        self.ctx.set_stroke_style_str(&color.to_css());
        self.ctx.set_line_width(width);
        self.ctx.begin_path();
        for segment in segments {
            self.ctx.move_to(segment.x0, segment.y0);
            self.ctx.line_to(segment.x1, segment.y1);
        }
        self.ctx.stroke();
    }

    fn stroke_polyline(&mut self, points: &[(f64, f64)], color: Color, width: f64) {
        let Some((&(x0, y0), rest)) = points.split_first() else {
            return;
        };
        self.ctx.set_stroke_style_str(&color.to_css());
        self.ctx.set_line_width(width);
        self.ctx.begin_path();
        self.ctx.move_to(x0, y0);
        for &(x, y) in rest {
            self.ctx.line_to(x, y);
        }
        self.ctx.stroke();
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, color: Color, font: &str) {
        self.ctx.set_font(font);
        self.ctx.set_fill_style_str(&color.to_css());
        if self.ctx.fill_text(text, x, y).is_err() {
            log_warn!(LogComponent::Infrastructure("Canvas"), "fill_text failed");
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Creates one stacked canvas per surface inside `container`
pub struct CanvasSurfaceFactory {
    document: Document,
    container: Element,
    canvases: Vec<(String, HtmlCanvasElement)>,
}

impl CanvasSurfaceFactory {
    pub fn new(document: Document, container: Element) -> Self {
        Self { document, container, canvases: Vec::new() }
    }

    /// Factory over the element with id `container_id` in the current page
    pub fn for_container(container_id: &str) -> ChartResult<Self> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| ChartError::Resource("no document available".into()))?;
        let container = document
            .get_element_by_id(container_id)
            .ok_or_else(|| ChartError::Resource(format!("element '{}' not found", container_id)))?;
        Ok(Self::new(document, container))
    }
}

impl SurfaceFactory for CanvasSurfaceFactory {
    fn create(
        &mut self,
        name: &str,
        layer: LayerKind,
        width: f64,
        height: f64,
    ) -> ChartResult<Box<dyn DrawTarget>> {
        let canvas = self
            .document
            .create_element("canvas")
            .map_err(|_| ChartError::Resource("failed to create canvas".into()))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| ChartError::Resource("created element is not a canvas".into()))?;

        let pointer = if layer.accepts_input() { "auto" } else { "none" };
        let style = format!(
            "position:absolute;left:0;top:0;z-index:{};pointer-events:{}",
            layer as u8, pointer
        );
        canvas
            .set_attribute("style", &style)
            .map_err(|_| ChartError::Resource("failed to style canvas".into()))?;
        canvas
            .set_attribute("data-surface", name)
            .map_err(|_| ChartError::Resource("failed to tag canvas".into()))?;
        self.container
            .append_child(&canvas)
            .map_err(|_| ChartError::Resource("failed to attach canvas".into()))?;

        let surface = CanvasSurface::new(canvas.clone(), width, height)?;
        self.canvases.push((name.to_string(), canvas));
        Ok(Box::new(surface))
    }

    fn release(&mut self, name: &str) {
        if let Some(index) = self.canvases.iter().position(|(n, _)| n == name) {
            let (_, canvas) = self.canvases.remove(index);
            canvas.remove();
        }
    }
}

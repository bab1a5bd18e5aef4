//! Recorded drawing commands. Built anywhere (including worker threads) and
//! replayed onto a real target on the UI thread.

use std::any::Any;

use super::surface::{DrawTarget, LayerKind, SurfaceFactory};
use crate::domain::chart::{Color, Rect, Segment};
use crate::domain::errors::ChartResult;

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear { rect: Rect },
    Clip { rect: Option<Rect> },
    FillRects { rects: Vec<Rect>, color: Color },
    StrokeSegments { segments: Vec<Segment>, color: Color, width: f64 },
    StrokePolyline { points: Vec<(f64, f64)>, color: Color, width: f64 },
    FillText { text: String, x: f64, y: f64, color: Color, font: String },
}

impl DrawCommand {
    pub fn is_paint(&self) -> bool {
        !matches!(self, DrawCommand::Clear { .. } | DrawCommand::Clip { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayList {
    width: f64,
    height: f64,
    commands: Vec<DrawCommand>,
}

impl DisplayList {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height, commands: Vec::new() }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Paint commands issued so far (clears and clips excluded)
    pub fn draw_calls(&self) -> usize {
        self.commands.iter().filter(|c| c.is_paint()).count()
    }

    /// Total rectangles across every fill command
    pub fn filled_rect_count(&self) -> usize {
        self.commands
            .iter()
            .map(|c| match c {
                DrawCommand::FillRects { rects, .. } => rects.len(),
                _ => 0,
            })
            .sum()
    }

    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn extend(&mut self, other: DisplayList) {
        self.commands.extend(other.commands);
    }

    pub fn replay(&self, target: &mut dyn DrawTarget) {
        for command in &self.commands {
            match command {
                DrawCommand::Clear { rect } => target.clear_rect(rect),
                DrawCommand::Clip { rect } => target.set_clip(*rect),
                DrawCommand::FillRects { rects, color } => target.fill_rects(rects, *color),
                DrawCommand::StrokeSegments { segments, color, width } => {
                    target.stroke_segments(segments, *color, *width)
                }
                DrawCommand::StrokePolyline { points, color, width } => {
                    target.stroke_polyline(points, *color, *width)
                }
                DrawCommand::FillText { text, x, y, color, font } => {
                    target.fill_text(text, *x, *y, *color, font)
                }
            }
        }
    }
}

impl DrawTarget for DisplayList {
    fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    fn clear_rect(&mut self, rect: &Rect) {
        // a full clear makes everything recorded so far invisible
        if rect.contains(&Rect::new(0.0, 0.0, self.width, self.height)) {
            self.commands.clear();
        }
        self.commands.push(DrawCommand::Clear { rect: *rect });
    }

    fn set_clip(&mut self, clip: Option<Rect>) {
        self.commands.push(DrawCommand::Clip { rect: clip });
    }

    fn fill_rects(&mut self, rects: &[Rect], color: Color) {
        if rects.is_empty() {
            return;
        }
        self.commands.push(DrawCommand::FillRects { rects: rects.to_vec(), color });
    }

    fn stroke_segments(&mut self, segments: &[Segment], color: Color, width: f64) {
        if segments.is_empty() {
            return;
        }
        self.commands.push(DrawCommand::StrokeSegments { segments: segments.to_vec(), color, width });
    }

    fn stroke_polyline(&mut self, points: &[(f64, f64)], color: Color, width: f64) {
        if points.len() < 2 {
            return;
        }
        self.commands.push(DrawCommand::StrokePolyline { points: points.to_vec(), color, width });
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, color: Color, font: &str) {
        self.commands.push(DrawCommand::FillText {
            text: text.to_string(),
            x,
            y,
            color,
            font: font.to_string(),
        });
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Creates recording targets; used headless and by tests that inspect the
/// issued commands
#[derive(Debug, Default, Clone, Copy)]
pub struct DisplayListFactory;

impl SurfaceFactory for DisplayListFactory {
    fn create(
        &mut self,
        _name: &str,
        _layer: LayerKind,
        width: f64,
        height: f64,
    ) -> ChartResult<Box<dyn DrawTarget>> {
        Ok(Box::new(DisplayList::new(width, height)))
    }
}

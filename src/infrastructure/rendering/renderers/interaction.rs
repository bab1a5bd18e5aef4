use super::{RenderFrame, RenderStats};
use crate::domain::chart::{Segment, Theme};
use crate::infrastructure::rendering::surface::DrawTarget;

pub struct CrosshairInput<'a> {
    /// Pointer position in surface pixels
    pub position: Option<(f64, f64)>,
    pub frame: RenderFrame<'a>,
    /// Price under the pointer, when it is over the main panel
    pub label: Option<String>,
    pub theme: &'a Theme,
}

/// Crosshair lines in one batch plus the price label
pub fn render_crosshair(target: &mut dyn DrawTarget, input: &CrosshairInput<'_>) -> RenderStats {
    let mut stats = RenderStats::default();
    let Some((x, y)) = input.position else {
        return stats;
    };
    let bounds = input.frame.bounds;
    if !bounds.contains_point(x, y) {
        stats.culled += 1;
        return stats;
    }

    let lines: Vec<Segment> = [
        Segment::new(x, bounds.y, x, bounds.bottom()),
        Segment::new(bounds.x, y, bounds.right(), y),
    ]
    .into_iter()
    .filter(|line| input.frame.admits(&line.bounds()))
    .collect();
    if lines.is_empty() {
        stats.culled += 1;
        return stats;
    }
    target.stroke_segments(&lines, input.theme.crosshair, 1.0);
    stats.draw_calls += 1;
    stats.drawn += 1;

    if let Some(label) = &input.label {
        target.fill_text(label, bounds.right() - 60.0, y - 4.0, input.theme.text, &input.theme.font);
        stats.draw_calls += 1;
    }
    stats
}

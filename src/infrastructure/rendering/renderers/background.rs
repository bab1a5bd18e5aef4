use super::{RenderFrame, RenderStats};
use crate::domain::chart::{PriceScale, Rect, Segment, Theme};
use crate::domain::layout::PanelPosition;
use crate::infrastructure::rendering::surface::DrawTarget;

/// Horizontal grid lines in the main panel
pub const GRID_ROWS: usize = 5;
/// Target spacing of vertical grid lines in pixels
pub const GRID_COLUMN_SPACING: f64 = 100.0;

pub struct BackgroundInput<'a> {
    pub frame: RenderFrame<'a>,
    pub panels: &'a [PanelPosition],
    pub divider_height: f64,
    /// Price mapping of the main panel, for grid labels
    pub price_scale: Option<PriceScale>,
    pub theme: &'a Theme,
}

/// Fill, grid and panel dividers. The grid goes out as one segment batch.
pub fn render_background(target: &mut dyn DrawTarget, input: &BackgroundInput<'_>) -> RenderStats {
    let mut stats = RenderStats::default();
    let theme = input.theme;
    let frame = &input.frame;
    let fill = frame.region.unwrap_or(frame.bounds);
    target.fill_rects(&[fill], theme.background);
    stats.draw_calls += 1;

    let mut grid = Vec::new();
    let mut labels = Vec::new();

    // vertical lines snapped to point slots
    let viewport = frame.viewport;
    let step = ((GRID_COLUMN_SPACING / viewport.scale.max(f64::EPSILON)).round() as usize).max(1);
    let first = viewport.start_index.div_ceil(step) * step;
    for index in (first..=viewport.end_index).step_by(step) {
        let x = frame.x_of(index);
        let line = Segment::new(x, frame.bounds.y, x, frame.bounds.bottom());
        push_if_admitted(frame, line, &mut grid, &mut stats);
    }

    if let (Some(scale), Some(main)) = (input.price_scale, input.panels.first()) {
        for row in 1..GRID_ROWS {
            let y = main.y + main.height * row as f64 / GRID_ROWS as f64;
            let line = Segment::new(frame.bounds.x, y, frame.bounds.right(), y);
            if push_if_admitted(frame, line, &mut grid, &mut stats) {
                labels.push((format!("{:.2}", scale.y_to_price(y)), y));
            }
        }
    }

    if !grid.is_empty() {
        target.stroke_segments(&grid, theme.grid, 1.0);
        stats.draw_calls += 1;
    }
    for (text, y) in labels {
        target.fill_text(&text, frame.bounds.right() - 60.0, y - 2.0, theme.text, &theme.font);
        stats.draw_calls += 1;
    }

    let dividers: Vec<Rect> = input
        .panels
        .iter()
        .skip(1)
        .map(|p| Rect::new(frame.bounds.x, p.y - input.divider_height, frame.bounds.width, input.divider_height))
        .filter(|r| frame.admits(r))
        .collect();
    if !dividers.is_empty() {
        target.fill_rects(&dividers, theme.divider);
        stats.draw_calls += 1;
    }
    stats
}

fn push_if_admitted(
    frame: &RenderFrame<'_>,
    line: Segment,
    out: &mut Vec<Segment>,
    stats: &mut RenderStats,
) -> bool {
    if frame.admits(&line.bounds()) {
        out.push(line);
        stats.drawn += 1;
        true
    } else {
        stats.culled += 1;
        false
    }
}

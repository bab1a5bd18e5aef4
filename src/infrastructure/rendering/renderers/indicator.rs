use std::collections::BTreeMap;

use super::{RenderFrame, RenderStats};
use crate::domain::chart::{Color, PriceScale, Rect, Segment, Theme, Viewport};
use crate::domain::market_data::PriceRange;
use crate::domain::series::{SeriesResult, SeriesStyle};
use crate::infrastructure::rendering::surface::DrawTarget;

/// Padding applied to auto-scaled value ranges
pub const AUTO_SCALE_PADDING: f64 = 0.05;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorStyle {
    pub color: Color,
    pub line_width: f64,
    pub line_colors: BTreeMap<String, Color>,
    pub histogram_up: Color,
    pub histogram_down: Color,
}

impl IndicatorStyle {
    pub fn resolve(style: &SeriesStyle, fallback: Color, theme: &Theme) -> Self {
        Self {
            color: style.color.unwrap_or(fallback),
            line_width: style.line_width.unwrap_or(theme.line_width),
            line_colors: style.line_colors.clone(),
            histogram_up: theme.volume_up,
            histogram_down: theme.volume_down,
        }
    }

    fn line_color(&self, name: &str, ordinal: usize) -> Color {
        if name == "main" {
            return self.color;
        }
        self.line_colors.get(name).copied().unwrap_or_else(|| {
            // dim secondary lines of the same family
            self.color.with_alpha((0.8 - 0.2 * ordinal as f32).max(0.3))
        })
    }
}

pub struct IndicatorRenderInput<'a> {
    pub result: &'a SeriesResult,
    pub frame: RenderFrame<'a>,
    pub scale: PriceScale,
    pub style: &'a IndicatorStyle,
}

/// Value-to-pixel mapping for a series: the family's fixed band when it
/// has one, otherwise the visible min/max padded by 5%. `None` when nothing
/// visible is finite.
pub fn indicator_scale(result: &SeriesResult, viewport: &Viewport, bounds: Rect) -> Option<PriceScale> {
    let range = match result.kind.fixed_range() {
        Some((min, max)) => PriceRange::new(min, max),
        None => {
            let (min, max) = result.value_range(viewport.start_index, viewport.end_index)?;
            PriceRange::new(min, max).with_margin(AUTO_SCALE_PADDING)
        }
    };
    Some(PriceScale::new(range, bounds.y, bounds.height))
}

/// One segment batch per line; NaN values break the line. Histogram lines
/// are drawn as bars, one batch per sign.
pub fn render_indicator(target: &mut dyn DrawTarget, input: &IndicatorRenderInput<'_>) -> RenderStats {
    let mut stats = RenderStats::default();
    let histogram = input.result.kind.histogram_line();

    for (ordinal, (name, values)) in input.result.lines().enumerate() {
        if Some(name) == histogram {
            stats += render_histogram(target, values, input);
            continue;
        }
        let segments = line_segments(values, input, &mut stats);
        if !segments.is_empty() {
            target.stroke_segments(&segments, input.style.line_color(name, ordinal), input.style.line_width);
            stats.draw_calls += 1;
        }
    }
    stats
}

fn visible_span(len: usize, viewport: &Viewport) -> Option<(usize, usize)> {
    if len == 0 || viewport.start_index >= len {
        return None;
    }
    Some((viewport.start_index, viewport.end_index.min(len - 1)))
}

fn line_segments(values: &[f64], input: &IndicatorRenderInput<'_>, stats: &mut RenderStats) -> Vec<Segment> {
    let Some((start, end)) = visible_span(values.len(), input.frame.viewport) else {
        return Vec::new();
    };
    let mut segments = Vec::with_capacity(end - start);
    for i in start..end {
        let (a, b) = (values[i], values[i + 1]);
        if !(a.is_finite() && b.is_finite()) {
            continue;
        }
        let segment = Segment::new(
            input.frame.x_of(i),
            input.scale.price_to_y(a),
            input.frame.x_of(i + 1),
            input.scale.price_to_y(b),
        );
        if input.frame.admits(&segment.bounds()) {
            segments.push(segment);
            stats.drawn += 1;
        } else {
            stats.culled += 1;
        }
    }
    segments
}

fn render_histogram(target: &mut dyn DrawTarget, values: &[f64], input: &IndicatorRenderInput<'_>) -> RenderStats {
    let mut stats = RenderStats::default();
    let Some((start, end)) = visible_span(values.len(), input.frame.viewport) else {
        return stats;
    };
    let zero_y = input.scale.price_to_y(0.0);
    let width = input.frame.viewport.body_width();
    let mut positive = Vec::new();
    let mut negative = Vec::new();

    for (i, &value) in values.iter().enumerate().take(end + 1).skip(start) {
        if !value.is_finite() {
            continue;
        }
        let x = input.frame.x_of(i);
        let y = input.scale.price_to_y(value);
        let mut bar = Rect::from_points(x - width / 2.0, zero_y, x + width / 2.0, y);
        bar.height = bar.height.max(1.0);
        if !input.frame.admits(&bar) {
            stats.culled += 1;
            continue;
        }
        if value >= 0.0 {
            positive.push(bar);
        } else {
            negative.push(bar);
        }
        stats.drawn += 1;
    }

    if !positive.is_empty() {
        target.fill_rects(&positive, input.style.histogram_up);
        stats.draw_calls += 1;
    }
    if !negative.is_empty() {
        target.fill_rects(&negative, input.style.histogram_down);
        stats.draw_calls += 1;
    }
    stats
}

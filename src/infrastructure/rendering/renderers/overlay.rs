use super::{RenderFrame, RenderStats};
use crate::domain::chart::{Color, OverlayData, PositionSide, PriceScale, Segment, Theme};
use crate::infrastructure::rendering::surface::DrawTarget;

pub struct OverlayRenderInput<'a> {
    pub overlays: &'a OverlayData,
    pub frame: RenderFrame<'a>,
    pub scale: PriceScale,
    pub theme: &'a Theme,
}

/// Stop-loss, take-profit and position lines across the main panel,
/// batched by colour, each with a label.
pub fn render_overlay(target: &mut dyn DrawTarget, input: &OverlayRenderInput<'_>) -> RenderStats {
    let mut stats = RenderStats::default();
    let theme = input.theme;
    let mut levels: Vec<(f64, Color, String)> = Vec::new();
    if let Some(price) = input.overlays.stop_loss {
        levels.push((price, theme.stop_loss, format!("SL {:.2}", price)));
    }
    if let Some(price) = input.overlays.take_profit {
        levels.push((price, theme.take_profit, format!("TP {:.2}", price)));
    }
    for position in &input.overlays.positions {
        let color = match position.side {
            PositionSide::Long => theme.position_long,
            PositionSide::Short => theme.position_short,
        };
        let label = format!("{} {} @ {:.2}", position.side, position.quantity, position.entry_price);
        levels.push((position.entry_price, color, label));
    }

    let bounds = input.frame.bounds;
    let mut batches: Vec<(Color, Vec<Segment>)> = Vec::new();
    let mut labels = Vec::new();
    for (price, color, label) in levels {
        if !price.is_finite() {
            continue;
        }
        let y = input.scale.price_to_y(price);
        let line = Segment::new(bounds.x, y, bounds.right(), y);
        if !input.frame.admits(&line.bounds()) {
            stats.culled += 1;
            continue;
        }
        match batches.iter_mut().find(|(c, _)| *c == color) {
            Some((_, segments)) => segments.push(line),
            None => batches.push((color, vec![line])),
        }
        labels.push((label, y, color));
        stats.drawn += 1;
    }

    for (color, segments) in &batches {
        target.stroke_segments(segments, *color, 1.0);
        stats.draw_calls += 1;
    }
    for (label, y, color) in labels {
        target.fill_text(&label, bounds.x + 4.0, y - 4.0, color, &theme.font);
        stats.draw_calls += 1;
    }
    stats
}

use super::{RenderFrame, RenderStats};
use crate::domain::chart::{PriceScale, Rect, Segment, Theme};
use crate::domain::market_data::Candle;
use crate::infrastructure::rendering::surface::DrawTarget;

pub struct PriceRenderInput<'a> {
    /// Visible slice of the store
    pub candles: &'a [Candle],
    /// Store index of `candles[0]`
    pub first_index: usize,
    pub frame: RenderFrame<'a>,
    pub scale: PriceScale,
    pub theme: &'a Theme,
}

/// Candles in three batches: up bodies, down bodies, wicks.
pub fn render_candles(target: &mut dyn DrawTarget, input: &PriceRenderInput<'_>) -> RenderStats {
    let mut stats = RenderStats::default();
    let body_width = input.frame.viewport.body_width();
    let half = body_width / 2.0;

    let mut up_bodies = Vec::new();
    let mut down_bodies = Vec::new();
    let mut wicks = Vec::new();

    for (offset, candle) in input.candles.iter().enumerate() {
        let x = input.frame.x_of(input.first_index + offset);
        let high_y = input.scale.price_to_y(candle.ohlcv.high.value());
        let low_y = input.scale.price_to_y(candle.ohlcv.low.value());
        let footprint = Rect::from_points(x - half, high_y, x + half, low_y);
        if !input.frame.admits(&footprint) {
            stats.culled += 1;
            continue;
        }

        let top = input.scale.price_to_y(candle.body_top());
        let bottom = input.scale.price_to_y(candle.body_bottom());
        let body = Rect::new(x - half, top, body_width, (bottom - top).max(1.0));
        if candle.is_bullish() {
            up_bodies.push(body);
        } else {
            down_bodies.push(body);
        }
        wicks.push(Segment::new(x, high_y, x, low_y));
        stats.drawn += 1;
    }

    if !up_bodies.is_empty() {
        target.fill_rects(&up_bodies, input.theme.up);
        stats.draw_calls += 1;
    }
    if !down_bodies.is_empty() {
        target.fill_rects(&down_bodies, input.theme.down);
        stats.draw_calls += 1;
    }
    if !wicks.is_empty() {
        target.stroke_segments(&wicks, input.theme.wick, input.theme.wick_width);
        stats.draw_calls += 1;
    }
    stats
}

/// Horizontal line and label at the latest close
pub fn render_current_price(
    target: &mut dyn DrawTarget,
    latest: Option<&Candle>,
    frame: &RenderFrame<'_>,
    scale: &PriceScale,
    theme: &Theme,
) -> RenderStats {
    let mut stats = RenderStats::default();
    let Some(candle) = latest else {
        return stats;
    };
    let close = candle.ohlcv.close.value();
    let y = scale.price_to_y(close);
    let line = Segment::new(frame.bounds.x, y, frame.bounds.right(), y);
    if !frame.admits(&line.bounds()) {
        stats.culled += 1;
        return stats;
    }
    let color = if candle.is_bullish() { theme.up } else { theme.down };
    target.stroke_segments(&[line], color, 1.0);
    target.fill_text(&format!("{:.2}", close), frame.bounds.right() - 60.0, y - 4.0, color, &theme.font);
    stats.drawn += 1;
    stats.draw_calls += 2;
    stats
}

use super::{RenderFrame, RenderStats};
use crate::domain::chart::{Rect, Theme};
use crate::domain::market_data::Candle;
use crate::infrastructure::rendering::surface::DrawTarget;

/// Share of the panel height used by volume bars
pub const VOLUME_BAND_RATIO: f64 = 0.2;

pub struct VolumeRenderInput<'a> {
    pub candles: &'a [Candle],
    pub first_index: usize,
    pub frame: RenderFrame<'a>,
    pub theme: &'a Theme,
}

/// Volume bars along the bottom of the panel, one batch per colour. Bars
/// are scaled to the largest visible volume.
pub fn render_volume(target: &mut dyn DrawTarget, input: &VolumeRenderInput<'_>) -> RenderStats {
    let mut stats = RenderStats::default();
    let max_volume = input
        .candles
        .iter()
        .map(|c| c.ohlcv.volume.value())
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max);
    if max_volume <= 0.0 {
        return stats;
    }

    let bounds = input.frame.bounds;
    let band = bounds.height * VOLUME_BAND_RATIO;
    let base = bounds.bottom();
    let width = input.frame.viewport.body_width();

    let mut up = Vec::new();
    let mut down = Vec::new();
    for (offset, candle) in input.candles.iter().enumerate() {
        let volume = candle.ohlcv.volume.value();
        if volume.is_nan() || volume <= 0.0 {
            continue;
        }
        let x = input.frame.x_of(input.first_index + offset);
        let height = (volume / max_volume * band).max(1.0);
        let bar = Rect::new(x - width / 2.0, base - height, width, height);
        if !input.frame.admits(&bar) {
            stats.culled += 1;
            continue;
        }
        if candle.is_bullish() {
            up.push(bar);
        } else {
            down.push(bar);
        }
        stats.drawn += 1;
    }

    if !up.is_empty() {
        target.fill_rects(&up, input.theme.volume_up);
        stats.draw_calls += 1;
    }
    if !down.is_empty() {
        target.fill_rects(&down, input.theme.volume_down);
        stats.draw_calls += 1;
    }
    stats
}

use price_chart_compositor::domain::chart::{PriceScale, Rect, Theme, Viewport};
use price_chart_compositor::domain::market_data::{Candle, PriceRange};
use price_chart_compositor::domain::series::{IndicatorKind, SeriesResult, SeriesStyle};
use price_chart_compositor::infrastructure::rendering::DisplayList;
use price_chart_compositor::infrastructure::rendering::renderers::{
    IndicatorRenderInput, IndicatorStyle, PriceRenderInput, RenderFrame, VolumeRenderInput,
    indicator_scale, render_candles, render_indicator, render_volume,
};

const BOUNDS: Rect = Rect { x: 0.0, y: 0.0, width: 800.0, height: 600.0 };

fn viewport() -> Viewport {
    Viewport { start_index: 0, end_index: 9, scale: 50.0, offset: 0.0, width: 800.0, height: 600.0 }
}

fn candles() -> Vec<Candle> {
    (0..10)
        .map(|i| {
            let (open, close) = if i % 2 == 0 { (95.0, 105.0) } else { (105.0, 95.0) };
            Candle::from_values(i, open, 110.0, 90.0, close, 10.0 + i as f64)
        })
        .collect()
}

fn price_scale() -> PriceScale {
    PriceScale::new(PriceRange::new(89.6, 110.4), BOUNDS.y, BOUNDS.height)
}

#[test]
fn damage_region_culls_candles_outside_it() {
    let theme = Theme::default();
    let viewport = viewport();
    let candles = candles();
    let mut list = DisplayList::new(800.0, 600.0);

    let input = PriceRenderInput {
        candles: &candles,
        first_index: 0,
        frame: RenderFrame::new(&viewport, BOUNDS, Some(Rect::new(130.0, 280.0, 40.0, 40.0))),
        scale: price_scale(),
        theme: &theme,
    };
    let stats = render_candles(&mut list, &input);

    // slots 2 and 3 span x 105..145 and 155..195
    assert_eq!((stats.drawn, stats.culled), (2, 8));
}

#[test]
fn candles_are_batched_by_style() {
    let theme = Theme::default();
    let viewport = viewport();
    let candles = candles();
    let mut list = DisplayList::new(800.0, 600.0);

    let input = PriceRenderInput {
        candles: &candles,
        first_index: 0,
        frame: RenderFrame::new(&viewport, BOUNDS, None),
        scale: price_scale(),
        theme: &theme,
    };
    let stats = render_candles(&mut list, &input);

    assert_eq!(stats.drawn, 10);
    assert_eq!(stats.draw_calls, 3);
    assert_eq!(list.draw_calls(), 3);
    assert_eq!(list.filled_rect_count(), 10);
}

#[test]
fn volume_uses_one_batch_per_direction() {
    let theme = Theme::default();
    let viewport = viewport();
    let candles = candles();
    let mut list = DisplayList::new(800.0, 600.0);

    let input = VolumeRenderInput {
        candles: &candles,
        first_index: 0,
        frame: RenderFrame::new(&viewport, BOUNDS, None),
        theme: &theme,
    };
    let stats = render_volume(&mut list, &input);

    assert_eq!(stats.drawn, 10);
    assert_eq!(list.draw_calls(), 2);
}

#[test]
fn all_nan_indicator_draws_nothing() {
    let viewport = viewport();
    let theme = Theme::default();
    let style = IndicatorStyle::resolve(&SeriesStyle::default(), theme.up, &theme);
    let result = SeriesResult::new("rsi", IndicatorKind::Rsi, vec![f64::NAN; 10]);
    let scale = indicator_scale(&result, &viewport, BOUNDS).unwrap();
    let mut list = DisplayList::new(800.0, 600.0);

    let input = IndicatorRenderInput {
        result: &result,
        frame: RenderFrame::new(&viewport, BOUNDS, None),
        scale,
        style: &style,
    };
    let stats = render_indicator(&mut list, &input);

    assert_eq!(stats.drawn, 0);
    assert!(list.is_empty());

    let sma = SeriesResult::new("sma", IndicatorKind::Sma, vec![f64::NAN; 10]);
    assert!(indicator_scale(&sma, &viewport, BOUNDS).is_none());
}

#[test]
fn nan_gaps_break_the_line() {
    let viewport = viewport();
    let theme = Theme::default();
    let style = IndicatorStyle::resolve(&SeriesStyle::default(), theme.up, &theme);
    let mut values: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
    values[4] = f64::NAN;
    let result = SeriesResult::new("sma", IndicatorKind::Sma, values);
    let scale = indicator_scale(&result, &viewport, BOUNDS).unwrap();
    let mut list = DisplayList::new(800.0, 600.0);

    let input = IndicatorRenderInput {
        result: &result,
        frame: RenderFrame::new(&viewport, BOUNDS, None),
        scale,
        style: &style,
    };
    let stats = render_indicator(&mut list, &input);

    // 9 joints minus the two touching index 4
    assert_eq!(stats.drawn, 7);
    assert_eq!(list.draw_calls(), 1);
}

#[test]
fn bounded_oscillators_use_fixed_band() {
    let viewport = viewport();
    let rsi = SeriesResult::new("rsi", IndicatorKind::Rsi, vec![40.0, 60.0]);
    let fixed = indicator_scale(&rsi, &viewport, BOUNDS).unwrap();
    assert_eq!((fixed.range.min, fixed.range.max), (0.0, 100.0));

    let sma = SeriesResult::new("sma", IndicatorKind::Sma, vec![40.0, 60.0]);
    let auto = indicator_scale(&sma, &viewport, BOUNDS).unwrap();
    assert!(auto.range.min < 40.0 && auto.range.min > 38.0);
    assert!(auto.range.max > 60.0 && auto.range.max < 62.0);
}

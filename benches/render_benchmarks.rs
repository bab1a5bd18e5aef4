use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use futures::executor::block_on;
use price_chart_compositor::application::ChartInstance;
use price_chart_compositor::domain::chart::{ChartOptions, PriceScale, Rect, Theme, Viewport};
use price_chart_compositor::domain::market_data::{Candle, PriceRange};
use price_chart_compositor::domain::series::SeriesConfig;
use price_chart_compositor::infrastructure::rendering::renderers::{PriceRenderInput, RenderFrame, render_candles};
use price_chart_compositor::infrastructure::rendering::{
    DisplayList, DisplayListFactory, ManualScheduler, RasterSurfaceFactory, SurfaceFactory,
};

fn generate_test_candles(count: usize) -> Vec<Candle> {
    let mut base_price = 50_000.0;
    (0..count)
        .map(|i| {
            let t = i as f64;
            let open = base_price + (t * 0.1).sin() * 100.0;
            let close = open + (t * 0.2).cos() * 50.0;
            let high = open.max(close) + (t * 0.3).sin().abs() * 25.0;
            let low = open.min(close) - (t * 0.4).cos().abs() * 25.0;
            base_price = close;
            Candle::from_values(1_640_000_000 + i as i64 * 60, open, high, low, close, 1_000.0 + t)
        })
        .collect()
}

fn bench_candle_batches(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_candles");
    let theme = Theme::default();
    let bounds = Rect::new(0.0, 0.0, 1_600.0, 900.0);

    for count in [100, 400, 800] {
        let candles = generate_test_candles(count);
        let (min, max) = candles.iter().fold((f64::MAX, f64::MIN), |(lo, hi), c| {
            (lo.min(c.ohlcv.low.value()), hi.max(c.ohlcv.high.value()))
        });
        let viewport = Viewport {
            start_index: 0,
            end_index: count - 1,
            scale: bounds.width / count as f64,
            offset: 0.0,
            width: bounds.width,
            height: bounds.height,
        };
        let scale = PriceScale::new(PriceRange::new(min, max), 0.0, bounds.height);

        for (label, region) in [("full", None), ("region", Some(Rect::new(700.0, 0.0, 60.0, 900.0)))] {
            group.bench_with_input(BenchmarkId::new(label, count), &count, |b, _| {
                b.iter(|| {
                    let mut list = DisplayList::new(bounds.width, bounds.height);
                    let input = PriceRenderInput {
                        candles: &candles,
                        first_index: 0,
                        frame: RenderFrame::new(&viewport, bounds, region),
                        scale,
                        theme: &theme,
                    };
                    render_candles(&mut list, &input)
                })
            });
        }
    }
    group.finish();
}

fn chart(factory: Box<dyn SurfaceFactory>) -> ChartInstance {
    let options = ChartOptions { offload_enabled: false, initial_visible: 300, ..ChartOptions::default() };
    let mut chart = ChartInstance::new(options, Theme::default(), factory, Box::new(ManualScheduler::new()))
        .expect("chart");
    chart.set_candles(&generate_test_candles(5_000)).expect("candles");
    for config in [
        SeriesConfig::new("sma", "sma"),
        SeriesConfig::new("bb", "bollinger"),
        SeriesConfig::new("rsi", "rsi"),
        SeriesConfig::new("macd", "macd"),
    ] {
        chart.add_series(config).expect("series");
    }
    let batch = block_on(chart.compute_series());
    chart.apply_computed(batch);
    chart
}

fn bench_frames(c: &mut Criterion) {
    let mut group = c.benchmark_group("frames");

    let mut recorded = chart(Box::new(DisplayListFactory));
    group.bench_function("pan_full_frame_display_list", |b| {
        let mut step = 1;
        b.iter(|| {
            step = -step;
            recorded.pan(step);
            recorded.run_frame()
        })
    });

    let mut raster = chart(Box::new(RasterSurfaceFactory));
    group.bench_function("pan_full_frame_raster", |b| {
        let mut step = 1;
        b.iter(|| {
            step = -step;
            raster.pan(step);
            raster.run_frame()
        })
    });

    group.bench_function("crosshair_frame_raster", |b| {
        let mut x = 0.0;
        b.iter(|| {
            x = (x + 7.0) % 800.0;
            raster.set_crosshair(x, 200.0);
            raster.run_frame()
        })
    });
    group.finish();
}

criterion_group!(benches, bench_candle_batches, bench_frames);
criterion_main!(benches);

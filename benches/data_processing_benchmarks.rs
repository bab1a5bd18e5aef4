use std::sync::Arc;
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use futures::executor::block_on;
use price_chart_compositor::domain::market_data::{Candle, WindowedStore};
use price_chart_compositor::domain::series::{SeriesConfig, compute};
use price_chart_compositor::infrastructure::offload::{OffloadConfig, OffloadManager};

/// Minute candles with a slow trend, swings and noise
fn generate_test_candles(count: usize) -> Vec<Candle> {
    let mut candles = Vec::with_capacity(count);
    let mut base_price = 50_000.0;
    for i in 0..count {
        let t = i as f64;
        let open = base_price + (t * 0.001).sin() * 1_000.0 + (t * 0.1).sin() * 200.0;
        let close = open + (t * 0.3).cos() * 100.0;
        let high = open.max(close) + (t * 0.7).sin().abs() * 150.0;
        let low = open.min(close) - (t * 0.9).cos().abs() * 120.0;
        let volume = 1_000.0 + (t * 0.4).sin().abs() * 2_000.0;
        candles.push(Candle::from_values(1_640_000_000 + i as i64 * 60, open, high, low, close, volume));
        base_price = close * 0.999 + open * 0.001;
    }
    candles
}

fn bench_store_upsert(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_upsert");
    group.measurement_time(Duration::from_secs(5));

    for count in [1_000, 10_000, 50_000] {
        let candles = generate_test_candles(count);
        group.bench_with_input(BenchmarkId::new("bulk", count), &candles, |b, candles| {
            b.iter(|| {
                let mut store = WindowedStore::new(count);
                store.upsert(candles);
                store.len()
            })
        });

        let (history, tail) = candles.split_at(count - 1);
        group.bench_with_input(BenchmarkId::new("live_tick", count), &count, |b, _| {
            let mut store = WindowedStore::new(count);
            store.upsert(history);
            let (mut tick, mut flip) = (tail[0], false);
            b.iter(|| {
                // alternate the close so every tick is a real overwrite
                flip = !flip;
                tick.ohlcv.close = if flip { tail[0].ohlcv.high } else { tail[0].ohlcv.low };
                store.upsert(std::slice::from_ref(&tick))
            })
        });
    }
    group.finish();
}

fn bench_indicators(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicators");
    let candles = generate_test_candles(10_000);

    for (name, config) in [
        ("sma_20", SeriesConfig::new("sma", "sma").with_param("period", 20.0)),
        ("ema_50", SeriesConfig::new("ema", "ema").with_param("period", 50.0)),
        ("rsi_14", SeriesConfig::new("rsi", "rsi")),
        ("macd", SeriesConfig::new("macd", "macd")),
        ("bollinger", SeriesConfig::new("bb", "bollinger")),
        ("stochastic", SeriesConfig::new("stoch", "stochastic")),
    ] {
        let Ok(spec) = config.parse() else { continue };
        group.bench_function(name, |b| b.iter(|| compute(&config.id, &spec, &candles)));
    }
    group.finish();
}

fn bench_offload(c: &mut Criterion) {
    let mut group = c.benchmark_group("offload");
    let candles = Arc::new(generate_test_candles(10_000));
    let configs: Vec<SeriesConfig> = (0..8)
        .map(|i| SeriesConfig::new(format!("sma-{}", i), "sma").with_param("period", 10.0 + i as f64 * 5.0))
        .collect();

    group.bench_function("inline_uncached", |b| {
        b.iter(|| {
            let manager = OffloadManager::inline();
            block_on(manager.calculate_many(&configs, Arc::clone(&candles)))
        })
    });

    let worker = OffloadManager::new(OffloadConfig::default());
    group.bench_function("worker_uncached", |b| {
        b.iter(|| {
            worker.clear_cache();
            block_on(worker.calculate_many(&configs, Arc::clone(&candles)))
        })
    });

    let cached = OffloadManager::inline();
    block_on(cached.calculate_many(&configs, Arc::clone(&candles)));
    group.bench_function("cache_hits", |b| {
        b.iter(|| block_on(cached.calculate_many(&configs, Arc::clone(&candles))))
    });
    group.finish();
    worker.shutdown();
}

criterion_group!(benches, bench_store_upsert, bench_indicators, bench_offload);
criterion_main!(benches);

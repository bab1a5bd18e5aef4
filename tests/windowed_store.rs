use price_chart_compositor::domain::market_data::{Candle, UpsertKind, WindowedStore};
use quickcheck_macros::quickcheck;

fn candle(time: i64, close: f64) -> Candle {
    Candle::from_values(time, close, close + 1.0, close - 1.0, close, 10.0)
}

fn store_with(times: std::ops::Range<i64>) -> WindowedStore {
    let mut store = WindowedStore::new(1_000);
    let points: Vec<Candle> = times.map(|t| candle(t, 100.0 + t as f64)).collect();
    store.upsert(&points);
    store
}

#[test]
fn upsert_overwrites_existing_time_in_place() {
    let mut store = store_with(0..3);
    let outcome = store.upsert(&[Candle::from_values(1, 101.0, 999.0, 100.0, 999.0, 5.0)]);

    assert_eq!(store.len(), 3);
    assert_eq!(store.point_at(1).map(|c| c.ohlcv.close.value()), Some(999.0));
    assert_eq!(outcome.overwritten, 1);
    assert_eq!(outcome.inserted, 0);
    assert!(outcome.invalidates_indices());
}

#[quickcheck]
fn repeated_upsert_is_idempotent(time: i32, close: u16) -> bool {
    let point = candle(time as i64, close as f64 + 1.0);
    let mut once = store_with(0..5);
    once.upsert(&[point]);
    let mut twice = once.clone();
    let outcome = twice.upsert(&[point]);

    outcome.kind == UpsertKind::Unchanged && once.as_slice() == twice.as_slice()
}

#[quickcheck]
fn store_stays_sorted_and_unique(times: Vec<i16>) -> bool {
    let mut store = WindowedStore::new(10_000);
    for chunk in times.chunks(3) {
        let points: Vec<Candle> = chunk.iter().map(|&t| candle(t as i64, 50.0)).collect();
        store.upsert(&points);
    }
    store.as_slice().windows(2).all(|w| w[0].time() < w[1].time())
}

#[test]
fn find_index_by_time_picks_floor() {
    let mut store = WindowedStore::new(100);
    store.upsert(&[candle(10, 1.0), candle(20, 2.0), candle(30, 3.0)]);

    assert_eq!(store.find_index_by_time(20), Some(1));
    assert_eq!(store.find_index_by_time(25), Some(1));
    assert_eq!(store.find_index_by_time(99), Some(2));
    assert_eq!(store.find_index_by_time(5), None);
}

#[test]
fn slice_is_clamped_and_end_exclusive() {
    let store = store_with(0..10);
    assert_eq!(store.slice(2, 5).len(), 3);
    assert_eq!(store.slice(8, 50).len(), 2);
    assert!(store.slice(20, 30).is_empty());
}

#[test]
fn price_range_has_two_percent_margin() {
    let mut store = WindowedStore::new(100);
    store.upsert(&[
        Candle::from_values(0, 100.0, 110.0, 90.0, 105.0, 1.0),
        Candle::from_values(1, 105.0, 108.0, 95.0, 100.0, 1.0),
    ]);
    let range = store.price_range_for(0, 1).unwrap();
    assert!((range.min - 89.6).abs() < 1e-9);
    assert!((range.max - 110.4).abs() < 1e-9);

    assert!(store.price_range_for(5, 9).is_none());
}

#[test]
fn capacity_evicts_oldest_points() {
    let mut store = WindowedStore::new(5);
    store.upsert(&(0..5).map(|t| candle(t, 1.0)).collect::<Vec<_>>());
    let outcome = store.upsert(&[candle(5, 2.0), candle(6, 3.0)]);

    assert_eq!(store.len(), 5);
    assert_eq!(store.time_range(), Some((2, 6)));
    assert_eq!(outcome.evicted, 2);
    assert_eq!(outcome.kind, UpsertKind::Rewritten);
}

#[test]
fn snapshot_survives_later_writes() {
    let mut store = store_with(0..3);
    let snapshot = store.snapshot();
    store.upsert(&[candle(3, 1.0), candle(-1, 1.0)]);

    assert_eq!(snapshot.len(), 3);
    assert_eq!(store.len(), 5);
    assert_eq!(store.point_at(0).map(Candle::time), Some(-1));
}

//! Time-ordered candle buffer with index/time/price queries.
//!
//! The buffer lives behind an `Arc` and every layout change builds a new
//! vector and swaps it in, so a reader holding a [`WindowedStore::snapshot`]
//! sees either the old or the new layout, never a mix.

use std::sync::Arc;

use super::entities::Candle;
use super::value_objects::PriceRange;
use crate::domain::logging::LogComponent;
use crate::{log_debug, log_warn};

/// Default maximum number of stored points
pub const DEFAULT_CAPACITY: usize = 100_000;
/// Symmetric margin applied by [`WindowedStore::price_range_for`]
pub const PRICE_MARGIN_RATIO: f64 = 0.02;

/// What an upsert did to the index layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertKind {
    /// Nothing stored changed
    Unchanged,
    /// Points were only added after the previous last point; existing
    /// indices and values are untouched
    Appended,
    /// Existing values were overwritten, points were inserted before the end
    /// or old points were evicted. Previously computed indices are stale.
    Rewritten,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub kind: UpsertKind,
    pub inserted: usize,
    pub overwritten: usize,
    pub evicted: usize,
    pub rejected: usize,
}

impl UpsertOutcome {
    fn unchanged(rejected: usize) -> Self {
        Self { kind: UpsertKind::Unchanged, inserted: 0, overwritten: 0, evicted: 0, rejected }
    }

    /// True when cached per-index results can no longer be trusted
    pub fn invalidates_indices(&self) -> bool {
        self.kind == UpsertKind::Rewritten
    }
}

#[derive(Debug, Clone)]
pub struct WindowedStore {
    candles: Arc<Vec<Candle>>,
    capacity: usize,
}

impl Default for WindowedStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl WindowedStore {
    pub fn new(capacity: usize) -> Self {
        Self { candles: Arc::new(Vec::new()), capacity: capacity.max(1) }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Cheap shared handle to the current layout
    pub fn snapshot(&self) -> Arc<Vec<Candle>> {
        Arc::clone(&self.candles)
    }

    pub fn as_slice(&self) -> &[Candle] {
        &self.candles
    }

    pub fn latest(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn point_at(&self, index: usize) -> Option<&Candle> {
        self.candles.get(index)
    }

    /// Points in `[start, end)`, clamped to the stored range
    pub fn slice(&self, start: usize, end: usize) -> &[Candle] {
        let end = end.min(self.candles.len());
        let start = start.min(end);
        &self.candles[start..end]
    }

    /// First and last stored timestamps
    pub fn time_range(&self) -> Option<(i64, i64)> {
        match (self.candles.first(), self.candles.last()) {
            (Some(first), Some(last)) => Some((first.time(), last.time())),
            _ => None,
        }
    }

    /// Index of `time`, or of the last point before it when there is no
    /// exact match. `None` when `time` precedes every stored point.
    pub fn find_index_by_time(&self, time: i64) -> Option<usize> {
        match self.candles.binary_search_by_key(&time, |c| c.time()) {
            Ok(index) => Some(index),
            Err(0) => None,
            Err(insert_at) => Some(insert_at - 1),
        }
    }

    /// Lowest low / highest high over `[start, end]` (inclusive) with a 2%
    /// margin on both sides. Non-finite prices are ignored.
    pub fn price_range_for(&self, start: usize, end: usize) -> Option<PriceRange> {
        if self.candles.is_empty() || start > end {
            return None;
        }
        let window = self.slice(start, end.saturating_add(1));
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for candle in window {
            let low = candle.ohlcv.low.value();
            let high = candle.ohlcv.high.value();
            if low.is_finite() {
                min = min.min(low);
            }
            if high.is_finite() {
                max = max.max(high);
            }
        }
        if !min.is_finite() || !max.is_finite() {
            return None;
        }
        Some(PriceRange::new(min, max).with_margin(PRICE_MARGIN_RATIO))
    }

    /// Merge `points` by timestamp. Appending strictly newer points in
    /// increasing order is O(appended); anything else rebuilds the sorted
    /// buffer once. Invalid candles are skipped.
    pub fn upsert(&mut self, points: &[Candle]) -> UpsertOutcome {
        let (valid, rejected) = Self::filter_valid(points);
        if valid.is_empty() {
            return UpsertOutcome::unchanged(rejected);
        }

        let last_time = self.candles.last().map(|c| c.time());
        let strictly_newer = valid.windows(2).all(|w| w[0].time() < w[1].time())
            && last_time.is_none_or(|last| valid[0].time() > last);

        let mut outcome = if strictly_newer {
            self.append_sorted(&valid)
        } else {
            self.merge_rebuild(&valid)
        };
        outcome.rejected = rejected;

        let evicted = self.enforce_capacity();
        if evicted > 0 {
            outcome.evicted = evicted;
            outcome.kind = UpsertKind::Rewritten;
        }

        log_debug!(
            LogComponent::Domain("WindowedStore"),
            "upsert: {:?} (+{} ~{} -{}), len={}",
            outcome.kind,
            outcome.inserted,
            outcome.overwritten,
            outcome.evicted,
            self.candles.len()
        );
        outcome
    }

    /// Replace the whole buffer
    pub fn replace(&mut self, points: &[Candle]) -> UpsertOutcome {
        self.candles = Arc::new(Vec::new());
        let mut outcome = self.upsert(points);
        outcome.kind = UpsertKind::Rewritten;
        outcome
    }

    pub fn clear(&mut self) {
        self.candles = Arc::new(Vec::new());
    }

    fn filter_valid(points: &[Candle]) -> (Vec<Candle>, usize) {
        let valid: Vec<Candle> = points.iter().copied().filter(|c| c.ohlcv.is_valid()).collect();
        let rejected = points.len() - valid.len();
        if rejected > 0 {
            log_warn!(
                LogComponent::Domain("WindowedStore"),
                "skipped {} invalid candle(s)",
                rejected
            );
        }
        (valid, rejected)
    }

    fn append_sorted(&mut self, valid: &[Candle]) -> UpsertOutcome {
        let mut next = Vec::with_capacity(self.candles.len() + valid.len());
        next.extend_from_slice(&self.candles);
        next.extend_from_slice(valid);
        self.candles = Arc::new(next);
        UpsertOutcome {
            kind: UpsertKind::Appended,
            inserted: valid.len(),
            overwritten: 0,
            evicted: 0,
            rejected: 0,
        }
    }

    fn merge_rebuild(&mut self, valid: &[Candle]) -> UpsertOutcome {
        let mut next: Vec<Candle> = self.candles.as_ref().clone();
        let old_len = next.len();
        let old_last = next.last().map(|c| c.time());
        let mut overwritten = 0;
        let mut changed_existing = false;
        let mut pending = Vec::new();

        for candle in valid {
            match next[..old_len].binary_search_by_key(&candle.time(), |c| c.time()) {
                Ok(index) => {
                    if next[index] != *candle {
                        next[index] = *candle;
                        overwritten += 1;
                        changed_existing = true;
                    }
                }
                Err(_) => pending.push(*candle),
            }
        }

        // later duplicates inside the batch win
        pending.reverse();
        pending.sort_by_key(|c| c.time());
        pending.dedup_by_key(|c| c.time());
        let inserted = pending.len();
        let appended_only = pending.first().is_none_or(|c| old_last.is_none_or(|last| c.time() > last));

        if inserted == 0 && !changed_existing {
            return UpsertOutcome::unchanged(0);
        }

        next.extend(pending);
        if !appended_only {
            next.sort_by_key(|c| c.time());
        }
        self.candles = Arc::new(next);

        let kind = if changed_existing || !appended_only {
            UpsertKind::Rewritten
        } else {
            UpsertKind::Appended
        };
        UpsertOutcome { kind, inserted, overwritten, evicted: 0, rejected: 0 }
    }

    fn enforce_capacity(&mut self) -> usize {
        let len = self.candles.len();
        if len <= self.capacity {
            return 0;
        }
        let excess = len - self.capacity;
        let trimmed: Vec<Candle> = self.candles[excess..].to_vec();
        self.candles = Arc::new(trimmed);
        excess
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(time: i64, close: f64) -> Candle {
        Candle::from_values(time, close, close + 1.0, close - 1.0, close, 1.0)
    }

    #[test]
    fn append_fast_path_reports_appended() {
        let mut store = WindowedStore::new(10);
        let outcome = store.upsert(&[candle(1, 10.0), candle(2, 11.0)]);
        assert_eq!(outcome.kind, UpsertKind::Appended);
        let outcome = store.upsert(&[candle(3, 12.0)]);
        assert_eq!(outcome.kind, UpsertKind::Appended);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn batch_duplicates_keep_last() {
        let mut store = WindowedStore::new(10);
        store.upsert(&[candle(5, 1.0)]);
        store.upsert(&[candle(2, 1.0), candle(2, 7.0)]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.point_at(0).map(|c| c.ohlcv.close.value()), Some(7.0));
    }

    #[test]
    fn out_of_order_insert_rewrites() {
        let mut store = WindowedStore::new(10);
        store.upsert(&[candle(1, 1.0), candle(3, 3.0)]);
        let outcome = store.upsert(&[candle(2, 2.0)]);
        assert_eq!(outcome.kind, UpsertKind::Rewritten);
        let times: Vec<i64> = store.as_slice().iter().map(|c| c.time()).collect();
        assert_eq!(times, vec![1, 2, 3]);
    }

    #[test]
    fn invalid_candles_are_rejected() {
        let mut store = WindowedStore::new(10);
        let bad = Candle::from_values(1, 10.0, 5.0, 12.0, 10.0, 1.0);
        let outcome = store.upsert(&[bad]);
        assert_eq!(outcome.rejected, 1);
        assert!(store.is_empty());
    }
}

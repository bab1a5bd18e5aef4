use derive_more::{Constructor, Deref, DerefMut, From, Into};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Value Object - Price
#[derive(
    Debug, Clone, Copy, PartialEq, From, Into, Deref, DerefMut, Constructor, Serialize, Deserialize,
)]
pub struct Price(f64);

impl Price {
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl PartialOrd for Price {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.0.partial_cmp(&other.0)
    }
}

/// Value Object - Volume
#[derive(
    Debug, Clone, Copy, PartialEq, From, Into, Deref, DerefMut, Constructor, Serialize, Deserialize,
)]
pub struct Volume(f64);

impl Volume {
    pub fn value(&self) -> f64 {
        self.0
    }
}

/// Value Object - Timestamp (milliseconds). The store key of every candle.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    From,
    Into,
    Deref,
    DerefMut,
    Constructor,
    Serialize,
    Deserialize,
)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        self.0 as f64
    }

    pub fn from_millis(value: i64) -> Self {
        Self(value)
    }
}

/// Value Object - OHLCV sample
#[derive(Debug, Clone, Copy, PartialEq, Constructor, Serialize, Deserialize)]
pub struct OHLCV {
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub volume: Volume,
}

impl OHLCV {
    /// Checks OHLC ordering and finite, non-negative volume
    pub fn is_valid(&self) -> bool {
        let finite = [self.open, self.high, self.low, self.close]
            .iter()
            .all(|p| p.value().is_finite())
            && self.volume.value().is_finite();
        finite
            && self.high >= self.open
            && self.high >= self.close
            && self.high >= self.low
            && self.low <= self.open
            && self.low <= self.close
            && self.volume.value() >= 0.0
    }
}

/// Min/max price band for a window of candles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Grow both ends by `ratio` of the span. A flat range grows by `ratio` of
    /// its magnitude (or by one unit at zero) so it never collapses.
    pub fn with_margin(&self, ratio: f64) -> Self {
        let span = self.span();
        let pad = if span > 0.0 {
            span * ratio
        } else if self.max != 0.0 {
            self.max.abs() * ratio
        } else {
            1.0
        };
        Self { min: self.min - pad, max: self.max + pad }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

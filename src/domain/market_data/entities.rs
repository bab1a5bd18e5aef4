pub use super::value_objects::{OHLCV, Price, Timestamp, Volume};
use serde::{Deserialize, Serialize};

/// Domain entity - one immutable OHLCV point keyed by its timestamp
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: Timestamp,
    pub ohlcv: OHLCV,
}

impl Candle {
    pub fn new(timestamp: Timestamp, ohlcv: OHLCV) -> Self {
        Self { timestamp, ohlcv }
    }

    /// Shorthand used by feeds and tests
    pub fn from_values(time: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self::new(
            Timestamp::from_millis(time),
            OHLCV::new(
                Price::from(open),
                Price::from(high),
                Price::from(low),
                Price::from(close),
                Volume::from(volume),
            ),
        )
    }

    pub fn time(&self) -> i64 {
        self.timestamp.value()
    }

    /// Close at or above open counts as up
    pub fn is_bullish(&self) -> bool {
        self.ohlcv.close >= self.ohlcv.open
    }

    pub fn body_top(&self) -> f64 {
        self.ohlcv.open.value().max(self.ohlcv.close.value())
    }

    pub fn body_bottom(&self) -> f64 {
        self.ohlcv.open.value().min(self.ohlcv.close.value())
    }
}

/// Wire shape used by market-data collaborators: `{time, open, high, low, close, volume}`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandleDto {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl From<CandleDto> for Candle {
    fn from(dto: CandleDto) -> Self {
        Candle::from_values(dto.time, dto.open, dto.high, dto.low, dto.close, dto.volume)
    }
}

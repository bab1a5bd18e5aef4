use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display as StrumDisplay, EnumIter, EnumString};

use crate::domain::chart::Color;
use crate::domain::errors::{ChartError, ChartResult};

/// Largest accepted lookback period
const MAX_PERIOD: usize = 10_000;

/// Value Object - indicator family. The string form is the external `type`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    StrumDisplay,
    EnumIter,
    EnumString,
    AsRefStr,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    #[strum(serialize = "sma")]
    Sma,
    #[strum(serialize = "ema")]
    Ema,
    #[strum(serialize = "wma")]
    Wma,
    #[strum(serialize = "rsi")]
    Rsi,
    #[strum(serialize = "macd")]
    Macd,
    #[strum(serialize = "bollinger")]
    Bollinger,
    #[strum(serialize = "stochastic")]
    Stochastic,
    #[strum(serialize = "williams_r")]
    WilliamsR,
    #[strum(serialize = "atr")]
    Atr,
    #[strum(serialize = "obv")]
    Obv,
    #[strum(serialize = "volume_sma")]
    VolumeSma,
}

impl IndicatorKind {
    /// Canonical value band for bounded oscillators
    pub fn fixed_range(&self) -> Option<(f64, f64)> {
        match self {
            IndicatorKind::Rsi | IndicatorKind::Stochastic => Some((0.0, 100.0)),
            IndicatorKind::WilliamsR => Some((-100.0, 0.0)),
            _ => None,
        }
    }

    /// Where the family is drawn when the config does not say
    pub fn default_display(&self) -> DisplayKind {
        match self {
            IndicatorKind::Sma
            | IndicatorKind::Ema
            | IndicatorKind::Wma
            | IndicatorKind::Bollinger => DisplayKind::Overlay,
            _ => DisplayKind::Auxiliary,
        }
    }

    /// Auxiliary line painted as signed bars instead of a polyline
    pub fn histogram_line(&self) -> Option<&'static str> {
        match self {
            IndicatorKind::Macd => Some("histogram"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, StrumDisplay)]
#[serde(rename_all = "snake_case")]
pub enum DisplayKind {
    /// Drawn over the price panel in price coordinates
    Overlay,
    /// Drawn in its own panel below the price panel
    Auxiliary,
}

/// Per-series style. Missing colours fall back to the theme palette.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeriesStyle {
    pub color: Option<Color>,
    pub line_width: Option<f64>,
    /// Colours for named auxiliary lines (`signal`, `upper`, ...)
    pub line_colors: BTreeMap<String, Color>,
}

fn default_enabled() -> bool {
    true
}

/// Series configuration as supplied by the host UI:
/// `{id, type, enabled, display, panel_id, params, style}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesConfig {
    pub id: String,
    #[serde(rename = "type")]
    pub indicator_type: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub display: Option<DisplayKind>,
    #[serde(default)]
    pub panel_id: Option<String>,
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
    #[serde(default)]
    pub style: SeriesStyle,
}

impl SeriesConfig {
    pub fn new(id: impl Into<String>, indicator_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            indicator_type: indicator_type.into(),
            enabled: true,
            display: None,
            panel_id: None,
            params: BTreeMap::new(),
            style: SeriesStyle::default(),
        }
    }

    pub fn with_param(mut self, name: &str, value: f64) -> Self {
        self.params.insert(name.to_string(), value);
        self
    }

    pub fn with_display(mut self, display: DisplayKind) -> Self {
        self.display = Some(display);
        self
    }

    pub fn with_panel(mut self, panel_id: impl Into<String>) -> Self {
        self.panel_id = Some(panel_id.into());
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.style.color = Some(color);
        self
    }

    pub fn kind(&self) -> ChartResult<IndicatorKind> {
        self.indicator_type.parse::<IndicatorKind>().map_err(|_| {
            ChartError::Configuration(format!(
                "series '{}': unknown type '{}'",
                self.id, self.indicator_type
            ))
        })
    }

    /// Parse into the typed indicator description. The only place the
    /// external type string is interpreted.
    pub fn parse(&self) -> ChartResult<IndicatorSpec> {
        IndicatorSpec::from_params(self.kind()?, &self.params)
            .map_err(|msg| ChartError::Configuration(format!("series '{}': {}", self.id, msg)))
    }

    /// Display kind after applying the family default
    pub fn resolved_display(&self) -> ChartResult<DisplayKind> {
        match self.display {
            Some(display) => Ok(display),
            None => Ok(self.kind()?.default_display()),
        }
    }

    /// Stable textual form of the params, part of the result cache key
    pub fn params_key(&self) -> String {
        self.params
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// Typed indicator description. Every computation matches on this
/// exhaustively.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorSpec {
    Sma { period: usize },
    Ema { period: usize },
    Wma { period: usize },
    Rsi { period: usize },
    Macd { fast: usize, slow: usize, signal: usize },
    Bollinger { period: usize, std_dev: f64 },
    Stochastic { k_period: usize, d_period: usize },
    WilliamsR { period: usize },
    Atr { period: usize },
    Obv,
    VolumeSma { period: usize },
}

impl IndicatorSpec {
    pub fn kind(&self) -> IndicatorKind {
        match self {
            IndicatorSpec::Sma { .. } => IndicatorKind::Sma,
            IndicatorSpec::Ema { .. } => IndicatorKind::Ema,
            IndicatorSpec::Wma { .. } => IndicatorKind::Wma,
            IndicatorSpec::Rsi { .. } => IndicatorKind::Rsi,
            IndicatorSpec::Macd { .. } => IndicatorKind::Macd,
            IndicatorSpec::Bollinger { .. } => IndicatorKind::Bollinger,
            IndicatorSpec::Stochastic { .. } => IndicatorKind::Stochastic,
            IndicatorSpec::WilliamsR { .. } => IndicatorKind::WilliamsR,
            IndicatorSpec::Atr { .. } => IndicatorKind::Atr,
            IndicatorSpec::Obv => IndicatorKind::Obv,
            IndicatorSpec::VolumeSma { .. } => IndicatorKind::VolumeSma,
        }
    }

    fn from_params(kind: IndicatorKind, params: &BTreeMap<String, f64>) -> Result<Self, String> {
        let spec = match kind {
            IndicatorKind::Sma => IndicatorSpec::Sma { period: period(params, "period", 20)? },
            IndicatorKind::Ema => IndicatorSpec::Ema { period: period(params, "period", 20)? },
            IndicatorKind::Wma => IndicatorSpec::Wma { period: period(params, "period", 20)? },
            IndicatorKind::Rsi => IndicatorSpec::Rsi { period: period(params, "period", 14)? },
            IndicatorKind::Macd => {
                let fast = period(params, "fast", 12)?;
                let slow = period(params, "slow", 26)?;
                if fast >= slow {
                    return Err(format!("macd fast period {} must be below slow {}", fast, slow));
                }
                IndicatorSpec::Macd { fast, slow, signal: period(params, "signal", 9)? }
            }
            IndicatorKind::Bollinger => {
                let std_dev = params.get("std_dev").copied().unwrap_or(2.0);
                if !(std_dev.is_finite() && std_dev > 0.0) {
                    return Err(format!("std_dev must be positive, got {}", std_dev));
                }
                IndicatorSpec::Bollinger { period: period(params, "period", 20)?, std_dev }
            }
            IndicatorKind::Stochastic => IndicatorSpec::Stochastic {
                k_period: period(params, "k_period", 14)?,
                d_period: period(params, "d_period", 3)?,
            },
            IndicatorKind::WilliamsR => {
                IndicatorSpec::WilliamsR { period: period(params, "period", 14)? }
            }
            IndicatorKind::Atr => IndicatorSpec::Atr { period: period(params, "period", 14)? },
            IndicatorKind::Obv => IndicatorSpec::Obv,
            IndicatorKind::VolumeSma => {
                IndicatorSpec::VolumeSma { period: period(params, "period", 20)? }
            }
        };
        Ok(spec)
    }
}

fn period(params: &BTreeMap<String, f64>, name: &str, default: usize) -> Result<usize, String> {
    let Some(&raw) = params.get(name) else {
        return Ok(default);
    };
    if !raw.is_finite() || raw.fract() != 0.0 || raw < 1.0 || raw > MAX_PERIOD as f64 {
        return Err(format!("param '{}' must be an integer in 1..={}, got {}", name, MAX_PERIOD, raw));
    }
    Ok(raw as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_strings_parse_case_insensitively() {
        assert_eq!("RSI".parse::<IndicatorKind>().ok(), Some(IndicatorKind::Rsi));
        assert_eq!("williams_r".parse::<IndicatorKind>().ok(), Some(IndicatorKind::WilliamsR));
        assert_eq!(IndicatorKind::VolumeSma.to_string(), "volume_sma");
    }

    #[test]
    fn unknown_type_is_configuration_error() {
        let config = SeriesConfig::new("x", "ichimoku");
        assert!(matches!(config.parse(), Err(ChartError::Configuration(_))));
    }

    #[test]
    fn fractional_period_is_rejected() {
        let config = SeriesConfig::new("s", "sma").with_param("period", 2.5);
        assert!(matches!(config.parse(), Err(ChartError::Configuration(_))));
    }

    #[test]
    fn defaults_fill_missing_params() {
        let spec = SeriesConfig::new("m", "macd").parse().ok();
        assert_eq!(spec, Some(IndicatorSpec::Macd { fast: 12, slow: 26, signal: 9 }));
    }

    #[test]
    fn params_key_is_order_independent() {
        let a = SeriesConfig::new("b", "bollinger").with_param("period", 20.0).with_param("std_dev", 2.0);
        let b = SeriesConfig::new("b", "bollinger").with_param("std_dev", 2.0).with_param("period", 20.0);
        assert_eq!(a.params_key(), b.params_key());
    }
}

use serde::{Deserialize, Serialize};

use super::value_objects::Color;
use crate::domain::errors::{ChartError, ChartResult};
use crate::domain::market_data::DEFAULT_CAPACITY;

/// Minimum number of index steps between the first and last visible point
pub const MIN_VISIBLE: usize = 10;
/// Narrowest point slot in pixels
pub const MIN_POINT_WIDTH: f64 = 2.0;
/// Widest point slot in pixels
pub const MAX_POINT_WIDTH: f64 = 50.0;
/// Height of the divider between stacked panels
pub const DIVIDER_HEIGHT: f64 = 4.0;

/// Chart instance configuration. Every field has a default, so partial
/// JSON documents are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartOptions {
    pub width: f64,
    pub height: f64,
    /// Store capacity; oldest points are evicted beyond it
    pub capacity: usize,
    pub min_visible: usize,
    pub min_point_width: f64,
    pub max_point_width: f64,
    /// Points shown when the chart first receives data
    pub initial_visible: usize,
    pub divider_height: f64,
    pub aux_panel_height: f64,
    pub aux_panel_min_height: f64,
    pub main_panel_min_height: f64,
    /// Zoom delta applied by zoom_in / zoom_out
    pub zoom_step: f64,
    pub offload_enabled: bool,
    pub offload_timeout_ms: u64,
    /// Let the offload context build indicator paint commands too
    pub offload_paint: bool,
    /// Config count above which the worker fans out across threads
    pub parallel_threshold: usize,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            capacity: DEFAULT_CAPACITY,
            min_visible: MIN_VISIBLE,
            min_point_width: MIN_POINT_WIDTH,
            max_point_width: MAX_POINT_WIDTH,
            initial_visible: 120,
            divider_height: DIVIDER_HEIGHT,
            aux_panel_height: 120.0,
            aux_panel_min_height: 40.0,
            main_panel_min_height: 120.0,
            zoom_step: 0.2,
            offload_enabled: true,
            offload_timeout_ms: 2_000,
            offload_paint: false,
            parallel_threshold: 4,
        }
    }
}

impl ChartOptions {
    pub fn from_json(json: &str) -> ChartResult<Self> {
        let options: ChartOptions = serde_json::from_str(json)
            .map_err(|e| ChartError::Configuration(format!("invalid chart options: {}", e)))?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> ChartResult<()> {
        if !(self.width > 0.0 && self.height > 0.0) {
            return Err(ChartError::Configuration(format!(
                "chart size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.min_point_width <= 0.0 || self.min_point_width > self.max_point_width {
            return Err(ChartError::Configuration(format!(
                "point width bounds [{}, {}] are inconsistent",
                self.min_point_width, self.max_point_width
            )));
        }
        if self.capacity == 0 {
            return Err(ChartError::Configuration("capacity must be at least 1".into()));
        }
        if !(self.zoom_step > 0.0 && self.zoom_step < 0.9) {
            return Err(ChartError::Configuration(format!(
                "zoom step {} outside (0, 0.9)",
                self.zoom_step
            )));
        }
        Ok(())
    }
}

/// Colours, line widths and font for every layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub background: Color,
    pub grid: Color,
    pub up: Color,
    pub down: Color,
    pub wick: Color,
    pub volume_up: Color,
    pub volume_down: Color,
    pub current_price: Color,
    pub crosshair: Color,
    pub stop_loss: Color,
    pub take_profit: Color,
    pub position_long: Color,
    pub position_short: Color,
    pub divider: Color,
    pub text: Color,
    pub line_width: f64,
    pub wick_width: f64,
    pub font: String,
    /// Fallback palette for series without an explicit colour
    pub series_palette: Vec<Color>,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Color::from_hex(0x1a1a1a),
            grid: Color::from_hex(0x2a2a2a),
            up: Color::from_hex(0x00ff88),
            down: Color::from_hex(0xff4444),
            wick: Color::from_hex(0x888888),
            volume_up: Color::from_hex(0x00ff88).with_alpha(0.4),
            volume_down: Color::from_hex(0xff4444).with_alpha(0.4),
            current_price: Color::from_hex(0x00ff88),
            crosshair: Color::from_hex(0xaaaaaa),
            stop_loss: Color::from_hex(0xff4444),
            take_profit: Color::from_hex(0x00ff88),
            position_long: Color::from_hex(0x3399ff),
            position_short: Color::from_hex(0xff9933),
            divider: Color::from_hex(0x333333),
            text: Color::from_hex(0xaaaaaa),
            line_width: 1.5,
            wick_width: 1.0,
            font: "12px Arial".to_string(),
            series_palette: vec![
                Color::from_hex(0xf5c542),
                Color::from_hex(0x42a5f5),
                Color::from_hex(0xab47bc),
                Color::from_hex(0x26a69a),
                Color::from_hex(0xef5350),
            ],
        }
    }
}

impl Theme {
    pub fn palette_color(&self, index: usize) -> Color {
        if self.series_palette.is_empty() {
            return self.text;
        }
        self.series_palette[index % self.series_palette.len()]
    }
}

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display as StrumDisplay};

/// Identifier of the always-present price panel
pub const MAIN_PANEL_ID: &str = "main";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, StrumDisplay, AsRefStr, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelKind {
    #[strum(serialize = "main")]
    Main,
    #[strum(serialize = "auxiliary")]
    Auxiliary,
}

/// A horizontal partition of the chart area
#[derive(Debug, Clone, PartialEq)]
pub struct PanelConfig {
    pub id: String,
    pub kind: PanelKind,
    pub height: f64,
    pub min_height: f64,
    pub max_height: f64,
    pub member_series_ids: Vec<String>,
}

impl PanelConfig {
    pub fn main(height: f64, min_height: f64) -> Self {
        Self {
            id: MAIN_PANEL_ID.to_string(),
            kind: PanelKind::Main,
            height,
            min_height,
            max_height: f64::MAX,
            member_series_ids: Vec::new(),
        }
    }

    pub fn auxiliary(id: impl Into<String>, height: f64, min_height: f64) -> Self {
        Self {
            id: id.into(),
            kind: PanelKind::Auxiliary,
            height,
            min_height,
            max_height: f64::MAX,
            member_series_ids: Vec::new(),
        }
    }

    pub fn with_max_height(mut self, max_height: f64) -> Self {
        self.max_height = max_height;
        self
    }

    pub fn is_main(&self) -> bool {
        self.kind == PanelKind::Main
    }

    pub fn clamp_height(&self, height: f64) -> f64 {
        height.clamp(self.min_height, self.max_height.max(self.min_height))
    }

    pub fn has_series(&self, series_id: &str) -> bool {
        self.member_series_ids.iter().any(|s| s == series_id)
    }
}

/// Resolved vertical placement of one panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelPosition {
    pub panel_id: String,
    pub kind: PanelKind,
    pub y: f64,
    pub height: f64,
}

impl PanelPosition {
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn contains_y(&self, y: f64) -> bool {
        y >= self.y && y < self.bottom()
    }
}

/// What lies under a vertical pixel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitTarget {
    Panel(String),
    /// Divider between panel `i` and panel `i + 1`
    Divider(usize),
}

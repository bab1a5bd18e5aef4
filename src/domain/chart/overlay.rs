use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display as StrumDisplay, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, StrumDisplay, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum PositionSide {
    #[strum(serialize = "long")]
    Long,
    #[strum(serialize = "short")]
    Short,
}

/// An open position drawn as a horizontal line at its entry price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionMarker {
    pub entry_price: f64,
    pub side: PositionSide,
    #[serde(default)]
    pub quantity: f64,
}

/// Trading levels drawn on the overlay layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayData {
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub positions: Vec<PositionMarker>,
}

impl OverlayData {
    pub fn is_empty(&self) -> bool {
        self.stop_loss.is_none() && self.take_profit.is_none() && self.positions.is_empty()
    }
}

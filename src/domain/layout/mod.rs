//! Panel layout: main price panel plus stacked auxiliary panels.

pub mod manager;
pub mod panel;

pub use manager::PanelLayoutManager;
pub use panel::{HitTarget, MAIN_PANEL_ID, PanelConfig, PanelKind, PanelPosition};

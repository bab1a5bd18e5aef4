//! Application layer: the chart instance and its series registry.

pub mod chart_instance;
pub mod series_registry;

pub use chart_instance::{
    BACKGROUND_SURFACE, ChartInstance, ComputedBatch, ComputedSeries, INTERACTION_SURFACE,
    OVERLAY_SURFACE, PRICE_SURFACE, indicator_surface_name,
};
pub use series_registry::{PrePainted, SeriesEntry, SeriesRegistry, SeriesUpdate, target_panel};

use crate::domain::logging::{LogComponent, LogLevel};

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

pub use application::{ChartInstance, SeriesUpdate};
pub use domain::chart::{ChartOptions, OverlayData, Theme, Viewport, ViewportModel};
pub use domain::errors::{ChartError, ChartResult, OffloadError};
pub use domain::layout::PanelLayoutManager;
pub use domain::market_data::{Candle, WindowedStore};
pub use domain::series::{SeriesConfig, SeriesResult};
pub use infrastructure::offload::OffloadManager;
pub use infrastructure::rendering::{Compositor, Surface};
pub use presentation::WasmChart;

/// Install the console logger, the wall clock and the panic hook
#[cfg_attr(target_arch = "wasm32", wasm_bindgen::prelude::wasm_bindgen(start))]
pub fn initialize() {
    console_error_panic_hook::set_once();
    domain::logging::init_time_provider(Box::new(infrastructure::services::SystemTimeProvider::new()));
    domain::logging::init_logger(Box::new(infrastructure::services::ConsoleLogger::new()), LogLevel::build_default());
    log_info!(LogComponent::Presentation("Initialize"), "chart core initialized");
}

pub mod chart;
pub mod errors;
pub mod layout;
pub mod logging;
pub mod market_data;
pub mod series;

pub use errors::{ChartError, ChartResult, OffloadError};

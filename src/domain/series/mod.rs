//! Indicator series: external configuration, typed spec, computation and
//! the computed result.

pub mod config;
pub mod indicators;
pub mod result;

pub use config::{DisplayKind, IndicatorKind, IndicatorSpec, SeriesConfig, SeriesStyle};
pub use indicators::compute;
pub use result::SeriesResult;

/// Failures of the offload path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OffloadError {
    /// No response within the configured timeout
    Timeout,
    /// The execution context dropped the request (thread died or panicked)
    Crashed,
    /// The execution context could not be started
    Unavailable(String),
}

impl std::fmt::Display for OffloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OffloadError::Timeout => write!(f, "request timed out"),
            OffloadError::Crashed => write!(f, "execution context crashed"),
            OffloadError::Unavailable(msg) => write!(f, "execution context unavailable: {}", msg),
        }
    }
}

/// Simplified error system - one variant per failure class.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartError {
    /// Unknown series type or malformed params. Affects one series only.
    Configuration(String),
    /// Drawing context acquisition failed. Fatal at construction.
    Resource(String),
    Offload(OffloadError),
    /// Empty or unusable input data.
    Data(String),
    /// The chart instance was destroyed.
    Destroyed,
}

impl std::fmt::Display for ChartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChartError::Configuration(msg) => write!(f, "Configuration Error: {}", msg),
            ChartError::Resource(msg) => write!(f, "Resource Error: {}", msg),
            ChartError::Offload(err) => write!(f, "Offload Error: {}", err),
            ChartError::Data(msg) => write!(f, "Data Error: {}", msg),
            ChartError::Destroyed => write!(f, "Chart instance destroyed"),
        }
    }
}

impl std::error::Error for ChartError {}

impl From<OffloadError> for ChartError {
    fn from(err: OffloadError) -> Self {
        ChartError::Offload(err)
    }
}

pub type ChartResult<T> = Result<T, ChartError>;

//! Error types for almanac-engine operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlmanacError {
    /// A recurrence pattern, period, override or zone definition carries
    /// inconsistent or out-of-range values.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A zone-qualified instant names a zone the calendar does not define.
    #[error("Unknown time zone: {0}")]
    ZoneResolution(String),

    /// A query window whose end is not after its start.
    #[error("Invalid window: {0}")]
    Window(String),
}

pub type Result<T> = std::result::Result<T, AlmanacError>;

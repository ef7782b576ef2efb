//! Shared error type for the CDIP crates

/// Errors produced by the common utilities
#[derive(Debug, thiserror::Error)]
pub enum CdipError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("cannot parse datetime '{0}'")]
    DatetimeParse(String),

    #[error("invalid timespan: start {start} is after end {end}")]
    InvalidTimespan { start: i64, end: i64 },
}

pub type Result<T> = std::result::Result<T, CdipError>;

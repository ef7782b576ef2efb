//! DAP protocol error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DapError {
    #[error("dds parse error: {0}")]
    DdsParse(String),

    #[error("das parse error: {0}")]
    DasParse(String),

    #[error("unsupported dap construct: {0}")]
    Unsupported(String),

    #[error("unknown dap type: {0}")]
    UnknownType(String),

    #[error("missing 'Data:' separator in dods response")]
    MissingDataSeparator,

    #[error("dods header is not valid utf-8")]
    HeaderEncoding,

    #[error("dods stream truncated while reading {0}")]
    Truncated(String),

    #[error("array count mismatch for {var}: {first} != {second}")]
    CountMismatch { var: String, first: u32, second: u32 },

    #[error("array for {var} claims {count} elements but only {remaining} bytes remain")]
    CountOverrun {
        var: String,
        count: u32,
        remaining: usize,
    },
}

pub type Result<T> = std::result::Result<T, DapError>;

//! Client error types

use thiserror::Error;

use cdip_common::CdipError;
use cdip_dap::DapError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("dataset not found: {0}")]
    NotFound(String),

    #[error("server returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error(transparent)]
    Dap(#[from] DapError),

    #[error(transparent)]
    Common(#[from] CdipError),

    #[error("station {0} has no realtime or historic file")]
    NoStationFile(String),

    #[error("mismatched series for '{0}' while seaming station files")]
    SeamMismatch(String),

    #[error("snapshot io: {0}")]
    Snapshot(#[from] std::io::Error),

    #[error("snapshot format: {0}")]
    SnapshotFormat(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;

//! CDIP Client - Access to CDIP wave buoy data over THREDDS/OPeNDAP
//!
//! The Coastal Data Information Program publishes every station's netCDF
//! files through a THREDDS data server. This crate fetches and decodes them
//! remotely: realtime and historic parameter files, archive deployment files
//! with raw xyz displacements, the all-station latest observations snapshot,
//! the station catalog, and the supporting WMO-id and file-hash tables.

pub mod catalog;
pub mod dataset;
pub mod error;
pub mod flags;
pub mod hashes;
pub mod http;
pub mod latest;
pub mod model;
pub mod ndbc;
pub mod request;
pub mod station;
pub mod stats;
pub mod urls;

pub use catalog::{dataset_urls, realtime_stations};
pub use dataset::NcFile;
pub use error::ClientError;
pub use flags::PubSet;
pub use hashes::NcHashes;
pub use http::{ClientConfig, DodsClient};
pub use latest::Latest;
pub use model::{LatestStation, RequestResult, StationMeta};
pub use ndbc::WmoIds;
pub use request::DataRequest;
pub use station::{SeriesSpan, StationData};
pub use stats::{StationStats, StatsReport};
pub use urls::DatasetKind;

//! CDIP Common - Shared types and utilities
//!
//! This crate provides the foundational pieces used across the CDIP crates:
//! - Error type
//! - Time conversions and timestamp-array helpers
//! - Timespans
//! - Geographic locations

pub mod error;
pub mod location;
pub mod time;
pub mod timespan;
pub mod utils;

// Re-exports for convenience
pub use error::CdipError;
pub use location::Location;
pub use time::{
    closest_index, combine_intervals, format_datestring, from_stamp, interval_around,
    parse_datestring, parse_datetime, parse_nc_attr_datetime, to_stamp, BoundsExceeded,
    StampInterval,
};
pub use timespan::Timespan;
pub use utils::{is_station_id, qualify_station, snapshot_dir};

/// THREDDS server that publishes the CDIP netCDF datasets
pub const THREDDS_DOMAIN: &str = "http://thredds.cdip.ucsd.edu";

/// Path under the THREDDS domain that serves DAP2 (OPeNDAP) datasets
pub const DODS_PATH: &str = "thredds/dodsC";

/// CDIP web server hosting the WMO id table and metadata listings
pub const CDIP_DOMAIN: &str = "http://cdip.ucsd.edu";

/// Deployment files are probed up to this number (`d01` .. `d99`)
pub const MAX_DEPLOYMENTS: u32 = 99;

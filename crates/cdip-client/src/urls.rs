//! Dataset url construction for the THREDDS server
//!
//! CDIP-owned files live under `cdip/`:
//!
//! ```text
//! <domain>/thredds/dodsC/cdip/realtime/<stn>_rt.nc
//! <domain>/thredds/dodsC/cdip/realtime/<stn>_xy.nc
//! <domain>/thredds/dodsC/cdip/archive/<stn>/<stn>_historic.nc
//! <domain>/thredds/dodsC/cdip/archive/<stn>/<stn>_d<NN>.nc
//! <domain>/thredds/dodsC/cdip/realtime/latest_3day.nc
//! ```
//!
//! Files contributed by other organizations live under `external/<ORG>/`
//! with the organization name uppercased in both directory and filename.

use std::fmt;

use cdip_common::DODS_PATH;

/// Which netCDF file of a station to address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DatasetKind {
    /// Rolling realtime file, `<stn>_rt.nc`
    Realtime,
    /// Realtime displacement file, `<stn>_xy.nc`
    RealtimeXy,
    /// Full station history, `<stn>_historic.nc`
    Historic,
    /// One deployment, e.g. `Archive("d05".into())`
    Archive(String),
    /// The cross-station `latest_3day.nc` file
    Latest,
}

impl DatasetKind {
    /// Dataset label as it appears in external filenames
    pub fn dataset_label(&self) -> &str {
        match self {
            DatasetKind::Realtime => "realtime",
            DatasetKind::RealtimeXy => "realtimexy",
            DatasetKind::Historic => "historic",
            DatasetKind::Archive(_) => "archive",
            DatasetKind::Latest => "latest",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetKind::Archive(deployment) => write!(f, "archive/{deployment}"),
            other => f.write_str(other.dataset_label()),
        }
    }
}

/// Filename of a CDIP-owned dataset
pub fn dataset_filename(stn: &str, kind: &DatasetKind) -> String {
    match kind {
        DatasetKind::Realtime => format!("{stn}_rt.nc"),
        DatasetKind::RealtimeXy => format!("{stn}_xy.nc"),
        DatasetKind::Historic => format!("{stn}_historic.nc"),
        DatasetKind::Archive(deployment) => format!("{stn}_{deployment}.nc"),
        DatasetKind::Latest => "latest_3day.nc".to_string(),
    }
}

/// OPeNDAP url of a CDIP-owned dataset
pub fn dataset_url(domain: &str, stn: &str, kind: &DatasetKind) -> String {
    let filename = dataset_filename(stn, kind);
    match kind {
        DatasetKind::Realtime | DatasetKind::RealtimeXy | DatasetKind::Latest => {
            format!("{domain}/{DODS_PATH}/cdip/realtime/{filename}")
        }
        DatasetKind::Historic | DatasetKind::Archive(_) => {
            format!("{domain}/{DODS_PATH}/cdip/archive/{stn}/{filename}")
        }
    }
}

/// OPeNDAP url of an externally contributed dataset. `id` is the station id
/// as the organization names it (a WMO id for ww3 model output).
pub fn external_url(domain: &str, org: &str, id: &str, kind: &DatasetKind) -> String {
    let org_dir = org.to_uppercase();
    let label = kind.dataset_label();
    format!("{domain}/{DODS_PATH}/external/{org_dir}/{id}_{org_dir}_{label}.nc")
}

/// Deployment directory name for a 1-based deployment number
pub fn deployment_name(n: u32) -> String {
    format!("d{n:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOMAIN: &str = "http://thredds.cdip.ucsd.edu";

    #[test]
    fn test_realtime_url() {
        assert_eq!(
            dataset_url(DOMAIN, "100p1", &DatasetKind::Realtime),
            "http://thredds.cdip.ucsd.edu/thredds/dodsC/cdip/realtime/100p1_rt.nc"
        );
        assert_eq!(
            dataset_url(DOMAIN, "100p1", &DatasetKind::RealtimeXy),
            "http://thredds.cdip.ucsd.edu/thredds/dodsC/cdip/realtime/100p1_xy.nc"
        );
    }

    #[test]
    fn test_archive_urls_nest_under_station() {
        assert_eq!(
            dataset_url(DOMAIN, "100p1", &DatasetKind::Historic),
            "http://thredds.cdip.ucsd.edu/thredds/dodsC/cdip/archive/100p1/100p1_historic.nc"
        );
        assert_eq!(
            dataset_url(DOMAIN, "100p1", &DatasetKind::Archive("d05".to_string())),
            "http://thredds.cdip.ucsd.edu/thredds/dodsC/cdip/archive/100p1/100p1_d05.nc"
        );
    }

    #[test]
    fn test_latest_url() {
        assert_eq!(
            dataset_url(DOMAIN, "", &DatasetKind::Latest),
            "http://thredds.cdip.ucsd.edu/thredds/dodsC/cdip/realtime/latest_3day.nc"
        );
    }

    #[test]
    fn test_external_url_uppercases_org() {
        assert_eq!(
            external_url(DOMAIN, "ww3", "46225", &DatasetKind::Realtime),
            "http://thredds.cdip.ucsd.edu/thredds/dodsC/external/WW3/46225_WW3_realtime.nc"
        );
    }

    #[test]
    fn test_deployment_name_pads() {
        assert_eq!(deployment_name(1), "d01");
        assert_eq!(deployment_name(42), "d42");
    }
}

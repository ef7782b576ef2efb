//! Seamed station data
//!
//! A station's history is spread over files: a rolling realtime file, a
//! historic file, and one archive file per deployment. Neither the
//! realtime nor the historic file is guaranteed to exist, and the number
//! of deployments is unknown up front. [`StationData`] hides that split
//! and seams the pieces into one series.

use chrono::Utc;
use tracing::debug;

use cdip_common::{
    closest_index, combine_intervals, interval_around, qualify_station, BoundsExceeded, Timespan,
    MAX_DEPLOYMENTS,
};
use cdip_dap::{ArrayValues, DapDim, DapType, DataArray, MaskedArray};

use crate::dataset::{var_prefix, NcFile, XyzInfo};
use crate::error::{ClientError, Result};
use crate::flags::PubSet;
use crate::http::DodsClient;
use crate::model::{RequestResult, StationMeta};
use crate::request::DataRequest;
use crate::urls::{deployment_name, DatasetKind};

/// Bulk wave parameters
pub const PARAMETER_VARS: [&str; 4] = ["waveHs", "waveTp", "waveDp", "waveTa"];

/// Buoy displacement components
pub const XYZ_VARS: [&str; 3] = [
    "xyzXDisplacement",
    "xyzYDisplacement",
    "xyzZDisplacement",
];

/// Spectral density and directional moments
pub const SPECTRUM_VARS: [&str; 7] = [
    "waveEnergyDensity",
    "waveMeanDirection",
    "waveA1Value",
    "waveB1Value",
    "waveA2Value",
    "waveB2Value",
    "waveCheckFactor",
];

/// Station description variables
pub const META_VARS: [&str; 5] = [
    "metaStationName",
    "metaDeployLatitude",
    "metaDeployLongitude",
    "metaWaterDepth",
    "metaDeclination",
];

/// Global attributes reported with station metadata
pub const META_ATTRIBUTES: [&str; 17] = [
    "wmo_id",
    "geospatial_lat_min",
    "geospatial_lat_max",
    "geospatial_lat_units",
    "geospatial_lat_resolution",
    "geospatial_lon_min",
    "geospatial_lon_max",
    "geospatial_lon_units",
    "geospatial_lon_resolution",
    "geospatial_vertical_min",
    "geospatial_vertical_max",
    "geospatial_vertical_units",
    "geospatial_vertical_resolution",
    "time_coverage_start",
    "time_coverage_end",
    "date_created",
    "date_modified",
];

/// How a series request picks its time window
#[derive(Debug, Clone, Copy)]
pub enum SeriesSpan {
    /// Inclusive stamp span
    Span { start: i64, end: i64 },
    /// `records` rows to the right (or left, negative) of the row closest
    /// to `target`
    Around { target: i64, records: i64 },
    /// The last three days
    Recent,
}

/// Data access for one station across its realtime, historic, and
/// deployment files
#[derive(Debug)]
pub struct StationData {
    client: DodsClient,
    stn: String,
    org: Option<String>,
    realtime: NcFile,
    historic: NcFile,
}

impl StationData {
    pub fn new(client: &DodsClient, stn: &str) -> StationData {
        let stn = qualify_station(stn);
        StationData {
            client: client.clone(),
            realtime: NcFile::new(client, &stn, DatasetKind::Realtime),
            historic: NcFile::new(client, &stn, DatasetKind::Historic),
            org: None,
            stn,
        }
    }

    /// A station whose files another organization contributes. For ww3
    /// model output addressed by a CDIP station id, the filename carries
    /// the station's WMO id instead.
    pub async fn with_org(client: &DodsClient, stn: &str, org: &str) -> Result<StationData> {
        let stn = qualify_station(stn);
        let id = if org == "ww3" && stn.get(3..4) == Some("p") {
            match crate::ndbc::WmoIds::new(client).wmo_id(&stn[..3]).await? {
                Some(id) => id,
                None => {
                    return Err(ClientError::NotFound(format!("no wmo id for station {stn}")))
                }
            }
        } else {
            stn.clone()
        };
        Ok(StationData {
            client: client.clone(),
            realtime: NcFile::external(client, &stn, org, &id, DatasetKind::Realtime),
            historic: NcFile::external(client, &stn, org, &id, DatasetKind::Historic),
            org: Some(org.to_string()),
            stn,
        })
    }

    pub fn stn(&self) -> &str {
        &self.stn
    }

    pub fn org(&self) -> Option<&str> {
        self.org.as_deref()
    }

    pub fn realtime(&self) -> &NcFile {
        &self.realtime
    }

    pub fn historic(&self) -> &NcFile {
        &self.historic
    }

    pub async fn get_parameters(
        &self,
        span: SeriesSpan,
        pub_set: PubSet,
        apply_mask: bool,
    ) -> Result<RequestResult> {
        self.get_series(span, &PARAMETER_VARS, pub_set, apply_mask).await
    }

    pub async fn get_spectra(
        &self,
        span: SeriesSpan,
        pub_set: PubSet,
        apply_mask: bool,
    ) -> Result<RequestResult> {
        self.get_series(span, &SPECTRUM_VARS, pub_set, apply_mask).await
    }

    pub async fn get_xyz(&self, span: SeriesSpan, pub_set: PubSet) -> Result<RequestResult> {
        self.get_series(span, &XYZ_VARS, pub_set, true).await
    }

    /// Fetch a series that may span several files.
    ///
    /// The variables must share one time dimension; the leading one names
    /// it. Returns an empty result when nothing falls inside the window.
    pub async fn get_series(
        &self,
        span: SeriesSpan,
        vars: &[&str],
        pub_set: PubSet,
        apply_mask: bool,
    ) -> Result<RequestResult> {
        let Some(first) = vars.first() else {
            return Ok(RequestResult::new());
        };
        let prefix = var_prefix(first);
        let (start, end) = match span {
            SeriesSpan::Span { start, end } => (start, end),
            SeriesSpan::Recent => {
                let now = Utc::now().timestamp();
                (now - 3 * 86_400, now)
            }
            SeriesSpan::Around { target, records } => {
                let time_var = format!("{prefix}Time");
                match self.target_timespan(target, records, &time_var).await? {
                    Some(span) => span,
                    None => return Ok(RequestResult::new()),
                }
            }
        };
        let req = DataRequest::new(start, end, vars)
            .with_pub_set(pub_set)
            .with_apply_mask(apply_mask);
        if prefix == "xyz" {
            self.merge_xyz_request(&req).await
        } else {
            self.merge_request(&req).await
        }
    }

    /// Station metadata from the historic file, or the realtime file when
    /// no historic exists yet
    pub async fn get_stn_meta(&self) -> Result<StationMeta> {
        let file = if self.historic.exists().await {
            &self.historic
        } else if self.realtime.exists().await {
            &self.realtime
        } else {
            return Err(ClientError::NoStationFile(self.stn.clone()));
        };
        let req = DataRequest::default().with_vars(META_VARS);
        let result = file.fetch(&req).await?;
        let mut meta = StationMeta {
            vars: result.into_map(),
            ..StationMeta::default()
        };
        let das = file.das().await?;
        for attr in META_ATTRIBUTES {
            if let Some(value) = das.global(attr) {
                meta.attributes.insert(attr.to_string(), value.clone());
            }
        }
        Ok(meta)
    }

    /// The station's existing files: realtime, historic, then deployments
    /// in order
    pub async fn nc_files(&self) -> Vec<NcFile> {
        let mut files = Vec::new();
        let rt = NcFile::new(&self.client, &self.stn, DatasetKind::Realtime);
        if rt.exists().await {
            files.push(rt);
        }
        let ht = NcFile::new(&self.client, &self.stn, DatasetKind::Historic);
        if ht.exists().await {
            files.push(ht);
        }
        for dep in 1..MAX_DEPLOYMENTS {
            let ar = NcFile::new(
                &self.client,
                &self.stn,
                DatasetKind::Archive(deployment_name(dep)),
            );
            if !ar.exists().await {
                break;
            }
            files.push(ar);
        }
        files
    }

    /// Fetch from the realtime and historic files and seam the halves,
    /// oldest rows first. Each file is consulted only when its time
    /// coverage can reach the request span.
    async fn merge_request(&self, req: &DataRequest) -> Result<RequestResult> {
        let prefix_time = format!("{}Time", var_prefix(&req.vars[0]));
        let (newer, older) = tokio::try_join!(
            async {
                match gate_stamp(&self.realtime, &prefix_time, false).await? {
                    Some(first) if first <= req.end => self.realtime.fetch(req).await,
                    _ => Ok(RequestResult::new()),
                }
            },
            async {
                match gate_stamp(&self.historic, &prefix_time, true).await? {
                    Some(last) if last >= req.start => self.historic.fetch(req).await,
                    _ => Ok(RequestResult::new()),
                }
            },
        )?;
        RequestResult::merge(older, newer)
    }

    /// Displacement requests walk the realtime xy file and then the
    /// archives. Rows are located by sample index, so each file's own
    /// sampling description decides what it holds.
    async fn merge_xyz_request(&self, req: &DataRequest) -> Result<RequestResult> {
        let mut req = req.clone();
        // xyzData is shorthand for the three components
        if req.vars.first().map(String::as_str) == Some("xyzData") {
            req.vars = XYZ_VARS.iter().map(|v| v.to_string()).collect();
        }

        let xy = NcFile::new(&self.client, &self.stn, DatasetKind::RealtimeXy);
        let mut newest = RequestResult::new();
        let mut rt_file_start = None;
        if xy.exists().await {
            let (result, file_start) = xyz_file_request(&xy, &req).await?;
            newest = result;
            rt_file_start = file_start;
        }
        // a request starting after the realtime file does cannot reach
        // into the archives
        if let Some(file_start) = rt_file_start {
            if req.start > file_start {
                return Ok(newest);
            }
        }

        let mut archived = RequestResult::new();
        for dep in 1..MAX_DEPLOYMENTS {
            let ar = NcFile::new(
                &self.client,
                &self.stn,
                DatasetKind::Archive(deployment_name(dep)),
            );
            if !ar.exists().await {
                break;
            }
            let (result, file_start) = xyz_file_request(&ar, &req).await?;
            archived = RequestResult::merge(archived, result)?;
            if let Some(file_start) = file_start {
                if file_start > req.end {
                    break;
                }
            }
        }
        RequestResult::merge(archived, newest)
    }

    /// Stamp interval covering `n` records around the record closest to
    /// `target`, seaming across the historic/realtime boundary when the
    /// count runs past either file. `None` when neither file can place the
    /// target.
    pub async fn target_timespan(
        &self,
        target: i64,
        n: i64,
        time_var: &str,
    ) -> Result<Option<(i64, i64)>> {
        let r_stamps: Option<Vec<i64>> = if self.realtime.exists().await {
            self.realtime.stamps(time_var).await?
        } else {
            None
        };

        let mut r_closest: Option<usize> = None;
        if let Some(r) = r_stamps.as_ref().filter(|r| !r.is_empty()) {
            let last = r.len() - 1;
            let i_b = r.partition_point(|&t| t < target).min(last);
            if i_b == last || r[i_b] == target {
                r_closest = Some(i_b);
            } else if i_b > 0 {
                r_closest = Some(closest_index(i_b - 1, i_b, r, target));
            }
        }

        let mut h_stamps: Option<Vec<i64>> = None;
        let mut h_closest: Option<usize> = None;
        if r_closest.is_none() && self.historic.exists().await {
            h_stamps = self.historic.stamps(time_var).await?;
            if let Some(h) = h_stamps.as_ref().filter(|h| !h.is_empty()) {
                let last = h.len() - 1;
                let i_b = h.partition_point(|&t| t < target).min(last);
                if h[i_b] == target || i_b == 0 {
                    h_closest = Some(i_b);
                } else if i_b >= last {
                    // target falls between the historic and realtime files
                    match r_stamps.as_ref().filter(|r| !r.is_empty()) {
                        Some(r) if (h[last] - target).abs() >= (r[0] - target).abs() => {
                            r_closest = Some(0);
                        }
                        _ => h_closest = Some(i_b),
                    }
                } else {
                    h_closest = Some(closest_index(i_b - 1, i_b, h, target));
                }
            }
        }

        if let (Some(r), Some(i)) = (&r_stamps, r_closest) {
            let r_int = interval_around(r, i, n);
            if r_int.bounds == BoundsExceeded::Left {
                if h_stamps.is_none() && self.historic.exists().await {
                    h_stamps = self.historic.stamps(time_var).await?;
                }
                if let Some(h) = h_stamps.as_ref().filter(|h| !h.is_empty()) {
                    let h_int = interval_around(h, h.len() - 1, n + i as i64 + 1);
                    return Ok(Some(combine_intervals(h_int, r_int)));
                }
            }
            return Ok(Some((r_int.start, r_int.end)));
        }
        if let (Some(h), Some(i)) = (&h_stamps, h_closest) {
            let h_int = interval_around(h, i, n);
            if h_int.bounds == BoundsExceeded::Right {
                if let Some(r) = r_stamps.as_ref().filter(|r| !r.is_empty()) {
                    let r_int = interval_around(r, 0, n + i as i64 - (h.len() as i64 - 1) - 1);
                    return Ok(Some(combine_intervals(h_int, r_int)));
                }
            }
            return Ok(Some((h_int.start, h_int.end)));
        }
        debug!(stn = %self.stn, target, "no file places the target stamp");
        Ok(None)
    }
}

/// First (or last) stamp of the file's time coordinate, preferring the
/// request's own time variable and falling back to `waveTime`
async fn gate_stamp(file: &NcFile, prefix_time: &str, last: bool) -> Result<Option<i64>> {
    if !file.exists().await {
        return Ok(None);
    }
    let var = if file.dds().await?.var(prefix_time).is_some() {
        prefix_time
    } else {
        "waveTime"
    };
    if last {
        file.last_stamp(var).await
    } else {
        file.first_stamp(var).await
    }
}

/// One displacement file's rows inside the request span, plus the file's
/// first sample stamp when its sampling description is usable
async fn xyz_file_request(
    file: &NcFile,
    req: &DataRequest,
) -> Result<(RequestResult, Option<i64>)> {
    let Some(info) = XyzInfo::load(file).await? else {
        return Ok((RequestResult::new(), None));
    };
    if !info.is_valid() || info.len == 0 {
        return Ok((RequestResult::new(), None));
    }
    let file_start = info.timestamp(0).round() as i64;

    let s_idx = info.index_for(req.start);
    let e_idx = info.index_for(req.end);
    let sample_span = Timespan::new(s_idx, e_idx);
    let file_span = Timespan::new(0, info.len as i64 - 1);
    if !sample_span.overlaps(&file_span) {
        return Ok((RequestResult::new(), Some(file_start)));
    }

    let s = s_idx.max(0) as usize;
    let e = e_idx.min(info.len as i64 - 1).max(0) as usize;
    let vars: Vec<&str> = req.vars.iter().map(String::as_str).collect();
    let mut result = file.fetch_rows(&vars, s, e).await?;
    if !result.is_empty() {
        let times: Vec<f64> = (s..e).map(|i| info.timestamp(i as i64)).collect();
        let n = times.len();
        result.insert(
            "xyzTime",
            MaskedArray::unmasked(DataArray {
                name: "xyzTime".into(),
                dtype: DapType::Float64,
                dims: vec![DapDim {
                    name: "xyzTime".into(),
                    size: n,
                }],
                values: ArrayValues::Float64(times),
            }),
        );
    }
    Ok((result, Some(file_start)))
}

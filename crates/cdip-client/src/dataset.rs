//! One station netCDF file served over OPeNDAP
//!
//! [`NcFile`] addresses a single file and answers data requests against it.
//! A request resolves in at most two round trips: one for the time
//! coordinate of the leading variable, then one batched fetch of every
//! requested variable, any non-time coordinates, and the QC flags the
//! publication mask needs. The DDS and DAS are fetched lazily and cached
//! for the lifetime of the value.

use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use cdip_common::{parse_nc_attr_datetime, to_stamp, Timespan};
use cdip_dap::{ArrayValues, ConstraintExpr, Das, Dds, MaskedArray, Slice};

use crate::error::Result;
use crate::http::DodsClient;
use crate::model::RequestResult;
use crate::request::DataRequest;
use crate::urls::{dataset_url, external_url, DatasetKind};

/// Leading lowercase run of a variable name, e.g. `wave` of `waveHs`
pub fn var_prefix(name: &str) -> &str {
    let end = name.find(char::is_uppercase).unwrap_or(name.len());
    &name[..end]
}

/// Indices of the rows with `start <= stamp <= end`, end exclusive
pub(crate) fn span_indices(stamps: &[i64], start: i64, end: i64) -> (usize, usize) {
    let s = stamps.partition_point(|&t| t < start);
    let e = s + stamps[s..].partition_point(|&t| t <= end);
    (s, e)
}

fn int_values(values: &ArrayValues) -> Vec<i64> {
    (0..values.len())
        .map(|i| values.get_i64(i).unwrap_or(0))
        .collect()
}

/// A station netCDF file on the server
#[derive(Debug)]
pub struct NcFile {
    client: DodsClient,
    stn: String,
    kind: DatasetKind,
    url: String,
    dds: OnceCell<Dds>,
    das: OnceCell<Das>,
}

impl NcFile {
    pub fn new(client: &DodsClient, stn: &str, kind: DatasetKind) -> NcFile {
        let url = dataset_url(client.thredds_domain(), stn, &kind);
        NcFile {
            client: client.clone(),
            stn: stn.to_string(),
            kind,
            url,
            dds: OnceCell::new(),
            das: OnceCell::new(),
        }
    }

    /// A file contributed by another organization, e.g. ww3 model output.
    /// `id` is the station id as the organization names it.
    pub fn external(client: &DodsClient, stn: &str, org: &str, id: &str, kind: DatasetKind) -> NcFile {
        let url = external_url(client.thredds_domain(), org, id, &kind);
        NcFile {
            client: client.clone(),
            stn: stn.to_string(),
            kind,
            url,
            dds: OnceCell::new(),
            das: OnceCell::new(),
        }
    }

    /// The cross-station `latest_3day.nc` file
    pub fn latest(client: &DodsClient) -> NcFile {
        NcFile::new(client, "", DatasetKind::Latest)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn stn(&self) -> &str {
        &self.stn
    }

    pub fn kind(&self) -> &DatasetKind {
        &self.kind
    }

    pub fn filename(&self) -> &str {
        self.url.rsplit('/').next().unwrap_or(&self.url)
    }

    pub(crate) fn client(&self) -> &DodsClient {
        &self.client
    }

    /// True when the server answers for this file
    pub async fn exists(&self) -> bool {
        self.client.exists(&format!("{}.dds", self.url)).await
    }

    pub async fn dds(&self) -> Result<&Dds> {
        self.dds
            .get_or_try_init(|| self.client.fetch_dds(&self.url))
            .await
    }

    pub async fn das(&self) -> Result<&Das> {
        self.das
            .get_or_try_init(|| self.client.fetch_das(&self.url))
            .await
    }

    /// The file's `date_modified` global attribute
    pub async fn date_modified(&self) -> Result<Option<DateTime<Utc>>> {
        match self.das().await?.global("date_modified").and_then(|v| v.as_str()) {
            Some(s) => Ok(Some(parse_nc_attr_datetime(s)?)),
            None => Ok(None),
        }
    }

    /// The file's `time_coverage_start`/`time_coverage_end` attributes
    pub async fn coverage(&self) -> Result<Option<Timespan>> {
        let das = self.das().await?;
        let start = das.global("time_coverage_start").and_then(|v| v.as_str());
        let end = das.global("time_coverage_end").and_then(|v| v.as_str());
        match (start, end) {
            (Some(start), Some(end)) => Ok(Some(Timespan::new(
                to_stamp(parse_nc_attr_datetime(start)?),
                to_stamp(parse_nc_attr_datetime(end)?),
            ))),
            _ => Ok(None),
        }
    }

    /// One stamp of a time variable without fetching the whole coordinate
    pub async fn stamp_at(&self, var: &str, i: usize) -> Result<Option<i64>> {
        if self.dds().await?.var(var).is_none() {
            return Ok(None);
        }
        let ce = ConstraintExpr::new().var_sliced(var, &[Slice::index(i)]);
        let resp = self.client.fetch_dods(&self.url, &ce).await?;
        Ok(resp
            .array(var)
            .and_then(|a| a.values.get_f64(0))
            .map(|x| x.round() as i64))
    }

    pub async fn first_stamp(&self, var: &str) -> Result<Option<i64>> {
        self.stamp_at(var, 0).await
    }

    /// A whole time coordinate as stamps
    pub async fn stamps(&self, var: &str) -> Result<Option<Vec<i64>>> {
        if self.dds().await?.var(var).is_none() {
            return Ok(None);
        }
        let ce = ConstraintExpr::new().var(var);
        let resp = self.client.fetch_dods(&self.url, &ce).await?;
        Ok(resp.array(var).map(|a| {
            (0..a.values.len())
                .map(|i| a.values.get_f64(i).unwrap_or(0.0).round() as i64)
                .collect()
        }))
    }

    pub async fn last_stamp(&self, var: &str) -> Result<Option<i64>> {
        let n = match self.dds().await?.var(var) {
            Some(v) if !v.is_empty() => v.len(),
            _ => return Ok(None),
        };
        self.stamp_at(var, n - 1).await
    }

    /// Fetch the requested variables from this file.
    ///
    /// The leading variable decides everything: a missing leading variable
    /// yields an empty result; its dimension with `units` starting
    /// `seconds` is the time coordinate the span is bisected on; its
    /// `ancillary_variables` attribute names the QC flag the publication
    /// mask is built from. Other requested variables that the file lacks
    /// are skipped. Variables sharing the time dimension come back row
    /// compressed to the publication set unless `apply_mask` is off;
    /// masking by wave and sst flag pairs only, gps status bits never
    /// subset rows.
    pub async fn fetch(&self, req: &DataRequest) -> Result<RequestResult> {
        let mut result = RequestResult::new();
        let Some(first_name) = req.vars.first() else {
            return Ok(result);
        };
        let dds = self.dds().await?;
        let das = self.das().await?;
        let Some(first_var) = dds.var(first_name) else {
            debug!(var = %first_name, url = %self.url, "leading variable absent, empty result");
            return Ok(result);
        };

        // classify the leading variable's dimensions
        let mut time_dim: Option<String> = None;
        let mut coord_dims: Vec<String> = Vec::new();
        for dim in &first_var.dims {
            if dds.var(&dim.name).is_none() {
                // count and string-length dims carry no coordinate variable
                continue;
            }
            if das.units(&dim.name).is_some_and(|u| u.starts_with("seconds")) {
                time_dim = Some(dim.name.clone());
            } else {
                coord_dims.push(dim.name.clone());
            }
        }

        // bisect the request span on the time coordinate
        let mut span: Option<(usize, usize)> = None;
        if let Some(time_name) = &time_dim {
            let ce = ConstraintExpr::new().var(time_name);
            let resp = self.client.fetch_dods(&self.url, &ce).await?;
            let Some(arr) = resp.array(time_name) else {
                return Ok(result);
            };
            let stamps: Vec<i64> = (0..arr.values.len())
                .map(|i| arr.values.get_f64(i).unwrap_or(0.0).round() as i64)
                .collect();
            let (s, e) = span_indices(&stamps, req.start, req.end);
            if s == e {
                debug!(url = %self.url, start = req.start, end = req.end, "span outside file");
                return Ok(result);
            }
            let full = MaskedArray::from_array(arr.clone(), das.fill_value(time_name));
            let outside: Vec<bool> = (0..stamps.len()).map(|i| i < s || i >= e).collect();
            result.insert(time_name.clone(), full.compress_rows(&outside));
            span = Some((s, e));
        }

        // the QC flag pair behind the publication mask
        let flag_pair: Option<(String, Option<String>)> = das
            .str_attr(first_name, "ancillary_variables")
            .and_then(|s| s.split_whitespace().next())
            .filter(|anc| matches!(*anc, "waveFlagPrimary" | "sstFlagPrimary"))
            .map(|anc| {
                let secondary = format!("{}FlagSecondary", var_prefix(anc));
                let secondary = dds.var(&secondary).is_some().then_some(secondary);
                (anc.to_string(), secondary)
            });

        // batch the data variables, non-time coordinates, and flags
        let mut deliver: Vec<String> = Vec::new();
        for name in &req.vars {
            if Some(name.as_str()) == time_dim.as_deref() || dds.var(name).is_none() {
                continue;
            }
            if !deliver.contains(name) {
                deliver.push(name.clone());
            }
        }
        for dim in &coord_dims {
            if !deliver.contains(dim) {
                deliver.push(dim.clone());
            }
        }
        let mut to_fetch = deliver.clone();
        if let Some((primary, secondary)) = &flag_pair {
            for flag in [Some(primary), secondary.as_ref()].into_iter().flatten() {
                if dds.var(flag).is_some() && !to_fetch.contains(flag) {
                    to_fetch.push(flag.clone());
                }
            }
        }

        let mut ce = ConstraintExpr::new();
        let mut time_sliced: Vec<String> = Vec::new();
        for name in &to_fetch {
            let Some(var) = dds.var(name) else { continue };
            let on_time = span.is_some()
                && var
                    .dims
                    .first()
                    .is_some_and(|d| Some(d.name.as_str()) == time_dim.as_deref());
            if on_time {
                let (s, e) = span.unwrap_or((0, 0));
                let mut slices = vec![Slice::range(s, e - 1)];
                for d in &var.dims[1..] {
                    slices.push(Slice::range(0, d.size.saturating_sub(1)));
                }
                ce = ce.var_sliced(name, &slices);
                time_sliced.push(name.clone());
            } else {
                ce = ce.var(name);
            }
        }
        if ce.is_empty() {
            return Ok(result);
        }
        debug!(url = %self.url, vars = to_fetch.len(), "batched fetch");
        let resp = self.client.fetch_dods(&self.url, &ce).await?;

        for name in &deliver {
            let Some(arr) = resp.array(name) else { continue };
            result.insert(name.clone(), MaskedArray::from_array(arr.clone(), das.fill_value(name)));
        }

        // compress rows to the publication set
        if req.apply_mask && span.is_some() {
            if let Some((primary, secondary)) = &flag_pair {
                let primary_vals = resp.array(primary).map(|a| int_values(&a.values));
                if let Some(primary_vals) = primary_vals {
                    let secondary_vals = secondary
                        .as_ref()
                        .and_then(|s| resp.array(s))
                        .map(|a| int_values(&a.values));
                    let rows_masked = req
                        .pub_set
                        .row_mask(&primary_vals, secondary_vals.as_deref());
                    let mut targets = time_sliced.clone();
                    if let Some(time_name) = &time_dim {
                        targets.push(time_name.clone());
                    }
                    for name in &targets {
                        if let Some(arr) = result.get(name) {
                            let compressed = arr.compress_rows(&rows_masked);
                            result.insert(name.clone(), compressed);
                        }
                    }
                }
            }
        }

        Ok(result)
    }

    /// Fetch variables by row range, `s..e` exclusive, fill masking only.
    /// Displacement requests address rows by sample index instead of a
    /// time coordinate.
    pub async fn fetch_rows(&self, vars: &[&str], s: usize, e: usize) -> Result<RequestResult> {
        let mut result = RequestResult::new();
        if s >= e {
            return Ok(result);
        }
        let dds = self.dds().await?;
        let das = self.das().await?;
        let mut ce = ConstraintExpr::new();
        let mut found = Vec::new();
        for name in vars {
            if dds.var(name).is_none() {
                continue;
            }
            ce = ce.var_sliced(name, &[Slice::range(s, e - 1)]);
            found.push(*name);
        }
        if ce.is_empty() {
            return Ok(result);
        }
        let resp = self.client.fetch_dods(&self.url, &ce).await?;
        for name in found {
            let Some(arr) = resp.array(name) else { continue };
            result.insert(name, MaskedArray::from_array(arr.clone(), das.fill_value(name)));
        }
        Ok(result)
    }
}

/// Sampling description of a displacement file. Sample `i` was measured at
/// `start_time - filter_delay + i / sample_rate`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XyzInfo {
    pub start_time: f64,
    pub sample_rate: f64,
    pub filter_delay: f64,
    pub len: usize,
}

impl XyzInfo {
    /// Read the sampling variables of `file`. `None` when the file carries
    /// no displacement data. Mark I buoys store the filter delay as a fill
    /// value, which reads as zero delay.
    pub async fn load(file: &NcFile) -> Result<Option<XyzInfo>> {
        let dds = file.dds().await?;
        let Some(z) = dds.var("xyzZDisplacement") else {
            return Ok(None);
        };
        let len = z.len();
        if dds.var("xyzStartTime").is_none() || dds.var("xyzSampleRate").is_none() {
            return Ok(None);
        }
        let mut ce = ConstraintExpr::new().var("xyzStartTime").var("xyzSampleRate");
        let has_delay = dds.var("xyzFilterDelay").is_some();
        if has_delay {
            ce = ce.var("xyzFilterDelay");
        }
        let das = file.das().await?;
        let resp = file.client.fetch_dods(&file.url, &ce).await?;
        let scalar = |name: &str| -> Option<f64> {
            let arr = resp.array(name)?;
            MaskedArray::from_array(arr.clone(), das.fill_value(name)).get_f64(0)
        };
        let (Some(start_time), Some(sample_rate)) = (scalar("xyzStartTime"), scalar("xyzSampleRate"))
        else {
            return Ok(None);
        };
        let filter_delay = scalar("xyzFilterDelay").unwrap_or(0.0);
        Ok(Some(XyzInfo {
            start_time,
            sample_rate,
            filter_delay,
            len,
        }))
    }

    /// Sample index a stamp falls on
    pub fn index_for(&self, stamp: i64) -> i64 {
        (self.sample_rate * (stamp as f64 - self.start_time + self.filter_delay)).round() as i64
    }

    /// Measurement time of sample `i`, fractional seconds
    pub fn timestamp(&self, i: i64) -> f64 {
        self.start_time - self.filter_delay + i as f64 / self.sample_rate
    }

    pub fn is_valid(&self) -> bool {
        self.start_time != 0.0 && self.sample_rate != 0.0 && self.filter_delay >= 0.0
    }
}

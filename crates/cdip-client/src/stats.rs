//! Data availability summaries for a station's whole record

use std::collections::BTreeMap;

use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use cdip_common::{from_stamp, time::NC_ATTR_FMT};
use cdip_dap::MaskedArray;

use crate::dataset::{var_prefix, NcFile};
use crate::error::{ClientError, Result};
use crate::flags::{flag_categories, FlagCategories, PubSet};
use crate::station::{SeriesSpan, StationData};
use crate::urls::DatasetKind;

/// Quality flag variables summarized by [`StationStats::flag_counts`]
pub const FLAG_VARS: [&str; 3] = ["waveFlagPrimary", "sstFlagPrimary", "gpsStatusFlags"];

/// First stamp considered part of the station record
const RECORD_START: i64 = crate::request::EARLIEST_STAMP;

/// Category counts per flag variable, total and by calendar month
#[derive(Debug, Clone, Default, Serialize)]
pub struct FlagCounts {
    /// flag variable to category label to count
    pub totals: BTreeMap<String, BTreeMap<String, u64>>,
    /// flag variable to `YYYYMM` to category label to count
    pub by_month: BTreeMap<String, BTreeMap<String, BTreeMap<String, u64>>>,
}

/// Time coverage of one archived deployment file
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentCoverage {
    pub time_coverage_start: Option<String>,
    pub time_coverage_end: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DeploymentSummary {
    pub number_of_deployments: usize,
    /// deployment name (`d01` ..) to its coverage
    pub deployments: BTreeMap<String, DeploymentCoverage>,
}

/// Everything [`StationStats::make_stats`] reports
#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub flag_counts: FlagCounts,
    pub deployments: DeploymentSummary,
}

/// Availability reporting over a station's files.
///
/// Counts cover the record from 1975 on, released and unreleased rows
/// alike, so gaps show up instead of being filtered away.
#[derive(Debug)]
pub struct StationStats {
    station: StationData,
}

impl StationStats {
    pub fn new(station: StationData) -> StationStats {
        StationStats { station }
    }

    pub fn station(&self) -> &StationData {
        &self.station
    }

    /// Flag counts plus the deployment inventory
    pub async fn make_stats(&self) -> Result<StatsReport> {
        Ok(StatsReport {
            flag_counts: self.flag_counts(&FLAG_VARS).await?,
            deployments: self.deployment_summary().await?,
        })
    }

    /// Count flag categories over the entire station record. Fill rows are
    /// skipped; values outside the declared categories count as `unknown`.
    pub async fn flag_counts(&self, flags: &[&str]) -> Result<FlagCounts> {
        let das = self.meta_file().await?.das().await?;
        let span = SeriesSpan::Span {
            start: RECORD_START,
            end: Utc::now().timestamp(),
        };
        let mut counts = FlagCounts::default();
        for &flag in flags {
            let Some(categories) = flag_categories(das, flag) else {
                debug!(stn = %self.station.stn(), flag, "no flag categories published");
                continue;
            };
            let series = self
                .station
                .get_series(span, &[flag], PubSet::BothAll, true)
                .await?;
            let Some(values) = series.get(flag) else {
                continue;
            };
            let time_var = format!("{}Time", var_prefix(flag));
            let stamps = series.stamps(&time_var).unwrap_or_default();
            let (totals, by_month) = count_categories(values, &stamps, &categories);
            counts.totals.insert(flag.to_string(), totals);
            counts.by_month.insert(flag.to_string(), by_month);
        }
        Ok(counts)
    }

    /// Coverage of each archived deployment file
    pub async fn deployment_summary(&self) -> Result<DeploymentSummary> {
        let mut summary = DeploymentSummary::default();
        for file in self.station.nc_files().await {
            let DatasetKind::Archive(dep) = file.kind() else {
                continue;
            };
            let coverage = file.coverage().await?;
            summary.deployments.insert(
                dep.clone(),
                DeploymentCoverage {
                    time_coverage_start: coverage.map(|c| nc_datetime(c.start)),
                    time_coverage_end: coverage.map(|c| nc_datetime(c.end)),
                },
            );
            summary.number_of_deployments += 1;
        }
        Ok(summary)
    }

    /// The file whose DAS describes the station's flag categories
    async fn meta_file(&self) -> Result<&NcFile> {
        if self.station.historic().exists().await {
            Ok(self.station.historic())
        } else if self.station.realtime().exists().await {
            Ok(self.station.realtime())
        } else {
            Err(ClientError::NoStationFile(self.station.stn().to_string()))
        }
    }
}

fn nc_datetime(stamp: i64) -> String {
    from_stamp(stamp).format(NC_ATTR_FMT).to_string()
}

type MonthCounts = BTreeMap<String, BTreeMap<String, u64>>;

/// Tally labelled counts for one flag series, totalled and keyed by the
/// `YYYYMM` month of each row's stamp
fn count_categories(
    values: &MaskedArray,
    stamps: &[i64],
    categories: &FlagCategories,
) -> (BTreeMap<String, u64>, MonthCounts) {
    let mut totals: BTreeMap<String, u64> = BTreeMap::new();
    let mut by_month: MonthCounts = BTreeMap::new();
    for i in 0..values.len() {
        let Some(value) = values.get_i64(i) else {
            continue;
        };
        let label = categories.label(value);
        *totals.entry(label.to_string()).or_insert(0) += 1;
        if let Some(&stamp) = stamps.get(i) {
            let month = from_stamp(stamp).format("%Y%m").to_string();
            *by_month
                .entry(month)
                .or_default()
                .entry(label.to_string())
                .or_insert(0) += 1;
        }
    }
    (totals, by_month)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdip_common::{parse_datetime, to_stamp};
    use cdip_dap::{ArrayValues, DapDim, DapType, DataArray};

    fn flag_series(vals: Vec<u8>, fill: Option<f64>) -> MaskedArray {
        MaskedArray::from_array(
            DataArray {
                name: "waveFlagPrimary".into(),
                dtype: DapType::Byte,
                dims: vec![DapDim {
                    name: "waveTime".into(),
                    size: vals.len(),
                }],
                values: ArrayValues::Byte(vals),
            },
            fill,
        )
    }

    fn wave_categories() -> FlagCategories {
        FlagCategories {
            values: vec![1, 2, 3, 4, 9],
            meanings: vec![
                "good".into(),
                "not_evaluated".into(),
                "questionable".into(),
                "bad".into(),
                "missing".into(),
            ],
        }
    }

    #[test]
    fn test_count_categories_totals_and_unknown() {
        let values = flag_series(vec![1, 1, 4, 7], None);
        let (totals, _) = count_categories(&values, &[], &wave_categories());
        assert_eq!(totals.get("good"), Some(&2));
        assert_eq!(totals.get("bad"), Some(&1));
        assert_eq!(totals.get("unknown"), Some(&1));
    }

    #[test]
    fn test_count_categories_skips_fill_rows() {
        let values = flag_series(vec![1, 255, 4], Some(255.0));
        let (totals, _) = count_categories(&values, &[], &wave_categories());
        assert_eq!(totals.values().sum::<u64>(), 2);
    }

    #[test]
    fn test_count_categories_by_month() {
        let jan = to_stamp(parse_datetime("2024-01-15 00:00:00").unwrap());
        let feb = to_stamp(parse_datetime("2024-02-02 12:00:00").unwrap());
        let values = flag_series(vec![1, 1, 4], None);
        let (_, by_month) = count_categories(&values, &[jan, jan, feb], &wave_categories());
        assert_eq!(by_month["202401"].get("good"), Some(&2));
        assert_eq!(by_month["202402"].get("bad"), Some(&1));
        assert!(!by_month.contains_key("202403"));
    }

    #[test]
    fn test_nc_datetime_format() {
        let stamp = to_stamp(parse_datetime("2020-03-04 05:06:07").unwrap());
        assert_eq!(nc_datetime(stamp), "2020-03-04T05:06:07Z");
    }
}

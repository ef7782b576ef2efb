//! Result models returned by station and latest queries

use std::collections::BTreeMap;

use serde::Serialize;

use cdip_dap::{AttrValue, MaskedArray};

use crate::error::{ClientError, Result};

/// Variables returned by one data request, keyed by variable name.
///
/// Serializes as one JSON object with an array per variable; masked
/// elements become `null`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct RequestResult {
    vars: BTreeMap<String, MaskedArray>,
}

impl RequestResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, arr: MaskedArray) {
        self.vars.insert(name.into(), arr);
    }

    pub fn get(&self, name: &str) -> Option<&MaskedArray> {
        self.vars.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut MaskedArray> {
        self.vars.get_mut(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<MaskedArray> {
        self.vars.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn into_map(self) -> BTreeMap<String, MaskedArray> {
        self.vars
    }

    /// A time variable's values rounded to unix stamps
    pub fn stamps(&self, var: &str) -> Option<Vec<i64>> {
        let arr = self.vars.get(var)?;
        (0..arr.len())
            .map(|i| arr.values.get_f64(i).map(|x| x.round() as i64))
            .collect()
    }

    /// Seam two results from consecutive files, `older` rows first.
    ///
    /// Variables present in only one side pass through unchanged. A
    /// variable whose halves disagree in dtype or row width cannot be
    /// seamed and fails the merge.
    pub fn merge(older: RequestResult, newer: RequestResult) -> Result<RequestResult> {
        let mut merged = older;
        for (name, arr) in newer.vars {
            match merged.vars.get_mut(&name) {
                None => {
                    merged.vars.insert(name, arr);
                }
                Some(existing) => {
                    if !existing.append(arr) {
                        return Err(ClientError::SeamMismatch(name));
                    }
                }
            }
        }
        Ok(merged)
    }
}

/// Station description assembled from meta variables and file attributes
#[derive(Debug, Clone, Default, Serialize)]
pub struct StationMeta {
    #[serde(flatten)]
    pub vars: BTreeMap<String, MaskedArray>,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, AttrValue>,
}

/// Most recent observations of one station from `latest_3day.nc`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestStation {
    pub site_label: String,
    pub station_name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub water_depth: Option<f64>,
    /// Stamp of the newest released wave record
    pub wave_time: i64,
    pub wave_hs: Option<f64>,
    pub wave_tp: Option<f64>,
    pub wave_dp: Option<f64>,
    /// Stamp of the newest released sst record, when any survives masking
    pub sst_time: Option<i64>,
    #[serde(rename = "sstSeaSurfaceTemperature")]
    pub sst: Option<f64>,
}

/// Every station dataset the THREDDS catalog lists
#[derive(Debug, Clone, Default, Serialize)]
pub struct DatasetUrls {
    pub realtime: Vec<String>,
    pub archive: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdip_dap::{ArrayValues, DapDim, DapType, DataArray};

    fn series(name: &str, vals: Vec<f64>) -> MaskedArray {
        MaskedArray::unmasked(DataArray {
            name: name.into(),
            dtype: DapType::Float64,
            dims: vec![DapDim {
                name: "waveTime".into(),
                size: vals.len(),
            }],
            values: ArrayValues::Float64(vals),
        })
    }

    #[test]
    fn test_merge_keeps_older_rows_first() {
        let mut older = RequestResult::new();
        older.insert("waveHs", series("waveHs", vec![1.0, 2.0]));
        let mut newer = RequestResult::new();
        newer.insert("waveHs", series("waveHs", vec![3.0]));
        newer.insert("waveTp", series("waveTp", vec![9.0]));

        let merged = RequestResult::merge(older, newer).unwrap();
        assert_eq!(
            merged.get("waveHs").unwrap().values,
            ArrayValues::Float64(vec![1.0, 2.0, 3.0])
        );
        assert_eq!(merged.get("waveTp").unwrap().len(), 1);
    }

    #[test]
    fn test_merge_rejects_mismatched_halves() {
        let mut older = RequestResult::new();
        older.insert("waveHs", series("waveHs", vec![1.0]));
        let mut newer = RequestResult::new();
        newer.insert(
            "waveHs",
            MaskedArray::unmasked(DataArray {
                name: "waveHs".into(),
                dtype: DapType::Float32,
                dims: vec![DapDim {
                    name: "waveTime".into(),
                    size: 1,
                }],
                values: ArrayValues::Float32(vec![1.0]),
            }),
        );
        assert!(matches!(
            RequestResult::merge(older, newer),
            Err(ClientError::SeamMismatch(_))
        ));
    }

    #[test]
    fn test_stamps_round_to_seconds() {
        let mut r = RequestResult::new();
        r.insert("waveTime", series("waveTime", vec![1_400_000_000.4, 1_400_001_800.0]));
        assert_eq!(r.stamps("waveTime"), Some(vec![1_400_000_000, 1_400_001_800]));
        assert_eq!(r.stamps("missing"), None);
    }

    #[test]
    fn test_result_serializes_as_object() {
        let mut r = RequestResult::new();
        r.insert("waveHs", series("waveHs", vec![1.5]));
        assert_eq!(serde_json::to_string(&r).unwrap(), r#"{"waveHs":[1.5]}"#);
    }
}

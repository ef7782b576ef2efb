//! Most recent observations across all realtime stations
//!
//! `latest_3day.nc` stacks every realtime station side by side: data
//! variables are time by station, and per-station offsets correct each
//! station's rows to its own observation times. The newest released row
//! per station is found by masking the offset columns with the
//! publication flags and scanning each column from the end.

use chrono::Utc;

use cdip_dap::MaskedArray;

use crate::dataset::NcFile;
use crate::error::Result;
use crate::flags::PubSet;
use crate::http::DodsClient;
use crate::model::{LatestStation, RequestResult};
use crate::request::DataRequest;

/// Reader for the cross-station latest file
#[derive(Debug)]
pub struct Latest {
    file: NcFile,
}

impl Latest {
    pub fn new(client: &DodsClient) -> Latest {
        Latest {
            file: NcFile::latest(client),
        }
    }

    pub fn file(&self) -> &NcFile {
        &self.file
    }

    /// Site labels of the stations the file carries, e.g. `100p1`
    pub async fn stations(&self) -> Result<Vec<String>> {
        let req = DataRequest::default()
            .with_vars(["metaSiteLabel"])
            .with_apply_mask(false);
        let result = self.file.fetch(&req).await?;
        let Some(labels) = result.get("metaSiteLabel") else {
            return Ok(Vec::new());
        };
        Ok((0..labels.rows())
            .filter_map(|i| labels.get_str(i))
            .map(str::to_string)
            .collect())
    }

    /// The newest released observation of every station in the file.
    ///
    /// Stations whose wave rows are all masked out of `pub_set` are
    /// omitted. Sea surface temperature fields are `None` for stations
    /// whose sst rows are all masked, and a station's sst row is located
    /// independently of its wave row.
    pub async fn fetch(&self, pub_set: PubSet) -> Result<Vec<LatestStation>> {
        // the file reaches up to 30 minutes past now
        let now = Utc::now().timestamp();
        let vars = [
            "waveHs",
            "waveTp",
            "waveDp",
            "sstSeaSurfaceTemperature",
            "waveTimeOffset",
            "sstTime",
            "sstTimeOffset",
            "waveFlagPrimary",
            "waveFlagSecondary",
            "sstFlagPrimary",
            "sstFlagSecondary",
            "metaLatitude",
            "metaLongitude",
            "metaWaterDepth",
            "metaSiteLabel",
            "metaStationName",
        ];
        let req = DataRequest::new(now - 4 * 86_400, now + 30 * 60, &vars)
            .with_pub_set(pub_set)
            .with_apply_mask(false);
        let result = self.file.fetch(&req).await?;

        let Some(wave_offset) = result.get("waveTimeOffset") else {
            return Ok(Vec::new());
        };
        let mut wave_offset = wave_offset.clone();
        or_flag_mask(&mut wave_offset, &result, "waveFlagPrimary", "waveFlagSecondary", pub_set);
        let wave_ixs = latest_indices(&wave_offset);

        let sst = result.get("sstTimeOffset").map(|offset| {
            let mut offset = offset.clone();
            or_flag_mask(&mut offset, &result, "sstFlagPrimary", "sstFlagSecondary", pub_set);
            let ixs = latest_indices(&offset);
            (ixs, offset)
        });

        let wave_times = result.stamps("waveTime").unwrap_or_default();
        let sst_times = result.stamps("sstTime").unwrap_or_default();
        let labels = result.get("metaSiteLabel");
        let names = result.get("metaStationName");

        let cols = wave_offset.row_len();
        let mut out = Vec::with_capacity(cols);
        for s in 0..cols {
            let Some(ix) = wave_ixs[s] else { continue };
            let Some(&base) = wave_times.get(ix) else { continue };
            let Some(offset_s) = wave_offset.get_f64(ix * cols + s) else { continue };
            let wave_time = base + offset_s.round() as i64;

            let at = |name: &str, row: usize| -> Option<f64> {
                result.get(name).and_then(|a| a.get_f64(row * a.row_len() + s))
            };
            let meta = |name: &str| -> Option<f64> {
                result.get(name).and_then(|a| a.get_f64(s))
            };

            let (sst_time, sst_value) = match &sst {
                Some((ixs, offset)) => match ixs.get(s).copied().flatten() {
                    Some(sx) => {
                        let time = match (sst_times.get(sx), offset.get_f64(sx * offset.row_len() + s)) {
                            (Some(&b), Some(o)) => Some(b + o.round() as i64),
                            _ => None,
                        };
                        (time, at("sstSeaSurfaceTemperature", sx))
                    }
                    None => (None, None),
                },
                None => (None, None),
            };

            out.push(LatestStation {
                site_label: labels.and_then(|a| a.get_str(s)).unwrap_or_default().to_string(),
                station_name: names.and_then(|a| a.get_str(s)).unwrap_or_default().to_string(),
                latitude: meta("metaLatitude"),
                longitude: meta("metaLongitude"),
                water_depth: meta("metaWaterDepth"),
                wave_time,
                wave_hs: at("waveHs", ix),
                wave_tp: at("waveTp", ix),
                wave_dp: at("waveDp", ix),
                sst_time,
                sst: sst_value,
            });
        }
        Ok(out)
    }
}

/// OR the pub-set exclusion mask into a time-by-station offset array,
/// element by element
fn or_flag_mask(
    offset: &mut MaskedArray,
    result: &RequestResult,
    primary: &str,
    secondary: &str,
    pub_set: PubSet,
) {
    let Some(primary) = result.get(primary) else {
        return;
    };
    let primary_vals: Vec<i64> = (0..primary.len())
        .map(|i| primary.values.get_i64(i).unwrap_or(0))
        .collect();
    let secondary_vals: Option<Vec<i64>> = result.get(secondary).map(|a| {
        (0..a.len())
            .map(|i| a.values.get_i64(i).unwrap_or(0))
            .collect()
    });
    let excluded = pub_set.row_mask(&primary_vals, secondary_vals.as_deref());
    for (slot, x) in offset.mask.iter_mut().zip(excluded) {
        *slot |= x;
    }
}

/// Last unmasked row per station column, `None` for all-masked columns
fn latest_indices(offset: &MaskedArray) -> Vec<Option<usize>> {
    let cols = offset.row_len();
    let rows = offset.rows();
    (0..cols)
        .map(|s| (0..rows).rev().find(|t| !offset.is_masked(t * cols + s)))
        .collect()
}

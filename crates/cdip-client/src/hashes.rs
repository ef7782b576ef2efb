//! Change tracking for the archive nc file inventory

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::http::DodsClient;

const HASHES_PATH: &str = "/data_access/metadata/wavecdf_by_datemod.txt";
const SNAPSHOT_FILE: &str = "nc_hashes.json";

/// The published hash inventory of archived nc files.
///
/// CDIP publishes a tab-separated table listing every archived nc file
/// with its current content hash. Comparing a freshly fetched table
/// against a locally saved snapshot tells a mirror which files to
/// refetch.
#[derive(Debug, Clone)]
pub struct NcHashes {
    hashes: BTreeMap<String, String>,
}

impl NcHashes {
    /// Fetch and parse the current inventory
    pub async fn load(client: &DodsClient) -> Result<NcHashes> {
        let url = format!("{}{}", client.cdip_domain(), HASHES_PATH);
        let body = client.get_text(&url).await?;
        let hashes = parse_inventory(&body);
        debug!(files = hashes.len(), "loaded nc hash inventory");
        Ok(NcHashes { hashes })
    }

    pub fn hashes(&self) -> &BTreeMap<String, String> {
        &self.hashes
    }

    /// Highest deployment suffix archived for a station, `d00` when none.
    ///
    /// Archive files are named `<stn>_dNN.nc`, so the suffixes order
    /// lexicographically.
    pub fn last_deployment(&self, stn: &str) -> String {
        let mut last = "d00";
        for name in self.hashes.keys() {
            if name.get(0..5) == Some(stn) && name.get(5..7) == Some("_d") {
                if let Some(dep) = name.get(6..9) {
                    if last < dep {
                        last = dep;
                    }
                }
            }
        }
        last.to_string()
    }

    /// Names of files that are new or whose hash differs from `old`
    pub fn changed(&self, old: &BTreeMap<String, String>) -> Vec<String> {
        self.hashes
            .iter()
            .filter(|&(name, hash)| old.get(name.as_str()) != Some(hash))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Compare against the snapshot saved under `dir`. Empty when no
    /// snapshot exists yet, so a first run never floods the caller.
    pub fn compare_snapshot(&self, dir: &Path) -> Result<Vec<String>> {
        match read_snapshot(dir)? {
            Some(old) => Ok(self.changed(&old)),
            None => Ok(Vec::new()),
        }
    }

    /// Persist the current table under `dir` for the next comparison
    pub fn save_snapshot(&self, dir: &Path) -> Result<()> {
        write_snapshot(dir, &self.hashes)
    }
}

/// Lines carry the filename in the first tab field and the hash in the
/// seventh; a header row starts with `filename`
fn parse_inventory(body: &str) -> BTreeMap<String, String> {
    let mut hashes = BTreeMap::new();
    for line in body.trim().lines() {
        if line.starts_with("filename") {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 7 {
            continue;
        }
        hashes.insert(fields[0].to_string(), fields[6].to_string());
    }
    hashes
}

fn read_snapshot(dir: &Path) -> Result<Option<BTreeMap<String, String>>> {
    let path = dir.join(SNAPSHOT_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let body = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&body)?))
}

fn write_snapshot(dir: &Path, hashes: &BTreeMap<String, String>) -> Result<()> {
    fs::create_dir_all(dir)?;
    let path = dir.join(SNAPSHOT_FILE);
    fs::write(&path, serde_json::to_vec_pretty(hashes)?)?;
    debug!(path = %path.display(), files = hashes.len(), "saved hash snapshot");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const INVENTORY: &str = "filename\tdate\tsize\ta\tb\tc\thash\n\
        100p1_d01.nc\t2024-01-02\t101\tx\tx\tx\taaa111\n\
        100p1_d02.nc\t2024-03-04\t102\tx\tx\tx\tbbb222\n\
        100p1_rt.nc\t2024-05-06\t103\tx\tx\tx\tccc333\n\
        201p1_d05.nc\t2023-07-08\t104\tx\tx\tx\tddd444\n\
        truncated\tline\n";

    fn inventory() -> NcHashes {
        NcHashes {
            hashes: parse_inventory(INVENTORY),
        }
    }

    #[test]
    fn test_parse_inventory_skips_header_and_short_lines() {
        let nc = inventory();
        assert_eq!(nc.hashes().len(), 4);
        assert_eq!(
            nc.hashes().get("100p1_d01.nc").map(String::as_str),
            Some("aaa111")
        );
        assert!(!nc.hashes().contains_key("filename"));
        assert!(!nc.hashes().contains_key("truncated"));
    }

    #[test]
    fn test_last_deployment() {
        let nc = inventory();
        assert_eq!(nc.last_deployment("100p1"), "d02");
        assert_eq!(nc.last_deployment("201p1"), "d05");
        // realtime-only station: no archive suffix yet
        assert_eq!(nc.last_deployment("999p9"), "d00");
    }

    #[test]
    fn test_changed_reports_new_and_differing() {
        let nc = inventory();
        let mut old = nc.hashes().clone();
        old.remove("201p1_d05.nc");
        old.insert("100p1_d02.nc".to_string(), "stale".to_string());
        assert_eq!(nc.changed(&old), vec!["100p1_d02.nc", "201p1_d05.nc"]);
        assert!(nc.changed(nc.hashes()).is_empty());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let nc = inventory();
        // nothing saved yet: the first comparison reports no changes
        assert_eq!(read_snapshot(dir.path()).unwrap(), None);
        assert!(nc.compare_snapshot(dir.path()).unwrap().is_empty());

        nc.save_snapshot(dir.path()).unwrap();
        assert_eq!(read_snapshot(dir.path()).unwrap().as_ref(), Some(nc.hashes()));
        assert!(nc.compare_snapshot(dir.path()).unwrap().is_empty());
    }
}

//! CDIP station number to WMO identifier mapping

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use tracing::debug;

use crate::error::Result;
use crate::http::DodsClient;

const WMO_IDS_PATH: &str = "/wmo_ids";

/// Lookup of the WMO identifiers NDBC assigns to CDIP stations.
///
/// The table at `cdip.ucsd.edu/wmo_ids` maps three-digit station numbers
/// to five-digit WMO ids. Model stations address external datasets by WMO
/// id rather than station number. Fetches are cached for an hour.
#[derive(Debug, Clone)]
pub struct WmoIds {
    client: DodsClient,
    cache: Cache<(), Arc<BTreeMap<String, String>>>,
}

impl WmoIds {
    pub fn new(client: &DodsClient) -> WmoIds {
        WmoIds {
            client: client.clone(),
            cache: Cache::builder()
                .time_to_live(Duration::from_secs(3600))
                .max_capacity(1)
                .build(),
        }
    }

    /// The full station number to WMO id table
    pub async fn table(&self) -> Result<Arc<BTreeMap<String, String>>> {
        if let Some(table) = self.cache.get(&()) {
            return Ok(table);
        }
        let url = format!("{}{}", self.client.cdip_domain(), WMO_IDS_PATH);
        let body = self.client.get_text(&url).await?;
        let table = Arc::new(parse_table(&body));
        debug!(entries = table.len(), "loaded wmo id table");
        self.cache.insert((), table.clone());
        Ok(table)
    }

    /// WMO id for a three-digit station number, `None` when unassigned
    pub async fn wmo_id(&self, stn: &str) -> Result<Option<String>> {
        Ok(self.table().await?.get(stn).cloned())
    }
}

/// Each line holds the station number in columns 0..3 and the WMO id from
/// column 5 on. Stations without an assignment are left out.
fn parse_table(body: &str) -> BTreeMap<String, String> {
    let mut ids = BTreeMap::new();
    for line in body.lines() {
        let Some(stn) = line.get(0..3) else { continue };
        let id = line.get(5..).unwrap_or("").trim();
        if id.is_empty() {
            continue;
        }
        ids.insert(stn.to_string(), id.to_string());
    }
    ids
}

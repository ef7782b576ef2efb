//! THREDDS catalog crawling
//!
//! The server publishes `catalog.xml` pages: a top catalog referencing the
//! `cdip/realtime` and `cdip/archive` catalogs, and under archive one more
//! catalog per station. Dataset entries carry a `urlPath` relative to the
//! OPeNDAP root. The pages use a handful of fixed elements, so a start-tag
//! scan is enough; tag and attribute names are matched by substring to stay
//! indifferent to namespace prefixes.

use futures::stream::{self, StreamExt, TryStreamExt};

use cdip_common::DODS_PATH;

use crate::error::Result;
use crate::http::DodsClient;
use crate::model::DatasetUrls;

/// Attribute values of matching start tags, in document order. A tag
/// matches when its name contains `tag`; within it, every attribute whose
/// name contains `attr` contributes its value.
pub fn scan_tag_attr(xml: &str, tag: &str, attr: &str) -> Vec<String> {
    let mut out = Vec::new();
    let bytes = xml.as_bytes();
    let mut i = 0;
    while let Some(open) = xml[i..].find('<') {
        let start = i + open + 1;
        if xml[start..].starts_with("!--") {
            match xml[start..].find("-->") {
                Some(end) => {
                    i = start + end + 3;
                    continue;
                }
                None => break,
            }
        }
        let mut j = start;
        let mut quote: Option<u8> = None;
        while j < bytes.len() {
            match (quote, bytes[j]) {
                (Some(q), c) if c == q => quote = None,
                (None, b'"') | (None, b'\'') => quote = Some(bytes[j]),
                (None, b'>') => break,
                _ => {}
            }
            j += 1;
        }
        if j >= bytes.len() {
            break;
        }
        let body = &xml[start..j];
        i = j + 1;
        if body.starts_with(['/', '!', '?']) {
            continue;
        }
        let body = body.strip_suffix('/').unwrap_or(body);
        let (name, rest) = match body.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest),
            None => (body, ""),
        };
        if !name.contains(tag) {
            continue;
        }
        for (attr_name, value) in parse_attrs(rest) {
            if attr_name.contains(attr) {
                out.push(value.to_string());
            }
        }
    }
    out
}

fn parse_attrs(mut rest: &str) -> Vec<(&str, &str)> {
    let mut attrs = Vec::new();
    while let Some(eq) = rest.find('=') {
        let name = rest[..eq].trim();
        let after = rest[eq + 1..].trim_start();
        let Some(q) = after.chars().next().filter(|c| *c == '"' || *c == '\'') else {
            break;
        };
        let after = &after[1..];
        let Some(close) = after.find(q) else {
            break;
        };
        attrs.push((name, &after[..close]));
        rest = &after[close + 1..];
    }
    attrs
}

/// Dataset urlPaths of one catalog page turned into OPeNDAP urls. Paths
/// begin `cdip/`, which the page-relative part repeats.
fn dods_urls_from_catalog(domain: &str, xml: &str) -> Vec<String> {
    scan_tag_attr(xml, "dataset", "urlPath")
        .iter()
        .filter_map(|path| path.get(5..))
        .map(|rest| format!("{domain}/{DODS_PATH}/cdip/{rest}"))
        .collect()
}

/// Crawl the server catalog for every realtime and archive dataset url.
///
/// The archive side holds one sub-catalog per station; those pages are
/// fetched a few at a time.
pub async fn dataset_urls(client: &DodsClient) -> Result<DatasetUrls> {
    let domain = client.thredds_domain();
    let top = client
        .get_text(&format!("{domain}/thredds/catalog.xml"))
        .await?;

    let mut urls = DatasetUrls::default();
    for href in scan_tag_attr(&top, "catalogRef", "href") {
        if !href.contains("archive") && !href.contains("realtime") {
            continue;
        }
        let catalog_url = format!("{domain}{href}");
        let text = client.get_text(&catalog_url).await?;
        if href.contains("archive") {
            let base = match catalog_url.rsplit_once('/') {
                Some((base, _)) => base.to_string(),
                None => catalog_url.clone(),
            };
            let pages: Vec<String> = stream::iter(
                scan_tag_attr(&text, "catalogRef", "href")
                    .into_iter()
                    .map(|sub| {
                        let url = format!("{base}/{sub}");
                        async move { client.get_text(&url).await }
                    }),
            )
            .buffered(8)
            .try_collect()
            .await?;
            for page in &pages {
                urls.archive.extend(dods_urls_from_catalog(domain, page));
            }
        } else {
            urls.realtime.extend(dods_urls_from_catalog(domain, &text));
        }
    }
    Ok(urls)
}

/// Three-digit station numbers with a realtime file on the server, sorted
/// and deduplicated
pub async fn realtime_stations(client: &DodsClient) -> Result<Vec<String>> {
    let domain = client.thredds_domain();
    let text = client
        .get_text(&format!(
            "{domain}/thredds/catalog/cdip/realtime/catalog.xml"
        ))
        .await?;

    let mut stations = Vec::new();
    for path in scan_tag_attr(&text, "dataset", "urlPath") {
        let name = path.rsplit('/').next().unwrap_or(&path);
        // station files only; the realtime catalog also lists
        // latest_3day.nc
        let stn = name
            .strip_suffix("_rt.nc")
            .or_else(|| name.strip_suffix("_xy.nc"))
            .and_then(|s| s.get(0..3));
        if let Some(stn) = stn {
            stations.push(stn.to_string());
        }
    }
    stations.sort();
    stations.dedup();
    Ok(stations)
}

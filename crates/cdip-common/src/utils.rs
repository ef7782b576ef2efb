//! Station-id validation and local snapshot paths

use std::env;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

/// Full station ids look like `100p1`: three digits, `p`, one digit
static STATION_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{3}p\d$").expect("Invalid regex pattern"));

/// Bare three-digit station numbers, e.g. `100`
static STATION_NUMBER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{3}$").expect("Invalid regex pattern"));

/// True when `s` is a fully qualified station id such as `100p1`
pub fn is_station_id(s: &str) -> bool {
    STATION_ID_PATTERN.is_match(s)
}

/// Qualify a bare station number with the default `p1` data-set suffix.
///
/// `100` becomes `100p1`; anything already qualified (or unrecognized) is
/// passed through unchanged.
pub fn qualify_station(s: &str) -> String {
    if STATION_NUMBER_PATTERN.is_match(s) {
        format!("{s}p1")
    } else {
        s.to_string()
    }
}

/// Directory for locally persisted snapshots such as the file-hash table.
///
/// Resolution order: `CDIP_SNAPSHOT_PATH`, then `$HOME/.cdip`, then `.cdip`
/// under the working directory.
pub fn snapshot_dir() -> PathBuf {
    if let Ok(dir) = env::var("CDIP_SNAPSHOT_PATH") {
        return PathBuf::from(dir);
    }
    match env::var("HOME") {
        Ok(home) => Path::new(&home).join(".cdip"),
        Err(_) => PathBuf::from(".cdip"),
    }
}

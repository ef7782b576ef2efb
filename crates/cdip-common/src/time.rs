//! Time conversions and timestamp-array helpers
//!
//! All CDIP data times are UTC epoch seconds. This module converts between
//! `chrono` datetimes, the `"%Y-%m-%d %H:%M:%S"` strings accepted by request
//! builders, and the compact `YYYYMMDDHHMMSS` datestrings used in CDIP file
//! and product names. It also carries the interval arithmetic used when
//! resolving "n records around a target time" requests.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::{CdipError, Result};

/// Datetime format accepted wherever a request takes a string time
pub const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// Format used by netCDF global attributes such as `date_modified`
pub const NC_ATTR_FMT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Convert a datetime to Unix seconds
pub fn to_stamp(dt: DateTime<Utc>) -> i64 {
    dt.timestamp()
}

/// Convert Unix seconds to a datetime
pub fn from_stamp(stamp: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(stamp, 0).unwrap_or(DateTime::UNIX_EPOCH)
}

/// Parse a `"%Y-%m-%d %H:%M:%S"` string as UTC
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, DATETIME_FMT)
        .map(|n| n.and_utc())
        .map_err(|_| CdipError::DatetimeParse(s.to_string()))
}

/// Parse a netCDF attribute datetime (`%Y-%m-%dT%H:%M:%SZ`)
pub fn parse_nc_attr_datetime(s: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, NC_ATTR_FMT)
        .map(|n| n.and_utc())
        .map_err(|_| CdipError::DatetimeParse(s.to_string()))
}

/// Parse a CDIP compact datestring.
///
/// Datestrings are `YYYYMMDDHHMMSS` truncated at any even length between 4
/// and 14; omitted fields default to the start of the period (`"2016"` is
/// 2016-01-01 00:00:00, `"20160803"` is 2016-08-03 00:00:00).
pub fn parse_datestring(s: &str) -> Result<DateTime<Utc>> {
    let len = s.len();
    if !(4..=14).contains(&len) || len % 2 != 0 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CdipError::DatetimeParse(s.to_string()));
    }
    let field = |from: usize, to: usize, default: u32| -> u32 {
        if len >= to {
            s[from..to].parse().unwrap_or(default)
        } else {
            default
        }
    };
    let year: i32 = s[0..4]
        .parse()
        .map_err(|_| CdipError::DatetimeParse(s.to_string()))?;
    let date = NaiveDate::from_ymd_opt(year, field(4, 6, 1), field(6, 8, 1))
        .and_then(|d| d.and_hms_opt(field(8, 10, 0), field(10, 12, 0), field(12, 14, 0)))
        .ok_or_else(|| CdipError::DatetimeParse(s.to_string()))?;
    Ok(date.and_utc())
}

/// Format a datetime as a full 14-digit CDIP datestring
pub fn format_datestring(dt: DateTime<Utc>) -> String {
    dt.format("%Y%m%d%H%M%S").to_string()
}

/// Which end of a stamp array an interval request ran off, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsExceeded {
    Left,
    Within,
    Right,
}

/// A `[start, end]` stamp interval extracted from an ordered array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StampInterval {
    pub start: i64,
    pub end: i64,
    pub bounds: BoundsExceeded,
}

/// Return whichever of `i1`, `i2` indexes the stamp closest to `target`
/// (ties go to `i1`)
pub fn closest_index(i1: usize, i2: usize, stamps: &[i64], target: i64) -> usize {
    if (stamps[i1] - target).abs() <= (stamps[i2] - target).abs() {
        i1
    } else {
        i2
    }
}

/// Extract the interval covering `n` records to the right (`n >= 0`) or left
/// (`n < 0`) of index `i`, clamped to the array, noting when `i + n` fell off
/// either end.
pub fn interval_around(stamps: &[i64], i: usize, n: i64) -> StampInterval {
    let last = stamps.len() as i64 - 1;
    let i = i as i64;
    let bounds = if i + n > last {
        BoundsExceeded::Right
    } else if i + n < 0 {
        BoundsExceeded::Left
    } else {
        BoundsExceeded::Within
    };
    let (start, end) = if n >= 0 {
        (stamps[i as usize], stamps[(i + n).min(last) as usize])
    } else {
        (stamps[(i + n).max(0) as usize], stamps[i as usize])
    };
    StampInterval { start, end, bounds }
}

/// Join two intervals taken from adjacent files into one span
pub fn combine_intervals(older: StampInterval, newer: StampInterval) -> (i64, i64) {
    (older.start, newer.end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_round_trip() {
        let dt = parse_datetime("2016-08-01 12:30:00").unwrap();
        assert_eq!(from_stamp(to_stamp(dt)), dt);
    }

    #[test]
    fn test_parse_datetime_rejects_garbage() {
        assert!(parse_datetime("2016-08-01").is_err());
        assert!(parse_datetime("not a date").is_err());
    }

    #[test]
    fn test_parse_nc_attr_datetime() {
        let dt = parse_nc_attr_datetime("2020-03-04T05:06:07Z").unwrap();
        assert_eq!(to_stamp(dt), 1583298367);
    }

    #[test]
    fn test_parse_datestring_lengths() {
        assert_eq!(
            parse_datestring("2016").unwrap(),
            parse_datetime("2016-01-01 00:00:00").unwrap()
        );
        assert_eq!(
            parse_datestring("201608").unwrap(),
            parse_datetime("2016-08-01 00:00:00").unwrap()
        );
        assert_eq!(
            parse_datestring("20160803").unwrap(),
            parse_datetime("2016-08-03 00:00:00").unwrap()
        );
        assert_eq!(
            parse_datestring("20160803123456").unwrap(),
            parse_datetime("2016-08-03 12:34:56").unwrap()
        );
    }

    #[test]
    fn test_parse_datestring_rejects_bad_input() {
        // Odd length, too short, too long, non-digits
        assert!(parse_datestring("20165").is_err());
        assert!(parse_datestring("20").is_err());
        assert!(parse_datestring("2016080312345678").is_err());
        assert!(parse_datestring("2016x8").is_err());
    }

    #[test]
    fn test_format_datestring() {
        let dt = parse_datetime("2016-08-03 12:34:56").unwrap();
        assert_eq!(format_datestring(dt), "20160803123456");
    }

    #[test]
    fn test_closest_index_prefers_nearer() {
        let stamps = [100, 200];
        assert_eq!(closest_index(0, 1, &stamps, 120), 0);
        assert_eq!(closest_index(0, 1, &stamps, 180), 1);
        // Tie goes to the first index
        assert_eq!(closest_index(0, 1, &stamps, 150), 0);
    }

    #[test]
    fn test_interval_around_forward() {
        let stamps = [10, 20, 30, 40];
        let iv = interval_around(&stamps, 1, 2);
        assert_eq!((iv.start, iv.end), (20, 40));
        assert_eq!(iv.bounds, BoundsExceeded::Within);
    }

    #[test]
    fn test_interval_around_backward_clamps() {
        let stamps = [10, 20, 30, 40];
        let iv = interval_around(&stamps, 1, -3);
        assert_eq!((iv.start, iv.end), (10, 20));
        assert_eq!(iv.bounds, BoundsExceeded::Left);
    }

    #[test]
    fn test_interval_around_right_overrun() {
        let stamps = [10, 20, 30];
        let iv = interval_around(&stamps, 2, 5);
        assert_eq!((iv.start, iv.end), (30, 30));
        assert_eq!(iv.bounds, BoundsExceeded::Right);
    }

    #[test]
    fn test_combine_intervals() {
        let older = interval_around(&[10, 20], 1, -1);
        let newer = interval_around(&[30, 40], 0, 1);
        assert_eq!(combine_intervals(older, newer), (10, 40));
    }
}

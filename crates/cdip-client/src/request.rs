//! Request parameters for station data fetches

use chrono::Utc;

use crate::flags::PubSet;

/// Earliest stamp any station file can cover, 1975-01-01T00:00:00Z
pub const EARLIEST_STAMP: i64 = 157_766_400;

/// What to fetch from one netCDF file
#[derive(Debug, Clone)]
pub struct DataRequest {
    /// Inclusive span start, unix stamp
    pub start: i64,
    /// Inclusive span end, unix stamp
    pub end: i64,
    pub vars: Vec<String>,
    pub pub_set: PubSet,
    /// When false, rows outside the pub set stay in place instead of being
    /// dropped
    pub apply_mask: bool,
}

impl Default for DataRequest {
    fn default() -> Self {
        Self {
            start: EARLIEST_STAMP,
            end: Utc::now().timestamp(),
            vars: vec!["waveHs".to_string()],
            pub_set: PubSet::default(),
            apply_mask: true,
        }
    }
}

impl DataRequest {
    pub fn new(start: i64, end: i64, vars: &[&str]) -> Self {
        Self {
            start,
            end,
            vars: vars.iter().map(|v| v.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn with_span(mut self, start: i64, end: i64) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn with_vars<I, S>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vars = vars.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_pub_set(mut self, pub_set: PubSet) -> Self {
        self.pub_set = pub_set;
        self
    }

    pub fn with_apply_mask(mut self, apply_mask: bool) -> Self {
        self.apply_mask = apply_mask;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_request() {
        let req = DataRequest::default();
        assert_eq!(req.start, EARLIEST_STAMP);
        assert_eq!(req.vars, vec!["waveHs".to_string()]);
        assert_eq!(req.pub_set, PubSet::PublicGood);
        assert!(req.apply_mask);
    }

    #[test]
    fn test_builder() {
        let req = DataRequest::new(100, 200, &["waveHs", "waveTp"])
            .with_pub_set(PubSet::BothAll)
            .with_apply_mask(false);
        assert_eq!(req.end, 200);
        assert_eq!(req.vars.len(), 2);
        assert!(!req.apply_mask);
    }
}

//! Inclusive timespan used for overlap checks between requests and files

/// An inclusive `[start, end]` span of Unix seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timespan {
    pub start: i64,
    pub end: i64,
}

impl Timespan {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// True when the two spans share at least one second
    pub fn overlaps(&self, other: &Timespan) -> bool {
        self.start <= other.end && self.end >= other.start
    }
}

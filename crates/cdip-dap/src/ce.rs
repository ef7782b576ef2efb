//! Constraint expressions for `.dods` requests
//!
//! A projection like `waveHs[301:1:456],waveTime[301:1:456]` asks the server
//! to subset the named variables before encoding, so a request for a week of
//! data never transfers a full deployment.

use std::fmt;

/// An inclusive `[start:stride:end]` hyperslab on one dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slice {
    pub start: usize,
    pub stride: usize,
    pub end: usize,
}

impl Slice {
    /// Inclusive index range with stride 1
    pub fn range(start: usize, end: usize) -> Self {
        Self {
            start,
            stride: 1,
            end,
        }
    }

    /// A single index
    pub fn index(i: usize) -> Self {
        Self::range(i, i)
    }

    pub fn len(&self) -> usize {
        if self.end < self.start {
            0
        } else {
            (self.end - self.start) / self.stride + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}:{}]", self.start, self.stride, self.end)
    }
}

/// A projection-only constraint expression
#[derive(Debug, Clone, Default)]
pub struct ConstraintExpr {
    projections: Vec<(String, Vec<Slice>)>,
}

impl ConstraintExpr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Project a whole variable
    pub fn var(mut self, name: &str) -> Self {
        self.projections.push((name.to_string(), Vec::new()));
        self
    }

    /// Project a variable subset by the given hyperslabs, one per dimension
    pub fn var_sliced(mut self, name: &str, slices: &[Slice]) -> Self {
        self.projections.push((name.to_string(), slices.to_vec()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.projections.is_empty()
    }

    /// Render as the query string that follows `.dods?`
    pub fn to_query(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ConstraintExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, slices)) in self.projections.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{name}")?;
            for s in slices {
                write!(f, "{s}")?;
            }
        }
        Ok(())
    }
}

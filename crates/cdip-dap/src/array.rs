//! Decoded data arrays and fill-value masking

use serde::ser::{Serialize, SerializeSeq, Serializer};

use crate::dds::DapDim;
use crate::types::DapType;

/// Element storage for one decoded variable
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayValues {
    Byte(Vec<u8>),
    Int16(Vec<i16>),
    UInt16(Vec<u16>),
    Int32(Vec<i32>),
    UInt32(Vec<u32>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Text(Vec<String>),
}

impl ArrayValues {
    pub fn len(&self) -> usize {
        match self {
            ArrayValues::Byte(v) => v.len(),
            ArrayValues::Int16(v) => v.len(),
            ArrayValues::UInt16(v) => v.len(),
            ArrayValues::Int32(v) => v.len(),
            ArrayValues::UInt32(v) => v.len(),
            ArrayValues::Float32(v) => v.len(),
            ArrayValues::Float64(v) => v.len(),
            ArrayValues::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element `i` coerced to f64; `None` for text
    pub fn get_f64(&self, i: usize) -> Option<f64> {
        match self {
            ArrayValues::Byte(v) => v.get(i).map(|&x| f64::from(x)),
            ArrayValues::Int16(v) => v.get(i).map(|&x| f64::from(x)),
            ArrayValues::UInt16(v) => v.get(i).map(|&x| f64::from(x)),
            ArrayValues::Int32(v) => v.get(i).map(|&x| f64::from(x)),
            ArrayValues::UInt32(v) => v.get(i).map(|&x| f64::from(x)),
            ArrayValues::Float32(v) => v.get(i).map(|&x| f64::from(x)),
            ArrayValues::Float64(v) => v.get(i).copied(),
            ArrayValues::Text(_) => None,
        }
    }

    /// Element `i` as an integer; `None` for floats and text
    pub fn get_i64(&self, i: usize) -> Option<i64> {
        match self {
            ArrayValues::Byte(v) => v.get(i).map(|&x| i64::from(x)),
            ArrayValues::Int16(v) => v.get(i).map(|&x| i64::from(x)),
            ArrayValues::UInt16(v) => v.get(i).map(|&x| i64::from(x)),
            ArrayValues::Int32(v) => v.get(i).map(|&x| i64::from(x)),
            ArrayValues::UInt32(v) => v.get(i).map(|&x| i64::from(x)),
            _ => None,
        }
    }

    pub fn get_str(&self, i: usize) -> Option<&str> {
        match self {
            ArrayValues::Text(v) => v.get(i).map(String::as_str),
            _ => None,
        }
    }
}

/// One decoded variable with its constrained shape
#[derive(Debug, Clone, PartialEq)]
pub struct DataArray {
    pub name: String,
    pub dtype: DapType,
    pub dims: Vec<DapDim>,
    pub values: ArrayValues,
}

impl DataArray {
    pub fn shape(&self) -> Vec<usize> {
        self.dims.iter().map(|d| d.size).collect()
    }
}

/// A decoded variable paired with a validity mask.
///
/// `mask[i]` true means element `i` is invalid: it matched the variable's
/// `_FillValue` or was masked out by a publication flag. Rows of 2-d arrays
/// are masked and compressed as units along the leading dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedArray {
    pub dtype: DapType,
    pub shape: Vec<usize>,
    pub values: ArrayValues,
    pub mask: Vec<bool>,
}

impl MaskedArray {
    /// Wrap a decoded array, masking elements equal to `fill` when given.
    ///
    /// `Float32` data compares against the fill narrowed to f32, since the
    /// DAS prints more digits than the stored 32-bit value carries. A NaN
    /// fill masks NaN elements.
    pub fn from_array(arr: DataArray, fill: Option<f64>) -> MaskedArray {
        let n = arr.values.len();
        let mask = match fill {
            None => vec![false; n],
            Some(fill) => match &arr.values {
                ArrayValues::Float32(v) => {
                    let f = fill as f32;
                    v.iter().map(|&x| x == f || (f.is_nan() && x.is_nan())).collect()
                }
                ArrayValues::Float64(v) => v
                    .iter()
                    .map(|&x| x == fill || (fill.is_nan() && x.is_nan()))
                    .collect(),
                ArrayValues::Text(_) => vec![false; n],
                other => (0..n)
                    .map(|i| other.get_f64(i).is_some_and(|x| x == fill))
                    .collect(),
            },
        };
        MaskedArray {
            dtype: arr.dtype,
            shape: arr.shape(),
            values: arr.values,
            mask,
        }
    }

    pub fn unmasked(arr: DataArray) -> MaskedArray {
        Self::from_array(arr, None)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Row count along the leading dimension (scalars count their elements)
    pub fn rows(&self) -> usize {
        match self.shape.first() {
            Some(&n) => n,
            None => self.values.len(),
        }
    }

    /// Elements per row
    pub fn row_len(&self) -> usize {
        if self.shape.len() > 1 {
            self.shape[1..].iter().product()
        } else {
            1
        }
    }

    pub fn is_masked(&self, i: usize) -> bool {
        self.mask.get(i).copied().unwrap_or(true)
    }

    /// Element `i` as f64, `None` when masked or text
    pub fn get_f64(&self, i: usize) -> Option<f64> {
        if self.is_masked(i) {
            None
        } else {
            self.values.get_f64(i)
        }
    }

    /// Element `i` as integer, `None` when masked, float, or text
    pub fn get_i64(&self, i: usize) -> Option<i64> {
        if self.is_masked(i) {
            None
        } else {
            self.values.get_i64(i)
        }
    }

    pub fn get_str(&self, i: usize) -> Option<&str> {
        if self.is_masked(i) {
            None
        } else {
            self.values.get_str(i)
        }
    }

    /// OR a per-row mask into this array, spreading it across row elements
    pub fn or_row_mask(&mut self, rows_masked: &[bool]) {
        let row_len = self.row_len();
        for (r, &m) in rows_masked.iter().enumerate() {
            if m {
                let lo = r * row_len;
                for slot in self.mask.iter_mut().skip(lo).take(row_len) {
                    *slot = true;
                }
            }
        }
    }

    /// Concatenate `other` after this array along the leading dimension.
    ///
    /// Returns false without modifying anything when the dtypes, ranks, or
    /// row widths differ.
    pub fn append(&mut self, other: MaskedArray) -> bool {
        if self.dtype != other.dtype
            || self.shape.is_empty()
            || self.shape.len() != other.shape.len()
            || self.row_len() != other.row_len()
        {
            return false;
        }
        match (&mut self.values, other.values) {
            (ArrayValues::Byte(a), ArrayValues::Byte(b)) => a.extend(b),
            (ArrayValues::Int16(a), ArrayValues::Int16(b)) => a.extend(b),
            (ArrayValues::UInt16(a), ArrayValues::UInt16(b)) => a.extend(b),
            (ArrayValues::Int32(a), ArrayValues::Int32(b)) => a.extend(b),
            (ArrayValues::UInt32(a), ArrayValues::UInt32(b)) => a.extend(b),
            (ArrayValues::Float32(a), ArrayValues::Float32(b)) => a.extend(b),
            (ArrayValues::Float64(a), ArrayValues::Float64(b)) => a.extend(b),
            (ArrayValues::Text(a), ArrayValues::Text(b)) => a.extend(b),
            _ => return false,
        }
        self.mask.extend(other.mask);
        self.shape[0] += other.shape.first().copied().unwrap_or(0);
        true
    }

    /// Drop every row whose entry in `rows_masked` is true
    pub fn compress_rows(&self, rows_masked: &[bool]) -> MaskedArray {
        let row_len = self.row_len().max(1);
        let keep = |flat: usize| !rows_masked.get(flat / row_len).copied().unwrap_or(false);
        let kept_rows = rows_masked.iter().filter(|&&m| !m).count();

        let mut shape = self.shape.clone();
        if let Some(first) = shape.first_mut() {
            *first = kept_rows;
        }
        let mask = self
            .mask
            .iter()
            .enumerate()
            .filter(|(i, _)| keep(*i))
            .map(|(_, &m)| m)
            .collect();

        fn filter<T: Clone>(vals: &[T], keep: impl Fn(usize) -> bool) -> Vec<T> {
            vals.iter()
                .enumerate()
                .filter(|(i, _)| keep(*i))
                .map(|(_, v)| v.clone())
                .collect()
        }
        let values = match &self.values {
            ArrayValues::Byte(v) => ArrayValues::Byte(filter(v, keep)),
            ArrayValues::Int16(v) => ArrayValues::Int16(filter(v, keep)),
            ArrayValues::UInt16(v) => ArrayValues::UInt16(filter(v, keep)),
            ArrayValues::Int32(v) => ArrayValues::Int32(filter(v, keep)),
            ArrayValues::UInt32(v) => ArrayValues::UInt32(filter(v, keep)),
            ArrayValues::Float32(v) => ArrayValues::Float32(filter(v, keep)),
            ArrayValues::Float64(v) => ArrayValues::Float64(filter(v, keep)),
            ArrayValues::Text(v) => ArrayValues::Text(filter(v, keep)),
        };

        MaskedArray {
            dtype: self.dtype,
            shape,
            values,
            mask,
        }
    }
}

struct Elem<'a> {
    arr: &'a MaskedArray,
    i: usize,
}

impl Serialize for Elem<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.arr.is_masked(self.i) {
            return serializer.serialize_none();
        }
        match &self.arr.values {
            ArrayValues::Byte(v) => serializer.serialize_u8(v[self.i]),
            ArrayValues::Int16(v) => serializer.serialize_i16(v[self.i]),
            ArrayValues::UInt16(v) => serializer.serialize_u16(v[self.i]),
            ArrayValues::Int32(v) => serializer.serialize_i32(v[self.i]),
            ArrayValues::UInt32(v) => serializer.serialize_u32(v[self.i]),
            ArrayValues::Float32(v) if v[self.i].is_nan() => serializer.serialize_none(),
            ArrayValues::Float32(v) => serializer.serialize_f32(v[self.i]),
            ArrayValues::Float64(v) if v[self.i].is_nan() => serializer.serialize_none(),
            ArrayValues::Float64(v) => serializer.serialize_f64(v[self.i]),
            ArrayValues::Text(v) => serializer.serialize_str(&v[self.i]),
        }
    }
}

struct Row<'a> {
    arr: &'a MaskedArray,
    row: usize,
}

impl Serialize for Row<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let row_len = self.arr.row_len();
        let mut seq = serializer.serialize_seq(Some(row_len))?;
        for i in self.row * row_len..(self.row + 1) * row_len {
            seq.serialize_element(&Elem { arr: self.arr, i })?;
        }
        seq.end()
    }
}

/// Masked elements serialize as `null`; 2-d arrays nest one sequence per row
impl Serialize for MaskedArray {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.shape.len() > 1 {
            let rows = self.rows();
            let mut seq = serializer.serialize_seq(Some(rows))?;
            for row in 0..rows {
                seq.serialize_element(&Row { arr: self, row })?;
            }
            seq.end()
        } else {
            let n = self.len();
            let mut seq = serializer.serialize_seq(Some(n))?;
            for i in 0..n {
                seq.serialize_element(&Elem { arr: self, i })?;
            }
            seq.end()
        }
    }
}

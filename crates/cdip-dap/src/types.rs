//! Atomic DAP2 data types

use std::fmt;
use std::str::FromStr;

use crate::error::DapError;

/// The atomic types a DAP2 variable or attribute can carry.
///
/// netCDF `char` variables appear as `String` in DAP responses, with the
/// trailing character dimension folded into the string value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DapType {
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float32,
    Float64,
    String,
    Url,
}

impl DapType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DapType::Byte => "Byte",
            DapType::Int16 => "Int16",
            DapType::UInt16 => "UInt16",
            DapType::Int32 => "Int32",
            DapType::UInt32 => "UInt32",
            DapType::Float32 => "Float32",
            DapType::Float64 => "Float64",
            DapType::String => "String",
            DapType::Url => "Url",
        }
    }

    /// Bytes one element occupies in the XDR stream.
    ///
    /// XDR widens 16-bit integers to 32 bits; bytes are packed (the stream
    /// pads the packed run to a 4-byte boundary). Strings are variable-width
    /// and return 1 here, the minimum an element can occupy.
    pub fn xdr_width(&self) -> usize {
        match self {
            DapType::Byte | DapType::String | DapType::Url => 1,
            DapType::Float64 => 8,
            _ => 4,
        }
    }
}

impl fmt::Display for DapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DapType {
    type Err = DapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "byte" => Ok(DapType::Byte),
            "int16" => Ok(DapType::Int16),
            "uint16" => Ok(DapType::UInt16),
            "int32" => Ok(DapType::Int32),
            "uint32" => Ok(DapType::UInt32),
            "float32" => Ok(DapType::Float32),
            "float64" => Ok(DapType::Float64),
            "string" => Ok(DapType::String),
            "url" => Ok(DapType::Url),
            _ => Err(DapError::UnknownType(s.to_string())),
        }
    }
}

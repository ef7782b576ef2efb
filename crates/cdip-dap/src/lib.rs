//! CDIP DAP - Client-side DAP2 (OPeNDAP) protocol support
//!
//! THREDDS serves each CDIP netCDF file through three DAP2 responses: the
//! dataset descriptor (`.dds`, variable names, types, and shapes), the
//! attribute structure (`.das`, per-variable and global attributes), and the
//! data response (`.dods`, a constrained DDS header followed by XDR-encoded
//! binary). This crate parses all three and builds the constraint
//! expressions used to subset variables server-side.

pub mod array;
pub mod ce;
pub mod das;
pub mod dds;
pub mod dods;
pub mod error;
mod lex;
pub mod types;
pub mod xdr;

pub use array::{ArrayValues, DataArray, MaskedArray};
pub use ce::{ConstraintExpr, Slice};
pub use das::{AttrValue, Das};
pub use dds::{DapDim, DapVar, Dds};
pub use dods::{parse_dods, DodsResponse};
pub use error::DapError;
pub use types::DapType;

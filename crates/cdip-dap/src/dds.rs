//! Dataset descriptor structure (`.dds`) parsing
//!
//! A DDS names every variable in the dataset with its type and shape:
//!
//! ```text
//! Dataset {
//!     Float64 waveTime[waveTime = 26316];
//!     Byte waveFlagPrimary[waveTime = 26316];
//!     Grid {
//!      ARRAY:
//!         Float32 waveEnergyDensity[waveTime = 26316][waveFrequency = 64];
//!      MAPS:
//!         Float64 waveTime[waveTime = 26316];
//!         Float32 waveFrequency[waveFrequency = 64];
//!     } waveEnergyDensity;
//! } cdip/realtime/100p1_rt.nc;
//! ```
//!
//! The same grammar describes the header of a `.dods` response, where the
//! dimension sizes reflect the constraint the request carried.

use crate::error::{DapError, Result};
use crate::lex::{Token, TokenStream};
use crate::types::DapType;

/// A named dimension with its (possibly constrained) size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DapDim {
    pub name: String,
    pub size: usize,
}

/// One variable declaration.
///
/// Grids carry their map vectors in `maps`; for plain arrays and scalars
/// `maps` is empty. A variable with no dimensions is a scalar, which matters
/// to the XDR decoder because scalars are sent without a length prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct DapVar {
    pub name: String,
    pub dtype: DapType,
    pub dims: Vec<DapDim>,
    pub maps: Vec<DapVar>,
}

impl DapVar {
    pub fn is_grid(&self) -> bool {
        !self.maps.is_empty()
    }

    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }

    /// Total element count across all dimensions
    pub fn len(&self) -> usize {
        self.dims.iter().map(|d| d.size).product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn shape(&self) -> Vec<usize> {
        self.dims.iter().map(|d| d.size).collect()
    }
}

/// A parsed dataset descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct Dds {
    /// Dataset name, usually the server-side file path
    pub name: String,
    /// Top-level variables in declaration order
    pub vars: Vec<DapVar>,
}

impl Dds {
    pub fn parse(text: &str) -> Result<Dds> {
        let mut ts = TokenStream::new(text);
        let kw = ts.word().map_err(DapError::DdsParse)?;
        if !kw.eq_ignore_ascii_case("dataset") {
            return Err(DapError::DdsParse(format!(
                "expected 'Dataset', found '{kw}'"
            )));
        }
        ts.expect(&Token::LBrace).map_err(DapError::DdsParse)?;
        let vars = parse_decls(&mut ts)?;
        let name = ts.word_or_quoted().map_err(DapError::DdsParse)?;
        ts.expect(&Token::Semi).map_err(DapError::DdsParse)?;
        Ok(Dds { name, vars })
    }

    pub fn var(&self, name: &str) -> Option<&DapVar> {
        self.vars.iter().find(|v| v.name == name)
    }
}

/// Parse declarations up to and including the closing brace
fn parse_decls(ts: &mut TokenStream) -> Result<Vec<DapVar>> {
    let mut vars = Vec::new();
    loop {
        match ts.peek() {
            Some(Token::RBrace) => {
                ts.next().map_err(DapError::DdsParse)?;
                return Ok(vars);
            }
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("grid") => {
                vars.push(parse_grid(ts)?);
            }
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("structure") => {
                vars.extend(parse_structure(ts)?);
            }
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("sequence") => {
                return Err(DapError::Unsupported(w.clone()));
            }
            Some(Token::Word(_)) => vars.push(parse_atomic(ts)?),
            other => {
                return Err(DapError::DdsParse(format!(
                    "expected declaration, found {other:?}"
                )));
            }
        }
    }
}

/// Parse `Type name[dim = n]...;`
fn parse_atomic(ts: &mut TokenStream) -> Result<DapVar> {
    let dtype: DapType = ts.word().map_err(DapError::DdsParse)?.parse()?;
    let name = ts.word().map_err(DapError::DdsParse)?;
    let mut dims = Vec::new();
    while ts.eat(&Token::LBracket) {
        let first = ts.word().map_err(DapError::DdsParse)?;
        let dim = if ts.eat(&Token::Eq) {
            let size = ts.word().map_err(DapError::DdsParse)?;
            DapDim {
                name: first,
                size: parse_size(&size)?,
            }
        } else {
            DapDim {
                name: String::new(),
                size: parse_size(&first)?,
            }
        };
        ts.expect(&Token::RBracket).map_err(DapError::DdsParse)?;
        dims.push(dim);
    }
    ts.expect(&Token::Semi).map_err(DapError::DdsParse)?;
    Ok(DapVar {
        name,
        dtype,
        dims,
        maps: Vec::new(),
    })
}

/// Parse `Structure { ... } name;`, flattening its members into the
/// surrounding scope
fn parse_structure(ts: &mut TokenStream) -> Result<Vec<DapVar>> {
    ts.word().map_err(DapError::DdsParse)?;
    ts.expect(&Token::LBrace).map_err(DapError::DdsParse)?;
    let vars = parse_decls(ts)?;
    ts.word().map_err(DapError::DdsParse)?;
    ts.expect(&Token::Semi).map_err(DapError::DdsParse)?;
    Ok(vars)
}

/// Parse `Grid { ARRAY: ... MAPS: ... } name;`
fn parse_grid(ts: &mut TokenStream) -> Result<DapVar> {
    ts.word().map_err(DapError::DdsParse)?;
    ts.expect(&Token::LBrace).map_err(DapError::DdsParse)?;
    let marker = ts.word().map_err(DapError::DdsParse)?;
    if !marker.eq_ignore_ascii_case("array:") {
        return Err(DapError::DdsParse(format!(
            "expected 'ARRAY:' in grid, found '{marker}'"
        )));
    }
    let array_part = parse_atomic(ts)?;
    let marker = ts.word().map_err(DapError::DdsParse)?;
    if !marker.eq_ignore_ascii_case("maps:") {
        return Err(DapError::DdsParse(format!(
            "expected 'MAPS:' in grid, found '{marker}'"
        )));
    }
    let mut maps = Vec::new();
    loop {
        match ts.peek() {
            Some(Token::RBrace) => {
                ts.next().map_err(DapError::DdsParse)?;
                break;
            }
            _ => maps.push(parse_atomic(ts)?),
        }
    }
    let name = ts.word().map_err(DapError::DdsParse)?;
    ts.expect(&Token::Semi).map_err(DapError::DdsParse)?;
    Ok(DapVar {
        name,
        dtype: array_part.dtype,
        dims: array_part.dims,
        maps,
    })
}

fn parse_size(s: &str) -> Result<usize> {
    s.parse()
        .map_err(|_| DapError::DdsParse(format!("invalid dimension size '{s}'")))
}

//! `.dods` data response decoding
//!
//! A dods response is the constrained DDS as text, a `Data:` separator line,
//! then one XDR-encoded block per projected variable in DDS order. Grids
//! encode their array part first and each map vector after it.

use crate::array::{ArrayValues, DataArray};
use crate::dds::{DapVar, Dds};
use crate::error::{DapError, Result};
use crate::types::DapType;
use crate::xdr::XdrReader;

const SEPARATOR: &[u8] = b"\nData:\n";

/// The decoded payload of one dods response
#[derive(Debug, Clone)]
pub struct DodsResponse {
    /// The constrained DDS from the response header
    pub dds: Dds,
    /// Decoded arrays in stream order. Grid maps follow their grid's array
    /// part as separate entries under the map names.
    pub arrays: Vec<DataArray>,
}

impl DodsResponse {
    pub fn array(&self, name: &str) -> Option<&DataArray> {
        self.arrays.iter().find(|a| a.name == name)
    }
}

/// Decode a complete dods response body
pub fn parse_dods(body: &[u8]) -> Result<DodsResponse> {
    let pos = find(body, SEPARATOR).ok_or(DapError::MissingDataSeparator)?;
    let header = std::str::from_utf8(&body[..pos]).map_err(|_| DapError::HeaderEncoding)?;
    let dds = Dds::parse(header)?;

    let mut reader = XdrReader::new(&body[pos + SEPARATOR.len()..]);
    let mut arrays = Vec::new();
    for var in &dds.vars {
        arrays.push(decode_array(&mut reader, var)?);
        for map in &var.maps {
            arrays.push(decode_array(&mut reader, map)?);
        }
    }
    Ok(DodsResponse { dds, arrays })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn decode_array(r: &mut XdrReader, var: &DapVar) -> Result<DataArray> {
    let values = if var.is_scalar() {
        decode_scalar(r, var)?
    } else if matches!(var.dtype, DapType::String | DapType::Url) {
        decode_strings(r, var)?
    } else {
        decode_fixed(r, var)?
    };
    Ok(DataArray {
        name: var.name.clone(),
        dtype: var.dtype,
        dims: var.dims.clone(),
        values,
    })
}

/// Read the doubled length prefix of a fixed-width array and sanity-check it
/// against the constrained DDS and the bytes left in the stream
fn checked_count(r: &mut XdrReader, var: &DapVar) -> Result<usize> {
    let first = r.read_u32(&var.name)?;
    let second = r.read_u32(&var.name)?;
    if first != second {
        return Err(DapError::CountMismatch {
            var: var.name.clone(),
            first,
            second,
        });
    }
    if first as usize != var.len() {
        return Err(DapError::CountMismatch {
            var: var.name.clone(),
            first,
            second: var.len() as u32,
        });
    }
    let needed = first as usize * var.dtype.xdr_width();
    if needed > r.remaining() {
        return Err(DapError::CountOverrun {
            var: var.name.clone(),
            count: first,
            remaining: r.remaining(),
        });
    }
    Ok(first as usize)
}

fn decode_fixed(r: &mut XdrReader, var: &DapVar) -> Result<ArrayValues> {
    let n = checked_count(r, var)?;
    let name = var.name.as_str();
    Ok(match var.dtype {
        DapType::Byte => {
            let bytes = r.read_bytes(n, name)?;
            r.skip_pad(n, name)?;
            ArrayValues::Byte(bytes)
        }
        DapType::Int16 => {
            let mut v = Vec::with_capacity(n);
            for _ in 0..n {
                v.push(r.read_i32(name)? as i16);
            }
            ArrayValues::Int16(v)
        }
        DapType::UInt16 => {
            let mut v = Vec::with_capacity(n);
            for _ in 0..n {
                v.push(r.read_u32(name)? as u16);
            }
            ArrayValues::UInt16(v)
        }
        DapType::Int32 => {
            let mut v = Vec::with_capacity(n);
            for _ in 0..n {
                v.push(r.read_i32(name)?);
            }
            ArrayValues::Int32(v)
        }
        DapType::UInt32 => {
            let mut v = Vec::with_capacity(n);
            for _ in 0..n {
                v.push(r.read_u32(name)?);
            }
            ArrayValues::UInt32(v)
        }
        DapType::Float32 => {
            let mut v = Vec::with_capacity(n);
            for _ in 0..n {
                v.push(r.read_f32(name)?);
            }
            ArrayValues::Float32(v)
        }
        DapType::Float64 => {
            let mut v = Vec::with_capacity(n);
            for _ in 0..n {
                v.push(r.read_f64(name)?);
            }
            ArrayValues::Float64(v)
        }
        DapType::String | DapType::Url => unreachable!("handled by decode_strings"),
    })
}

/// String arrays carry their length prefix once, then counted strings
fn decode_strings(r: &mut XdrReader, var: &DapVar) -> Result<ArrayValues> {
    let name = var.name.as_str();
    let n = r.read_u32(name)? as usize;
    if n != var.len() {
        return Err(DapError::CountMismatch {
            var: var.name.clone(),
            first: n as u32,
            second: var.len() as u32,
        });
    }
    let mut v = Vec::with_capacity(n);
    for _ in 0..n {
        v.push(clean_text(r.read_string(name)?));
    }
    Ok(ArrayValues::Text(v))
}

fn decode_scalar(r: &mut XdrReader, var: &DapVar) -> Result<ArrayValues> {
    let name = var.name.as_str();
    Ok(match var.dtype {
        DapType::Byte => {
            let b = r.read_bytes(1, name)?;
            r.skip_pad(1, name)?;
            ArrayValues::Byte(b)
        }
        DapType::Int16 => ArrayValues::Int16(vec![r.read_i32(name)? as i16]),
        DapType::UInt16 => ArrayValues::UInt16(vec![r.read_u32(name)? as u16]),
        DapType::Int32 => ArrayValues::Int32(vec![r.read_i32(name)?]),
        DapType::UInt32 => ArrayValues::UInt32(vec![r.read_u32(name)?]),
        DapType::Float32 => ArrayValues::Float32(vec![r.read_f32(name)?]),
        DapType::Float64 => ArrayValues::Float64(vec![r.read_f64(name)?]),
        DapType::String | DapType::Url => {
            ArrayValues::Text(vec![clean_text(r.read_string(name)?)])
        }
    })
}

/// netCDF char data is padded with trailing NULs or spaces
fn clean_text(s: String) -> String {
    s.trim_end_matches(['\0', ' ']).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_count(buf: &mut Vec<u8>, n: u32, twice: bool) {
        buf.extend_from_slice(&n.to_be_bytes());
        if twice {
            buf.extend_from_slice(&n.to_be_bytes());
        }
    }

    fn push_string(buf: &mut Vec<u8>, s: &str) {
        buf.extend_from_slice(&(s.len() as u32).to_be_bytes());
        buf.extend_from_slice(s.as_bytes());
        let pad = (4 - s.len() % 4) % 4;
        buf.extend_from_slice(&vec![0u8; pad]);
    }

    #[test]
    fn test_decode_fixed_width_arrays() {
        let header = "Dataset {\n    Float64 waveTime[waveTime = 2];\n    Float32 waveHs[waveTime = 2];\n} cdip/realtime/100p1_rt.nc;\n";
        let mut body = header.as_bytes().to_vec();
        body.extend_from_slice(b"\nData:\n");
        push_count(&mut body, 2, true);
        body.extend_from_slice(&1444000000.0f64.to_be_bytes());
        body.extend_from_slice(&1444001800.0f64.to_be_bytes());
        push_count(&mut body, 2, true);
        body.extend_from_slice(&1.25f32.to_be_bytes());
        body.extend_from_slice(&1.5f32.to_be_bytes());

        let resp = parse_dods(&body).unwrap();
        assert_eq!(resp.dds.name, "cdip/realtime/100p1_rt.nc");
        assert_eq!(
            resp.array("waveTime").unwrap().values,
            ArrayValues::Float64(vec![1444000000.0, 1444001800.0])
        );
        assert_eq!(
            resp.array("waveHs").unwrap().values,
            ArrayValues::Float32(vec![1.25, 1.5])
        );
    }

    #[test]
    fn test_decode_byte_array_consumes_padding() {
        let header =
            "Dataset {\n    Byte waveFlagPrimary[waveTime = 5];\n    Int32 tail[x = 1];\n} t.nc;\n";
        let mut body = header.as_bytes().to_vec();
        body.extend_from_slice(b"\nData:\n");
        push_count(&mut body, 5, true);
        body.extend_from_slice(&[1, 1, 4, 1, 9]);
        body.extend_from_slice(&[0, 0, 0]);
        push_count(&mut body, 1, true);
        body.extend_from_slice(&42i32.to_be_bytes());

        let resp = parse_dods(&body).unwrap();
        assert_eq!(
            resp.array("waveFlagPrimary").unwrap().values,
            ArrayValues::Byte(vec![1, 1, 4, 1, 9])
        );
        assert_eq!(
            resp.array("tail").unwrap().values,
            ArrayValues::Int32(vec![42])
        );
    }

    #[test]
    fn test_decode_int16_widened_to_words() {
        let header = "Dataset {\n    Int16 xyzData[t = 2];\n} t.nc;\n";
        let mut body = header.as_bytes().to_vec();
        body.extend_from_slice(b"\nData:\n");
        push_count(&mut body, 2, true);
        body.extend_from_slice(&(-12i32).to_be_bytes());
        body.extend_from_slice(&300i32.to_be_bytes());

        let resp = parse_dods(&body).unwrap();
        assert_eq!(
            resp.array("xyzData").unwrap().values,
            ArrayValues::Int16(vec![-12, 300])
        );
    }

    #[test]
    fn test_decode_string_array_counted_once() {
        let header = "Dataset {\n    String metaSiteLabel[station = 2];\n} latest_3day.nc;\n";
        let mut body = header.as_bytes().to_vec();
        body.extend_from_slice(b"\nData:\n");
        push_count(&mut body, 2, false);
        push_string(&mut body, "100 ");
        push_string(&mut body, "201\0");

        let resp = parse_dods(&body).unwrap();
        assert_eq!(
            resp.array("metaSiteLabel").unwrap().values,
            ArrayValues::Text(vec!["100".into(), "201".into()])
        );
    }

    #[test]
    fn test_decode_string_scalar() {
        let header = "Dataset {\n    String metaStationName;\n} t.nc;\n";
        let mut body = header.as_bytes().to_vec();
        body.extend_from_slice(b"\nData:\n");
        push_string(&mut body, "SCRIPPS PIER, CA  ");

        let resp = parse_dods(&body).unwrap();
        assert_eq!(
            resp.array("metaStationName").unwrap().values,
            ArrayValues::Text(vec!["SCRIPPS PIER, CA".into()])
        );
    }

    #[test]
    fn test_decode_grid_with_maps() {
        let header = "Dataset {\n    Grid {\n     ARRAY:\n        Float32 waveEnergyDensity[waveTime = 2][waveFrequency = 3];\n     MAPS:\n        Float64 waveTime[waveTime = 2];\n        Float32 waveFrequency[waveFrequency = 3];\n    } waveEnergyDensity;\n} t.nc;\n";
        let mut body = header.as_bytes().to_vec();
        body.extend_from_slice(b"\nData:\n");
        push_count(&mut body, 6, true);
        for x in [0.1f32, 0.2, 0.3, 0.4, 0.5, 0.6] {
            body.extend_from_slice(&x.to_be_bytes());
        }
        push_count(&mut body, 2, true);
        body.extend_from_slice(&100.0f64.to_be_bytes());
        body.extend_from_slice(&200.0f64.to_be_bytes());
        push_count(&mut body, 3, true);
        for x in [0.025f32, 0.03, 0.035] {
            body.extend_from_slice(&x.to_be_bytes());
        }

        let resp = parse_dods(&body).unwrap();
        let ed = resp.array("waveEnergyDensity").unwrap();
        assert_eq!(ed.shape(), vec![2, 3]);
        assert_eq!(
            ed.values,
            ArrayValues::Float32(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6])
        );
        assert_eq!(
            resp.array("waveFrequency").unwrap().values,
            ArrayValues::Float32(vec![0.025, 0.03, 0.035])
        );
        assert_eq!(
            resp.array("waveTime").unwrap().values,
            ArrayValues::Float64(vec![100.0, 200.0])
        );
    }

    #[test]
    fn test_missing_separator() {
        assert!(matches!(
            parse_dods(b"Dataset { Int32 x[x = 1]; } t.nc;"),
            Err(DapError::MissingDataSeparator)
        ));
    }

    #[test]
    fn test_count_mismatch_against_header() {
        let header = "Dataset {\n    Int32 x[x = 2];\n} t.nc;\n";
        let mut body = header.as_bytes().to_vec();
        body.extend_from_slice(b"\nData:\n");
        push_count(&mut body, 3, true);
        for x in [1i32, 2, 3] {
            body.extend_from_slice(&x.to_be_bytes());
        }
        assert!(matches!(
            parse_dods(&body),
            Err(DapError::CountMismatch { var, first: 3, second: 2 }) if var == "x"
        ));
    }

    #[test]
    fn test_truncated_payload() {
        let header = "Dataset {\n    Float64 waveTime[waveTime = 4];\n} t.nc;\n";
        let mut body = header.as_bytes().to_vec();
        body.extend_from_slice(b"\nData:\n");
        push_count(&mut body, 4, true);
        body.extend_from_slice(&1.0f64.to_be_bytes());
        assert!(matches!(
            parse_dods(&body),
            Err(DapError::CountOverrun { .. })
        ));
    }
}

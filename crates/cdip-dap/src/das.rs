//! Attribute structure (`.das`) parsing
//!
//! The DAS carries one attribute container per variable plus the `NC_GLOBAL`
//! pseudo-variable for file-level attributes:
//!
//! ```text
//! Attributes {
//!     waveHs {
//!         Float32 _FillValue -999.99;
//!         String units "meter";
//!         String ancillary_variables "waveFlagPrimary waveFlagSecondary";
//!     }
//!     NC_GLOBAL {
//!         String date_modified "2016-09-26T23:59:01Z";
//!     }
//! }
//! ```

use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeSeq, Serializer};

use crate::error::{DapError, Result};
use crate::lex::{Token, TokenStream};

/// One attribute value: a string, or a numeric vector.
///
/// netCDF numeric attributes are vectors even when they hold one element
/// (`flag_values` is the usual multi-element case).
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    Int(Vec<i64>),
    Float(Vec<f64>),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn ints(&self) -> Option<&[i64]> {
        match self {
            AttrValue::Int(v) => Some(v),
            _ => None,
        }
    }

    /// First element coerced to f64, for scalar numeric attributes
    pub fn first_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Int(v) => v.first().map(|&i| i as f64),
            AttrValue::Float(v) => v.first().copied(),
            AttrValue::Str(_) => None,
        }
    }
}

impl Serialize for AttrValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            AttrValue::Str(s) => serializer.serialize_str(s),
            AttrValue::Int(v) if v.len() == 1 => serializer.serialize_i64(v[0]),
            AttrValue::Int(v) => {
                let mut seq = serializer.serialize_seq(Some(v.len()))?;
                for i in v {
                    seq.serialize_element(i)?;
                }
                seq.end()
            }
            AttrValue::Float(v) if v.len() == 1 => serializer.serialize_f64(v[0]),
            AttrValue::Float(v) => {
                let mut seq = serializer.serialize_seq(Some(v.len()))?;
                for f in v {
                    seq.serialize_element(f)?;
                }
                seq.end()
            }
        }
    }
}

/// Attributes of one variable, keyed by attribute name
pub type AttrGroup = BTreeMap<String, AttrValue>;

/// A parsed attribute structure
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Das {
    groups: BTreeMap<String, AttrGroup>,
}

impl Das {
    pub fn parse(text: &str) -> Result<Das> {
        let mut ts = TokenStream::new(text);
        let kw = ts.word().map_err(DapError::DasParse)?;
        if !kw.eq_ignore_ascii_case("attributes") {
            return Err(DapError::DasParse(format!(
                "expected 'Attributes', found '{kw}'"
            )));
        }
        ts.expect(&Token::LBrace).map_err(DapError::DasParse)?;
        let mut groups = BTreeMap::new();
        loop {
            match ts.peek() {
                Some(Token::RBrace) => break,
                Some(Token::Word(_)) => {
                    let name = ts.word().map_err(DapError::DasParse)?;
                    ts.expect(&Token::LBrace).map_err(DapError::DasParse)?;
                    groups.insert(name, parse_group(&mut ts)?);
                }
                other => {
                    return Err(DapError::DasParse(format!(
                        "expected attribute container, found {other:?}"
                    )));
                }
            }
        }
        Ok(Das { groups })
    }

    pub fn group(&self, var: &str) -> Option<&AttrGroup> {
        self.groups.get(var)
    }

    pub fn groups(&self) -> &BTreeMap<String, AttrGroup> {
        &self.groups
    }

    pub fn attr(&self, var: &str, key: &str) -> Option<&AttrValue> {
        self.groups.get(var).and_then(|g| g.get(key))
    }

    pub fn str_attr(&self, var: &str, key: &str) -> Option<&str> {
        self.attr(var, key).and_then(|v| v.as_str())
    }

    pub fn f64_attr(&self, var: &str, key: &str) -> Option<f64> {
        self.attr(var, key).and_then(|v| v.first_f64())
    }

    /// File-level attribute from the `NC_GLOBAL` container
    pub fn global(&self, key: &str) -> Option<&AttrValue> {
        self.attr("NC_GLOBAL", key)
    }

    pub fn units(&self, var: &str) -> Option<&str> {
        self.str_attr(var, "units")
    }

    pub fn fill_value(&self, var: &str) -> Option<f64> {
        self.f64_attr(var, "_FillValue")
    }
}

impl Serialize for Das {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.groups.serialize(serializer)
    }
}

/// Parse attribute entries up to and including the closing brace.
///
/// Nested containers (such as `DODS_EXTRA`) are flattened into the parent
/// with dotted keys.
fn parse_group(ts: &mut TokenStream) -> Result<AttrGroup> {
    let mut group = AttrGroup::new();
    loop {
        match ts.peek() {
            Some(Token::RBrace) => {
                ts.next().map_err(DapError::DasParse)?;
                return Ok(group);
            }
            Some(Token::Word(_)) => {
                let first = ts.word().map_err(DapError::DasParse)?;
                if ts.eat(&Token::LBrace) {
                    for (k, v) in parse_group(ts)? {
                        group.insert(format!("{first}.{k}"), v);
                    }
                    continue;
                }
                let name = ts.word().map_err(DapError::DasParse)?;
                let mut raw = Vec::new();
                loop {
                    match ts.next().map_err(DapError::DasParse)? {
                        Token::Word(w) | Token::Quoted(w) => raw.push(w),
                        Token::Comma => {}
                        Token::Semi => break,
                        other => {
                            return Err(DapError::DasParse(format!(
                                "unexpected {other:?} in attribute '{name}'"
                            )));
                        }
                    }
                }
                group.insert(name.clone(), build_value(&first, &name, raw)?);
            }
            other => {
                return Err(DapError::DasParse(format!(
                    "expected attribute entry, found {other:?}"
                )));
            }
        }
    }
}

fn build_value(type_word: &str, name: &str, raw: Vec<String>) -> Result<AttrValue> {
    match type_word.to_ascii_lowercase().as_str() {
        "string" | "url" => Ok(AttrValue::Str(raw.join(", "))),
        "byte" | "int16" | "uint16" | "int32" | "uint32" => raw
            .iter()
            .map(|s| s.parse::<i64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(AttrValue::Int)
            .map_err(|_| DapError::DasParse(format!("bad integer value in '{name}'"))),
        "float32" | "float64" => raw
            .iter()
            .map(|s| s.parse::<f64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(AttrValue::Float)
            .map_err(|_| DapError::DasParse(format!("bad float value in '{name}'"))),
        // Unknown types pass through as text rather than failing the parse
        _ => Ok(AttrValue::Str(raw.join(", "))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RT_DAS: &str = r#"Attributes {
    waveTime {
        String long_name "UTC sample start time";
        String units "seconds since 1970-01-01 00:00:00 UTC";
    }
    waveHs {
        Float32 _FillValue -999.99;
        String units "meter";
        String ancillary_variables "waveFlagPrimary waveFlagSecondary";
    }
    waveFlagPrimary {
        Byte flag_values 1, 2, 3, 4, 9;
        String flag_meanings "good not_evaluated questionable bad missing";
    }
    NC_GLOBAL {
        String date_modified "2016-09-26T23:59:01Z";
        Float32 geospatial_lat_min 32.0;
    }
    DODS_EXTRA {
        String Unlimited_Dimension "waveTime";
    }
}"#;

    #[test]
    fn test_parse_realtime_das() {
        let das = Das::parse(RT_DAS).unwrap();
        assert_eq!(
            das.units("waveTime"),
            Some("seconds since 1970-01-01 00:00:00 UTC")
        );
        assert_eq!(das.fill_value("waveHs"), Some(-999.99));
        assert_eq!(
            das.str_attr("waveHs", "ancillary_variables"),
            Some("waveFlagPrimary waveFlagSecondary")
        );
        assert_eq!(
            das.attr("waveFlagPrimary", "flag_values").unwrap().ints(),
            Some(&[1, 2, 3, 4, 9][..])
        );
        assert_eq!(
            das.global("date_modified").unwrap().as_str(),
            Some("2016-09-26T23:59:01Z")
        );
        assert_eq!(das.f64_attr("NC_GLOBAL", "geospatial_lat_min"), Some(32.0));
        assert_eq!(
            das.str_attr("DODS_EXTRA", "Unlimited_Dimension"),
            Some("waveTime")
        );
    }

    #[test]
    fn test_missing_attributes_are_none() {
        let das = Das::parse(RT_DAS).unwrap();
        assert_eq!(das.fill_value("waveTime"), None);
        assert_eq!(das.units("nonesuch"), None);
    }

    #[test]
    fn test_nan_fill_value() {
        let das = Das::parse("Attributes { x { Float32 _FillValue NaN; } }").unwrap();
        assert!(das.fill_value("x").unwrap().is_nan());
    }

    #[test]
    fn test_attr_value_json_shapes() {
        let das = Das::parse(RT_DAS).unwrap();
        let flags = serde_json::to_string(das.attr("waveFlagPrimary", "flag_values").unwrap())
            .unwrap();
        assert_eq!(flags, "[1,2,3,4,9]");
        let lat = serde_json::to_string(das.global("geospatial_lat_min").unwrap()).unwrap();
        assert_eq!(lat, "32.0");
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(Das::parse("Dataset { }").is_err());
        assert!(Das::parse("Attributes { x { Float32 bad notanumber; } }").is_err());
    }
}

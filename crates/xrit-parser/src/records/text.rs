//! Free-text payloads: data definitions, annotations, projection names.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use xrit_common::parse_nominal_time;

use crate::error::{XritError, XritResult};

/// Key/value content of an image data function record.
///
/// Lines look like `$HALFTONE:=10`, `_NAME:=INFRARED` or `0:=330.06`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataDefinition {
    pub integers: BTreeMap<String, i64>,
    pub strings: BTreeMap<String, String>,
    /// Calibration table rows (count, value) in file order.
    pub table: Vec<(u32, f64)>,
}

impl DataDefinition {
    pub fn parse(text: &str) -> XritResult<Self> {
        let mut dd = DataDefinition::default();
        for line in text.trim().split('\r').map(str::trim).filter(|l| !l.is_empty()) {
            let (key, value) = line
                .split_once(":=")
                .ok_or_else(|| XritError::header(format!("could not decode data definition: '{line}'")))?;
            let (key, value) = (key.trim(), value.trim());

            if key.starts_with('$') {
                let v = value.parse().map_err(|_| {
                    XritError::header(format!("data definition {key} is not an integer: '{value}'"))
                })?;
                dd.integers.insert(key.to_string(), v);
            } else if key.starts_with('_') {
                dd.strings.insert(key.to_string(), value.to_string());
            } else if !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit()) {
                let count = key.parse().map_err(|_| {
                    XritError::header(format!("data definition count out of range: '{key}'"))
                })?;
                let v = value.parse().map_err(|_| {
                    XritError::header(format!("data definition {key} is not a number: '{value}'"))
                })?;
                dd.table.push((count, v));
            } else {
                return Err(XritError::header(format!(
                    "could not decode data definition: '{line}'"
                )));
            }
        }
        Ok(dd)
    }

    pub fn integer(&self, key: &str) -> Option<i64> {
        self.integers.get(key).copied()
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        self.strings.get(key).map(String::as_str)
    }
}

/// Sub-satellite longitude from a projection name such as `GEOS(+009.5)`.
pub fn projection_longitude(name: &str) -> XritResult<Option<f64>> {
    let (Some(open), Some(close)) = (name.find('('), name.find(')')) else {
        return Ok(None);
    };
    if close <= open {
        return Ok(None);
    }
    let inner = name[open + 1..close].trim();
    inner
        .parse()
        .map(Some)
        .map_err(|_| XritError::header(format!("bad sub-satellite longitude in projection name '{name}'")))
}

/// Fields recovered from a dash separated annotation such as
/// `H-000-MSG2__-MSG2________-IR_108___-000004___-201010111400-__`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationFields {
    pub channel_id: String,
    pub dissemination_id: i64,
    pub disseminating_spacecraft: String,
    pub segment_name: String,
    pub nominal_time: DateTime<Utc>,
    pub flags: String,
}

/// Split an annotation into platform, product name and the remaining fields.
pub fn split_annotation(text: &str) -> XritResult<(String, String, AnnotationFields)> {
    let parts: Vec<&str> = text.split('-').map(|p| p.trim_matches('_')).collect();
    if parts.len() < 8 {
        return Err(XritError::header(format!(
            "annotation '{text}' has {} fields, expected 8",
            parts.len()
        )));
    }
    let dissemination_id = parts[1]
        .parse()
        .map_err(|_| XritError::header(format!("bad dissemination id in annotation '{text}'")))?;
    let nominal_time = parse_nominal_time(parts[6])
        .map_err(|e| XritError::header(format!("annotation '{text}': {e}")))?;

    Ok((
        parts[3].to_string(),
        parts[4].to_string(),
        AnnotationFields {
            channel_id: parts[0].to_string(),
            dissemination_id,
            disseminating_spacecraft: parts[2].to_string(),
            segment_name: parts[5].to_string(),
            nominal_time,
            flags: parts[7].to_string(),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_data_definition() {
        let dd = DataDefinition::parse("$HALFTONE:=10\r_NAME:=INFRARED\r_UNIT:=KELVIN\r0:=330.06\r1023:=200.5\r")
            .unwrap();
        assert_eq!(dd.integer("$HALFTONE"), Some(10));
        assert_eq!(dd.string("_UNIT"), Some("KELVIN"));
        assert_eq!(dd.table, vec![(0, 330.06), (1023, 200.5)]);
    }

    #[test]
    fn test_data_definition_rejects_unknown_keys() {
        assert!(DataDefinition::parse("HALFTONE:=10").is_err());
        assert!(DataDefinition::parse("$HALFTONE=10").is_err());
        assert!(DataDefinition::parse("$HALFTONE:=ten").is_err());
    }

    #[test]
    fn test_projection_longitude() {
        assert_eq!(projection_longitude("GEOS(+009.5)").unwrap(), Some(9.5));
        assert_eq!(projection_longitude("GEOS(140.70)").unwrap(), Some(140.7));
        assert_eq!(projection_longitude("GEOS").unwrap(), None);
        assert!(projection_longitude("GEOS(abc)").is_err());
    }

    #[test]
    fn test_split_annotation() {
        let (platform, product, f) =
            split_annotation("H-000-MSG2__-MSG2________-IR_108___-000004___-201010111400-__").unwrap();
        assert_eq!(platform, "MSG2");
        assert_eq!(product, "IR_108");
        assert_eq!(f.channel_id, "H");
        assert_eq!(f.dissemination_id, 0);
        assert_eq!(f.segment_name, "000004");
        assert_eq!(f.nominal_time.hour(), 14);
        assert_eq!(f.flags, "");
    }

    #[test]
    fn test_split_annotation_too_short() {
        assert!(split_annotation("H-000-MSG2").is_err());
    }
}

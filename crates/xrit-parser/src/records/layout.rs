//! Declarative record layouts and the generic field decoder.
//!
//! A layout lists the fields of one record type in on-disk order. At most the
//! last field is variable width; its size is whatever the declared record
//! length leaves after the fixed prefix.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::bin_reader::{ByteCursor, CDS_TIME_LEN};
use crate::error::{XritError, XritResult};

/// Tag byte plus u16 record length.
pub const RECORD_PREFIX_LEN: usize = 3;

/// Width of one line-quality table entry.
pub const LINE_QUALITY_ENTRY_LEN: usize = 13;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    U8,
    U16,
    U32,
    U64,
    I32,
    CdsTime,
    /// Fixed-width text.
    Text(usize),
    /// Text filling the rest of the record.
    VarText,
    /// Table of 13-byte line-quality entries filling the rest of the record.
    LineQualityTable,
}

impl FieldType {
    /// On-disk width, `None` for variable-width fields.
    pub fn width(&self) -> Option<usize> {
        match self {
            FieldType::U8 => Some(1),
            FieldType::U16 => Some(2),
            FieldType::U32 | FieldType::I32 => Some(4),
            FieldType::U64 => Some(8),
            FieldType::CdsTime => Some(CDS_TIME_LEN),
            FieldType::Text(n) => Some(*n),
            FieldType::VarText | FieldType::LineQualityTable => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
}

pub(crate) const fn field(name: &'static str, ty: FieldType) -> FieldSpec {
    FieldSpec { name, ty }
}

/// Which typed view a record decodes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Primary,
    ImageStructure,
    ImageNavigation,
    ImageDataFunction,
    Annotation,
    JmaAnnotation,
    TimeStamp,
    SegmentIdentification,
    JmaSegmentIdentification,
    LineQuality,
    EncryptionKey,
    MissionText,
}

#[derive(Debug, Clone, Copy)]
pub struct RecordLayout {
    pub tag: u8,
    pub name: &'static str,
    pub kind: RecordKind,
    pub fields: &'static [FieldSpec],
}

impl RecordLayout {
    /// Bytes taken by the fixed-width fields, excluding the record prefix.
    pub fn fixed_len(&self) -> usize {
        self.fields.iter().filter_map(|f| f.ty.width()).sum()
    }

    /// Decode the record body (everything after tag and length).
    pub fn decode(&self, body: &[u8]) -> XritResult<RecordFields> {
        let fixed = self.fixed_len();
        if body.len() < fixed {
            return Err(XritError::header(format!(
                "{} record (type {}) declares {} bytes, needs at least {}",
                self.name,
                self.tag,
                body.len() + RECORD_PREFIX_LEN,
                fixed + RECORD_PREFIX_LEN
            )));
        }
        let variable = body.len() - fixed;

        let mut cursor = ByteCursor::new(body);
        let mut values = Vec::with_capacity(self.fields.len());
        for spec in self.fields {
            let value = match spec.ty {
                FieldType::U8 => FieldValue::Unsigned(cursor.u8()? as u64),
                FieldType::U16 => FieldValue::Unsigned(cursor.u16()? as u64),
                FieldType::U32 => FieldValue::Unsigned(cursor.u32()? as u64),
                FieldType::U64 => FieldValue::Unsigned(cursor.u64()?),
                FieldType::I32 => FieldValue::Signed(cursor.i32()? as i64),
                FieldType::CdsTime => FieldValue::Time(cursor.cds_time()?),
                FieldType::Text(n) => FieldValue::Text(cursor.text(n)?),
                FieldType::VarText => FieldValue::Text(cursor.text(variable)?),
                FieldType::LineQualityTable => {
                    FieldValue::LineQuality(decode_line_quality(cursor.take(variable)?)?)
                }
            };
            values.push((spec.name, value));
        }
        Ok(RecordFields { values })
    }
}

/// One entry of the image segment line quality record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineQualityEntry {
    pub line_number: i32,
    pub time: DateTime<Utc>,
    pub validity: u8,
    pub radiometric_quality: u8,
    pub geometric_quality: u8,
}

fn decode_line_quality(buf: &[u8]) -> XritResult<Vec<LineQualityEntry>> {
    if buf.len() % LINE_QUALITY_ENTRY_LEN != 0 {
        return Err(XritError::header(format!(
            "line quality table of {} bytes is not a multiple of {}",
            buf.len(),
            LINE_QUALITY_ENTRY_LEN
        )));
    }
    buf.chunks_exact(LINE_QUALITY_ENTRY_LEN)
        .map(|entry| {
            let mut c = ByteCursor::new(entry);
            Ok(LineQualityEntry {
                line_number: c.i32()?,
                time: c.cds_time()?,
                validity: c.u8()?,
                radiometric_quality: c.u8()?,
                geometric_quality: c.u8()?,
            })
        })
        .collect()
}

/// A decoded primitive.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Unsigned(u64),
    Signed(i64),
    Time(DateTime<Utc>),
    Text(String),
    Bytes(Bytes),
    LineQuality(Vec<LineQualityEntry>),
}

/// Ordered name/value pairs of one record. Serializes as a map in field order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFields {
    values: Vec<(&'static str, FieldValue)>,
}

impl Serialize for RecordFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in &self.values {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl RecordFields {
    pub(crate) fn opaque(data: Bytes) -> Self {
        Self {
            values: vec![("data", FieldValue::Bytes(data))],
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(&'static str, FieldValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn unsigned(&self, name: &'static str) -> XritResult<u64> {
        match self.get(name) {
            Some(FieldValue::Unsigned(v)) => Ok(*v),
            _ => Err(missing_field(name)),
        }
    }

    pub(crate) fn signed(&self, name: &'static str) -> XritResult<i64> {
        match self.get(name) {
            Some(FieldValue::Signed(v)) => Ok(*v),
            _ => Err(missing_field(name)),
        }
    }

    pub(crate) fn time(&self, name: &'static str) -> XritResult<DateTime<Utc>> {
        match self.get(name) {
            Some(FieldValue::Time(v)) => Ok(*v),
            _ => Err(missing_field(name)),
        }
    }

    pub(crate) fn text(&self, name: &'static str) -> XritResult<&str> {
        match self.get(name) {
            Some(FieldValue::Text(v)) => Ok(v),
            _ => Err(missing_field(name)),
        }
    }

    pub(crate) fn line_quality(&self, name: &'static str) -> XritResult<&[LineQualityEntry]> {
        match self.get(name) {
            Some(FieldValue::LineQuality(v)) => Ok(v),
            _ => Err(missing_field(name)),
        }
    }
}

fn missing_field(name: &str) -> XritError {
    XritError::header(format!("record layout has no field '{name}' of the expected type"))
}

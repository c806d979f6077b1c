//! xRIT header records.
//!
//! A file header is a run of records, each framed as:
//!
//! ```text
//! +-----+---------+---------------------------+
//! | tag | rec_len | fields ...                |
//! | u8  | u16     | rec_len - 3 bytes         |
//! +-----+---------+---------------------------+
//! ```
//!
//! The first record is always the primary header (tag 0); its
//! `total_header_length` says where the header ends and the data field begins.

pub mod layout;
pub mod text;

use std::io::Read;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::trace;

use crate::bin_reader::read_u32;
use crate::error::{XritError, XritResult};
use crate::mission::Mission;

pub use layout::{FieldSpec, FieldType, FieldValue, LineQualityEntry, RecordFields, RecordKind, RecordLayout};
pub use text::{AnnotationFields, DataDefinition};

use layout::RECORD_PREFIX_LEN;

/// Length of the primary header record, including its prefix.
pub const PRIMARY_HEADER_LEN: usize = 16;

/// Tag of the primary header record.
pub const PRIMARY_HEADER_TAG: u8 = 0;

/// File type discriminator of the primary header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FileType {
    ImageData,
    GtsMessage,
    AlphanumericText,
    EncryptionKeyMessage,
    Prologue,
    Epilogue,
    Mpef,
    Other(u8),
}

impl From<u8> for FileType {
    fn from(v: u8) -> Self {
        match v {
            0 => FileType::ImageData,
            1 => FileType::GtsMessage,
            2 => FileType::AlphanumericText,
            3 => FileType::EncryptionKeyMessage,
            128 => FileType::Prologue,
            129 => FileType::Epilogue,
            144 => FileType::Mpef,
            other => FileType::Other(other),
        }
    }
}

/// Record type 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrimaryHeader {
    pub file_type: FileType,
    pub total_header_length: u32,
    pub data_field_length: u64,
}

/// Record type 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageStructure {
    pub bits_per_pixel: u8,
    pub columns: u16,
    pub lines: u16,
    pub compression: u8,
}

/// Record type 2.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageNavigation {
    pub projection_name: String,
    pub cfac: i32,
    pub lfac: i32,
    pub coff: i32,
    pub loff: i32,
    pub sub_satellite_longitude: Option<f64>,
}

/// Record type 3.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageDataFunction {
    pub definition: DataDefinition,
}

/// Record type 4.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub text: String,
    pub platform: String,
    pub product_name: String,
    /// Present for dash-separated annotations; JMA files carry none.
    pub fields: Option<AnnotationFields>,
}

impl Annotation {
    /// `platform_product_segment_YYYYmmdd_HHMM`
    pub fn segment_id(&self) -> Option<String> {
        self.fields.as_ref().map(|f| {
            format!(
                "{}_{}_{}_{}",
                self.platform,
                self.product_name,
                f.segment_name,
                f.nominal_time.format("%Y%m%d_%H%M")
            )
        })
    }

    /// `platform_product_YYYYmmdd_HHMM`
    pub fn product_id(&self) -> Option<String> {
        self.fields.as_ref().map(|f| {
            format!(
                "{}_{}_{}",
                self.platform,
                self.product_name,
                f.nominal_time.format("%Y%m%d_%H%M")
            )
        })
    }

    pub fn nominal_time(&self) -> Option<DateTime<Utc>> {
        self.fields.as_ref().map(|f| f.nominal_time)
    }
}

/// Record type 5.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeStamp {
    pub cds_p_field: u8,
    pub time: DateTime<Utc>,
}

/// Record type 128.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentIdentification {
    pub spacecraft_id: Option<u16>,
    pub spectral_channel_id: Option<u8>,
    pub segment_number: u16,
    pub planned_start_segment: u16,
    pub planned_end_segment: u16,
    /// JMA: first line number of this segment within the image.
    pub first_line: Option<u16>,
    pub data_field_representation: Option<u8>,
}

/// Record type 129 outside JMA.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineQuality {
    pub entries: Vec<LineQualityEntry>,
}

/// Record type 129 in JMA files.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncryptionKey {
    pub station_id: u16,
}

/// Typed view of a record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RecordBody {
    Primary(PrimaryHeader),
    ImageStructure(ImageStructure),
    ImageNavigation(ImageNavigation),
    ImageDataFunction(ImageDataFunction),
    Annotation(Annotation),
    TimeStamp(TimeStamp),
    SegmentIdentification(SegmentIdentification),
    LineQuality(LineQuality),
    EncryptionKey(EncryptionKey),
    /// Mission specific text records (JMA 130-132).
    MissionText(String),
    /// A tag the mission table does not know.
    Opaque(Bytes),
}

/// One parsed header record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderRecord {
    pub tag: u8,
    pub name: &'static str,
    /// Declared length including tag and length bytes.
    pub length: u16,
    pub fields: RecordFields,
    pub body: RecordBody,
}

impl HeaderRecord {
    fn decode(layout: &RecordLayout, length: u16, body: &[u8]) -> XritResult<Self> {
        let fields = layout.decode(body)?;
        let typed = typed_body(layout.kind, &fields)?;
        Ok(Self {
            tag: layout.tag,
            name: layout.name,
            length,
            fields,
            body: typed,
        })
    }

    fn opaque(tag: u8, length: u16, body: &[u8]) -> Self {
        let data = Bytes::copy_from_slice(body);
        Self {
            tag,
            name: "unknown",
            length,
            fields: RecordFields::opaque(data.clone()),
            body: RecordBody::Opaque(data),
        }
    }
}

fn typed_body(kind: RecordKind, f: &RecordFields) -> XritResult<RecordBody> {
    let body = match kind {
        RecordKind::Primary => RecordBody::Primary(PrimaryHeader {
            file_type: FileType::from(f.unsigned("file_type")? as u8),
            total_header_length: f.unsigned("total_header_length")? as u32,
            data_field_length: f.unsigned("data_field_length")?,
        }),
        RecordKind::ImageStructure => RecordBody::ImageStructure(ImageStructure {
            bits_per_pixel: f.unsigned("bits_per_pixel")? as u8,
            columns: f.unsigned("columns")? as u16,
            lines: f.unsigned("lines")? as u16,
            compression: f.unsigned("compression")? as u8,
        }),
        RecordKind::ImageNavigation => {
            let projection_name = f.text("projection_name")?.trim().to_string();
            RecordBody::ImageNavigation(ImageNavigation {
                sub_satellite_longitude: text::projection_longitude(&projection_name)?,
                projection_name,
                cfac: f.signed("cfac")? as i32,
                lfac: f.signed("lfac")? as i32,
                coff: f.signed("coff")? as i32,
                loff: f.signed("loff")? as i32,
            })
        }
        RecordKind::ImageDataFunction => RecordBody::ImageDataFunction(ImageDataFunction {
            definition: DataDefinition::parse(f.text("data_definition")?)?,
        }),
        RecordKind::Annotation => {
            let text = f.text("text")?.trim().to_string();
            let (platform, product_name, fields) = text::split_annotation(&text)?;
            RecordBody::Annotation(Annotation {
                text,
                platform,
                product_name,
                fields: Some(fields),
            })
        }
        RecordKind::JmaAnnotation => {
            let text = f.text("text")?.trim().to_string();
            let product_name = text.get(8..11).unwrap_or_default().to_string();
            RecordBody::Annotation(Annotation {
                text,
                platform: "Himawari-8".to_string(),
                product_name,
                fields: None,
            })
        }
        RecordKind::TimeStamp => RecordBody::TimeStamp(TimeStamp {
            cds_p_field: f.unsigned("cds_p_field")? as u8,
            time: f.time("time")?,
        }),
        RecordKind::SegmentIdentification => {
            RecordBody::SegmentIdentification(SegmentIdentification {
                spacecraft_id: Some(f.unsigned("spacecraft_id")? as u16),
                spectral_channel_id: Some(f.unsigned("spectral_channel_id")? as u8),
                segment_number: f.unsigned("segment_number")? as u16,
                planned_start_segment: f.unsigned("planned_start_segment")? as u16,
                planned_end_segment: f.unsigned("planned_end_segment")? as u16,
                first_line: None,
                data_field_representation: Some(f.unsigned("data_field_representation")? as u8),
            })
        }
        RecordKind::JmaSegmentIdentification => {
            RecordBody::SegmentIdentification(SegmentIdentification {
                spacecraft_id: None,
                spectral_channel_id: None,
                segment_number: f.unsigned("segment_number")? as u16,
                planned_start_segment: 1,
                planned_end_segment: f.unsigned("planned_end_segment")? as u16,
                first_line: Some(f.unsigned("first_line")? as u16),
                data_field_representation: None,
            })
        }
        RecordKind::LineQuality => RecordBody::LineQuality(LineQuality {
            entries: f.line_quality("line_quality")?.to_vec(),
        }),
        RecordKind::EncryptionKey => RecordBody::EncryptionKey(EncryptionKey {
            station_id: f.unsigned("station_id")? as u16,
        }),
        RecordKind::MissionText => RecordBody::MissionText(f.text("text")?.trim().to_string()),
    };
    Ok(body)
}

/// Parse every record of a header held in `buf`.
///
/// `buf` must start at the primary header. Parsing stops once the primary
/// header's `total_header_length` bytes are consumed; bytes past that point
/// are ignored.
pub fn parse_headers(buf: &[u8], mission: Mission) -> XritResult<Vec<HeaderRecord>> {
    match buf.first() {
        Some(&PRIMARY_HEADER_TAG) => {}
        Some(&tag) => {
            return Err(XritError::header(format!(
                "first header has to be a primary header, this one is of type {tag}"
            )))
        }
        None => return Err(XritError::header("empty header")),
    }

    let mut records = Vec::new();
    let mut consumed = 0usize;
    let mut total = PRIMARY_HEADER_LEN;

    while consumed < total {
        if consumed + RECORD_PREFIX_LEN > buf.len() {
            return Err(XritError::header(format!(
                "record prefix at offset {consumed} runs past the {} byte buffer",
                buf.len()
            )));
        }
        let tag = buf[consumed];
        let length = u16::from_be_bytes([buf[consumed + 1], buf[consumed + 2]]);
        let len = length as usize;
        if len < RECORD_PREFIX_LEN {
            return Err(XritError::header(format!(
                "record type {tag} at offset {consumed} declares length {len}"
            )));
        }
        if consumed + len > buf.len() {
            return Err(XritError::header(format!(
                "record type {tag} at offset {consumed} declares length {len}, only {} bytes left",
                buf.len() - consumed
            )));
        }

        let body = &buf[consumed + RECORD_PREFIX_LEN..consumed + len];
        let record = match mission.layout(tag) {
            Some(layout) => HeaderRecord::decode(layout, length, body)?,
            None => HeaderRecord::opaque(tag, length, body),
        };
        trace!(tag, name = record.name, length = len, "decoded header record");

        if let RecordBody::Primary(primary) = &record.body {
            if records.is_empty() {
                total = primary.total_header_length as usize;
            }
        }
        records.push(record);
        consumed += len;
    }

    Ok(records)
}

/// Read and parse a header from the start of `reader`.
///
/// Returns the records and the header length, which is also the offset of
/// the data field. The reader is left positioned at the data field.
pub fn read_headers<R: Read>(reader: &mut R, mission: Mission) -> XritResult<(Vec<HeaderRecord>, u64)> {
    let mut buf = vec![0u8; PRIMARY_HEADER_LEN];
    reader
        .read_exact(&mut buf)
        .map_err(|e| XritError::header(format!("cannot read primary header: {e}")))?;

    if buf[0] != PRIMARY_HEADER_TAG {
        return Err(XritError::header(format!(
            "first header has to be a primary header, this one is of type {}",
            buf[0]
        )));
    }
    let total = read_u32(&buf[4..8])? as usize;
    if total < PRIMARY_HEADER_LEN {
        return Err(XritError::header(format!(
            "total header length {total} is shorter than the primary header"
        )));
    }

    buf.resize(total, 0);
    reader
        .read_exact(&mut buf[PRIMARY_HEADER_LEN..])
        .map_err(|e| XritError::header(format!("header declares {total} bytes: {e}")))?;

    let records = parse_headers(&buf, mission)?;
    Ok((records, total as u64))
}

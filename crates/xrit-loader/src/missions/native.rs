//! EUMETSAT native MSG (UMARF) files.
//!
//! A native file holds the whole image of all channels in one file: an ASCII
//! UMARF header, the level 1.5 header, then line records starting at a fixed
//! offset. Each record carries one line of each of the 11 VIS/IR channels
//! followed by three HRV lines, every line preceded by a 38 byte packet
//! header and a 27 byte line header.
//!
//! The file is presented to the assembler as a single segment whose lines
//! are interleaved inside the records.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;
use xrit_common::FirstPixel;
use xrit_parser::bin_reader::{decode_text, ByteCursor};
use xrit_parser::segment::line_bytes;
use xrit_parser::{LineLayout, SegmentCatalog, SegmentDescriptor};

use crate::calibration::{msg_channel_index, Calibrator};
use crate::error::{LoaderError, Result};
use crate::missions::msg::{MsgPrologue, HRV};
use crate::missions::ImageSource;
use crate::types::{Boundary, ImageMetadata, MSG_HRV_PIXEL_SIZE, MSG_VIS_IR_PIXEL_SIZE};

const MAIN_PAIRS: usize = 6;
const SECTIONS: usize = 27;
const SECONDARY_PAIRS: usize = 37;
const NAME_LEN: usize = 30;
const VALUE_LEN: usize = 50;
const SECTION_FIELD_LEN: usize = 16;

/// Length of the UMARF header.
pub const UMARF_LEN: usize = (MAIN_PAIRS + SECONDARY_PAIRS) * (NAME_LEN + VALUE_LEN)
    + SECTIONS * (NAME_LEN + 2 * SECTION_FIELD_LEN);

/// The level 1.5 header follows a packet header and a version byte.
const LEVEL15_HEADER: usize = UMARF_LEN + 38 + 1;

/// Offset of the first line record.
pub const LINE_DATA: u64 = 450_400;

const LINE_HEADER_LEN: usize = 38 + 27;
const VIS_IR_CHANNELS: usize = 11;
const HRV_LINES_PER_RECORD: usize = 3;
const BITS_PER_PIXEL: u8 = 10;

/// HRV columns of a full disc image.
const HRV_FULL_COLUMNS: usize = 5568;

/// MSG VIS/IR origin on the reference grid.
const VIS_IR_ORIGIN: i64 = 1856;
/// HRV origin, fixed for native files.
const HRV_ORIGIN: i64 = 5566;

/// One entry of the UMARF data section table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataSection {
    pub name: String,
    pub size: u64,
    pub address: u64,
}

/// Decoded header of a native file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NativeHeader {
    pub main: BTreeMap<String, String>,
    pub sections: Vec<DataSection>,
    pub secondary: BTreeMap<String, String>,
    pub prologue: MsgPrologue,
}

impl NativeHeader {
    /// Decode the bytes preceding the line data.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < LEVEL15_HEADER {
            return Err(LoaderError::metadata(format!(
                "native header is {} bytes, expected at least {LEVEL15_HEADER}",
                data.len()
            )));
        }
        let mut cursor = ByteCursor::new(data);

        let mut main = BTreeMap::new();
        for _ in 0..MAIN_PAIRS {
            let (name, value) = (umarf_name(cursor.take(NAME_LEN)?), umarf_value(cursor.take(VALUE_LEN)?));
            main.insert(name, value);
        }

        let mut sections = Vec::new();
        for _ in 0..SECTIONS {
            let name = umarf_name(cursor.take(NAME_LEN)?);
            let size = umarf_value(cursor.take(SECTION_FIELD_LEN)?);
            let address = umarf_value(cursor.take(SECTION_FIELD_LEN)?);
            if name.is_empty() {
                continue;
            }
            let number = |v: &str| {
                v.parse::<u64>()
                    .map_err(|_| LoaderError::metadata(format!("bad UMARF section {name}: '{v}'")))
            };
            sections.push(DataSection {
                size: number(&size)?,
                address: number(&address)?,
                name,
            });
        }

        let mut secondary = BTreeMap::new();
        for _ in 0..SECONDARY_PAIRS {
            let (name, value) = (umarf_name(cursor.take(NAME_LEN)?), umarf_value(cursor.take(VALUE_LEN)?));
            if !name.is_empty() {
                secondary.insert(name, value);
            }
        }

        let prologue = MsgPrologue::parse(&data[LEVEL15_HEADER..])?;
        Ok(Self {
            main,
            sections,
            secondary,
            prologue,
        })
    }

    /// Read the header of a native file.
    pub fn read(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| LoaderError::io(path, e))?;
        let mut data = Vec::with_capacity(LINE_DATA as usize);
        file.take(LINE_DATA)
            .read_to_end(&mut data)
            .map_err(|e| LoaderError::io(path, e))?;
        debug!(path = %path.display(), bytes = data.len(), "read native MSG header");
        Self::parse(&data)
    }

    /// A header value, secondary product header first.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.secondary
            .get(name)
            .or_else(|| self.main.get(name))
            .map(String::as_str)
    }

    pub fn integer(&self, name: &str) -> Result<i64> {
        let value = self
            .value(name)
            .ok_or_else(|| LoaderError::metadata(format!("native header has no {name}")))?;
        value
            .parse()
            .map_err(|_| LoaderError::metadata(format!("native header {name} is not an integer: '{value}'")))
    }

    fn count(&self, name: &str) -> Result<usize> {
        let v = self.integer(name)?;
        usize::try_from(v).map_err(|_| LoaderError::metadata(format!("native header {name} is {v}")))
    }

    /// The selected rectangle of the VIS/IR grid.
    pub fn selected(&self) -> Result<Boundary> {
        Ok(Boundary::new(
            self.integer("SouthLineSelectedRectangle")?,
            self.integer("NorthLineSelectedRectangle")?,
            self.integer("EastColumnSelectedRectangle")?,
            self.integer("WestColumnSelectedRectangle")?,
        ))
    }

    /// `(lines, columns)` of the VIS/IR channels.
    pub fn vis_ir_size(&self) -> Result<(usize, usize)> {
        Ok((self.count("NumberLinesVISIR")?, self.count("NumberColumnsVISIR")?))
    }

    /// `(lines, columns)` of HRV. A full disc stores the fixed full width.
    pub fn hrv_size(&self) -> Result<(usize, usize)> {
        let lines = self.count("NumberLinesHRV")?;
        let selected = self.selected()?;
        let columns = if selected.west - selected.east >= 3711 {
            HRV_FULL_COLUMNS
        } else {
            self.count("NumberColumnsHRV")?
        };
        Ok((lines, columns))
    }

    /// Platform name from the prologue satellite id.
    pub fn satname(&self) -> Result<String> {
        match self.prologue.satellite_id {
            id @ 321..=324 => Ok(format!("MSG{}", id - 320)),
            id => Err(LoaderError::metadata(format!("unknown MSG satellite id {id}"))),
        }
    }

    /// Where the lines of `channel` live in the file.
    pub fn layout(&self, channel: &str) -> Result<(LineLayout, usize, usize)> {
        let index = msg_channel_index(channel)
            .ok_or_else(|| LoaderError::config(format!("unknown SEVIRI channel '{channel}'")))?;
        let (lines, columns) = self.vis_ir_size()?;
        let (hrv_lines, hrv_columns) = self.hrv_size()?;
        let v = line_bytes(columns, BITS_PER_PIXEL);
        let h = line_bytes(hrv_columns, BITS_PER_PIXEL);
        let vis_ir_block = (VIS_IR_CHANNELS * (LINE_HEADER_LEN + v)) as u64;
        let record = vis_ir_block + (HRV_LINES_PER_RECORD * (LINE_HEADER_LEN + h)) as u64;

        if channel == HRV {
            let offsets = (0..HRV_LINES_PER_RECORD)
                .map(|j| vis_ir_block + (j * (LINE_HEADER_LEN + h) + LINE_HEADER_LEN) as u64)
                .collect();
            Ok((LineLayout::interleaved(LINE_DATA, record, offsets, h), hrv_lines, hrv_columns))
        } else {
            let offset = (index * (LINE_HEADER_LEN + v) + LINE_HEADER_LEN) as u64;
            Ok((LineLayout::interleaved(LINE_DATA, record, vec![offset], v), lines, columns))
        }
    }
}

/// Name field: `name: ` padded to 30 bytes.
fn umarf_name(field: &[u8]) -> String {
    let name = &field[..field.len() - 2];
    decode_text(name).trim().to_string()
}

fn umarf_value(field: &[u8]) -> String {
    decode_text(field).trim().to_string()
}

/// Build the image source of one channel of a native file.
pub fn open(path: &Path, channel: &str) -> Result<ImageSource> {
    let header = NativeHeader::read(path)?;
    let (layout, lines, columns) = header.layout(channel)?;
    let descriptor = SegmentDescriptor {
        path: path.to_path_buf(),
        segment_number: 1,
        planned_start_segment: 1,
        planned_end_segment: 1,
        columns,
        lines,
        bits_per_pixel: BITS_PER_PIXEL,
        layout,
    };
    let catalog = SegmentCatalog::from_descriptors(vec![descriptor])?;

    let (coff, loff, pixel_size) = if channel == HRV {
        (HRV_ORIGIN, HRV_ORIGIN, MSG_HRV_PIXEL_SIZE)
    } else {
        let selected = header.selected()?;
        (
            selected.east + VIS_IR_ORIGIN - 1,
            selected.south + VIS_IR_ORIGIN - 1,
            MSG_VIS_IR_PIXEL_SIZE,
        )
    };

    let metadata = ImageMetadata {
        satname: header.satname()?,
        product_name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        channel: channel.to_string(),
        columns,
        lines,
        first_pixel: FirstPixel::SouthEast,
        column_scale: pixel_size,
        line_scale: pixel_size,
        coff,
        loff,
        sublon: header.prologue.nominal_longitude,
        no_data_value: 0,
        bits_per_pixel: BITS_PER_PIXEL,
        segment_lines: lines,
        ..Default::default()
    };
    let calibrator = header.prologue.calibrator(channel)?;

    Ok(ImageSource {
        metadata,
        catalog,
        calibrator: Some(Arc::new(calibrator) as Arc<dyn Calibrator>),
    })
}

//! Electro-L (GOMS) HRIT.
//!
//! Geometry comes from the segment headers like SGS. The prologue is a
//! little-endian block holding the nominal longitude and one 1024 entry
//! calibration table per channel. The epilogue carries nothing the loader
//! uses.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;
use xrit_parser::bin_reader::ByteCursor;
use xrit_parser::{FileType, Mission, SegmentFile};

use crate::calibration::{CalibrationTable, Calibrator, TableCalibrator};
use crate::error::{LoaderError, Result};
use crate::missions::{catalog, first_segment, segment_metadata, segment_offset, ImageSource};

/// Channels in prologue calibration order.
pub const GOMS_CHANNELS: [&str; 10] = [
    "00_6", "00_7", "00_9", "03_8", "06_4", "08_0", "08_7", "09_7", "10_7", "11_9",
];

/// Entries per calibration table, one per 10-bit count.
pub const TABLE_LEN: usize = 1024;

const SATELLITE_NAME_LEN: usize = 256;
const ACQUISITION_RECORDS: usize = 10;
const ACQUISITION_RECORD_LEN: usize = 24;

/// The parts of the GOMS prologue the loader reads.
#[derive(Debug, Clone, PartialEq)]
pub struct GomsPrologue {
    pub satellite_id: u64,
    pub satellite_name: String,
    /// Degrees east.
    pub nominal_longitude: f64,
    /// Calibrated value of each count, per channel.
    pub calibration: Vec<Vec<f64>>,
}

impl GomsPrologue {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(data);
        cursor.skip(8)?;
        let satellite_id = cursor.u64_le()?;
        let satellite_name = cursor.text(SATELLITE_NAME_LEN)?;
        let nominal_longitude = cursor.f64_le()?.to_degrees();
        cursor.skip(4 + 8)?;
        cursor.skip(ACQUISITION_RECORDS * ACQUISITION_RECORD_LEN)?;

        let mut calibration = Vec::with_capacity(GOMS_CHANNELS.len());
        for _ in GOMS_CHANNELS {
            let table = (0..TABLE_LEN)
                .map(|_| cursor.i32_le().map(|v| v as f64 / 1000.0))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            calibration.push(table);
        }
        Ok(Self {
            satellite_id,
            satellite_name,
            nominal_longitude,
            calibration,
        })
    }

    pub fn read(path: &Path) -> Result<Self> {
        let file = SegmentFile::open_as(path, Mission::Goms, FileType::Prologue)?;
        let data = file.read_data()?;
        debug!(path = %path.display(), bytes = data.len(), "read GOMS prologue");
        Self::parse(&data)
    }

    /// Lookup calibrator of `channel`. Table entries at or below zero mark
    /// counts without a calibrated value.
    pub fn calibrator(&self, channel: &str, no_data: u16) -> Result<TableCalibrator> {
        let index = GOMS_CHANNELS
            .iter()
            .position(|c| *c == channel)
            .ok_or_else(|| LoaderError::calibration(format!("no GOMS calibration for channel '{channel}'")))?;
        let values = self.calibration[index]
            .iter()
            .map(|&v| if v > 0.0 { v } else { f64::NAN })
            .collect();
        let unit = if channel.starts_with("00_") { "%" } else { "K" };
        Ok(TableCalibrator::new(CalibrationTable::Lookup(values), unit, no_data))
    }
}

pub fn open<P: AsRef<Path>>(segments: &[P], prologue: &Path) -> Result<ImageSource> {
    let catalog = catalog(segments, Mission::Goms)?;
    let prologue = GomsPrologue::read(prologue)?;
    let file = first_segment(&catalog, Mission::Goms)?;
    let mut metadata = segment_metadata(&file, &catalog)?;

    metadata.channel = metadata.channel.chars().take(4).collect();
    metadata.sublon = prologue.nominal_longitude;
    metadata.loff += segment_offset(&catalog);

    let calibrator = prologue.calibrator(&metadata.channel, metadata.no_data_value)?;
    metadata.calibration_unit = calibrator.unit().to_string();
    Ok(ImageSource {
        metadata,
        catalog,
        calibrator: Some(Arc::new(calibrator) as Arc<dyn Calibrator>),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationLevel;
    use crate::types::RasterRegion;
    use test_utils::{file_type, temp_test_dir, HritBuilder, SyntheticChannel};
    use xrit_common::FirstPixel;

    fn prologue_bytes(longitude_deg: f64, table: impl Fn(usize, usize) -> i32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&1u32.to_le_bytes());
        out.extend_from_slice(&292u32.to_le_bytes());
        out.extend_from_slice(&19u64.to_le_bytes());
        let mut name = b"ELECTRO-L N1".to_vec();
        name.resize(SATELLITE_NAME_LEN, 0);
        out.extend_from_slice(&name);
        out.extend_from_slice(&longitude_deg.to_radians().to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&0f64.to_le_bytes());
        out.resize(out.len() + ACQUISITION_RECORDS * ACQUISITION_RECORD_LEN, 0);
        for channel in 0..GOMS_CHANNELS.len() {
            for count in 0..TABLE_LEN {
                out.extend_from_slice(&table(channel, count).to_le_bytes());
            }
        }
        out
    }

    fn write_prologue(dir: &Path, data: Vec<u8>) -> std::path::PathBuf {
        HritBuilder::new(file_type::PROLOGUE)
            .annotation("H-000-GOMS1_-GOMS1_4_____-_________-PRO______-201301011200-__")
            .data(data)
            .write_to(&dir.join("PRO"))
    }

    #[test]
    fn test_parse_prologue() {
        let data = prologue_bytes(76.0, |channel, count| (channel * 100_000 + count) as i32);
        let prologue = GomsPrologue::parse(&data).unwrap();
        assert_eq!(prologue.satellite_id, 19);
        assert_eq!(prologue.satellite_name, "ELECTRO-L N1");
        assert!((prologue.nominal_longitude - 76.0).abs() < 1e-9);
        assert_eq!(prologue.calibration.len(), 10);
        assert_eq!(prologue.calibration[8][5], 800.005);

        assert!(GomsPrologue::parse(&data[..data.len() - 1]).is_err());
    }

    #[test]
    fn test_calibrator_masks_non_positive_entries() {
        let data = prologue_bytes(76.0, |channel, count| if count < 2 { 0 } else { (200_000 + count * 10 + channel) as i32 });
        let prologue = GomsPrologue::parse(&data).unwrap();

        let ir = prologue.calibrator("10_7", 0).unwrap();
        assert_eq!(ir.unit(), "K");
        let counts = RasterRegion {
            data: vec![0, 1, 2, 100],
            width: 4,
            height: 1,
            mask: None,
        };
        let out = ir.calibrate(&counts, CalibrationLevel::Default).unwrap();
        assert!(out.values.data[0].is_nan());
        assert!(out.values.data[1].is_nan());
        assert!((out.values.data[2] - 200.028).abs() < 1e-3);
        assert!((out.values.data[3] - 201.008).abs() < 1e-3);

        assert_eq!(prologue.calibrator("00_6", 0).unwrap().unit(), "%");
        assert!(prologue.calibrator("IR_108", 0).is_err());
    }

    #[test]
    fn test_open_goms_image() {
        let dir = temp_test_dir();
        let mut channel = SyntheticChannel::small(10, 4, 6, 10);
        channel.platform = "GOMS1".to_string();
        channel.channel = "10_7".to_string();
        let paths = channel.write_segments(dir.path(), &[2, 3]);
        let pro = write_prologue(dir.path(), prologue_bytes(76.0, |_, count| (count * 1000) as i32));

        let source = open(&paths, &pro).unwrap();
        let mda = &source.metadata;
        assert_eq!(mda.channel, "10_7");
        assert_eq!(mda.satname, "GOMS1");
        assert!((mda.sublon - 76.0).abs() < 1e-9);
        assert_eq!(mda.first_pixel, FirstPixel::NorthWest);
        assert_eq!((mda.lines, mda.columns), (24, 10));
        // Segment 2 is the first present.
        assert_eq!(mda.loff, 12 + 4);
        assert_eq!(mda.calibration_unit, "K");

        let calibrator = source.calibrator.unwrap();
        let counts = RasterRegion {
            data: vec![0, 7],
            width: 2,
            height: 1,
            mask: None,
        };
        let out = calibrator.calibrate(&counts, CalibrationLevel::Default).unwrap();
        assert!(out.values.data[0].is_nan());
        assert_eq!(out.values.data[1], 7.0);
    }
}

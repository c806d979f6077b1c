//! MSG HRIT: level 1.5 prologue and epilogue, and the image metadata built
//! from them.
//!
//! Only the fields the loader needs are decoded. Offsets are into the data
//! field of the prologue/epilogue file (the level 1.5 header and trailer).

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;
use xrit_common::FirstPixel;
use xrit_parser::bin_reader::ByteCursor;
use xrit_parser::{FileType, Mission, SegmentFile};

use crate::calibration::{msg_channel_index, Calibrator, MsgCalibrator, MSG_CHANNELS};
use crate::error::{LoaderError, Result};
use crate::missions::{annotation, catalog, first_segment, navigation, ImageSource};
use crate::types::{Boundary, ImageMetadata, MSG_HRV_PIXEL_SIZE, MSG_VIS_IR_PIXEL_SIZE};

const SATELLITE_ID: usize = 0;
const NOMINAL_LONGITUDE: usize = 2;
const IMAGE_DESCRIPTION: usize = 386_892;
const GRID_VIS_IR: usize = IMAGE_DESCRIPTION + 5;
const GRID_HRV: usize = IMAGE_DESCRIPTION + 22;
const PLANNED_CHAN_PROCESSING: usize = IMAGE_DESCRIPTION + 89;
const CALIBRATION: usize = 387_065;

const ACTUAL_COVERAGE: usize = 293;

/// Name of the high resolution channel.
pub const HRV: &str = "HRV";

/// Reference grid of one channel family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReferenceGrid {
    pub lines: i32,
    pub columns: i32,
    /// Kilometres.
    pub line_step: f32,
    pub column_step: f32,
    pub first_pixel: FirstPixel,
}

impl ReferenceGrid {
    fn parse(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(Self {
            lines: cursor.i32()?,
            columns: cursor.i32()?,
            line_step: cursor.f32()?,
            column_step: cursor.f32()?,
            first_pixel: FirstPixel::from_grid_origin(cursor.u8()?)?,
        })
    }

    fn size(&self) -> Result<(usize, usize)> {
        let lines = usize::try_from(self.lines)
            .map_err(|_| LoaderError::metadata(format!("reference grid has {} lines", self.lines)))?;
        let columns = usize::try_from(self.columns)
            .map_err(|_| LoaderError::metadata(format!("reference grid has {} columns", self.columns)))?;
        Ok((lines, columns))
    }
}

/// The prologue fields used for geometry and calibration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MsgPrologue {
    pub satellite_id: u16,
    /// Degrees east.
    pub nominal_longitude: f64,
    pub projection_type: u8,
    pub ssp_longitude: f64,
    pub vis_ir: ReferenceGrid,
    pub hrv: ReferenceGrid,
    /// Per channel, in [`MSG_CHANNELS`] order.
    pub planned_chan_processing: [u8; 12],
    /// `(slope, offset)` per channel, in [`MSG_CHANNELS`] order.
    pub calibration: [(f64, f64); 12],
}

impl MsgPrologue {
    /// Decode a level 1.5 header.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(data);

        cursor.seek(SATELLITE_ID)?;
        let satellite_id = cursor.u16()?;
        cursor.seek(NOMINAL_LONGITUDE)?;
        let nominal_longitude = cursor.f32()? as f64;

        cursor.seek(IMAGE_DESCRIPTION)?;
        let projection_type = cursor.u8()?;
        let ssp_longitude = cursor.f32()? as f64;
        cursor.seek(GRID_VIS_IR)?;
        let vis_ir = ReferenceGrid::parse(&mut cursor)?;
        cursor.seek(GRID_HRV)?;
        let hrv = ReferenceGrid::parse(&mut cursor)?;

        cursor.seek(PLANNED_CHAN_PROCESSING)?;
        let mut planned_chan_processing = [0u8; 12];
        planned_chan_processing.copy_from_slice(cursor.take(12)?);

        cursor.seek(CALIBRATION)?;
        let mut calibration = [(0.0, 0.0); 12];
        for pair in &mut calibration {
            *pair = (cursor.f64()?, cursor.f64()?);
        }

        Ok(Self {
            satellite_id,
            nominal_longitude,
            projection_type,
            ssp_longitude,
            vis_ir,
            hrv,
            planned_chan_processing,
            calibration,
        })
    }

    /// Read and decode a prologue file.
    pub fn read(path: &Path) -> Result<Self> {
        let file = SegmentFile::open_as(path, Mission::MsgHrit, FileType::Prologue)?;
        let data = file.read_data()?;
        debug!(path = %path.display(), bytes = data.len(), "read MSG prologue");
        Self::parse(&data)
    }

    pub fn grid(&self, channel: &str) -> &ReferenceGrid {
        if channel == HRV {
            &self.hrv
        } else {
            &self.vis_ir
        }
    }

    /// Slope/offset calibration of `channel`.
    pub fn calibrator(&self, channel: &str) -> Result<MsgCalibrator> {
        let index = msg_channel_index(channel).ok_or_else(|| {
            LoaderError::calibration(format!(
                "unknown SEVIRI channel '{channel}', expected one of {MSG_CHANNELS:?}"
            ))
        })?;
        let (slope, offset) = self.calibration[index];
        MsgCalibrator::new(
            self.satellite_id,
            channel,
            slope,
            offset,
            self.planned_chan_processing[index],
        )
    }
}

/// Actual coverage of the image, from the epilogue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MsgEpilogue {
    pub vis_ir: Boundary,
    pub lower_hrv: Boundary,
    pub upper_hrv: Boundary,
}

impl MsgEpilogue {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(data);
        cursor.seek(ACTUAL_COVERAGE)?;
        let mut boundary = || -> Result<Boundary> {
            Ok(Boundary::new(
                cursor.i32()? as i64,
                cursor.i32()? as i64,
                cursor.i32()? as i64,
                cursor.i32()? as i64,
            ))
        };
        Ok(Self {
            vis_ir: boundary()?,
            lower_hrv: boundary()?,
            upper_hrv: boundary()?,
        })
    }

    pub fn read(path: &Path) -> Result<Self> {
        let file = SegmentFile::open_as(path, Mission::MsgHrit, FileType::Epilogue)?;
        let data = file.read_data()?;
        debug!(path = %path.display(), bytes = data.len(), "read MSG epilogue");
        Self::parse(&data)
    }

    /// Data-carrying rectangles of `channel`.
    pub fn boundaries(&self, channel: &str) -> Vec<Boundary> {
        if channel == HRV {
            vec![self.lower_hrv, self.upper_hrv]
        } else {
            vec![self.vis_ir]
        }
    }
}

/// Build the image source of an MSG HRIT channel.
pub fn open<P: AsRef<Path>>(segments: &[P], prologue: &Path, epilogue: &Path) -> Result<ImageSource> {
    let catalog = catalog(segments, Mission::MsgHrit)?;
    let prologue = MsgPrologue::read(prologue)?;
    let epilogue = MsgEpilogue::read(epilogue)?;

    let file = first_segment(&catalog, Mission::MsgHrit)?;
    let annotation = annotation(&file)?;
    let nav = navigation(&file)?;
    let channel = annotation.product_name.clone();
    let segment = catalog.iter().next().map_or(1, |d| d.segment_number);

    let metadata = image_metadata(
        &prologue,
        &epilogue,
        &channel,
        (nav.coff as i64, nav.loff as i64),
        segment,
        catalog.segment_lines(),
    )?;
    let calibrator = prologue.calibrator(&channel)?;

    Ok(ImageSource {
        metadata: ImageMetadata {
            satname: annotation.platform.clone(),
            product_name: annotation
                .product_id()
                .unwrap_or_else(|| annotation.text.clone()),
            bits_per_pixel: catalog.bits_per_pixel(),
            time_stamp: annotation
                .nominal_time()
                .or_else(|| file.time_stamp().map(|t| t.time)),
            ..metadata
        },
        catalog,
        calibrator: Some(Arc::new(calibrator) as Arc<dyn Calibrator>),
    })
}

/// Geometry of `channel` given the navigation origin `(coff, loff)` of
/// segment `segment`.
///
/// The origin is moved from the segment onto the whole image and offset by
/// the actual coverage of the first boundary, on the side the image starts
/// from.
pub fn image_metadata(
    prologue: &MsgPrologue,
    epilogue: &MsgEpilogue,
    channel: &str,
    (nav_coff, nav_loff): (i64, i64),
    segment: u16,
    segment_lines: usize,
) -> Result<ImageMetadata> {
    let grid = prologue.grid(channel);
    let (lines, columns) = grid.size()?;
    let first_pixel = grid.first_pixel;
    let boundaries = epilogue.boundaries(channel);
    let b = boundaries[0];

    let column_side = if first_pixel.is_east() { b.east } else { b.west };
    let line_side = if first_pixel.is_south() { b.south } else { b.north };
    let coff = column_side + nav_coff - 1;
    let loff = line_side + nav_loff + (segment_lines * (segment as usize).saturating_sub(1)) as i64 - 1;

    let pixel_size = if channel == HRV {
        MSG_HRV_PIXEL_SIZE
    } else {
        MSG_VIS_IR_PIXEL_SIZE
    };

    Ok(ImageMetadata {
        channel: channel.to_string(),
        columns,
        lines,
        first_pixel,
        column_scale: pixel_size,
        line_scale: pixel_size,
        coff,
        loff,
        sublon: prologue.nominal_longitude,
        no_data_value: 0,
        bits_per_pixel: 10,
        segment_lines,
        boundaries,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{temp_test_dir, MsgEpilogueSpec, MsgPrologueSpec};

    #[test]
    fn test_parse_prologue() {
        let mut spec = MsgPrologueSpec::default();
        spec.nominal_longitude = 9.5;
        spec.calibration[8] = (0.205, -10.456);
        spec.planned_chan_processing[8] = 1;
        let prologue = MsgPrologue::parse(&spec.to_bytes()).unwrap();

        assert_eq!(prologue.satellite_id, 324);
        assert_eq!(prologue.nominal_longitude, 9.5);
        assert_eq!(prologue.vis_ir.lines, 3712);
        assert_eq!(prologue.vis_ir.first_pixel, FirstPixel::SouthEast);
        assert_eq!(prologue.hrv.columns, 11136);
        assert_eq!(prologue.calibration[8], (0.205, -10.456));

        let cal = prologue.calibrator("IR_108").unwrap();
        assert_eq!((cal.slope, cal.offset, cal.cal_type), (0.205, -10.456, 1));
        assert!(prologue.calibrator("IR_999").is_err());
    }

    #[test]
    fn test_truncated_prologue() {
        let bytes = MsgPrologueSpec::default().to_bytes();
        assert!(MsgPrologue::parse(&bytes[..1000]).is_err());
    }

    #[test]
    fn test_read_epilogue_file() {
        let dir = temp_test_dir();
        let path = MsgEpilogueSpec::default().write_to(&dir.path().join("EPI"));
        let epilogue = MsgEpilogue::read(&path).unwrap();
        assert_eq!(epilogue.vis_ir, Boundary::new(1, 3712, 1, 3712));
        assert_eq!(epilogue.upper_hrv, Boundary::new(8065, 11136, 2977, 8544));
        assert_eq!(epilogue.boundaries(HRV).len(), 2);

        // A prologue is not an epilogue.
        let pro = MsgPrologueSpec::default().write_to(&dir.path().join("PRO"));
        assert!(MsgEpilogue::read(&pro).is_err());
        assert!(MsgPrologue::read(&pro).is_ok());
    }

    #[test]
    fn test_vis_ir_origin() {
        let prologue = MsgPrologue::parse(&MsgPrologueSpec::default().to_bytes()).unwrap();
        let epilogue = MsgEpilogue::parse(&MsgEpilogueSpec::default().to_bytes()).unwrap();
        // Segment 1 of 8 with loff stored relative to the segment.
        let mda = image_metadata(&prologue, &epilogue, "IR_108", (1856, 1856), 1, 464).unwrap();
        assert_eq!((mda.coff, mda.loff), (1856, 1856));
        assert_eq!(mda.first_pixel, FirstPixel::SouthEast);
        assert_eq!(mda.boundaries.len(), 1);

        let mda = image_metadata(&prologue, &epilogue, "IR_108", (1856, 1856 - 928), 3, 464).unwrap();
        assert_eq!(mda.loff, 1856);
    }

    #[test]
    fn test_hrv_uses_lower_window() {
        let prologue = MsgPrologue::parse(&MsgPrologueSpec::default().to_bytes()).unwrap();
        let epilogue = MsgEpilogue::parse(&MsgEpilogueSpec::default().to_bytes()).unwrap();
        let mda = image_metadata(&prologue, &epilogue, HRV, (5566, 5566), 1, 464).unwrap();
        assert_eq!((mda.lines, mda.columns), (11136, 11136));
        assert_eq!(mda.coff, 1 + 5566 - 1);
        assert_eq!(mda.column_scale, MSG_HRV_PIXEL_SIZE);
        assert_eq!(mda.boundaries, vec![epilogue.lower_hrv, epilogue.upper_hrv]);
    }
}

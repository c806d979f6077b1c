//! Per-mission image metadata readers.
//!
//! Every reader turns the files of one image into an [`ImageSource`]: the
//! segment catalog that locates pixel lines, the image metadata, and a
//! calibrator when the headers carry enough to build one.
//!
//! | Mission | Geometry from | Calibration from |
//! |---|---|---|
//! | MSG HRIT | prologue + epilogue | prologue slope/offset |
//! | SGS | segment headers | data function table |
//! | GOMS | segment headers | prologue lookup tables |
//! | JMA | segment headers | data function table |
//! | native MSG | UMARF + level 1.5 header | embedded prologue |

pub mod goms;
pub mod jma;
pub mod msg;
pub mod native;
pub mod sgs;

use std::path::Path;
use std::sync::Arc;

use tracing::info;
use xrit_common::FirstPixel;
use xrit_parser::records::{Annotation, ImageNavigation};
use xrit_parser::{Mission, SegmentCatalog, SegmentFile, XritError};

use crate::calibration::{Calibrator, TableCalibrator};
use crate::error::{LoaderError, Result};
use crate::loader::ImageFiles;
use crate::types::{pixel_size_from_factor, ImageMetadata};

pub use goms::GomsPrologue;
pub use msg::{MsgEpilogue, MsgPrologue, ReferenceGrid};
pub use native::NativeHeader;

/// What a mission reader produces for one image.
#[derive(Debug, Clone)]
pub struct ImageSource {
    pub metadata: ImageMetadata,
    pub catalog: SegmentCatalog,
    pub calibrator: Option<Arc<dyn Calibrator>>,
}

/// Read the metadata of the image made of `files`.
pub fn open_source(mission: Mission, files: &ImageFiles) -> Result<ImageSource> {
    let source = match mission {
        Mission::MsgHrit => {
            let prologue = files
                .prologue
                .as_deref()
                .ok_or_else(|| LoaderError::config("MSG HRIT images need a prologue file"))?;
            let epilogue = files
                .epilogue
                .as_deref()
                .ok_or_else(|| LoaderError::config("MSG HRIT images need an epilogue file"))?;
            msg::open(&files.segments, prologue, epilogue)?
        }
        Mission::Sgs => sgs::open(&files.segments)?,
        Mission::Goms => {
            let prologue = files
                .prologue
                .as_deref()
                .ok_or_else(|| LoaderError::config("GOMS images need a prologue file"))?;
            goms::open(&files.segments, prologue)?
        }
        Mission::JmaHrit => jma::open(&files.segments)?,
        Mission::MsgNative => {
            let [path] = files.segments.as_slice() else {
                return Err(LoaderError::config(format!(
                    "a native MSG image is one file, got {}",
                    files.segments.len()
                )));
            };
            let channel = files
                .channel
                .as_deref()
                .ok_or_else(|| LoaderError::config("native MSG images need a channel name"))?;
            native::open(path, channel)?
        }
        Mission::Base => open_base(&files.segments)?,
    };
    info!(
        %mission,
        satname = %source.metadata.satname,
        channel = %source.metadata.channel,
        lines = source.metadata.lines,
        columns = source.metadata.columns,
        first_pixel = %source.metadata.first_pixel,
        segments = source.catalog.len(),
        "read image metadata"
    );
    Ok(source)
}

/// Plain LRIT/HRIT: everything comes from the segment headers.
fn open_base<P: AsRef<Path>>(segments: &[P]) -> Result<ImageSource> {
    let catalog = catalog(segments, Mission::Base)?;
    let file = first_segment(&catalog, Mission::Base)?;
    let mut metadata = segment_metadata(&file, &catalog)?;
    metadata.loff += segment_offset(&catalog);
    let calibrator = table_calibrator(&file, metadata.no_data_value)?;
    if let Some(c) = &calibrator {
        metadata.calibration_unit = c.unit().to_string();
    }
    Ok(ImageSource {
        metadata,
        catalog,
        calibrator: calibrator.map(|c| Arc::new(c) as Arc<dyn Calibrator>),
    })
}

/// Catalog the segment files of one image. No files at all is an error of
/// its own, distinct from gaps in the planned range.
pub(crate) fn catalog<P: AsRef<Path>>(segments: &[P], mission: Mission) -> Result<SegmentCatalog> {
    if segments.is_empty() {
        return Err(LoaderError::MissingSegments(format!("the {mission} image")));
    }
    Ok(SegmentCatalog::build(segments, mission)?)
}

/// Header of the lowest numbered segment present.
pub(crate) fn first_segment(catalog: &SegmentCatalog, mission: Mission) -> Result<SegmentFile> {
    let descriptor = catalog
        .iter()
        .next()
        .ok_or_else(|| LoaderError::MissingSegments("an empty segment catalog".to_string()))?;
    Ok(SegmentFile::open(&descriptor.path, mission)?)
}

/// Lines between the first planned segment and the first one present, added
/// to a per-segment `loff`.
pub(crate) fn segment_offset(catalog: &SegmentCatalog) -> i64 {
    let first = catalog
        .iter()
        .next()
        .map_or(catalog.planned_start(), |d| d.segment_number);
    (catalog.segment_lines() * first.saturating_sub(catalog.planned_start()) as usize) as i64
}

pub(crate) fn navigation(file: &SegmentFile) -> Result<&ImageNavigation> {
    file.navigation().ok_or_else(|| {
        XritError::MissingRecord {
            path: file.path.clone(),
            record: "image navigation",
        }
        .into()
    })
}

pub(crate) fn annotation(file: &SegmentFile) -> Result<&Annotation> {
    file.annotation().ok_or_else(|| {
        XritError::MissingRecord {
            path: file.path.clone(),
            record: "annotation",
        }
        .into()
    })
}

/// Metadata shared by the missions whose geometry lives in the segment
/// headers: north-west images of `segment_lines` times the planned segment
/// count starting at the first planned segment, origin as stored in the
/// navigation record.
pub(crate) fn segment_metadata(file: &SegmentFile, catalog: &SegmentCatalog) -> Result<ImageMetadata> {
    let nav = navigation(file)?;
    let annotation = annotation(file)?;
    let segment_lines = catalog.segment_lines();
    let planned = (catalog.planned_end() - catalog.planned_start()) as usize + 1;

    Ok(ImageMetadata {
        satname: annotation.platform.clone(),
        product_name: annotation
            .product_id()
            .unwrap_or_else(|| annotation.text.clone()),
        channel: annotation.product_name.clone(),
        columns: catalog.columns(),
        lines: segment_lines * planned,
        first_pixel: FirstPixel::NorthWest,
        column_scale: pixel_size_from_factor(nav.cfac),
        line_scale: pixel_size_from_factor(nav.lfac),
        coff: nav.coff as i64,
        loff: nav.loff as i64,
        sublon: nav.sub_satellite_longitude.unwrap_or(0.0),
        bits_per_pixel: catalog.bits_per_pixel(),
        segment_lines,
        first_segment: catalog.planned_start(),
        time_stamp: annotation
            .nominal_time()
            .or_else(|| file.time_stamp().map(|t| t.time)),
        ..Default::default()
    })
}

/// Calibrator from the data function record, if it carries a table.
pub(crate) fn table_calibrator(file: &SegmentFile, no_data: u16) -> Result<Option<TableCalibrator>> {
    match file.data_function() {
        Some(df) if !df.definition.table.is_empty() => {
            Ok(Some(TableCalibrator::from_definition(&df.definition, no_data)?))
        }
        _ => Ok(None),
    }
}

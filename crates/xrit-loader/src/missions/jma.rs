//! JMA Himawari HRIT.
//!
//! Images are north-west with 16-bit samples. The navigation origin is
//! already expressed for the whole image, so unlike SGS no per-segment
//! offset is added.

use std::path::Path;
use std::sync::Arc;

use xrit_parser::Mission;

use crate::calibration::Calibrator;
use crate::error::Result;
use crate::missions::{catalog, first_segment, segment_metadata, table_calibrator, ImageSource};

pub fn open<P: AsRef<Path>>(segments: &[P]) -> Result<ImageSource> {
    let catalog = catalog(segments, Mission::JmaHrit)?;
    let file = first_segment(&catalog, Mission::JmaHrit)?;
    let mut metadata = segment_metadata(&file, &catalog)?;

    let calibrator = table_calibrator(&file, metadata.no_data_value)?;
    metadata.calibration_unit = calibrator
        .as_ref()
        .map(|c| c.unit().to_string())
        .unwrap_or_default();
    Ok(ImageSource {
        metadata,
        catalog,
        calibrator: calibrator.map(|c| Arc::new(c) as Arc<dyn Calibrator>),
    })
}

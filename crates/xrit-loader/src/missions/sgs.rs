//! GOES and MTSAT images re-disseminated by EUMETSAT (SGS).
//!
//! Geometry comes from the segment headers alone. The product name encodes
//! the channel and the sub-satellite longitude, e.g. `10_7_135W`.

use std::path::Path;
use std::sync::Arc;

use xrit_parser::Mission;

use crate::calibration::Calibrator;
use crate::error::{LoaderError, Result};
use crate::missions::{catalog, first_segment, segment_metadata, segment_offset, table_calibrator, ImageSource};

pub fn open<P: AsRef<Path>>(segments: &[P]) -> Result<ImageSource> {
    let catalog = catalog(segments, Mission::Sgs)?;
    let file = first_segment(&catalog, Mission::Sgs)?;
    let mut metadata = segment_metadata(&file, &catalog)?;

    let product = metadata.channel.clone();
    metadata.channel = channel_name(&product);
    metadata.sublon = sub_satellite_longitude(&product)?;
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

/// The first four characters of the product name: `10_7`.
pub fn channel_name(product: &str) -> String {
    product.chars().take(4).collect()
}

/// `10_7_135W` is -135.0, `00_7_075E` is 75.0.
pub fn sub_satellite_longitude(product: &str) -> Result<f64> {
    let invalid = || LoaderError::metadata(format!("no sub-satellite longitude in product name '{product}'"));
    let hemisphere = product.chars().last().ok_or_else(invalid)?;
    let digits = product
        .get(5..product.len() - hemisphere.len_utf8())
        .filter(|d| !d.is_empty())
        .ok_or_else(invalid)?;
    let value: f64 = digits.replace('_', ".").parse().map_err(|_| invalid())?;
    match hemisphere {
        'W' => Ok(-value),
        'E' => Ok(value),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{temp_test_dir, SyntheticChannel};
    use xrit_common::FirstPixel;

    #[test]
    fn test_product_name() {
        assert_eq!(channel_name("10_7_135W"), "10_7");
        assert_eq!(sub_satellite_longitude("10_7_135W").unwrap(), -135.0);
        assert_eq!(sub_satellite_longitude("00_7_075E").unwrap(), 75.0);
        assert_eq!(sub_satellite_longitude("06_8_140_7E").unwrap(), 140.7);
        assert!(sub_satellite_longitude("10_7").is_err());
        assert!(sub_satellite_longitude("10_7_135X").is_err());
    }

    #[test]
    fn test_open_goes_image() {
        let dir = temp_test_dir();
        let mut channel = SyntheticChannel::small(10, 4, 7, 10);
        channel.platform = "GOES15".to_string();
        channel.channel = "10_7_135W".to_string();
        channel.planned_end = 7;
        let mut table = vec!["_UNIT:=KELVIN".to_string()];
        table.push("0:=330.0".to_string());
        table.push("1023:=163.0".to_string());
        channel.data_function = table;
        let paths = channel.write_segments(dir.path(), &[3, 4]);

        let source = open(&paths).unwrap();
        let mda = &source.metadata;
        assert_eq!(mda.channel, "10_7");
        assert_eq!(mda.satname, "GOES15");
        assert_eq!(mda.sublon, -135.0);
        assert_eq!(mda.first_pixel, FirstPixel::NorthWest);
        assert_eq!((mda.lines, mda.columns), (28, 10));
        assert_eq!(mda.loff, 14 + 8);
        assert_eq!(mda.calibration_unit, "KELVIN");
        assert!(source.calibrator.is_some());
    }
}

//! Loads windows of real EUMETSAT files. Skipped unless TEST_DATA_DIR holds them.

use chrono::{TimeZone, Utc};
use test_utils::{assert_approx_eq, require_test_files};
use xrit_loader::{CalibrationLevel, FirstPixel, ImageFiles, ImageLoader, LoaderConfig, PixelWindow, RasterRegion};
use xrit_parser::Mission;

const PROLOGUE: &str = "H-000-MSG2__-MSG2________-_________-PRO______-201010111400-__";
const EPILOGUE: &str = "H-000-MSG2__-MSG2________-_________-EPI______-201010111400-__";

/// Reference sums of the 300 x 900 IR_108 window at rows 1656, columns 1756.
const IR_108_SUM_COUNTS: u64 = 121_795_059;
const IR_108_SUM_KELVIN: f64 = 75_116_847.263172984;

/// Reference sum of the 600 x 1000 HRV window at rows 5168, columns 5068.
const HRV_SUM_REFLECTANCE: f64 = 11_328_340.753558;

fn open_msg(paths: &[std::path::PathBuf]) -> ImageLoader {
    let files = ImageFiles::new(paths[2..].to_vec())
        .with_prologue(&paths[0])
        .with_epilogue(&paths[1]);
    ImageLoader::open(Mission::MsgHrit, &files, LoaderConfig::default()).expect("image should open")
}

fn finite_sum(values: &RasterRegion<f32>) -> f64 {
    values.data.iter().filter(|v| v.is_finite()).map(|&v| v as f64).sum()
}

#[test]
fn test_real_msg_metadata() {
    let paths = require_test_files!(
        PROLOGUE,
        EPILOGUE,
        "H-000-MSG2__-MSG2________-IR_108___-000004___-201010111400-__",
        "H-000-MSG2__-MSG2________-IR_108___-000005___-201010111400-__",
    );
    let loader = open_msg(&paths);

    let mda = loader.metadata();
    assert_eq!(mda.satname, "MSG2");
    assert_eq!(mda.first_pixel, FirstPixel::SouthEast);
    assert_eq!((mda.lines, mda.columns), (3712, 3712));
    assert_eq!(mda.segment_lines, 464);
    assert_eq!((mda.coff, mda.loff), (1856, 1856));
    assert_approx_eq!(mda.sublon, 0.0, 1e-4);
    assert_eq!(mda.time_stamp, Some(Utc.with_ymd_and_hms(2010, 10, 11, 14, 0, 0).unwrap()));
}

#[test]
fn test_real_msg_ir_108_window() {
    let paths = require_test_files!(
        PROLOGUE,
        EPILOGUE,
        "H-000-MSG2__-MSG2________-IR_108___-000004___-201010111400-__",
        "H-000-MSG2__-MSG2________-IR_108___-000005___-201010111400-__",
    );
    let loader = open_msg(&paths);

    // Normalized rows 1656..1956 fall in segments 4 and 5.
    let image = loader.slice(&PixelWindow::new(1656..1956, 1756..2656)).unwrap();
    assert_eq!(image.shape(), (300, 900));
    assert!(image.warnings.is_empty());
    assert_eq!(image.raster.sum(), IR_108_SUM_COUNTS);

    let temperature = loader.calibrate(&image, CalibrationLevel::Default).unwrap();
    assert_eq!(temperature.unit, "K");
    let sum = finite_sum(&temperature.values);
    assert_approx_eq!(sum, IR_108_SUM_KELVIN, IR_108_SUM_KELVIN * 1e-3);
}

#[test]
fn test_real_msg_hrv_window() {
    let paths = require_test_files!(
        PROLOGUE,
        EPILOGUE,
        "H-000-MSG2__-MSG2________-HRV______-000012___-201010111400-__",
        "H-000-MSG2__-MSG2________-HRV______-000013___-201010111400-__",
    );
    let loader = open_msg(&paths);
    assert_eq!(loader.metadata().channel, "HRV");

    let image = loader.slice(&PixelWindow::new(5168..5768, 5068..6068)).unwrap();
    assert_eq!(image.shape(), (600, 1000));

    let reflectance = loader.calibrate(&image, CalibrationLevel::Default).unwrap();
    assert_eq!(reflectance.unit, "%");
    let sum = finite_sum(&reflectance.values);
    assert_approx_eq!(sum, HRV_SUM_REFLECTANCE, HRV_SUM_REFLECTANCE * 1e-3);
}

//! MSG HRIT channels: grid orientation, partial coverage and calibration.

mod common;

use common::{disk_raster, grid, msg_image, normalize, small_msg_channel, WrittenImage};
use test_utils::{assert_approx_eq, MsgEpilogueSpec, MsgPrologueSpec, SyntheticChannel};
use xrit_loader::calibration::RADIANCE_UNIT;
use xrit_loader::{CalibrationLevel, FirstPixel, LoadWarning, LoaderConfig, PixelWindow};
use xrit_parser::Mission;

const LOWER_HRV: [i32; 4] = [1, 16, 1, 12];
const UPPER_HRV: [i32; 4] = [17, 24, 7, 18];

/// A 24 by 24 HRV image whose 12 column segment lines sit in two
/// boundaries: the lower one at the east edge, the upper one shifted west.
fn hrv_image(segments: &[u16]) -> WrittenImage {
    let channel = SyntheticChannel {
        channel: "HRV".to_string(),
        ..SyntheticChannel::small(12, 4, 6, 10)
    };
    let prologue = MsgPrologueSpec {
        hrv: grid(24, 24, 2),
        ..Default::default()
    };
    let epilogue = MsgEpilogueSpec {
        lower_hrv: LOWER_HRV,
        upper_hrv: UPPER_HRV,
        ..Default::default()
    };
    msg_image(channel, segments, &prologue, &epilogue)
}

fn masked() -> LoaderConfig {
    LoaderConfig {
        mask: true,
        ..Default::default()
    }
}

#[test]
fn test_every_grid_origin() {
    for origin in 0..4u8 {
        let (channel, prologue, epilogue) = small_msg_channel(origin, [1, 12, 1, 16]);
        let image = msg_image(channel, &[1, 2, 3], &prologue, &epilogue);
        let loader = image.open(Mission::MsgHrit, LoaderConfig::default());
        let first_pixel = loader.metadata().first_pixel;
        assert_eq!(first_pixel, FirstPixel::from_grid_origin(origin).unwrap());

        let disk = disk_raster(&image.channel, 12, 16, &[[1, 12, 1, 16]]);
        let expected = normalize(&disk, 12, 16, first_pixel);
        let loaded = loader.full().unwrap();
        assert_eq!(loaded.raster.data, expected, "origin {origin}");
        assert_eq!(loaded.metadata.first_pixel, FirstPixel::NorthWest);

        // A window straddling segments picks the same cells as the full read.
        let window = PixelWindow::new(3..9, 5..14);
        let part = loader.slice(&window).unwrap();
        assert_eq!(part.raster, loaded.raster.window(&window).unwrap(), "origin {origin}");
    }
}

#[test]
fn test_vis_ir_metadata() {
    let (channel, prologue, epilogue) = small_msg_channel(2, [1, 12, 1, 16]);
    let image = msg_image(channel, &[1, 2, 3], &prologue, &epilogue);
    let loader = image.open(Mission::MsgHrit, LoaderConfig::default());
    let mda = loader.metadata();
    assert_eq!(mda.satname, "MSG3");
    assert_eq!(mda.channel, "IR_108");
    assert_eq!((mda.lines, mda.columns), (12, 16));
    assert_eq!(mda.first_pixel, FirstPixel::SouthEast);
    assert_eq!(mda.boundaries.len(), 1);
    assert_eq!(mda.no_data_value, 0);
}

#[test]
fn test_partial_vis_ir_coverage_is_masked() {
    let coverage = [1, 12, 1, 10];
    let (channel, prologue, epilogue) = small_msg_channel(2, coverage);
    let image = msg_image(channel, &[1, 2, 3], &prologue, &epilogue);
    let loader = image.open(Mission::MsgHrit, masked());

    let loaded = loader.full().unwrap();
    let disk = disk_raster(&image.channel, 12, 16, &[coverage]);
    assert_eq!(loaded.raster.data, normalize(&disk, 12, 16, FirstPixel::SouthEast));
    for row in 0..12 {
        for col in 0..16 {
            // On-disk columns 10..16 lie west of the coverage.
            assert_eq!(loaded.raster.is_masked(row, col), col <= 5, "({row}, {col})");
        }
    }
    assert!(loaded.warnings.is_empty());
}

#[test]
fn test_hrv_boundaries_composited() {
    let image = hrv_image(&[1, 2, 3, 4, 5, 6]);
    let loader = image.open(Mission::MsgHrit, masked());
    assert_eq!((loader.metadata().lines, loader.metadata().columns), (24, 24));
    assert_eq!(loader.metadata().boundaries.len(), 2);

    let disk = disk_raster(&image.channel, 24, 24, &[LOWER_HRV, UPPER_HRV]);
    let expected = normalize(&disk, 24, 24, FirstPixel::SouthEast);
    let loaded = loader.full().unwrap();
    assert_eq!(loaded.raster.data, expected);
    assert!(loaded.warnings.is_empty());

    // Masked exactly where no boundary has data.
    for (i, &v) in expected.iter().enumerate() {
        assert_eq!(loaded.raster.is_masked(i / 24, i % 24), v == 0, "cell {i}");
    }

    // A window across the step between the boundaries.
    let window = PixelWindow::new(2..10, 3..20);
    let part = loader.slice(&window).unwrap();
    assert_eq!(part.raster.data, loaded.raster.window(&window).unwrap().data);
}

#[test]
fn test_hrv_window_outside_boundaries() {
    let image = hrv_image(&[1, 2, 3, 4, 5, 6]);
    let loader = image.open(Mission::MsgHrit, masked());
    // On-disk rows 0..4, columns 18..24: south of the upper boundary and
    // west of the lower one.
    let loaded = loader.slice(&PixelWindow::new(20..24, 0..6)).unwrap();
    assert_eq!(loaded.warnings, vec![LoadWarning::NoBoundaryIntersects]);
    assert_eq!(loaded.raster.sum(), 0);
    assert!(loaded.raster.mask.as_ref().unwrap().iter().all(|&m| m));
}

#[test]
fn test_hrv_missing_segment() {
    let image = hrv_image(&[1, 2, 3, 4, 6]);
    let loader = image.open(Mission::MsgHrit, LoaderConfig::default());
    let loaded = loader.full().unwrap();

    // On-disk rows 16..20 are normalized rows 4..8.
    assert_eq!(
        loaded.warnings,
        vec![LoadWarning::MissingSegment { segment: 5, rows: 4..8 }]
    );
    for row in 4..8 {
        assert!(loaded.raster.row(row).iter().all(|&v| v == 0), "row {row}");
    }
    let mut disk = disk_raster(&image.channel, 24, 24, &[LOWER_HRV, UPPER_HRV]);
    disk[16 * 24..20 * 24].fill(0);
    assert_eq!(loaded.raster.data, normalize(&disk, 24, 24, FirstPixel::SouthEast));
}

#[test]
fn test_parallel_hrv_read() {
    let image = hrv_image(&[1, 2, 3, 4, 5, 6]);
    let sequential = image.open(Mission::MsgHrit, LoaderConfig::default());
    let parallel = image.open(
        Mission::MsgHrit,
        LoaderConfig {
            parallel_segments: true,
            ..Default::default()
        },
    );
    assert_eq!(
        sequential.full().unwrap().raster,
        parallel.full().unwrap().raster
    );
}

#[test]
fn test_radiance_through_loader() {
    let coverage = [1, 12, 1, 10];
    let (channel, prologue, epilogue) = small_msg_channel(2, coverage);
    let image = msg_image(channel, &[1, 2, 3], &prologue, &epilogue);
    let loader = image.open(Mission::MsgHrit, masked());
    let loaded = loader.full().unwrap();

    let radiance = loader.calibrate(&loaded, CalibrationLevel::Radiance).unwrap();
    assert_eq!(radiance.unit, RADIANCE_UNIT);
    for (i, &count) in loaded.raster.data.iter().enumerate() {
        let value = radiance.values.data[i];
        if loaded.raster.is_masked(i / 16, i % 16) {
            assert!(value.is_nan(), "cell {i}");
        } else {
            assert_approx_eq!(value, (count as f64 * 0.2 - 10.0).max(0.0), 1e-3);
        }
    }

    let temperature = loader.calibrate(&loaded, CalibrationLevel::Default).unwrap();
    assert_eq!(temperature.unit, "K");
    let counts = loader.calibrate(&loaded, CalibrationLevel::Counts).unwrap();
    assert_eq!(counts.values.data[0], loaded.raster.data[0] as f32);
}

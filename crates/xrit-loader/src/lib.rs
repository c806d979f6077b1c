//! Windowed image loading from xRIT segment files.
//!
//! This crate turns the segment files of one satellite image into dense
//! count rasters for arbitrary windows. It enables:
//!
//! - **Partial reads**: only the segments and lines a window needs are read
//! - **Orientation handling**: output is always north up, west left
//! - **Partial channels**: MSG boundaries are composited with no-data fill
//! - **Calibration**: counts to physical units through [`Calibrator`]
//!
//! # Architecture
//!
//! ```text
//! ImageLoader::slice(window)
//!      │
//!      ├─► OrientationNormalizer: normalized window → on-disk window
//!      │
//!      ├─► resolve(): on-disk rows → (segment, first line, last line)
//!      │
//!      ├─► RegionAssembler, per span (optionally on rayon)
//!      │         │
//!      │         ├─► segment present: read lines, unpack, mirror
//!      │         │
//!      │         └─► segment missing: keep no-data, LoadWarning
//!      │
//!      └─► LoadedImage { sliced metadata, raster, warnings }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use xrit_loader::{ImageFiles, ImageLoader, LoaderConfig, PixelWindow};
//! use xrit_parser::Mission;
//!
//! let files = ImageFiles::new(segments)
//!     .with_prologue(prologue)
//!     .with_epilogue(epilogue);
//! let loader = ImageLoader::open(Mission::MsgHrit, &files, LoaderConfig::from_env())?;
//!
//! let image = loader.slice(&PixelWindow::new(1656..1956, 1756..2656))?;
//! for warning in &image.warnings {
//!     eprintln!("{warning}");
//! }
//! ```

pub mod assembler;
pub mod calibration;
pub mod config;
pub mod decompress;
pub mod error;
pub mod loader;
pub mod missions;
pub mod normalizer;
pub mod resolver;
pub mod types;

// Re-export commonly used types at crate root
pub use assembler::{AssembledRegion, RegionAssembler};
pub use calibration::{
    CalibratedRaster, CalibrationLevel, CalibrationTable, Calibrator, MsgCalibrator, TableCalibrator,
};
pub use config::{LoaderConfig, SatelliteConfig};
pub use decompress::{Decompressor, XritDecompress};
pub use error::{LoaderError, Result};
pub use loader::{ImageFiles, ImageLoader};
pub use missions::{open_source, ImageSource};
pub use resolver::{resolve, SegmentSpan};
pub use types::{Boundary, ImageMetadata, LoadWarning, LoadedImage, RasterRegion};
pub use xrit_common::{AreaExtent, FirstPixel, PixelWindow};

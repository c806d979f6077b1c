//! Core types for loaded images.

use std::fmt;
use std::ops::Range;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use xrit_common::{AreaExtent, FirstPixel, PixelWindow};

use crate::error::{LoaderError, Result};

/// Distance from the Earth's centre to a geostationary satellite, less the
/// Earth's radius, in metres.
pub const SATELLITE_HEIGHT: f64 = 35_785_831.0;

/// MSG VIS/IR sampling distance at the sub-satellite point, metres.
pub const MSG_VIS_IR_PIXEL_SIZE: f64 = 3000.403165817;

/// MSG HRV sampling distance at the sub-satellite point, metres.
pub const MSG_HRV_PIXEL_SIZE: f64 = 1000.134348869;

/// Pixel size in metres implied by a navigation column/line scaling factor.
pub fn pixel_size_from_factor(factor: i32) -> f64 {
    let degrees = 2f64.powi(16) / (factor as f64).abs();
    SATELLITE_HEIGHT * degrees.to_radians().tan()
}

/// A rectangle of the on-disk raster that carries data, 1-based inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Boundary {
    pub south: i64,
    pub north: i64,
    pub east: i64,
    pub west: i64,
}

impl Boundary {
    pub fn new(south: i64, north: i64, east: i64, west: i64) -> Self {
        Self {
            south,
            north,
            east,
            west,
        }
    }

    /// The boundary as a 0-based on-disk window.
    pub fn raw_window(&self) -> Result<PixelWindow> {
        if self.south < 1 || self.east < 1 || self.north < self.south || self.west < self.east {
            return Err(LoaderError::metadata(format!("invalid boundary {self:?}")));
        }
        Ok(PixelWindow::new(
            (self.south - 1) as usize..self.north as usize,
            (self.east - 1) as usize..self.west as usize,
        ))
    }
}

/// Everything known about an image (or a window of it) apart from its pixels.
///
/// Windowing never mutates an instance; [`ImageMetadata::sliced`] returns a
/// new value describing the served window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// Platform, e.g. "MSG3".
    pub satname: String,
    pub product_name: String,
    pub channel: String,
    /// "full disc" for a whole image, "sliced" after windowing.
    pub region_name: String,
    pub columns: usize,
    pub lines: usize,
    pub first_pixel: FirstPixel,
    /// Projection units per column.
    pub column_scale: f64,
    /// Projection units per line.
    pub line_scale: f64,
    /// Column of the projection origin, 1-based, in on-disk orientation.
    pub coff: i64,
    /// Line of the projection origin, 1-based, in on-disk orientation.
    pub loff: i64,
    /// Sub-satellite longitude, degrees east.
    pub sublon: f64,
    pub no_data_value: u16,
    pub bits_per_pixel: u8,
    /// Lines per segment file.
    pub segment_lines: usize,
    /// Segment number holding on-disk row 0.
    pub first_segment: u16,
    /// Data-carrying rectangles for partially covered channels.
    pub boundaries: Vec<Boundary>,
    pub area_extent: Option<AreaExtent>,
    pub time_stamp: Option<DateTime<Utc>>,
    pub calibration_unit: String,
}

impl Default for ImageMetadata {
    fn default() -> Self {
        Self {
            satname: String::new(),
            product_name: String::new(),
            channel: String::new(),
            region_name: "full disc".to_string(),
            columns: 0,
            lines: 0,
            first_pixel: FirstPixel::NorthWest,
            column_scale: 0.0,
            line_scale: 0.0,
            coff: 0,
            loff: 0,
            sublon: 0.0,
            no_data_value: 0,
            bits_per_pixel: 0,
            segment_lines: 0,
            first_segment: 1,
            boundaries: Vec::new(),
            area_extent: None,
            time_stamp: None,
            calibration_unit: "counts".to_string(),
        }
    }
}

impl ImageMetadata {
    /// The whole image as a window.
    pub fn full_window(&self) -> PixelWindow {
        PixelWindow::full(self.lines, self.columns)
    }

    /// Fails with `WindowOutOfRange` unless `window` is a non-empty window
    /// inside the image.
    pub fn check_window(&self, window: &PixelWindow) -> Result<()> {
        if window.is_empty() || !window.fits(self.lines, self.columns) {
            return Err(LoaderError::WindowOutOfRange {
                window: window.clone(),
                lines: self.lines,
                columns: self.columns,
            });
        }
        Ok(())
    }
}

/// A dense row-major raster.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterRegion<T> {
    pub data: Vec<T>,
    pub width: usize,
    pub height: usize,
    /// True for cells that hold no data.
    pub mask: Option<Vec<bool>>,
}

impl<T: Copy> RasterRegion<T> {
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Self {
            data: vec![value; width * height],
            width,
            height,
            mask: None,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        if row >= self.height || col >= self.width {
            return None;
        }
        self.data.get(row * self.width + col).copied()
    }

    pub fn row(&self, row: usize) -> &[T] {
        &self.data[row * self.width..(row + 1) * self.width]
    }

    /// Whether a cell is masked out.
    pub fn is_masked(&self, row: usize, col: usize) -> bool {
        self.mask
            .as_ref()
            .and_then(|m| m.get(row * self.width + col).copied())
            .unwrap_or(false)
    }

    /// Copy of a sub-window of this raster.
    pub fn window(&self, window: &PixelWindow) -> Option<Self> {
        if !window.fits(self.height, self.width) {
            return None;
        }
        let mut data = Vec::with_capacity(window.height() * window.width());
        let mut mask = self.mask.as_ref().map(|_| Vec::with_capacity(data.capacity()));
        for row in window.rows.clone() {
            let range = row * self.width + window.cols.start..row * self.width + window.cols.end;
            data.extend_from_slice(&self.data[range.clone()]);
            if let (Some(out), Some(src)) = (mask.as_mut(), self.mask.as_ref()) {
                out.extend_from_slice(&src[range]);
            }
        }
        Some(Self {
            data,
            width: window.width(),
            height: window.height(),
            mask,
        })
    }
}

impl RasterRegion<u16> {
    /// Sum of all unmasked cells.
    pub fn sum(&self) -> u64 {
        match &self.mask {
            Some(mask) => self
                .data
                .iter()
                .zip(mask)
                .filter(|(_, &m)| !m)
                .map(|(&v, _)| v as u64)
                .sum(),
            None => self.data.iter().map(|&v| v as u64).sum(),
        }
    }

    /// Smallest and largest unmasked value.
    pub fn min_max(&self) -> Option<(u16, u16)> {
        let values = self.data.iter().enumerate().filter_map(|(i, &v)| {
            let masked = self.mask.as_ref().is_some_and(|m| m[i]);
            (!masked).then_some(v)
        });
        values.fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }

    /// Mask cells equal to `no_data`.
    pub fn mask_value(&mut self, no_data: u16) {
        self.mask = Some(self.data.iter().map(|&v| v == no_data).collect());
    }
}

/// A recoverable problem met while loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoadWarning {
    /// A segment expected by the window was not supplied; its rows hold no-data.
    MissingSegment { segment: u16, rows: Range<usize> },
    /// No data-carrying boundary intersects the window.
    NoBoundaryIntersects,
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadWarning::MissingSegment { segment, rows } => write!(
                f,
                "segment {segment} missing, output rows {}..{} hold no-data",
                rows.start, rows.end
            ),
            LoadWarning::NoBoundaryIntersects => write!(f, "window does not intersect any data boundary"),
        }
    }
}

/// Pixels of a window plus the metadata describing it.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub metadata: ImageMetadata,
    pub raster: RasterRegion<u16>,
    pub warnings: Vec<LoadWarning>,
}

impl LoadedImage {
    pub fn shape(&self) -> (usize, usize) {
        self.raster.shape()
    }
}

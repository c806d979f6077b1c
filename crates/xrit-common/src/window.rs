//! Rectangular pixel windows.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{CommonError, CommonResult};
use crate::orientation::FirstPixel;

/// A 0-based, start-inclusive/stop-exclusive window of rows and columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelWindow {
    pub rows: Range<usize>,
    pub cols: Range<usize>,
}

impl PixelWindow {
    pub fn new(rows: Range<usize>, cols: Range<usize>) -> Self {
        Self { rows, cols }
    }

    /// The whole image.
    pub fn full(lines: usize, columns: usize) -> Self {
        Self {
            rows: 0..lines,
            cols: 0..columns,
        }
    }

    /// A single row spanning all columns.
    pub fn row(row: usize, columns: usize) -> Self {
        Self {
            rows: row..row + 1,
            cols: 0..columns,
        }
    }

    pub fn height(&self) -> usize {
        self.rows.end.saturating_sub(self.rows.start)
    }

    pub fn width(&self) -> usize {
        self.cols.end.saturating_sub(self.cols.start)
    }

    pub fn is_empty(&self) -> bool {
        self.height() == 0 || self.width() == 0
    }

    /// True when the window lies inside an image of `lines` x `columns`.
    pub fn fits(&self, lines: usize, columns: usize) -> bool {
        self.rows.start <= self.rows.end
            && self.cols.start <= self.cols.end
            && self.rows.end <= lines
            && self.cols.end <= columns
    }

    /// Overlap of two windows, `None` when they share no pixel.
    pub fn intersection(&self, other: &PixelWindow) -> Option<PixelWindow> {
        let rows = self.rows.start.max(other.rows.start)..self.rows.end.min(other.rows.end);
        let cols = self.cols.start.max(other.cols.start)..self.cols.end.min(other.cols.end);
        if rows.start >= rows.end || cols.start >= cols.end {
            return None;
        }
        Some(PixelWindow { rows, cols })
    }

    /// Express this window relative to the top-left corner of `origin`.
    pub fn relative_to(&self, origin: &PixelWindow) -> PixelWindow {
        PixelWindow {
            rows: self.rows.start - origin.rows.start..self.rows.end - origin.rows.start,
            cols: self.cols.start - origin.cols.start..self.cols.end - origin.cols.start,
        }
    }

    /// Mirror the rows against an image of `lines` rows.
    pub fn flip_rows(&self, lines: usize) -> PixelWindow {
        PixelWindow {
            rows: lines.saturating_sub(self.rows.end)..lines.saturating_sub(self.rows.start),
            cols: self.cols.clone(),
        }
    }

    /// Mirror the columns against an image of `columns` columns.
    pub fn flip_cols(&self, columns: usize) -> PixelWindow {
        PixelWindow {
            rows: self.rows.clone(),
            cols: columns.saturating_sub(self.cols.end)..columns.saturating_sub(self.cols.start),
        }
    }

    /// Map a window in normalized (north-west) coordinates onto the on-disk
    /// raster of an image whose first pixel is `first_pixel`.
    ///
    /// The window must fit inside the image.
    pub fn to_raw(&self, first_pixel: FirstPixel, lines: usize, columns: usize) -> PixelWindow {
        let mut raw = self.clone();
        if first_pixel.is_south() {
            raw = raw.flip_rows(lines);
        }
        if first_pixel.is_east() {
            raw = raw.flip_cols(columns);
        }
        raw
    }

    /// Inverse of [`PixelWindow::to_raw`].
    pub fn to_normalized(&self, first_pixel: FirstPixel, lines: usize, columns: usize) -> PixelWindow {
        // Reflection is an involution.
        self.to_raw(first_pixel, lines, columns)
    }

    /// Parse `"start:stop"` into a range. An empty side means 0 or `limit`.
    pub fn parse_range(s: &str, limit: usize) -> CommonResult<Range<usize>> {
        let (start, stop) = s
            .split_once(':')
            .ok_or_else(|| CommonError::InvalidRange(s.to_string()))?;
        let parse = |v: &str, default: usize| -> CommonResult<usize> {
            let v = v.trim();
            if v.is_empty() {
                return Ok(default);
            }
            v.parse().map_err(|_| CommonError::InvalidRange(s.to_string()))
        };
        Ok(parse(start, 0)?..parse(stop, limit)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersection_and_relative() {
        let a = PixelWindow::new(10..20, 5..15);
        let b = PixelWindow::new(15..30, 0..8);
        let i = a.intersection(&b).unwrap();
        assert_eq!(i, PixelWindow::new(15..20, 5..8));
        assert_eq!(i.relative_to(&a), PixelWindow::new(5..10, 0..3));
    }

    #[test]
    fn test_touching_windows_do_not_intersect() {
        let a = PixelWindow::new(0..10, 0..10);
        let b = PixelWindow::new(10..20, 0..10);
        assert!(a.intersection(&b).is_none());
    }

    #[test]
    fn test_south_east_reflection() {
        let w = PixelWindow::new(0..100, 10..20);
        let raw = w.to_raw(FirstPixel::SouthEast, 3712, 3712);
        assert_eq!(raw, PixelWindow::new(3612..3712, 3692..3702));
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(PixelWindow::parse_range("10:20", 100).unwrap(), 10..20);
        assert_eq!(PixelWindow::parse_range(":", 100).unwrap(), 0..100);
        assert!(PixelWindow::parse_range("10", 100).is_err());
    }
}

//! Orientation normalization and the geographic extent path.
//!
//! Windows handed to and returned from the loader are in normalized
//! orientation: row 0 is the northernmost line, column 0 the westernmost
//! column. `coff`/`loff` in [`ImageMetadata`] are kept in on-disk orientation
//! and are mirrored here before any extent arithmetic.

use xrit_common::{AreaExtent, FirstPixel, PixelWindow};

use crate::error::{LoaderError, Result};
use crate::types::ImageMetadata;

impl ImageMetadata {
    /// 0-based column and line of the projection origin in normalized
    /// orientation.
    pub fn normalized_origin(&self) -> (f64, f64) {
        let coff = if self.first_pixel.is_east() {
            self.columns as f64 - self.coff as f64 - 1.0
        } else {
            self.coff as f64 - 1.0
        };
        let loff = if self.first_pixel.is_south() {
            self.lines as f64 - self.loff as f64 - 1.0
        } else {
            self.loff as f64 - 1.0
        };
        (coff, loff)
    }

    /// Normalized window to the on-disk window of this image.
    pub fn to_raw_window(&self, window: &PixelWindow) -> PixelWindow {
        window.to_raw(self.first_pixel, self.lines, self.columns)
    }

    /// On-disk window to the normalized window of this image.
    pub fn to_normalized_window(&self, raw: &PixelWindow) -> PixelWindow {
        raw.to_normalized(self.first_pixel, self.lines, self.columns)
    }

    /// Pixel window (normalized) covering a projection-plane extent.
    ///
    /// Rounding is half to even. The window is clipped to the image; an
    /// extent that misses the image entirely fails with `WindowOutOfRange`.
    pub fn window_from_extent(&self, extent: &AreaExtent) -> Result<PixelWindow> {
        if self.column_scale == 0.0 || self.line_scale == 0.0 {
            return Err(LoaderError::metadata("image has no pixel size"));
        }
        let (coff, loff) = self.normalized_origin();
        let xs = self.column_scale;
        let ys = self.line_scale;

        let col_start = (extent.ll_x / xs + coff + 0.5).round_ties_even() as i64;
        let row_stop = (extent.ll_y / -ys + loff - 0.5).round_ties_even() as i64 + 1;
        let col_stop = (extent.ur_x / xs + coff - 0.5).round_ties_even() as i64 + 1;
        let row_start = (extent.ur_y / -ys + loff + 0.5).round_ties_even() as i64;

        let clip = |v: i64, limit: usize| v.clamp(0, limit as i64) as usize;
        let window = PixelWindow::new(
            clip(row_start, self.lines)..clip(row_stop, self.lines),
            clip(col_start, self.columns)..clip(col_stop, self.columns),
        );
        self.check_window(&window)?;
        Ok(window)
    }

    /// Projection-plane extent of a normalized window. Corners are pixel edges.
    pub fn extent_of_window(&self, window: &PixelWindow) -> AreaExtent {
        let (coff, loff) = self.normalized_origin();
        let xs = self.column_scale;
        let ys = self.line_scale;
        let (r0, r1) = (window.rows.start as f64, window.rows.end as f64);
        let (c0, c1) = (window.cols.start as f64, window.cols.end as f64);
        AreaExtent::new(
            (c0 - coff - 0.5) * xs,
            -(r1 - 1.0 - loff + 0.5) * ys,
            (c1 - 1.0 - coff + 0.5) * xs,
            -(r0 - loff - 0.5) * ys,
        )
    }

    /// Metadata describing the normalized `window` of this image.
    pub fn sliced(&self, window: &PixelWindow) -> ImageMetadata {
        let (coff, loff) = self.normalized_origin();
        let region_name = if *window == self.full_window() {
            self.region_name.clone()
        } else {
            "sliced".to_string()
        };
        ImageMetadata {
            region_name,
            columns: window.width(),
            lines: window.height(),
            first_pixel: FirstPixel::NorthWest,
            coff: (coff - window.cols.start as f64 + 1.0).round() as i64,
            loff: (loff - window.rows.start as f64 + 1.0).round() as i64,
            boundaries: Vec::new(),
            area_extent: Some(self.extent_of_window(window)),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MSG_VIS_IR_PIXEL_SIZE;

    fn msg_metadata(first_pixel: FirstPixel) -> ImageMetadata {
        ImageMetadata {
            columns: 3712,
            lines: 3712,
            first_pixel,
            column_scale: MSG_VIS_IR_PIXEL_SIZE,
            line_scale: MSG_VIS_IR_PIXEL_SIZE,
            coff: 1856,
            loff: 1856,
            ..Default::default()
        }
    }

    #[test]
    fn test_full_disc_extent_is_symmetric() {
        for fp in FirstPixel::ALL {
            let mda = msg_metadata(fp);
            let extent = mda.extent_of_window(&mda.full_window());
            let half = 3712.0 / 2.0 * MSG_VIS_IR_PIXEL_SIZE;
            let tol = MSG_VIS_IR_PIXEL_SIZE + 1e-6;
            assert!((extent.ll_x + half).abs() <= tol, "{fp:?} {extent:?}");
            assert!((extent.ur_x - half).abs() <= tol, "{fp:?} {extent:?}");
            assert!((extent.ur_y - half).abs() <= tol, "{fp:?} {extent:?}");
            assert!((extent.width() - 3712.0 * MSG_VIS_IR_PIXEL_SIZE).abs() < 1e-6);
        }
    }

    #[test]
    fn test_extent_round_trip() {
        let window = PixelWindow::new(1656..1956, 1756..2656);
        for fp in FirstPixel::ALL {
            let mda = msg_metadata(fp);
            let extent = mda.extent_of_window(&window);
            assert_eq!(mda.window_from_extent(&extent).unwrap(), window, "{fp:?}");
        }
    }

    #[test]
    fn test_extent_outside_image() {
        let mda = msg_metadata(FirstPixel::SouthEast);
        let far = AreaExtent::new(1e8, 1e8, 1.1e8, 1.1e8);
        assert!(matches!(
            mda.window_from_extent(&far),
            Err(LoaderError::WindowOutOfRange { .. })
        ));
    }

    #[test]
    fn test_sliced_metadata() {
        let mda = msg_metadata(FirstPixel::SouthEast);
        let window = PixelWindow::new(100..300, 50..150);
        let sliced = mda.sliced(&window);
        assert_eq!((sliced.columns, sliced.lines), (100, 200));
        assert_eq!(sliced.first_pixel, FirstPixel::NorthWest);
        assert_eq!(sliced.region_name, "sliced");
        assert_eq!(sliced.area_extent, Some(mda.extent_of_window(&window)));

        // The window's own extent is unchanged when computed from the slice.
        let own = sliced.extent_of_window(&sliced.full_window());
        let expected = mda.extent_of_window(&window);
        for (a, b) in own.to_array().iter().zip(expected.to_array()) {
            assert!((a - b).abs() < 1e-6, "{own:?} vs {expected:?}");
        }

        assert_eq!(mda.sliced(&mda.full_window()).region_name, "full disc");
    }

    #[test]
    fn test_raw_window_mapping() {
        let mda = msg_metadata(FirstPixel::SouthEast);
        let window = PixelWindow::new(0..10, 0..20);
        let raw = mda.to_raw_window(&window);
        assert_eq!(raw, PixelWindow::new(3702..3712, 3692..3712));
        assert_eq!(mda.to_normalized_window(&raw), window);
    }
}

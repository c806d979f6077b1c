//! The image loader facade.
//!
//! An [`ImageLoader`] holds the metadata and segment catalog of one image
//! and serves windows of it. Windows are given and returned in normalized
//! orientation (north up, west left); the loader maps them onto the on-disk
//! raster, reads the segments involved and mirrors the result.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use xrit_common::{AreaExtent, PixelWindow};
use xrit_parser::segment::is_compressed_name;
use xrit_parser::{Mission, SegmentCatalog};

use crate::assembler::RegionAssembler;
use crate::calibration::{as_counts, CalibratedRaster, CalibrationLevel, Calibrator};
use crate::config::{LoaderConfig, SatelliteConfig};
use crate::decompress::{decompress_all, Decompressor, XritDecompress};
use crate::error::{LoaderError, Result};
use crate::missions::{open_source, ImageSource};
use crate::types::{ImageMetadata, LoadWarning, LoadedImage, RasterRegion};

/// The files making up one image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageFiles {
    pub segments: Vec<PathBuf>,
    /// MSG HRIT prologue.
    pub prologue: Option<PathBuf>,
    /// MSG HRIT epilogue.
    pub epilogue: Option<PathBuf>,
    /// Channel to read from a native MSG file.
    pub channel: Option<String>,
}

impl ImageFiles {
    pub fn new(segments: Vec<PathBuf>) -> Self {
        Self {
            segments,
            ..Default::default()
        }
    }

    pub fn with_prologue(mut self, path: impl Into<PathBuf>) -> Self {
        self.prologue = Some(path.into());
        self
    }

    pub fn with_epilogue(mut self, path: impl Into<PathBuf>) -> Self {
        self.epilogue = Some(path.into());
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Locate the files of `channel` at `time` from a satellite configuration.
    ///
    /// Returns the mission named by the instrument (base when unnamed) along
    /// with the files found on disk.
    pub fn from_config(
        config: &SatelliteConfig,
        instrument: Option<&str>,
        channel: &str,
        time: DateTime<Utc>,
    ) -> Result<(Mission, Self)> {
        let (name, instrument) = config.instrument(instrument)?;
        instrument.channel(channel)?;
        let mission = match instrument.mission.as_deref() {
            Some(m) => m.parse()?,
            None => Mission::Base,
        };
        let level1 = &instrument.level1;

        let segments = level1.find_segments(channel, time)?;
        if segments.is_empty() {
            return Err(LoaderError::MissingSegments(format!(
                "{} {name} {channel} at {}",
                config.satname,
                time.format("%Y-%m-%d %H:%M")
            )));
        }
        let mut files = Self::new(segments).with_channel(channel);
        files.prologue = level1.prologue_path(time);
        files.epilogue = level1.epilogue_path(time);
        debug!(
            satname = %config.satname,
            instrument = name,
            channel,
            segments = files.segments.len(),
            "located image files"
        );
        Ok((mission, files))
    }

    fn has_compressed(&self) -> bool {
        self.segments
            .iter()
            .chain(&self.prologue)
            .chain(&self.epilogue)
            .any(|p| is_compressed_name(p))
    }

    /// Replace compressed files with decompressed copies.
    pub fn decompressed(&self, decompressor: &dyn Decompressor) -> Result<Self> {
        let single = |p: &Option<PathBuf>| p.as_deref().map(|p| decompressor.decompress(p)).transpose();
        Ok(Self {
            segments: decompress_all(decompressor, &self.segments)?,
            prologue: single(&self.prologue)?,
            epilogue: single(&self.epilogue)?,
            channel: self.channel.clone(),
        })
    }
}

/// Serves windows of one image.
#[derive(Debug, Clone)]
pub struct ImageLoader {
    metadata: ImageMetadata,
    catalog: SegmentCatalog,
    calibrator: Option<Arc<dyn Calibrator>>,
    config: LoaderConfig,
}

impl ImageLoader {
    /// Wrap an already read image source.
    pub fn new(source: ImageSource) -> Self {
        Self {
            metadata: source.metadata,
            catalog: source.catalog,
            calibrator: source.calibrator,
            config: LoaderConfig::default(),
        }
    }

    /// Read the metadata of an image.
    ///
    /// Compressed files are first decompressed with the program named by
    /// `config.decompress_path`.
    pub fn open(mission: Mission, files: &ImageFiles, config: LoaderConfig) -> Result<Self> {
        config.validate().map_err(LoaderError::Config)?;
        if files.has_compressed() {
            let decompressor = XritDecompress::from_config(&config)?;
            return Self::open_with(mission, files, config, &decompressor);
        }
        Ok(Self::new(open_source(mission, files)?).with_config(config))
    }

    /// [`ImageLoader::open`] with an explicit decompressor.
    pub fn open_with(
        mission: Mission,
        files: &ImageFiles,
        config: LoaderConfig,
        decompressor: &dyn Decompressor,
    ) -> Result<Self> {
        config.validate().map_err(LoaderError::Config)?;
        let files = files.decompressed(decompressor)?;
        Ok(Self::new(open_source(mission, &files)?).with_config(config))
    }

    pub fn with_config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the calibrator built from the headers.
    pub fn with_calibrator(mut self, calibrator: Arc<dyn Calibrator>) -> Self {
        self.calibrator = Some(calibrator);
        self
    }

    pub fn metadata(&self) -> &ImageMetadata {
        &self.metadata
    }

    pub fn catalog(&self) -> &SegmentCatalog {
        &self.catalog
    }

    pub fn calibrator(&self) -> Option<&Arc<dyn Calibrator>> {
        self.calibrator.as_ref()
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Load a window given in normalized orientation.
    ///
    /// # Arguments
    /// * `window` - Rows and columns, 0-based with exclusive ends, row 0 north
    ///
    /// # Returns
    /// Counts of the window, metadata describing it, and a warning per
    /// segment that was expected but not supplied.
    pub fn slice(&self, window: &PixelWindow) -> Result<LoadedImage> {
        self.metadata.check_window(window)?;
        let raw = self.metadata.to_raw_window(window);
        self.load(window, &raw)
    }

    /// Load a window given in on-disk orientation.
    pub fn raw_slice(&self, raw: &PixelWindow) -> Result<LoadedImage> {
        self.metadata.check_window(raw)?;
        let window = self.metadata.to_normalized_window(raw);
        self.load(&window, raw)
    }

    /// Load the pixels covering a projection-plane extent.
    pub fn by_extent(&self, extent: &AreaExtent) -> Result<LoadedImage> {
        let window = self.metadata.window_from_extent(extent)?;
        debug!(?extent, rows = ?window.rows, cols = ?window.cols, "extent to window");
        self.slice(&window)
    }

    /// Load the whole image.
    pub fn full(&self) -> Result<LoadedImage> {
        self.slice(&self.metadata.full_window())
    }

    /// Convert the counts of a loaded window.
    pub fn calibrate(&self, image: &LoadedImage, level: CalibrationLevel) -> Result<CalibratedRaster> {
        match (&self.calibrator, level) {
            (Some(calibrator), _) => calibrator.calibrate(&image.raster, level),
            (None, CalibrationLevel::Counts) => Ok(as_counts(&image.raster)),
            (None, _) => Err(LoaderError::calibration(format!(
                "no calibration available for channel '{}'",
                self.metadata.channel
            ))),
        }
    }

    fn load(&self, window: &PixelWindow, raw: &PixelWindow) -> Result<LoadedImage> {
        let (raster, warnings) = if self.metadata.boundaries.is_empty() {
            self.read_plain(raw)?
        } else {
            self.read_boundaries(raw)?
        };
        info!(
            channel = %self.metadata.channel,
            rows = ?window.rows,
            cols = ?window.cols,
            warnings = warnings.len(),
            "loaded window"
        );
        Ok(LoadedImage {
            metadata: self.metadata.sliced(window),
            raster,
            warnings,
        })
    }

    fn assembler(&self) -> RegionAssembler<'_> {
        RegionAssembler::new(&self.catalog, self.metadata.first_pixel, self.metadata.no_data_value)
            .first_segment(self.metadata.first_segment)
            .parallel(self.config.parallel_segments)
    }

    fn read_plain(&self, raw: &PixelWindow) -> Result<(RasterRegion<u16>, Vec<LoadWarning>)> {
        let out = self.assembler().assemble(raw)?;
        let mut raster = out.raster;
        if self.config.mask {
            raster.mask_value(self.metadata.no_data_value);
        }
        Ok((raster, out.warnings))
    }

    /// Composite the data-carrying boundaries that overlap `raw`.
    ///
    /// Segment lines of a partially covered channel start at the east (or
    /// west) column of the boundary they belong to, so each overlap is read
    /// with columns relative to its boundary and placed at its position in
    /// the window. Cells outside every boundary keep the no-data value.
    fn read_boundaries(&self, raw: &PixelWindow) -> Result<(RasterRegion<u16>, Vec<LoadWarning>)> {
        let no_data = self.metadata.no_data_value;
        let first_pixel = self.metadata.first_pixel;
        let (height, width) = (raw.height(), raw.width());
        let mut raster = RasterRegion::filled(width, height, no_data);
        let mut written = vec![false; width * height];
        let mut warnings = Vec::new();
        let assembler = self.assembler();

        for boundary in &self.metadata.boundaries {
            let area = boundary.raw_window()?;
            let Some(piece) = raw.intersection(&area) else {
                continue;
            };
            let on_disk = PixelWindow::new(
                piece.rows.clone(),
                piece.cols.start - area.cols.start..piece.cols.end - area.cols.start,
            );
            debug!(?boundary, rows = ?on_disk.rows, cols = ?on_disk.cols, "reading boundary");
            let out = assembler.assemble(&on_disk)?;
            let place = piece.relative_to(raw).to_normalized(first_pixel, height, width);

            for (k, row) in place.rows.clone().enumerate() {
                let dest = row * width + place.cols.start..row * width + place.cols.end;
                raster.data[dest.clone()].copy_from_slice(out.raster.row(k));
                written[dest].fill(true);
            }
            warnings.extend(out.warnings.into_iter().map(|w| match w {
                LoadWarning::MissingSegment { segment, rows } => LoadWarning::MissingSegment {
                    segment,
                    rows: rows.start + place.rows.start..rows.end + place.rows.start,
                },
                other => other,
            }));
        }

        if !written.iter().any(|&w| w) {
            warn!(rows = ?raw.rows, cols = ?raw.cols, "window does not intersect any data boundary");
            warnings.push(LoadWarning::NoBoundaryIntersects);
        }
        warnings.sort_by_key(|w| match w {
            LoadWarning::MissingSegment { segment, rows } => (*segment, rows.start),
            LoadWarning::NoBoundaryIntersects => (0, 0),
        });
        if self.config.mask {
            raster.mask = Some(
                raster
                    .data
                    .iter()
                    .zip(&written)
                    .map(|(&v, &w)| !w || v == no_data)
                    .collect(),
            );
        }
        Ok((raster, warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{temp_test_dir, SyntheticChannel};
    use xrit_common::FirstPixel;

    fn base_loader(channel: &SyntheticChannel, segments: &[u16]) -> (tempfile::TempDir, ImageLoader) {
        let dir = temp_test_dir();
        let paths = channel.write_segments(dir.path(), segments);
        let loader = ImageLoader::open(Mission::Base, &ImageFiles::new(paths), LoaderConfig::default()).unwrap();
        (dir, loader)
    }

    #[test]
    fn test_slice_matches_disk() {
        let channel = SyntheticChannel::small(12, 4, 3, 10);
        let (_dir, loader) = base_loader(&channel, &[1, 2, 3]);
        let window = PixelWindow::new(2..9, 3..11);
        let image = loader.slice(&window).unwrap();
        assert_eq!(image.shape(), (7, 8));
        assert_eq!(image.raster.sum(), channel.raw_window_sum(2..9, 3..11));
        assert_eq!(image.metadata.region_name, "sliced");
        assert!(image.warnings.is_empty());
    }

    #[test]
    fn test_out_of_range_window() {
        let channel = SyntheticChannel::small(12, 4, 3, 10);
        let (_dir, loader) = base_loader(&channel, &[1, 2, 3]);
        for window in [PixelWindow::new(0..13, 0..4), PixelWindow::new(0..4, 5..13), PixelWindow::new(3..3, 0..4)] {
            assert!(matches!(
                loader.slice(&window),
                Err(LoaderError::WindowOutOfRange { .. })
            ));
        }
    }

    #[test]
    fn test_full_image_keeps_region_name() {
        let channel = SyntheticChannel::small(6, 2, 2, 8);
        let (_dir, loader) = base_loader(&channel, &[1, 2]);
        let image = loader.full().unwrap();
        assert_eq!(image.metadata.region_name, "full disc");
        assert_eq!(image.metadata.first_pixel, FirstPixel::NorthWest);
    }

    #[test]
    fn test_mask_and_counts_calibration() {
        let channel = SyntheticChannel::small(6, 2, 3, 10);
        let (_dir, loader) = base_loader(&channel, &[1, 3]);
        let config = LoaderConfig {
            mask: true,
            ..Default::default()
        };
        let loader = loader.with_config(config);
        let image = loader.full().unwrap();
        assert!(image.raster.is_masked(2, 0));
        assert!(!image.raster.is_masked(0, 0));

        let counts = loader.calibrate(&image, CalibrationLevel::Counts).unwrap();
        assert_eq!(counts.unit, "counts");
        assert_eq!(counts.values.data[0], image.raster.data[0] as f32);
        assert!(loader.calibrate(&image, CalibrationLevel::Default).is_err());
    }

    #[test]
    fn test_compressed_files_need_decompressor() {
        let files = ImageFiles::new(vec!["H-000-MSG3__-MSG3________-IR_108___-000001___-201510111400-C_".into()]);
        let err = ImageLoader::open(Mission::MsgHrit, &files, LoaderConfig::default()).unwrap_err();
        assert!(matches!(err, LoaderError::Decompression(_)), "{err}");
    }
}

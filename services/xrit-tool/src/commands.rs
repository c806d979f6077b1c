//! Subcommand implementations. Each writes its report to `out`.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use tracing::info;
use xrit_common::{AreaExtent, PixelWindow};
use xrit_loader::{
    CalibrationLevel, Decompressor, ImageFiles, ImageLoader, ImageMetadata, LoadWarning, LoaderConfig,
    SatelliteConfig, XritDecompress,
};
use xrit_parser::{Mission, SegmentCatalog, SegmentFile};

use crate::cli::{Commands, SliceArgs};

pub fn run(command: &Commands, out: &mut dyn Write) -> Result<()> {
    match command {
        Commands::Headers { file, mission, json } => headers(file, *mission, *json, out),
        Commands::Catalog { files, mission, json } => catalog(files, *mission, *json, out),
        Commands::Slice(args) => slice(args, out),
        Commands::Decompress { file, program, outdir } => {
            let decompressor = XritDecompress::new(program, outdir.clone());
            let path = decompressor
                .decompress(file)
                .with_context(|| format!("failed to decompress {}", file.display()))?;
            writeln!(out, "{}", path.display())?;
            Ok(())
        }
    }
}

pub fn headers(path: &Path, mission: Mission, json: bool, out: &mut dyn Write) -> Result<()> {
    let file = SegmentFile::open(path, mission).with_context(|| format!("failed to read {}", path.display()))?;
    if json {
        serde_json::to_writer_pretty(&mut *out, &file.records)?;
        writeln!(out)?;
        return Ok(());
    }
    writeln!(out, "{} ({:?}, {} header bytes)", path.display(), file.file_type(), file.header_length)?;
    for record in &file.records {
        writeln!(out, "{:>4} {:<26} {:>6}", record.tag, record.name, record.length)?;
        writeln!(out, "     {:?}", record.body)?;
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct CatalogRow {
    pub segment: u16,
    pub lines: usize,
    pub columns: usize,
    pub bits_per_pixel: u8,
    pub path: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct CatalogReport {
    pub planned_start: u16,
    pub planned_end: u16,
    pub segments: Vec<CatalogRow>,
    pub missing: Vec<u16>,
}

pub fn catalog(files: &[PathBuf], mission: Mission, json: bool, out: &mut dyn Write) -> Result<()> {
    let catalog = SegmentCatalog::build(files, mission).context("failed to catalog segments")?;
    let report = CatalogReport {
        planned_start: catalog.planned_start(),
        planned_end: catalog.planned_end(),
        segments: catalog
            .iter()
            .map(|d| CatalogRow {
                segment: d.segment_number,
                lines: d.lines,
                columns: d.columns,
                bits_per_pixel: d.bits_per_pixel,
                path: d.path.clone(),
            })
            .collect(),
        missing: catalog.missing(),
    };
    if json {
        serde_json::to_writer_pretty(&mut *out, &report)?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(out, "planned segments {}..={}", report.planned_start, report.planned_end)?;
    writeln!(out, "{:>7} {:>6} {:>7} {:>4}  path", "segment", "lines", "columns", "bits")?;
    for row in &report.segments {
        writeln!(
            out,
            "{:>7} {:>6} {:>7} {:>4}  {}",
            row.segment,
            row.lines,
            row.columns,
            row.bits_per_pixel,
            row.path.display()
        )?;
    }
    if report.missing.is_empty() {
        writeln!(out, "no missing segments")?;
    } else {
        writeln!(out, "missing segments: {:?}", report.missing)?;
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct CalibrationSummary {
    pub level: CalibrationLevel,
    pub unit: String,
    pub min: Option<f32>,
    pub max: Option<f32>,
    pub valid: usize,
}

#[derive(Debug, Serialize)]
pub struct SliceReport {
    pub shape: (usize, usize),
    pub sum: u64,
    pub min_max: Option<(u16, u16)>,
    pub warnings: Vec<LoadWarning>,
    pub calibration: Option<CalibrationSummary>,
    pub metadata: ImageMetadata,
}

pub fn slice(args: &SliceArgs, out: &mut dyn Write) -> Result<()> {
    let report = slice_report(args)?;
    if args.json {
        serde_json::to_writer_pretty(&mut *out, &report)?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(out, "shape: {} x {}", report.shape.0, report.shape.1)?;
    writeln!(out, "sum: {}", report.sum)?;
    match report.min_max {
        Some((lo, hi)) => writeln!(out, "min/max: {lo}/{hi}")?,
        None => writeln!(out, "min/max: all cells masked")?,
    }
    for warning in &report.warnings {
        writeln!(out, "warning: {warning}")?;
    }
    if let Some(c) = &report.calibration {
        match (c.min, c.max) {
            (Some(lo), Some(hi)) => writeln!(out, "calibrated ({}): {lo}..{hi} {} over {} cells", c.level.code(), c.unit, c.valid)?,
            _ => writeln!(out, "calibrated ({}): no valid cells", c.level.code())?,
        }
    }
    writeln!(out, "metadata: {}", serde_json::to_string_pretty(&report.metadata)?)?;
    Ok(())
}

/// Load the window named by `args` and summarize it.
pub fn slice_report(args: &SliceArgs) -> Result<SliceReport> {
    let (mission, files) = image_files(args)?;
    let mut config = LoaderConfig::from_env();
    config.mask |= args.mask;
    config.parallel_segments |= args.parallel;

    let loader = ImageLoader::open(mission, &files, config).context("failed to open image")?;
    let mda = loader.metadata();
    let image = match &args.extent {
        Some(extent) => {
            let extent = AreaExtent::from_csv(extent).with_context(|| format!("invalid extent '{extent}'"))?;
            loader.by_extent(&extent)?
        }
        None => {
            let rows = PixelWindow::parse_range(&args.rows, mda.lines)
                .with_context(|| format!("invalid rows '{}'", args.rows))?;
            let cols = PixelWindow::parse_range(&args.cols, mda.columns)
                .with_context(|| format!("invalid columns '{}'", args.cols))?;
            loader.slice(&PixelWindow::new(rows, cols))?
        }
    };
    info!(shape = ?image.shape(), warnings = image.warnings.len(), "sliced image");

    let calibration = match args.calibrate {
        Some(code) => {
            let level = CalibrationLevel::from_code(code)?;
            let calibrated = loader.calibrate(&image, level)?;
            let valid: Vec<f32> = calibrated
                .values
                .data
                .iter()
                .copied()
                .filter(|v| v.is_finite())
                .collect();
            Some(CalibrationSummary {
                level,
                unit: calibrated.unit,
                min: valid.iter().copied().reduce(f32::min),
                max: valid.iter().copied().reduce(f32::max),
                valid: valid.len(),
            })
        }
        None => None,
    };

    Ok(SliceReport {
        shape: image.shape(),
        sum: image.raster.sum(),
        min_max: image.raster.min_max(),
        warnings: image.warnings,
        calibration,
        metadata: image.metadata,
    })
}

fn image_files(args: &SliceArgs) -> Result<(Mission, ImageFiles)> {
    if let Some(satellite) = &args.satellite {
        let channel = args.channel.as_deref().ok_or_else(|| anyhow!("--satellite needs --channel"))?;
        let time = args.time.as_deref().ok_or_else(|| anyhow!("--satellite needs --time"))?;
        let time = NaiveDateTime::parse_from_str(time, "%Y%m%d%H%M")
            .with_context(|| format!("invalid time '{time}', expected YYYYmmddHHMM"))?;
        let config = SatelliteConfig::load(satellite)?;
        let (mission, files) =
            ImageFiles::from_config(&config, args.instrument.as_deref(), channel, Utc.from_utc_datetime(&time))?;
        return Ok((mission, files));
    }

    if args.segments.is_empty() {
        bail!("no segment files given");
    }
    let mut files = ImageFiles::new(args.segments.clone());
    files.prologue = args.prologue.clone();
    files.epilogue = args.epilogue.clone();
    files.channel = args.channel.clone();
    Ok((args.mission, files))
}

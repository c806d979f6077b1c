//! Assembly of a dense raster from segment files.
//!
//! The assembler works in on-disk coordinates: window rows are image lines
//! counted from the first line of the image's first segment, window columns
//! index samples of a segment line. Output rows and
//! columns are mirrored according to the first pixel so the result is always
//! north-up, west-left.

use std::ops::Range;

use rayon::prelude::*;
use tracing::{debug, warn};
use xrit_common::{FirstPixel, PixelWindow};
use xrit_parser::unpacking::unpack_10bit_into;
use xrit_parser::{LineReader, SegmentCatalog, SegmentDescriptor, XritResult};

use crate::error::{LoaderError, Result};
use crate::resolver::{resolve, SegmentSpan};
use crate::types::{LoadWarning, RasterRegion};

/// Sample depths the assembler can decode.
pub const SUPPORTED_BIT_DEPTHS: [u8; 3] = [8, 10, 16];

/// Reads windows of one image out of its segment catalog.
#[derive(Debug, Clone, Copy)]
pub struct RegionAssembler<'a> {
    catalog: &'a SegmentCatalog,
    first_pixel: FirstPixel,
    no_data: u16,
    first_segment: u16,
    parallel: bool,
}

/// Output of one assembly.
#[derive(Debug, Clone)]
pub struct AssembledRegion {
    pub raster: RasterRegion<u16>,
    pub warnings: Vec<LoadWarning>,
}

struct SpanTask<'b> {
    span: SegmentSpan,
    band: Range<usize>,
    rows: &'b mut [u16],
}

impl<'a> RegionAssembler<'a> {
    pub fn new(catalog: &'a SegmentCatalog, first_pixel: FirstPixel, no_data: u16) -> Self {
        Self {
            catalog,
            first_pixel,
            no_data,
            first_segment: 1,
            parallel: false,
        }
    }

    /// Segment number holding on-disk row 0.
    pub fn first_segment(mut self, segment: u16) -> Self {
        self.first_segment = segment.max(1);
        self
    }

    /// Image lines between row 0 and the end of the last planned segment.
    pub fn lines(&self) -> usize {
        let segments = (self.catalog.planned_end() as usize + 1).saturating_sub(self.first_segment as usize);
        self.catalog.segment_lines() * segments
    }

    /// Read segment spans on the rayon pool.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Assemble the on-disk `window`.
    ///
    /// Rows of segments absent from the catalog keep the no-data value and
    /// are reported as warnings. A segment that is present but unreadable
    /// fails the whole read.
    pub fn assemble(&self, window: &PixelWindow) -> Result<AssembledRegion> {
        let bits = self.catalog.bits_per_pixel();
        if !SUPPORTED_BIT_DEPTHS.contains(&bits) {
            return Err(LoaderError::UnsupportedBitDepth(bits));
        }
        let segment_lines = self.catalog.segment_lines();
        let columns = self.catalog.columns();
        let lines = self.lines();
        if window.is_empty() || !window.fits(lines, columns) {
            return Err(LoaderError::WindowOutOfRange {
                window: window.clone(),
                lines,
                columns,
            });
        }

        let (width, height) = (window.width(), window.height());
        let south = self.first_pixel.is_south();
        let mut raster = RasterRegion::filled(width, height, self.no_data);

        let shift = self.first_segment - 1;
        let spans = resolve(&window.rows, segment_lines);
        debug!(
            rows = ?window.rows,
            cols = ?window.cols,
            spans = spans.len(),
            first_pixel = %self.first_pixel,
            "assembling window"
        );

        let mut planned: Vec<(SegmentSpan, Range<usize>)> = spans
            .into_iter()
            .map(|mut span| {
                span.segment += shift;
                let band = span.band(height, south);
                (span, band)
            })
            .collect();
        planned.sort_by_key(|(_, band)| band.start);

        // Carve the output into the disjoint row bands of each span.
        let mut tasks = Vec::with_capacity(planned.len());
        let mut rest: &mut [u16] = &mut raster.data;
        let mut consumed = 0;
        for (span, band) in planned {
            let (_, tail) = std::mem::take(&mut rest).split_at_mut((band.start - consumed) * width);
            let (rows, tail) = tail.split_at_mut(band.len() * width);
            rest = tail;
            consumed = band.end;
            tasks.push(SpanTask { span, band, rows });
        }

        let outcomes: Vec<Option<LoadWarning>> = if self.parallel {
            tasks
                .into_par_iter()
                .map(|task| self.read_span(task, &window.cols))
                .collect::<Result<_>>()?
        } else {
            tasks
                .into_iter()
                .map(|task| self.read_span(task, &window.cols))
                .collect::<Result<_>>()?
        };

        let mut warnings: Vec<LoadWarning> = outcomes.into_iter().flatten().collect();
        warnings.sort_by_key(|w| match w {
            LoadWarning::MissingSegment { segment, .. } => *segment,
            LoadWarning::NoBoundaryIntersects => 0,
        });
        Ok(AssembledRegion { raster, warnings })
    }

    /// Fill one band from one segment. The file is opened, read and closed
    /// within this call.
    fn read_span(&self, task: SpanTask<'_>, cols: &Range<usize>) -> Result<Option<LoadWarning>> {
        let SpanTask { span, band, rows } = task;
        let Some(descriptor) = self.catalog.get(span.segment) else {
            warn!(
                segment = span.segment,
                rows = ?band,
                "segment not found, filling with no-data"
            );
            return Ok(Some(LoadWarning::MissingSegment {
                segment: span.segment,
                rows: band,
            }));
        };
        debug!(
            segment = span.segment,
            first_line = span.first_line,
            last_line = span.last_line,
            path = %descriptor.path.display(),
            "reading segment"
        );

        let fail = |reason: String| LoaderError::segment_read(&descriptor.path, span.segment, reason);
        let mut reader = descriptor.open_lines().map_err(|e| fail(e.to_string()))?;
        let mut decoder = LineDecoder::new(descriptor, reader.line_bytes());

        let width = cols.len();
        let count = span.line_count();
        let south = self.first_pixel.is_south();
        let east = self.first_pixel.is_east();
        for k in 0..count {
            let line = span.first_line + k;
            decoder
                .read(&mut reader, line - 1)
                .map_err(|e| fail(format!("line {line}: {e}")))?;
            let samples = decoder.decode().map_err(|e| fail(format!("line {line}: {e}")))?;
            let src = samples
                .get(cols.clone())
                .ok_or_else(|| fail(format!("line {line} holds {} samples", samples.len())))?;

            let row = if south { count - 1 - k } else { k };
            let dest = &mut rows[row * width..(row + 1) * width];
            if east {
                for (d, s) in dest.iter_mut().zip(src.iter().rev()) {
                    *d = *s;
                }
            } else {
                dest.copy_from_slice(src);
            }
        }
        Ok(None)
    }
}

/// Decodes packed lines of one segment into 16-bit samples, reusing its
/// buffers between lines.
#[derive(Debug)]
pub struct LineDecoder {
    bits_per_pixel: u8,
    columns: usize,
    line_bytes: usize,
    packed: Vec<u8>,
    samples: Vec<u16>,
}

impl LineDecoder {
    pub fn new(descriptor: &SegmentDescriptor, line_bytes: usize) -> Self {
        // 10-bit lines whose length is not a whole number of 5-byte groups
        // are zero padded; the extra samples are dropped after unpacking.
        let buffer = if descriptor.bits_per_pixel == 10 {
            line_bytes.next_multiple_of(5)
        } else {
            line_bytes
        };
        Self {
            bits_per_pixel: descriptor.bits_per_pixel,
            columns: descriptor.columns,
            line_bytes,
            packed: vec![0; buffer],
            samples: Vec::with_capacity(descriptor.columns + 4),
        }
    }

    /// Read 0-based line `line` into the packed buffer.
    pub fn read(&mut self, reader: &mut LineReader, line: usize) -> std::io::Result<()> {
        reader.read_line(line, &mut self.packed[..self.line_bytes])
    }

    /// Decode the packed buffer.
    pub fn decode(&mut self) -> XritResult<&[u16]> {
        self.samples.clear();
        match self.bits_per_pixel {
            8 => self
                .samples
                .extend(self.packed[..self.line_bytes].iter().map(|&b| b as u16)),
            10 => unpack_10bit_into(&self.packed, &mut self.samples)?,
            _ => self.samples.extend(
                self.packed[..self.line_bytes]
                    .chunks_exact(2)
                    .map(|c| u16::from_be_bytes([c[0], c[1]])),
            ),
        }
        self.samples.truncate(self.columns);
        Ok(&self.samples)
    }
}

//! Index of the segment files that make up one image.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{XritError, XritResult};
use crate::mission::Mission;
use crate::segment::{SegmentDescriptor, SegmentFile};

/// Segments of one image keyed by segment number.
///
/// All members share column count, line count, bits per pixel and planned
/// segment range. Planned segments with no file are simply absent.
#[derive(Debug, Clone)]
pub struct SegmentCatalog {
    segments: BTreeMap<u16, SegmentDescriptor>,
    planned_start: u16,
    planned_end: u16,
    columns: usize,
    segment_lines: usize,
    bits_per_pixel: u8,
}

impl SegmentCatalog {
    /// Parse the header of every file and index them.
    pub fn build<P: AsRef<Path>>(paths: &[P], mission: Mission) -> XritResult<Self> {
        let descriptors = paths
            .iter()
            .map(|p| SegmentFile::open(p, mission)?.descriptor())
            .collect::<XritResult<Vec<_>>>()?;
        Self::from_descriptors(descriptors)
    }

    /// Validate and index descriptors built elsewhere.
    pub fn from_descriptors(descriptors: Vec<SegmentDescriptor>) -> XritResult<Self> {
        let mut iter = descriptors.into_iter();
        let first = iter.next().ok_or_else(|| XritError::header("no segment files given"))?;

        let mut catalog = SegmentCatalog {
            segments: BTreeMap::new(),
            planned_start: first.planned_start_segment,
            planned_end: first.planned_end_segment,
            columns: first.columns,
            segment_lines: first.lines,
            bits_per_pixel: first.bits_per_pixel,
        };
        if catalog.planned_start > catalog.planned_end || catalog.segment_lines == 0 {
            return Err(XritError::InconsistentSegment {
                path: first.path.clone(),
                reason: format!(
                    "planned segments {}..={} with {} lines per segment",
                    catalog.planned_start, catalog.planned_end, catalog.segment_lines
                ),
            });
        }
        catalog.insert(first)?;
        for descriptor in iter {
            catalog.insert(descriptor)?;
        }

        info!(
            segments = catalog.segments.len(),
            planned_start = catalog.planned_start,
            planned_end = catalog.planned_end,
            missing = catalog.missing().len(),
            "built segment catalog"
        );
        Ok(catalog)
    }

    fn insert(&mut self, d: SegmentDescriptor) -> XritResult<()> {
        let mismatch = |what: &str, expected: String, actual: String| XritError::InconsistentSegment {
            path: d.path.clone(),
            reason: format!("{what} is {actual}, other segments have {expected}"),
        };

        if d.bits_per_pixel != self.bits_per_pixel {
            return Err(mismatch(
                "bits per pixel",
                self.bits_per_pixel.to_string(),
                d.bits_per_pixel.to_string(),
            ));
        }
        if d.columns != self.columns {
            return Err(mismatch("column count", self.columns.to_string(), d.columns.to_string()));
        }
        if d.lines != self.segment_lines {
            return Err(mismatch(
                "line count",
                self.segment_lines.to_string(),
                d.lines.to_string(),
            ));
        }
        if (d.planned_start_segment, d.planned_end_segment) != (self.planned_start, self.planned_end) {
            return Err(mismatch(
                "planned segment range",
                format!("{}..={}", self.planned_start, self.planned_end),
                format!("{}..={}", d.planned_start_segment, d.planned_end_segment),
            ));
        }
        if !(self.planned_start..=self.planned_end).contains(&d.segment_number) {
            return Err(XritError::InconsistentSegment {
                path: d.path.clone(),
                reason: format!(
                    "segment number {} outside planned range {}..={}",
                    d.segment_number, self.planned_start, self.planned_end
                ),
            });
        }
        if let Some(existing) = self.segments.get(&d.segment_number) {
            return Err(XritError::InconsistentSegment {
                path: d.path.clone(),
                reason: format!(
                    "segment number {} already provided by {}",
                    d.segment_number,
                    existing.path.display()
                ),
            });
        }

        debug!(segment = d.segment_number, path = %d.path.display(), "cataloged segment");
        self.segments.insert(d.segment_number, d);
        Ok(())
    }

    pub fn get(&self, segment_number: u16) -> Option<&SegmentDescriptor> {
        self.segments.get(&segment_number)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SegmentDescriptor> {
        self.segments.values()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn planned_start(&self) -> u16 {
        self.planned_start
    }

    pub fn planned_end(&self) -> u16 {
        self.planned_end
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Lines per segment.
    pub fn segment_lines(&self) -> usize {
        self.segment_lines
    }

    pub fn bits_per_pixel(&self) -> u8 {
        self.bits_per_pixel
    }

    /// Planned segment numbers with no file.
    pub fn missing(&self) -> Vec<u16> {
        (self.planned_start..=self.planned_end)
            .filter(|n| !self.segments.contains_key(n))
            .collect()
    }
}

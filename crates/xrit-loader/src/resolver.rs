//! Mapping of on-disk image rows onto segment files and their lines.

use std::ops::Range;

use serde::Serialize;

/// The lines of one segment that a window needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SegmentSpan {
    pub segment: u16,
    /// First needed line within the segment, 1-based.
    pub first_line: usize,
    /// Last needed line within the segment, 1-based inclusive.
    pub last_line: usize,
    /// Position of `first_line` counted from the first requested on-disk row.
    pub output_row_start: usize,
}

impl SegmentSpan {
    pub fn line_count(&self) -> usize {
        self.last_line + 1 - self.first_line
    }

    /// Output rows this span fills in a window of `height` rows. When lines
    /// are stored south first the band is mirrored.
    pub fn band(&self, height: usize, south: bool) -> Range<usize> {
        let start = self.output_row_start;
        let end = start + self.line_count();
        if south {
            height - end..height - start
        } else {
            start..end
        }
    }
}

/// Split on-disk rows `rows` (0-based, exclusive end) into per-segment spans.
///
/// Segment `s` holds image lines `(s - 1) * segment_lines + 1 ..= s *
/// segment_lines`. Spans come back in segment order and cover every
/// requested line exactly once.
pub fn resolve(rows: &Range<usize>, segment_lines: usize) -> Vec<SegmentSpan> {
    if rows.start >= rows.end || segment_lines == 0 {
        return Vec::new();
    }
    let line_init = rows.start + 1;
    let line_end = rows.end;
    let seg_init = (line_init - 1) / segment_lines + 1;
    let seg_end = (line_end - 1) / segment_lines + 1;

    let mut spans = Vec::with_capacity(seg_end + 1 - seg_init);
    for seg in seg_init..=seg_end {
        let Ok(segment) = u16::try_from(seg) else {
            break;
        };
        let base = segment_lines * (seg - 1);
        let first_line = line_init.saturating_sub(base).max(1);
        let last_line = (line_end - base).min(segment_lines);
        spans.push(SegmentSpan {
            segment,
            first_line,
            last_line,
            output_row_start: base + first_line - line_init,
        });
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn covered(spans: &[SegmentSpan], nl: usize) -> Vec<usize> {
        spans
            .iter()
            .flat_map(|s| {
                let base = (s.segment as usize - 1) * nl;
                (s.first_line..=s.last_line).map(move |l| base + l - 1)
            })
            .collect()
    }

    #[test]
    fn test_two_full_segments() {
        let spans = resolve(&(0..928), 464);
        assert_eq!(
            spans,
            vec![
                SegmentSpan {
                    segment: 1,
                    first_line: 1,
                    last_line: 464,
                    output_row_start: 0
                },
                SegmentSpan {
                    segment: 2,
                    first_line: 1,
                    last_line: 464,
                    output_row_start: 464
                },
            ]
        );
    }

    #[test]
    fn test_window_inside_one_segment() {
        let spans = resolve(&(470..480), 464);
        assert_eq!(spans.len(), 1);
        assert_eq!((spans[0].segment, spans[0].first_line, spans[0].last_line), (2, 7, 16));
    }

    #[test]
    fn test_boundary_values() {
        // Ends exactly on the last line of segment 1.
        let spans = resolve(&(460..464), 464);
        assert_eq!(spans.len(), 1);
        assert_eq!((spans[0].first_line, spans[0].last_line), (461, 464));

        // Starts exactly on the first line of segment 2.
        let spans = resolve(&(464..465), 464);
        assert_eq!(spans.len(), 1);
        assert_eq!((spans[0].segment, spans[0].first_line, spans[0].last_line), (2, 1, 1));

        // One line either side of the boundary.
        let spans = resolve(&(463..465), 464);
        assert_eq!(spans.len(), 2);
        assert_eq!((spans[0].first_line, spans[0].last_line), (464, 464));
        assert_eq!((spans[1].first_line, spans[1].last_line, spans[1].output_row_start), (1, 1, 1));
    }

    #[test]
    fn test_spans_cover_each_line_once() {
        for nl in [1usize, 3, 4, 7, 464] {
            for start in 0..20 {
                for stop in start + 1..start + 30 {
                    let spans = resolve(&(start..stop), nl);
                    assert_eq!(covered(&spans, nl), (start..stop).collect::<Vec<_>>(), "nl={nl} {start}..{stop}");
                    let rows: usize = spans.iter().map(SegmentSpan::line_count).sum();
                    assert_eq!(rows, stop - start);
                }
            }
        }
    }

    #[test]
    fn test_empty_window() {
        assert!(resolve(&(5..5), 464).is_empty());
        assert!(resolve(&(0..10), 0).is_empty());
    }

    #[test]
    fn test_band_mirroring() {
        let spans = resolve(&(2..10), 4);
        let north: Vec<_> = spans.iter().map(|s| s.band(8, false)).collect();
        assert_eq!(north, vec![0..2, 2..6, 6..8]);
        let south: Vec<_> = spans.iter().map(|s| s.band(8, true)).collect();
        assert_eq!(south, vec![6..8, 2..6, 0..2]);
    }
}

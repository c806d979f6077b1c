//! Synthetic xRIT files for tests.
//!
//! [`HritBuilder`] encodes header records byte-for-byte and computes the
//! primary header lengths itself, so tests only state the records they care
//! about. [`SyntheticChannel`] writes whole multi-segment channels whose
//! pixels follow [`crate::pattern_value`]. The MSG prologue, epilogue and
//! native file builders place only the fields the loader reads; everything
//! else is zero.

use std::fs;
use std::path::{Path, PathBuf};

use crate::generators::{encode_line, pattern_line};
use crate::paths::hrit_file_name;

/// File type codes of the primary header.
pub mod file_type {
    pub const IMAGE_DATA: u8 = 0;
    pub const TEXT: u8 = 2;
    pub const PROLOGUE: u8 = 128;
    pub const EPILOGUE: u8 = 129;
}

/// Builder for a single xRIT file.
#[derive(Debug, Clone)]
pub struct HritBuilder {
    file_type: u8,
    records: Vec<(u8, Vec<u8>)>,
    data: Vec<u8>,
}

impl HritBuilder {
    pub fn new(file_type: u8) -> Self {
        Self {
            file_type,
            records: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Record 1.
    pub fn structure(self, bits_per_pixel: u8, columns: u16, lines: u16, compression: u8) -> Self {
        let mut body = vec![bits_per_pixel];
        body.extend(columns.to_be_bytes());
        body.extend(lines.to_be_bytes());
        body.push(compression);
        self.raw_record(1, body)
    }

    /// Record 2.
    pub fn navigation(self, projection: &str, cfac: i32, lfac: i32, coff: i32, loff: i32) -> Self {
        let mut body = fixed_text(projection, 32);
        for v in [cfac, lfac, coff, loff] {
            body.extend(v.to_be_bytes());
        }
        self.raw_record(2, body)
    }

    /// Record 3. Lines are joined with `\r`.
    pub fn data_function(self, lines: &[&str]) -> Self {
        self.raw_record(3, lines.join("\r").into_bytes())
    }

    /// Record 4.
    pub fn annotation(self, text: &str) -> Self {
        self.raw_record(4, text.as_bytes().to_vec())
    }

    /// Record 5 with CDS days and milliseconds since 1958-01-01.
    pub fn time_stamp(self, days: u16, millis: u32) -> Self {
        let mut body = vec![0x40];
        body.extend(days.to_be_bytes());
        body.extend(millis.to_be_bytes());
        self.raw_record(5, body)
    }

    /// Record 128, MSG/SGS layout.
    pub fn segment(self, segment: u16, planned_start: u16, planned_end: u16) -> Self {
        let mut body = Vec::new();
        body.extend(324u16.to_be_bytes());
        body.push(9);
        body.extend(segment.to_be_bytes());
        body.extend(planned_start.to_be_bytes());
        body.extend(planned_end.to_be_bytes());
        body.push(0);
        self.raw_record(128, body)
    }

    /// Record 128, JMA layout.
    pub fn jma_segment(self, segment: u8, total: u8, first_line: u16) -> Self {
        let mut body = vec![segment, total];
        body.extend(first_line.to_be_bytes());
        self.raw_record(128, body)
    }

    /// Record 129, line quality table with `lines` valid entries.
    pub fn line_quality(self, lines: usize) -> Self {
        let mut body = Vec::with_capacity(lines * 13);
        for i in 0..lines {
            body.extend((i as i32 + 1).to_be_bytes());
            body.extend([0, 0, 0, 0, 0, 0]);
            body.extend([1, 4, 4]);
        }
        self.raw_record(129, body)
    }

    /// Any record, given its body (without tag and length).
    pub fn raw_record(mut self, tag: u8, body: Vec<u8>) -> Self {
        self.records.push((tag, body));
        self
    }

    /// The data field.
    pub fn data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }

    /// Header length this builder will declare.
    pub fn header_len(&self) -> usize {
        16 + self.records.iter().map(|(_, b)| b.len() + 3).sum::<usize>()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let total = self.header_len();
        let mut out = Vec::with_capacity(total + self.data.len());
        out.push(0);
        out.extend(16u16.to_be_bytes());
        out.push(self.file_type);
        out.extend((total as u32).to_be_bytes());
        out.extend((self.data.len() as u64 * 8).to_be_bytes());
        for (tag, body) in &self.records {
            out.push(*tag);
            out.extend(((body.len() + 3) as u16).to_be_bytes());
            out.extend(body);
        }
        out.extend(&self.data);
        out
    }

    pub fn write_to(&self, path: &Path) -> PathBuf {
        fs::write(path, self.to_bytes()).expect("failed to write synthetic xRIT file");
        path.to_path_buf()
    }
}

fn fixed_text(s: &str, width: usize) -> Vec<u8> {
    let mut v = s.as_bytes().to_vec();
    v.resize(width, b' ');
    v
}

/// A channel split into equally sized segments, with pattern pixels.
///
/// Pixel values depend on the whole-image on-disk line, so
/// `pattern_value((segment - 1) * segment_lines + i, col)` is line `i` of
/// `segment`.
#[derive(Debug, Clone)]
pub struct SyntheticChannel {
    pub platform: String,
    pub channel: String,
    pub time: String,
    pub columns: usize,
    pub segment_lines: usize,
    pub bits_per_pixel: u8,
    pub planned_start: u16,
    pub planned_end: u16,
    pub projection: String,
    pub cfac: i32,
    pub lfac: i32,
    pub coff: i32,
    pub loff: i32,
    pub data_function: Vec<String>,
}

impl SyntheticChannel {
    /// MSG VIS/IR geometry: 3712 columns, 464 lines per segment, 8 segments.
    pub fn msg_vis_ir(channel: &str) -> Self {
        Self {
            platform: "MSG3".to_string(),
            channel: channel.to_string(),
            time: "201510111400".to_string(),
            columns: 3712,
            segment_lines: 464,
            bits_per_pixel: 10,
            planned_start: 1,
            planned_end: 8,
            projection: "GEOS(+000.0)".to_string(),
            cfac: -13642337,
            lfac: -13642337,
            coff: 1856,
            loff: 1856,
            data_function: Vec::new(),
        }
    }

    /// A small channel with the given geometry and MSG naming.
    pub fn small(columns: usize, segment_lines: usize, segments: u16, bits_per_pixel: u8) -> Self {
        Self {
            columns,
            segment_lines,
            bits_per_pixel,
            planned_end: segments,
            coff: (columns / 2) as i32,
            loff: (segment_lines * segments as usize / 2) as i32,
            ..Self::msg_vis_ir("IR_108")
        }
    }

    /// File name of segment `segment`.
    pub fn file_name(&self, segment: u16) -> String {
        hrit_file_name(&self.platform, &self.channel, &format!("{segment:06}"), &self.time)
    }

    pub fn annotation(&self, segment: u16) -> String {
        self.file_name(segment)
    }

    /// Pattern samples of line `line` (0-based) within `segment`.
    pub fn line_samples(&self, segment: u16, line: usize) -> Vec<u16> {
        let absolute = (segment as usize - 1) * self.segment_lines + line;
        let mut samples = pattern_line(absolute, self.columns);
        if self.bits_per_pixel == 8 {
            for s in &mut samples {
                *s = *s % 255 + 1;
            }
        }
        samples
    }

    /// Packed data field of one segment.
    pub fn segment_data(&self, segment: u16) -> Vec<u8> {
        (0..self.segment_lines)
            .flat_map(|line| encode_line(&self.line_samples(segment, line), self.bits_per_pixel))
            .collect()
    }

    /// Complete segment file builder.
    pub fn segment_builder(&self, segment: u16) -> HritBuilder {
        let dd: Vec<&str> = self.data_function.iter().map(String::as_str).collect();
        let mut builder = HritBuilder::new(file_type::IMAGE_DATA)
            .structure(
                self.bits_per_pixel,
                self.columns as u16,
                self.segment_lines as u16,
                0,
            )
            .navigation(&self.projection, self.cfac, self.lfac, self.coff, self.loff);
        if !dd.is_empty() {
            builder = builder.data_function(&dd);
        }
        builder
            .annotation(&self.annotation(segment))
            .time_stamp(21102, 50_400_000)
            .segment(segment, self.planned_start, self.planned_end)
            .data(self.segment_data(segment))
    }

    pub fn write_segment(&self, dir: &Path, segment: u16) -> PathBuf {
        self.segment_builder(segment)
            .write_to(&dir.join(self.file_name(segment)))
    }

    pub fn write_segments(&self, dir: &Path, segments: &[u16]) -> Vec<PathBuf> {
        segments.iter().map(|&s| self.write_segment(dir, s)).collect()
    }

    /// Expected sum of an on-disk window, for checksum assertions.
    pub fn raw_window_sum(&self, rows: std::ops::Range<usize>, cols: std::ops::Range<usize>) -> u64 {
        let mut sum = 0u64;
        for row in rows {
            let segment = (row / self.segment_lines) as u16 + 1;
            let line = self.line_samples(segment, row % self.segment_lines);
            sum += line[cols.clone()].iter().map(|&v| v as u64).sum::<u64>();
        }
        sum
    }
}

/// Offsets of the fields the loader reads from an MSG level 1.5 header.
pub mod msg_layout {
    pub const IMAGE_DESCRIPTION: usize = 386_892;
    pub const GRID_VIS_IR: usize = IMAGE_DESCRIPTION + 5;
    pub const GRID_HRV: usize = IMAGE_DESCRIPTION + 22;
    pub const PLANNED_COVERAGE_VIS_IR: usize = IMAGE_DESCRIPTION + 39;
    pub const PLANNED_COVERAGE_HRV: usize = IMAGE_DESCRIPTION + 55;
    pub const IMAGE_PRODUCTION: usize = IMAGE_DESCRIPTION + 87;
    pub const PLANNED_CHAN_PROCESSING: usize = IMAGE_PRODUCTION + 2;
    pub const CALIBRATION: usize = 387_065;
    pub const PROLOGUE_LEN: usize = 387_257;
    pub const EPILOGUE_ACTUAL_COVERAGE: usize = 293;
    pub const EPILOGUE_LEN: usize = EPILOGUE_ACTUAL_COVERAGE + 48;
}

/// MSG reference grid.
#[derive(Debug, Clone, Copy)]
pub struct GridSpec {
    pub lines: i32,
    pub columns: i32,
    pub line_step: f32,
    pub column_step: f32,
    /// 0 north west, 1 south west, 2 south east, 3 north east.
    pub origin: u8,
}

/// The prologue fields the loader reads.
#[derive(Debug, Clone)]
pub struct MsgPrologueSpec {
    pub satellite_id: u16,
    pub nominal_longitude: f32,
    pub ssp: f32,
    pub vis_ir: GridSpec,
    pub hrv: GridSpec,
    pub planned_chan_processing: [u8; 12],
    pub calibration: [(f64, f64); 12],
}

impl Default for MsgPrologueSpec {
    fn default() -> Self {
        Self {
            satellite_id: 324,
            nominal_longitude: 0.0,
            ssp: 0.0,
            vis_ir: GridSpec {
                lines: 3712,
                columns: 3712,
                line_step: 3.000_403_2,
                column_step: 3.000_403_2,
                origin: 2,
            },
            hrv: GridSpec {
                lines: 11136,
                columns: 11136,
                line_step: 1.000_134_4,
                column_step: 1.000_134_4,
                origin: 2,
            },
            planned_chan_processing: [2; 12],
            calibration: [(0.2, -10.0); 12],
        }
    }
}

impl MsgPrologueSpec {
    /// Level 1.5 header bytes (the prologue data field).
    pub fn to_bytes(&self) -> Vec<u8> {
        use msg_layout::*;
        let mut buf = vec![0u8; PROLOGUE_LEN];
        put(&mut buf, 0, &self.satellite_id.to_be_bytes());
        put(&mut buf, 2, &self.nominal_longitude.to_be_bytes());
        put(&mut buf, IMAGE_DESCRIPTION, &[1]);
        put(&mut buf, IMAGE_DESCRIPTION + 1, &self.ssp.to_be_bytes());
        put_grid(&mut buf, GRID_VIS_IR, &self.vis_ir);
        put_grid(&mut buf, GRID_HRV, &self.hrv);
        put(&mut buf, PLANNED_CHAN_PROCESSING, &self.planned_chan_processing);
        for (i, (slope, offset)) in self.calibration.iter().enumerate() {
            put(&mut buf, CALIBRATION + 16 * i, &slope.to_be_bytes());
            put(&mut buf, CALIBRATION + 16 * i + 8, &offset.to_be_bytes());
        }
        buf
    }

    pub fn write_to(&self, path: &Path) -> PathBuf {
        HritBuilder::new(file_type::PROLOGUE)
            .annotation("H-000-MSG3__-MSG3________-_________-PRO______-201510111400-__")
            .data(self.to_bytes())
            .write_to(path)
    }
}

/// Actual coverage from the epilogue, 1-based inclusive:
/// `[south, north, east, west]` for VIS/IR, lower HRV and upper HRV.
#[derive(Debug, Clone, Copy)]
pub struct MsgEpilogueSpec {
    pub vis_ir: [i32; 4],
    pub lower_hrv: [i32; 4],
    pub upper_hrv: [i32; 4],
}

impl Default for MsgEpilogueSpec {
    fn default() -> Self {
        Self {
            vis_ir: [1, 3712, 1, 3712],
            lower_hrv: [1, 8064, 1, 5568],
            upper_hrv: [8065, 11136, 2977, 8544],
        }
    }
}

impl MsgEpilogueSpec {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0u8; msg_layout::EPILOGUE_LEN];
        put(&mut buf, 1, &324u16.to_be_bytes());
        let values = self.vis_ir.iter().chain(&self.lower_hrv).chain(&self.upper_hrv);
        for (i, v) in values.enumerate() {
            put(&mut buf, msg_layout::EPILOGUE_ACTUAL_COVERAGE + 4 * i, &v.to_be_bytes());
        }
        buf
    }

    pub fn write_to(&self, path: &Path) -> PathBuf {
        HritBuilder::new(file_type::EPILOGUE)
            .annotation("H-000-MSG3__-MSG3________-_________-EPI______-201510111400-__")
            .data(self.to_bytes())
            .write_to(path)
    }
}

fn put(buf: &mut [u8], at: usize, bytes: &[u8]) {
    buf[at..at + bytes.len()].copy_from_slice(bytes);
}

fn put_grid(buf: &mut [u8], at: usize, grid: &GridSpec) {
    put(buf, at, &grid.lines.to_be_bytes());
    put(buf, at + 4, &grid.columns.to_be_bytes());
    put(buf, at + 8, &grid.line_step.to_be_bytes());
    put(buf, at + 12, &grid.column_step.to_be_bytes());
    put(buf, at + 16, &[grid.origin]);
}

/// Offsets of a native MSG file.
pub mod native_layout {
    pub const UMARF_LEN: usize = 6 * 80 + 27 * 62 + 19 * 80 + 18 * 80;
    pub const LEVEL15_HEADER: usize = UMARF_LEN + 38 + 1;
    pub const LINE_DATA: usize = 450_400;
    pub const LINE_HEADER_LEN: usize = 38 + 27;
    pub const VIS_IR_CHANNELS: usize = 11;
    pub const HRV_LINES: usize = 3;
}

/// A small native MSG file: `lines` VIS/IR lines of `columns` samples and
/// `3 * lines` HRV lines of `hrv_columns` samples.
///
/// VIS/IR channel `k` (0-based) on on-disk line `l` holds
/// `pattern_value(l, c) + k`; HRV line `l` holds `pattern_value(l, c)`.
#[derive(Debug, Clone)]
pub struct NativeSpec {
    pub lines: usize,
    pub columns: usize,
    pub hrv_columns: usize,
    /// Selected rectangle `[south, north, east, west]`.
    pub selected: [i32; 4],
    pub prologue: MsgPrologueSpec,
}

impl NativeSpec {
    pub fn small(lines: usize, columns: usize) -> Self {
        Self {
            lines,
            columns,
            hrv_columns: columns * 3,
            selected: [1, lines as i32, 1, columns as i32],
            prologue: MsgPrologueSpec::default(),
        }
    }

    pub fn vis_ir_sample(&self, channel: usize, line: usize, col: usize) -> u16 {
        crate::pattern_value(line, col) + channel as u16
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        use native_layout::*;
        let mut out = Vec::new();

        let main = [
            ("FormatName", "NATIVE".to_string()),
            ("FormatDocumentName", "EUM/MSG/ICD/105".to_string()),
            ("FormatDocumentMajorVersion", "1".to_string()),
            ("FormatDocumentMinorVersion", "2".to_string()),
            ("CreationDateTime", "2015/10/11 14:15:00".to_string()),
            ("CreatingCentre", "EUMETSAT".to_string()),
        ];
        for (name, value) in &main {
            umarf_pair(&mut out, name, value);
        }
        for i in 0..27 {
            if i == 0 {
                let mut name = format!("{:<28}: ", "15Header").into_bytes();
                name.resize(30, 0);
                out.extend(name);
                out.extend(fixed_zero_text("450400", 16));
                out.extend(fixed_zero_text("0", 16));
            } else {
                out.extend([0u8; 30]);
                out.extend([0u8; 32]);
            }
        }
        let secondary = [
            ("NumberLinesVISIR", self.lines.to_string()),
            ("NumberColumnsVISIR", self.columns.to_string()),
            ("NumberLinesHRV", (self.lines * HRV_LINES).to_string()),
            ("NumberColumnsHRV", self.hrv_columns.to_string()),
            ("SouthLineSelectedRectangle", self.selected[0].to_string()),
            ("NorthLineSelectedRectangle", self.selected[1].to_string()),
            ("EastColumnSelectedRectangle", self.selected[2].to_string()),
            ("WestColumnSelectedRectangle", self.selected[3].to_string()),
        ];
        for i in 0..37 {
            match secondary.get(i) {
                Some((name, value)) => umarf_pair(&mut out, name, value),
                None => umarf_pair(&mut out, &format!("Unused{i}"), ""),
            }
        }
        assert_eq!(out.len(), UMARF_LEN);

        out.extend([0u8; 38]);
        out.push(2);
        out.extend(self.prologue.to_bytes());
        out.resize(LINE_DATA, 0);

        for line in 0..self.lines {
            for k in 0..VIS_IR_CHANNELS {
                out.extend([0u8; LINE_HEADER_LEN]);
                let samples: Vec<u16> = (0..self.columns)
                    .map(|c| self.vis_ir_sample(k, line, c))
                    .collect();
                out.extend(encode_line(&samples, 10));
            }
            for j in 0..HRV_LINES {
                out.extend([0u8; LINE_HEADER_LEN]);
                out.extend(encode_line(&pattern_line(line * HRV_LINES + j, self.hrv_columns), 10));
            }
        }
        out
    }

    pub fn write_to(&self, path: &Path) -> PathBuf {
        fs::write(path, self.to_bytes()).expect("failed to write synthetic native file");
        path.to_path_buf()
    }
}

fn umarf_pair(out: &mut Vec<u8>, name: &str, value: &str) {
    let mut n = format!("{name:<28}: ").into_bytes();
    n.resize(30, b' ');
    out.extend(n);
    out.extend(fixed_zero_text(value, 50));
}

fn fixed_zero_text(s: &str, width: usize) -> Vec<u8> {
    let mut v = s.as_bytes().to_vec();
    v.resize(width, 0);
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lengths_are_computed() {
        let bytes = HritBuilder::new(file_type::IMAGE_DATA)
            .structure(10, 8, 2, 0)
            .data(vec![0; 20])
            .to_bytes();
        assert_eq!(&bytes[4..8], &25u32.to_be_bytes());
        assert_eq!(&bytes[8..16], &160u64.to_be_bytes());
        assert_eq!(bytes.len(), 45);
    }

    #[test]
    fn test_segment_data_size() {
        let ch = SyntheticChannel::small(8, 4, 3, 10);
        assert_eq!(ch.segment_data(2).len(), 4 * 10);
        let ch = SyntheticChannel::small(8, 4, 3, 16);
        assert_eq!(ch.segment_data(1).len(), 4 * 16);
    }

    #[test]
    fn test_prologue_and_epilogue_sizes() {
        assert_eq!(MsgPrologueSpec::default().to_bytes().len(), 387_257);
        assert_eq!(MsgEpilogueSpec::default().to_bytes().len(), 341);
    }

    #[test]
    fn test_native_size() {
        let spec = NativeSpec::small(4, 8);
        let record = 11 * (65 + 10) + 3 * (65 + 30);
        assert_eq!(spec.to_bytes().len(), 450_400 + 4 * record);
    }
}

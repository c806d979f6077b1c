//! Single xRIT files: header access, data field access and line streaming.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::debug;

use crate::error::{XritError, XritResult};
use crate::mission::Mission;
use crate::records::{
    read_headers, Annotation, FileType, HeaderRecord, ImageDataFunction, ImageNavigation,
    ImageStructure, LineQuality, PrimaryHeader, RecordBody, SegmentIdentification, TimeStamp,
};

/// File name suffix of compressed xRIT files.
pub const COMPRESSED_SUFFIX: &str = "C_";

/// An xRIT file whose header has been parsed. Pixel data is not read.
#[derive(Debug, Clone)]
pub struct SegmentFile {
    pub path: PathBuf,
    pub mission: Mission,
    pub records: Vec<HeaderRecord>,
    /// Offset of the data field.
    pub header_length: u64,
}

impl SegmentFile {
    pub fn open(path: impl AsRef<Path>, mission: Mission) -> XritResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| XritError::io(path, e))?;
        let mut reader = BufReader::new(file);
        let (records, header_length) =
            read_headers(&mut reader, mission).map_err(|e| e.with_path(path))?;
        debug!(
            path = %path.display(),
            records = records.len(),
            header_length,
            "parsed xRIT header"
        );
        Ok(Self {
            path: path.to_path_buf(),
            mission,
            records,
            header_length,
        })
    }

    /// Open a file and require a given file type.
    pub fn open_as(path: impl AsRef<Path>, mission: Mission, expected: FileType) -> XritResult<Self> {
        let file = Self::open(path, mission)?;
        let actual = file.file_type();
        if actual != expected {
            return Err(XritError::HeaderDecode {
                path: Some(file.path.clone()),
                reason: format!("expected a {expected:?} file, found {actual:?}"),
            });
        }
        Ok(file)
    }

    pub fn primary(&self) -> Option<&PrimaryHeader> {
        self.records.iter().find_map(|r| match &r.body {
            RecordBody::Primary(p) => Some(p),
            _ => None,
        })
    }

    pub fn file_type(&self) -> FileType {
        self.primary()
            .map(|p| p.file_type)
            .unwrap_or(FileType::Other(u8::MAX))
    }

    pub fn structure(&self) -> Option<&ImageStructure> {
        self.records.iter().find_map(|r| match &r.body {
            RecordBody::ImageStructure(s) => Some(s),
            _ => None,
        })
    }

    pub fn navigation(&self) -> Option<&ImageNavigation> {
        self.records.iter().find_map(|r| match &r.body {
            RecordBody::ImageNavigation(n) => Some(n),
            _ => None,
        })
    }

    pub fn data_function(&self) -> Option<&ImageDataFunction> {
        self.records.iter().find_map(|r| match &r.body {
            RecordBody::ImageDataFunction(d) => Some(d),
            _ => None,
        })
    }

    pub fn annotation(&self) -> Option<&Annotation> {
        self.records.iter().find_map(|r| match &r.body {
            RecordBody::Annotation(a) => Some(a),
            _ => None,
        })
    }

    pub fn time_stamp(&self) -> Option<&TimeStamp> {
        self.records.iter().find_map(|r| match &r.body {
            RecordBody::TimeStamp(t) => Some(t),
            _ => None,
        })
    }

    pub fn segment(&self) -> Option<&SegmentIdentification> {
        self.records.iter().find_map(|r| match &r.body {
            RecordBody::SegmentIdentification(s) => Some(s),
            _ => None,
        })
    }

    pub fn line_quality(&self) -> Option<&LineQuality> {
        self.records.iter().find_map(|r| match &r.body {
            RecordBody::LineQuality(q) => Some(q),
            _ => None,
        })
    }

    /// Compressed per the image structure record.
    pub fn is_compressed(&self) -> bool {
        self.structure().is_some_and(|s| s.compression != 0)
    }

    /// Read the whole data field (prologue/epilogue payloads).
    pub fn read_data(&self) -> XritResult<Bytes> {
        let mut file = File::open(&self.path).map_err(|e| XritError::io(&self.path, e))?;
        file.seek(SeekFrom::Start(self.header_length))
            .map_err(|e| XritError::io(&self.path, e))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|e| XritError::io(&self.path, e))?;
        Ok(Bytes::from(data))
    }

    /// Structural description of an image data segment.
    pub fn descriptor(&self) -> XritResult<SegmentDescriptor> {
        if self.file_type() != FileType::ImageData {
            return Err(XritError::HeaderDecode {
                path: Some(self.path.clone()),
                reason: format!("this is no image data file ({:?})", self.file_type()),
            });
        }
        let structure = self.structure().ok_or_else(|| XritError::MissingRecord {
            path: self.path.clone(),
            record: "image structure",
        })?;
        let segment = self.segment().ok_or_else(|| XritError::MissingRecord {
            path: self.path.clone(),
            record: "segment identification",
        })?;

        let line_bytes = line_bytes(structure.columns as usize, structure.bits_per_pixel);
        Ok(SegmentDescriptor {
            path: self.path.clone(),
            segment_number: segment.segment_number,
            planned_start_segment: segment.planned_start_segment,
            planned_end_segment: segment.planned_end_segment,
            columns: structure.columns as usize,
            lines: structure.lines as usize,
            bits_per_pixel: structure.bits_per_pixel,
            layout: LineLayout::contiguous(self.header_length, line_bytes),
        })
    }
}

/// True when the file name carries the compressed-file marker.
pub fn is_compressed_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(COMPRESSED_SUFFIX))
}

/// Bytes in one packed line of `columns` samples.
pub fn line_bytes(columns: usize, bits_per_pixel: u8) -> usize {
    (columns * bits_per_pixel as usize).div_ceil(8)
}

/// Where line `i` of a segment lives on disk.
///
/// Lines are grouped into records of `record_length` bytes starting at
/// `data_offset`; line `i` sits in record `i / k` at `line_offsets[i % k]`,
/// with `k = line_offsets.len()`. Plain xRIT segments use one line per record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineLayout {
    pub data_offset: u64,
    pub record_length: u64,
    pub line_offsets: Vec<u64>,
    pub line_bytes: usize,
}

impl LineLayout {
    pub fn contiguous(data_offset: u64, line_bytes: usize) -> Self {
        Self {
            data_offset,
            record_length: line_bytes as u64,
            line_offsets: vec![0],
            line_bytes,
        }
    }

    pub fn interleaved(data_offset: u64, record_length: u64, line_offsets: Vec<u64>, line_bytes: usize) -> Self {
        Self {
            data_offset,
            record_length,
            line_offsets,
            line_bytes,
        }
    }

    /// Byte position of 0-based line `line`.
    pub fn position(&self, line: usize) -> u64 {
        let k = self.line_offsets.len().max(1);
        let within = self.line_offsets.get(line % k).copied().unwrap_or(0);
        self.data_offset + (line / k) as u64 * self.record_length + within
    }
}

/// One physical file covering a contiguous band of lines of one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentDescriptor {
    pub path: PathBuf,
    pub segment_number: u16,
    pub planned_start_segment: u16,
    pub planned_end_segment: u16,
    pub columns: usize,
    pub lines: usize,
    pub bits_per_pixel: u8,
    pub layout: LineLayout,
}

impl SegmentDescriptor {
    /// Open the file for line reads.
    pub fn open_lines(&self) -> std::io::Result<LineReader> {
        let file = File::open(&self.path)?;
        Ok(LineReader {
            reader: BufReader::new(file),
            layout: self.layout.clone(),
            position: None,
        })
    }
}

/// Reads packed lines of one segment. Dropping it closes the file.
#[derive(Debug)]
pub struct LineReader {
    reader: BufReader<File>,
    layout: LineLayout,
    position: Option<u64>,
}

impl LineReader {
    pub fn line_bytes(&self) -> usize {
        self.layout.line_bytes
    }

    /// Read 0-based line `line` into `buf`, which must be `line_bytes` long.
    ///
    /// Sequential reads continue from the current position; a short file
    /// surfaces as `UnexpectedEof`.
    pub fn read_line(&mut self, line: usize, buf: &mut [u8]) -> std::io::Result<()> {
        let target = self.layout.position(line);
        if self.position != Some(target) {
            self.reader.seek(SeekFrom::Start(target))?;
        }
        self.position = None;
        self.reader.read_exact(buf)?;
        self.position = Some(target + buf.len() as u64);
        Ok(())
    }
}

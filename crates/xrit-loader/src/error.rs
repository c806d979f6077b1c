//! Error types for image loading.

use std::path::PathBuf;

use thiserror::Error;
use xrit_common::{CommonError, PixelWindow};
use xrit_parser::XritError;

/// Errors that can occur while loading an image.
#[derive(Error, Debug)]
pub enum LoaderError {
    /// Header or catalog failure from the parser.
    #[error(transparent)]
    Parse(#[from] XritError),

    /// Geometry value rejected by the common types.
    #[error(transparent)]
    Geometry(#[from] CommonError),

    /// The requested window is not inside the image.
    #[error("window rows {:?} cols {:?} is outside the {lines}x{columns} image", .window.rows, .window.cols)]
    WindowOutOfRange {
        window: PixelWindow,
        lines: usize,
        columns: usize,
    },

    /// Sample depth other than 8, 10 or 16 bits.
    #[error("unsupported bit depth: {0} bits per pixel")]
    UnsupportedBitDepth(u8),

    /// A segment present in the catalog could not be read.
    #[error("failed to read segment {segment} from {path}: {reason}")]
    SegmentRead {
        path: PathBuf,
        segment: u16,
        reason: String,
    },

    /// None of the segments of the requested image were found.
    #[error("no image segments found for {0}")]
    MissingSegments(String),

    /// A prologue, epilogue or native header field is unusable.
    #[error("invalid image metadata: {0}")]
    Metadata(String),

    /// Storage/IO error.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Calibration error.
    #[error("calibration error: {0}")]
    Calibration(String),

    /// Decompression error.
    #[error("decompression error: {0}")]
    Decompression(String),
}

impl LoaderError {
    /// Create an Io error for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a SegmentRead error.
    pub fn segment_read(path: impl Into<PathBuf>, segment: u16, reason: impl ToString) -> Self {
        Self::SegmentRead {
            path: path.into(),
            segment,
            reason: reason.to_string(),
        }
    }

    /// Create a Metadata error.
    pub fn metadata(msg: impl Into<String>) -> Self {
        Self::Metadata(msg.into())
    }

    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a Calibration error.
    pub fn calibration(msg: impl Into<String>) -> Self {
        Self::Calibration(msg.into())
    }
}

impl From<serde_yaml::Error> for LoaderError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

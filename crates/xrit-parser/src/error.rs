//! Error types for xRIT parsing.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for xRIT parser operations.
pub type XritResult<T> = Result<T, XritError>;

/// Errors raised while decoding xRIT files.
///
/// None of these are recovered locally: a header that cannot be decoded is
/// never guessed at.
#[derive(Error, Debug)]
pub enum XritError {
    /// A primitive was handed a slice of the wrong width.
    #[error("malformed {field}: expected {expected} bytes, got {actual}")]
    MalformedField {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The header record framing is broken.
    #[error("header decode error{}: {reason}", path_suffix(.path))]
    HeaderDecode {
        path: Option<PathBuf>,
        reason: String,
    },

    /// A required record is absent from a file header.
    #[error("{}: missing {record} record", .path.display())]
    MissingRecord { path: PathBuf, record: &'static str },

    /// Segments of one image disagree on their structure.
    #[error("inconsistent segment {}: {reason}", .path.display())]
    InconsistentSegment { path: PathBuf, reason: String },

    /// Packed 10-bit input whose length is not a multiple of 5.
    #[error("invalid packed length {length}: must be a multiple of 5")]
    InvalidPackedLength { length: usize },

    /// I/O failure on a specific file.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn path_suffix(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => format!(" in {}", p.display()),
        None => String::new(),
    }
}

impl XritError {
    /// Create a HeaderDecode error not tied to a file.
    pub fn header(reason: impl Into<String>) -> Self {
        Self::HeaderDecode {
            path: None,
            reason: reason.into(),
        }
    }

    /// Create an Io error for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Attach a file path to a path-less header error.
    pub fn with_path(self, path: impl Into<PathBuf>) -> Self {
        match self {
            Self::HeaderDecode { path: None, reason } => Self::HeaderDecode {
                path: Some(path.into()),
                reason,
            },
            other => other,
        }
    }
}

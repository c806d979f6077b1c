//! HRIT/LRIT (xRIT) file decoding.
//!
//! This crate reads the parts of an xRIT file that do not depend on what the
//! pixels mean:
//!
//! - [`bin_reader`]: big-endian primitives and CCSDS time codes
//! - [`records`]: the tagged header records, decoded through per-mission
//!   tables ([`Mission`])
//! - [`segment`]: one file, its data field and a line reader
//! - [`catalog`]: the segment files of one image, validated against each other
//! - [`unpacking`]: 10-bit to 16-bit sample expansion
//!
//! Image assembly lives in the `xrit-loader` crate.

pub mod bin_reader;
pub mod catalog;
pub mod error;
pub mod mission;
pub mod records;
pub mod segment;
pub mod unpacking;

pub use catalog::SegmentCatalog;
pub use error::{XritError, XritResult};
pub use mission::Mission;
pub use records::{
    parse_headers, read_headers, FileType, HeaderRecord, RecordBody, RecordFields,
};
pub use segment::{LineLayout, LineReader, SegmentDescriptor, SegmentFile};
pub use unpacking::{unpack_10bit, TenBitUnpacker};

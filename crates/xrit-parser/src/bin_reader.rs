//! Big-endian primitive decoding.
//!
//! Every reader takes a slice of exactly the primitive's width and fails with
//! [`XritError::MalformedField`] otherwise. [`ByteCursor`] walks a buffer
//! field by field on top of these readers. A few missions store auxiliary
//! headers little-endian; the cursor has `_le` readers for those.

use chrono::{DateTime, Duration, Utc};
use xrit_common::cds_epoch;

use crate::error::{XritError, XritResult};

/// Width of a CDS time field (days u16 + milliseconds u32).
pub const CDS_TIME_LEN: usize = 6;
/// Width of an expanded CDS time field (CDS + microseconds u16 + nanoseconds u16).
pub const CDS_EXPANDED_TIME_LEN: usize = 10;

fn fixed<const N: usize>(field: &'static str, buf: &[u8]) -> XritResult<[u8; N]> {
    buf.try_into().map_err(|_| XritError::MalformedField {
        field,
        expected: N,
        actual: buf.len(),
    })
}

pub fn read_u8(buf: &[u8]) -> XritResult<u8> {
    Ok(u8::from_be_bytes(fixed("u8", buf)?))
}

pub fn read_u16(buf: &[u8]) -> XritResult<u16> {
    Ok(u16::from_be_bytes(fixed("u16", buf)?))
}

pub fn read_u32(buf: &[u8]) -> XritResult<u32> {
    Ok(u32::from_be_bytes(fixed("u32", buf)?))
}

pub fn read_u64(buf: &[u8]) -> XritResult<u64> {
    Ok(u64::from_be_bytes(fixed("u64", buf)?))
}

pub fn read_i8(buf: &[u8]) -> XritResult<i8> {
    Ok(i8::from_be_bytes(fixed("i8", buf)?))
}

pub fn read_i16(buf: &[u8]) -> XritResult<i16> {
    Ok(i16::from_be_bytes(fixed("i16", buf)?))
}

pub fn read_i32(buf: &[u8]) -> XritResult<i32> {
    Ok(i32::from_be_bytes(fixed("i32", buf)?))
}

pub fn read_i64(buf: &[u8]) -> XritResult<i64> {
    Ok(i64::from_be_bytes(fixed("i64", buf)?))
}

pub fn read_f32(buf: &[u8]) -> XritResult<f32> {
    Ok(f32::from_be_bytes(fixed("f32", buf)?))
}

pub fn read_f64(buf: &[u8]) -> XritResult<f64> {
    Ok(f64::from_be_bytes(fixed("f64", buf)?))
}

/// CCSDS day-segmented time: u16 days and u32 milliseconds since 1958-01-01.
pub fn read_cds_time(buf: &[u8]) -> XritResult<DateTime<Utc>> {
    let b: [u8; CDS_TIME_LEN] = fixed("CDS time", buf)?;
    let days = u16::from_be_bytes([b[0], b[1]]);
    let msecs = u32::from_be_bytes([b[2], b[3], b[4], b[5]]);
    Ok(cds_epoch() + Duration::days(days as i64) + Duration::milliseconds(msecs as i64))
}

/// CDS time followed by u16 microseconds and u16 nanoseconds.
pub fn read_cds_expanded_time(buf: &[u8]) -> XritResult<DateTime<Utc>> {
    let b: [u8; CDS_EXPANDED_TIME_LEN] = fixed("CDS expanded time", buf)?;
    let base = read_cds_time(&b[..CDS_TIME_LEN])?;
    let usecs = u16::from_be_bytes([b[6], b[7]]);
    let nsecs = u16::from_be_bytes([b[8], b[9]]);
    Ok(base + Duration::nanoseconds(usecs as i64 * 1_000 + nsecs as i64))
}

/// CCSDS unsegmented time: `coarse` bytes of whole seconds followed by `fine`
/// bytes of binary fraction, counted from the CDS epoch.
pub fn read_cuc_time(buf: &[u8], coarse: usize, fine: usize) -> XritResult<DateTime<Utc>> {
    if buf.len() != coarse + fine || coarse > 8 {
        return Err(XritError::MalformedField {
            field: "CUC time",
            expected: coarse + fine,
            actual: buf.len(),
        });
    }

    let seconds = buf[..coarse]
        .iter()
        .fold(0u64, |acc, b| (acc << 8) | *b as u64);
    let fraction: f64 = buf[coarse..]
        .iter()
        .enumerate()
        .map(|(i, b)| *b as f64 * 2f64.powi(-8 * (i as i32 + 1)))
        .sum();
    let nanos = (fraction * 1e9).round() as i64;
    Ok(cds_epoch() + Duration::seconds(seconds as i64) + Duration::nanoseconds(nanos))
}

/// Sequential reader over a byte buffer.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Take the next `n` bytes.
    pub fn take(&mut self, n: usize) -> XritResult<&'a [u8]> {
        if n > self.remaining() {
            return Err(XritError::MalformedField {
                field: "buffer",
                expected: n,
                actual: self.remaining(),
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn skip(&mut self, n: usize) -> XritResult<()> {
        self.take(n).map(|_| ())
    }

    pub fn seek(&mut self, pos: usize) -> XritResult<()> {
        if pos > self.buf.len() {
            return Err(XritError::MalformedField {
                field: "buffer",
                expected: pos,
                actual: self.buf.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    pub fn u8(&mut self) -> XritResult<u8> {
        read_u8(self.take(1)?)
    }

    pub fn u16(&mut self) -> XritResult<u16> {
        read_u16(self.take(2)?)
    }

    pub fn u32(&mut self) -> XritResult<u32> {
        read_u32(self.take(4)?)
    }

    pub fn u64(&mut self) -> XritResult<u64> {
        read_u64(self.take(8)?)
    }

    pub fn i16(&mut self) -> XritResult<i16> {
        read_i16(self.take(2)?)
    }

    pub fn i32(&mut self) -> XritResult<i32> {
        read_i32(self.take(4)?)
    }

    pub fn f32(&mut self) -> XritResult<f32> {
        read_f32(self.take(4)?)
    }

    pub fn f64(&mut self) -> XritResult<f64> {
        read_f64(self.take(8)?)
    }

    pub fn u32_le(&mut self) -> XritResult<u32> {
        Ok(u32::from_le_bytes(fixed("u32", self.take(4)?)?))
    }

    pub fn u64_le(&mut self) -> XritResult<u64> {
        Ok(u64::from_le_bytes(fixed("u64", self.take(8)?)?))
    }

    pub fn i32_le(&mut self) -> XritResult<i32> {
        Ok(i32::from_le_bytes(fixed("i32", self.take(4)?)?))
    }

    pub fn f64_le(&mut self) -> XritResult<f64> {
        Ok(f64::from_le_bytes(fixed("f64", self.take(8)?)?))
    }

    pub fn cds_time(&mut self) -> XritResult<DateTime<Utc>> {
        read_cds_time(self.take(CDS_TIME_LEN)?)
    }

    pub fn cds_expanded_time(&mut self) -> XritResult<DateTime<Utc>> {
        read_cds_expanded_time(self.take(CDS_EXPANDED_TIME_LEN)?)
    }

    /// `n` bytes decoded as Latin-1 text, trailing NULs and blanks trimmed.
    pub fn text(&mut self, n: usize) -> XritResult<String> {
        Ok(decode_text(self.take(n)?))
    }
}

/// Decode header text. Bytes map 1:1 to chars (Latin-1); NULs and trailing
/// whitespace are dropped.
pub fn decode_text(buf: &[u8]) -> String {
    let text: String = buf.iter().map(|&b| b as char).collect();
    text.trim_end_matches(['\0', ' ']).trim_start_matches('\0').to_string()
}

//! 10-bit sample unpacking.
//!
//! Four 10-bit samples are packed MSB first into five bytes:
//!
//! ```text
//! byte:    0         1         2         3         4
//! bits:  AAAAAAAA  AABBBBBB  BBBBCCCC  CCCCCCDD  DDDDDDDD
//! ```

use crate::error::{XritError, XritResult};

/// Bytes per packed group.
pub const GROUP_BYTES: usize = 5;
/// Samples per packed group.
pub const GROUP_SAMPLES: usize = 4;
/// Default chunk size for streaming unpack.
pub const BLOB_SIZE: usize = 5120;

#[inline]
fn unpack_group(g: &[u8], out: &mut Vec<u16>) {
    let (b0, b1, b2, b3, b4) = (g[0] as u16, g[1] as u16, g[2] as u16, g[3] as u16, g[4] as u16);
    out.push((b0 << 2) | (b1 >> 6));
    out.push(((b1 & 0x3F) << 4) | (b2 >> 4));
    out.push(((b2 & 0x0F) << 6) | (b3 >> 2));
    out.push(((b3 & 0x03) << 8) | b4);
}

/// Unpack `packed` into a new vector of samples.
pub fn unpack_10bit(packed: &[u8]) -> XritResult<Vec<u16>> {
    let mut out = Vec::with_capacity(packed.len() / GROUP_BYTES * GROUP_SAMPLES);
    unpack_10bit_into(packed, &mut out)?;
    Ok(out)
}

/// Unpack `packed`, appending the samples to `out`.
pub fn unpack_10bit_into(packed: &[u8], out: &mut Vec<u16>) -> XritResult<()> {
    if packed.len() % GROUP_BYTES != 0 {
        return Err(XritError::InvalidPackedLength {
            length: packed.len(),
        });
    }
    out.reserve(packed.len() / GROUP_BYTES * GROUP_SAMPLES);
    for group in packed.chunks_exact(GROUP_BYTES) {
        unpack_group(group, out);
    }
    Ok(())
}

/// Packed byte count holding `samples` 10-bit samples, rounded up to whole bytes.
pub fn packed_len(samples: usize) -> usize {
    (samples * 10).div_ceil(8)
}

/// Incremental unpacker for input that arrives in arbitrary chunks.
///
/// A group split across two chunks is carried over to the next call.
#[derive(Debug, Default)]
pub struct TenBitUnpacker {
    pending: [u8; GROUP_BYTES],
    pending_len: usize,
    consumed: usize,
}

impl TenBitUnpacker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unpack as many whole groups as `chunk` completes.
    pub fn feed(&mut self, mut chunk: &[u8], out: &mut Vec<u16>) {
        self.consumed += chunk.len();

        if self.pending_len > 0 {
            let need = GROUP_BYTES - self.pending_len;
            let take = need.min(chunk.len());
            self.pending[self.pending_len..self.pending_len + take].copy_from_slice(&chunk[..take]);
            self.pending_len += take;
            chunk = &chunk[take..];
            if self.pending_len < GROUP_BYTES {
                return;
            }
            let group = self.pending;
            unpack_group(&group, out);
            self.pending_len = 0;
        }

        let whole = chunk.len() - chunk.len() % GROUP_BYTES;
        out.reserve(whole / GROUP_BYTES * GROUP_SAMPLES);
        for group in chunk[..whole].chunks_exact(GROUP_BYTES) {
            unpack_group(group, out);
        }

        let rest = &chunk[whole..];
        self.pending[..rest.len()].copy_from_slice(rest);
        self.pending_len = rest.len();
    }

    /// Finish the stream. Fails if a partial group is left over.
    pub fn finish(self) -> XritResult<()> {
        if self.pending_len != 0 {
            return Err(XritError::InvalidPackedLength {
                length: self.consumed,
            });
        }
        Ok(())
    }
}

/// Unpack `packed` in fixed-size chunks of `chunk_size` bytes.
pub fn unpack_10bit_chunked(packed: &[u8], chunk_size: usize) -> XritResult<Vec<u16>> {
    let mut unpacker = TenBitUnpacker::new();
    let mut out = Vec::with_capacity(packed.len() / GROUP_BYTES * GROUP_SAMPLES);
    for chunk in packed.chunks(chunk_size.max(1)) {
        unpacker.feed(chunk, &mut out);
    }
    unpacker.finish()?;
    Ok(out)
}

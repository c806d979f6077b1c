//! Sample generators and bit packers for synthetic image data.
//!
//! The patterns are predictable so a test can recompute any pixel from its
//! (line, column) position in the on-disk raster.

/// Deterministic 10-bit count for on-disk line `line` and column `col`
/// (both 0-based, whole-image coordinates).
///
/// Never returns 0, which is the usual no-data value.
///
/// # Example
///
/// ```
/// use test_utils::pattern_value;
///
/// assert_eq!(pattern_value(0, 0), 1);
/// assert_eq!(pattern_value(0, 1), 4);
/// assert_eq!(pattern_value(1, 0), 8);
/// ```
pub fn pattern_value(line: usize, col: usize) -> u16 {
    ((line * 7 + col * 3) % 1000 + 1) as u16
}

/// Samples of one on-disk line using [`pattern_value`].
pub fn pattern_line(line: usize, columns: usize) -> Vec<u16> {
    (0..columns).map(|c| pattern_value(line, c)).collect()
}

/// Packs 10-bit samples MSB first, four samples per five bytes.
///
/// The tail is padded with zero samples up to a whole number of bytes.
///
/// # Example
///
/// ```
/// use test_utils::pack_10bit;
///
/// assert_eq!(pack_10bit(&[1023, 1023, 1023, 1023]), vec![0xFF; 5]);
/// ```
pub fn pack_10bit(samples: &[u16]) -> Vec<u8> {
    let total_bits = samples.len() * 10;
    let mut out = vec![0u8; total_bits.div_ceil(8)];
    for (i, &s) in samples.iter().enumerate() {
        let s = s & 0x3FF;
        for b in 0..10 {
            if s & (1 << (9 - b)) != 0 {
                let pos = i * 10 + b;
                out[pos / 8] |= 0x80 >> (pos % 8);
            }
        }
    }
    out
}

/// Encodes one line of samples at the given bit depth (8, 10 or 16).
///
/// 16-bit samples are written big-endian.
pub fn encode_line(samples: &[u16], bits_per_pixel: u8) -> Vec<u8> {
    match bits_per_pixel {
        8 => samples.iter().map(|&s| s as u8).collect(),
        10 => pack_10bit(samples),
        16 => samples.iter().flat_map(|s| s.to_be_bytes()).collect(),
        other => panic!("unsupported test bit depth {other}"),
    }
}

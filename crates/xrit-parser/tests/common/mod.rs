//! Common helpers for xrit-parser integration tests.

use std::path::PathBuf;

use tempfile::TempDir;
use test_utils::{temp_test_dir, SyntheticChannel};

/// A channel written to a temporary directory.
pub struct WrittenChannel {
    pub dir: TempDir,
    pub channel: SyntheticChannel,
    pub paths: Vec<PathBuf>,
}

/// Write `segments` of a small 10-bit channel (16 columns, 4 lines each,
/// 3 planned segments).
pub fn small_channel(segments: &[u16]) -> WrittenChannel {
    let dir = temp_test_dir();
    let channel = SyntheticChannel::small(16, 4, 3, 10);
    let paths = channel.write_segments(dir.path(), segments);
    WrittenChannel {
        dir,
        channel,
        paths,
    }
}

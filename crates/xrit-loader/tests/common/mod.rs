//! Common helpers for xrit-loader integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

use tempfile::TempDir;
use test_utils::{temp_test_dir, GridSpec, MsgEpilogueSpec, MsgPrologueSpec, SyntheticChannel};
use xrit_loader::{FirstPixel, ImageFiles, ImageLoader, LoaderConfig};
use xrit_parser::Mission;

/// Files of one image written to a temporary directory.
pub struct WrittenImage {
    pub dir: TempDir,
    pub channel: SyntheticChannel,
    pub files: ImageFiles,
}

impl WrittenImage {
    pub fn open(&self, mission: Mission, config: LoaderConfig) -> ImageLoader {
        ImageLoader::open(mission, &self.files, config).expect("failed to open image")
    }
}

/// Write `segments` of `channel` with no auxiliary files.
pub fn plain_image(channel: SyntheticChannel, segments: &[u16]) -> WrittenImage {
    let dir = temp_test_dir();
    let paths = channel.write_segments(dir.path(), segments);
    WrittenImage {
        dir,
        channel,
        files: ImageFiles::new(paths),
    }
}

/// Write `segments` of `channel` plus an MSG prologue and epilogue.
pub fn msg_image(
    channel: SyntheticChannel,
    segments: &[u16],
    prologue: &MsgPrologueSpec,
    epilogue: &MsgEpilogueSpec,
) -> WrittenImage {
    let mut image = plain_image(channel, segments);
    let pro = prologue.write_to(&image.dir.path().join("PRO"));
    let epi = epilogue.write_to(&image.dir.path().join("EPI"));
    image.files = image.files.clone().with_prologue(pro).with_epilogue(epi);
    image
}

pub fn grid(lines: i32, columns: i32, origin: u8) -> GridSpec {
    GridSpec {
        lines,
        columns,
        line_step: 3.0,
        column_step: 3.0,
        origin,
    }
}

/// A 12 line by 16 column IR_108 channel in 3 segments with a matching
/// prologue whose VIS/IR grid starts at `origin`.
pub fn small_msg_channel(origin: u8, coverage: [i32; 4]) -> (SyntheticChannel, MsgPrologueSpec, MsgEpilogueSpec) {
    let channel = SyntheticChannel::small(16, 4, 3, 10);
    let prologue = MsgPrologueSpec {
        vis_ir: grid(12, 16, origin),
        ..Default::default()
    };
    let epilogue = MsgEpilogueSpec {
        vis_ir: coverage,
        ..Default::default()
    };
    (channel, prologue, epilogue)
}

/// The on-disk raster described by data boundaries `[south, north, east,
/// west]`: each boundary's lines hold samples starting at its east column.
/// Cells outside every boundary are 0.
pub fn disk_raster(channel: &SyntheticChannel, lines: usize, columns: usize, boundaries: &[[i32; 4]]) -> Vec<u16> {
    let mut out = vec![0u16; lines * columns];
    for &[south, north, east, west] in boundaries {
        for row in (south - 1) as usize..north as usize {
            let segment = (row / channel.segment_lines) as u16 + 1;
            let samples = channel.line_samples(segment, row % channel.segment_lines);
            for col in (east - 1) as usize..west as usize {
                out[row * columns + col] = samples[col - (east - 1) as usize];
            }
        }
    }
    out
}

/// Mirror an on-disk raster into north-up, west-left order.
pub fn normalize(disk: &[u16], lines: usize, columns: usize, first_pixel: FirstPixel) -> Vec<u16> {
    let mut out = Vec::with_capacity(disk.len());
    for i in 0..lines {
        let row = if first_pixel.is_south() { lines - 1 - i } else { i };
        for j in 0..columns {
            let col = if first_pixel.is_east() { columns - 1 - j } else { j };
            out.push(disk[row * columns + col]);
        }
    }
    out
}

pub fn paths(image: &WrittenImage) -> Vec<PathBuf> {
    image.files.segments.clone()
}

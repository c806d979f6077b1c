//! Command line definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use xrit_parser::Mission;

#[derive(Parser, Debug)]
#[command(name = "xrit-tool")]
#[command(about = "Inspect xRIT segment files and load image windows", long_about = None)]
pub struct Cli {
    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Dump the header records of one file
    Headers {
        file: PathBuf,

        /// Record table to decode with (base, msg, jma, sgs, goms)
        #[arg(short, long, default_value = "base")]
        mission: Mission,

        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the segments of one channel and report the missing ones
    Catalog {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(short, long, default_value = "base")]
        mission: Mission,

        #[arg(long)]
        json: bool,
    },

    /// Load a window of an image and summarize it
    Slice(SliceArgs),

    /// Decompress one file with xRITDecompress
    Decompress {
        file: PathBuf,

        /// Path to the xRITDecompress program
        #[arg(long, env = "XRIT_DECOMPRESS_PATH")]
        program: PathBuf,

        /// Output directory (default: the directory of the input)
        #[arg(long, env = "XRIT_DECOMPRESS_OUTDIR")]
        outdir: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct SliceArgs {
    /// Segment files, or the single native file
    pub segments: Vec<PathBuf>,

    #[arg(short, long, default_value = "base")]
    pub mission: Mission,

    /// MSG HRIT prologue
    #[arg(long)]
    pub prologue: Option<PathBuf>,

    /// MSG HRIT epilogue
    #[arg(long)]
    pub epilogue: Option<PathBuf>,

    /// Channel to read (native files, or with --satellite)
    #[arg(long)]
    pub channel: Option<String>,

    /// Locate files from `<satellite>.yaml` in PPP_CONFIG_DIR instead
    #[arg(long, requires_all = ["channel", "time"], conflicts_with = "segments")]
    pub satellite: Option<String>,

    /// Instrument of --satellite
    #[arg(long)]
    pub instrument: Option<String>,

    /// Nominal image time, YYYYmmddHHMM
    #[arg(long)]
    pub time: Option<String>,

    /// Rows `start:stop` of the normalized image
    #[arg(long, default_value = ":")]
    pub rows: String,

    /// Columns `start:stop` of the normalized image
    #[arg(long, default_value = ":")]
    pub cols: String,

    /// Projection extent `ll_x,ll_y,ur_x,ur_y`, replaces --rows/--cols
    #[arg(long, allow_hyphen_values = true)]
    pub extent: Option<String>,

    /// Mask no-data cells
    #[arg(long)]
    pub mask: bool,

    /// Read segments on the rayon pool
    #[arg(long)]
    pub parallel: bool,

    /// Calibration level: 0 counts, 1 default, 2 radiance
    #[arg(long)]
    pub calibrate: Option<u8>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

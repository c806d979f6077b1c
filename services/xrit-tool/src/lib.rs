//! Command line access to xRIT files: header dumps, segment catalogs,
//! window loading and decompression.

pub mod cli;
pub mod commands;
pub mod logging;

pub use cli::{Cli, Commands, SliceArgs};

//! xRIT inspection and window loading tool.

use std::io::{self, Write};

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use xrit_tool::{commands, logging, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level, cli.log_json)?;
    debug!(command = ?cli.command, "starting xrit-tool");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    commands::run(&cli.command, &mut out)?;
    out.flush()?;
    Ok(())
}

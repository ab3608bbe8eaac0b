//! iearth CLI: download a dataset's files from the iEarth data service.

use anyhow::Result;
use clap::Parser;
use iearth::engine::arg_parser::Cli;
use iearth::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}

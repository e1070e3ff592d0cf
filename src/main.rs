//! snipshare - shared snippet viewer
//!
//! Opens a code snippet published behind a shareable link, shows it with
//! syntax highlighting, and lets the visitor like it, copy it, or open it in
//! the editor. Likes are remembered per machine, so no account is needed.

use clap::Parser;
use color_eyre::{Result, eyre::eyre};
use std::process::ExitCode;

use snipshare::config::Config;
use snipshare::logging;

mod cli;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let args = cli::Cli::parse();
    let config = Config::load(args.config.as_deref()).map_err(|e| eyre!("{:#}", e))?;

    let level = if args.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    logging::init_logging(level);

    let ok = cli::execute_cli(args, config)
        .await
        .map_err(|e| eyre!("{:#}", e))?;
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

mod config;
mod import;
mod logging;
mod report;
mod vms;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};

use crate::config::Config;
use crate::import::ParseMode;
use crate::report::ReportStyle;

const APP_VERSION: &str = "0.1";

/// read a XenServer vm metadata export and list the machines in it
#[derive(Parser, Debug)]
#[command(author, about, long_about = None)]
pub struct Params {
    /// Absolute path to xe binary including executable
    #[arg(long, env = "XE_BINARY", value_name = "PATH", allow_hyphen_values = true)]
    xebinary: Option<String>,

    /// Filename with meta data to import
    #[arg(long, env = "XE_IMPORT_FILE", value_name = "FILE", allow_hyphen_values = true)]
    infile: Option<String>,

    /// Print the version number
    #[arg(short = 'v', long = "version-info")]
    print_version: bool,

    /// Fail on malformed or incomplete exports instead of skipping them
    #[arg(long)]
    strict: bool,

    /// Only print the machine list
    #[arg(short, long)]
    quiet: bool,

    /// Also print each machine's parents, vbds and snapshots
    #[arg(long)]
    details: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Params::parse_from(config::normalize_args(std::env::args_os()));

    if args.print_version {
        println!("Version: {APP_VERSION}");
        return Ok(());
    }

    logging::init_tracing();

    let config = Config::resolve(&args);
    run(&config)
}

fn run(config: &Config) -> anyhow::Result<()> {
    let mode = if config.strict {
        ParseMode::Strict
    } else {
        ParseMode::Permissive
    };
    debug!(xe_binary = %config.xe_binary.display(), ?mode, "importing");

    let vms = import::load(&config.import_file, mode).with_context(|| {
        format!("failed to import {}", config.import_file.display())
    })?;
    if !config.quiet {
        println!("Successfully Opened {}", config.import_file.display());
    }

    if vms.is_empty() {
        info!("no machines found in {}", config.import_file.display());
    }

    let style = if config.details {
        ReportStyle::Detailed
    } else {
        ReportStyle::Summary
    };
    report::report(&vms, &mut std::io::stdout().lock(), style)?;

    Ok(())
}

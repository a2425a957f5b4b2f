//! SDReWire CLI — switch an FTDI-based SD-card mux between test system and DUT.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser};

mod cli;

#[derive(Parser)]
#[command(
    name = "sdrewire",
    version,
    about = "Control SDReWire SD-card multiplexers"
)]
struct Args {
    /// Only consider the device with this USB serial number
    #[arg(long, global = true)]
    serial: Option<String>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output as JSON (for list, sdmux, config)
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<cli::Command>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let Some(command) = args.command else {
        let _ = Args::command().print_help();
        return ExitCode::FAILURE;
    };

    let globals = cli::Globals {
        serial: args.serial,
        config_path: args.config,
        json: args.json,
    };

    match cli::run(command, &globals) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

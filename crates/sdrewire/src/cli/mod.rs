//! CLI subcommands — device listing, mux control, configuration.

mod config_cmd;
mod list;
mod sdmux;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Subcommand;
use serde::Serialize;

pub(super) use sdrewire_lib::config::{Config, Settings};
pub(super) use sdrewire_lib::device::{self, DiscoveredDevice, MuxDevice, Selection};
pub(super) use sdrewire_lib::error::Result;
pub(super) use sdrewire_lib::mux::{self, MuxRequest};
pub(super) use sdrewire_lib::protocol::MuxMode;

/// Options shared by every subcommand, resolved once in `main`.
pub struct Globals {
    pub serial: Option<String>,
    pub config_path: Option<PathBuf>,
    pub json: bool,
}

impl Globals {
    fn load_config(&self) -> Config {
        Config::load(self.config_path.as_deref())
    }

    fn settings(&self) -> Result<Settings> {
        Settings::resolve(&self.load_config(), self.serial.as_deref())
    }
}

const PADDING: usize = 2;

/// Compute alignment width for a command's key-value output.
/// Ensures at least PADDING spaces after the longest key in either level,
/// with top-level and indent values aligned to the same column.
pub(super) fn kv_width(top: &[&str], indent: &[&str]) -> usize {
    let top_max = top.iter().map(|k| k.len()).max().unwrap_or(0);
    let indent_max = indent.iter().map(|k| k.len()).max().unwrap_or(0);
    let top_need = if top.is_empty() { 0 } else { top_max + PADDING };
    // Indent keys lose 2 chars of inner width to the "  " prefix
    let indent_need = if indent.is_empty() {
        0
    } else {
        indent_max + PADDING + 2
    };
    top_need.max(indent_need)
}

pub(super) fn format_kv(key: &str, value: impl std::fmt::Display, w: usize) -> String {
    format!("{key:<width$}{value}", width = w)
}

pub(super) fn kv(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("{}", format_kv(key, value, w));
}

pub(super) fn kv_indent(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("  {key:<width$}{value}", width = w - 2);
}

// ── JSON output structs ──

#[derive(Serialize)]
pub(super) struct ListOutput {
    pub count: usize,
    pub devices: Vec<DiscoveredDevice>,
}

#[derive(Serialize)]
pub(super) struct SdmuxOutput {
    pub device: DiscoveredDevice,
    pub switched_to: Option<MuxMode>,
    pub mode: Option<MuxMode>,
}

#[derive(Serialize)]
pub(super) struct ConfigOutput {
    pub config_file: Option<String>,
    pub config_file_exists: bool,
    pub settings: Config,
}

#[derive(Subcommand)]
pub enum Command {
    /// List connected SDReWire devices
    List,

    /// Switch the SD mux and/or show which host it is connected to
    Sdmux {
        /// Connect the SD card to the test system
        #[arg(long, conflicts_with = "dut")]
        ts: bool,
        /// Connect the SD card to the device under test
        #[arg(long)]
        dut: bool,
        /// Print which host the SD card is connected to
        #[arg(long)]
        status: bool,
    },

    /// Show current configuration and file path
    Config,
}

pub fn run(cmd: Command, globals: &Globals) -> Result<ExitCode> {
    match cmd {
        Command::List => list::cmd_list(&globals.settings()?, globals.json),
        Command::Sdmux { ts, dut, status } => sdmux::cmd_sdmux(
            &globals.settings()?,
            MuxRequest::from_flags(ts, dut, status),
            globals.json,
        ),
        Command::Config => {
            config_cmd::cmd_config(globals.config_path.as_deref(), globals.json)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

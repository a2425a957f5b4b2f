//! `config` subcommand — show current configuration and file path.

use std::path::Path;

use super::{Config, ConfigOutput, Result, kv, kv_indent, kv_width};

pub(super) fn cmd_config(custom_path: Option<&Path>, json: bool) -> Result<()> {
    let config = Config::load(custom_path);
    let config_path = custom_path.map(Path::to_path_buf).or_else(Config::path);
    let config_exists = config_path.as_ref().is_some_and(|p| p.exists());

    if json {
        let output = ConfigOutput {
            config_file: config_path.as_ref().map(|p| p.display().to_string()),
            config_file_exists: config_exists,
            settings: config,
        };
        let rendered = serde_json::to_string_pretty(&output).map_err(std::io::Error::other)?;
        println!("{rendered}");
        return Ok(());
    }

    let w = kv_width(&["Config file:"], &["serial:", "timeout_ms:"]);

    match &config_path {
        Some(p) if config_exists => kv("Config file:", format_args!("{} (loaded)", p.display()), w),
        Some(p) => kv(
            "Config file:",
            format_args!("{} (not found, using defaults)", p.display()),
            w,
        ),
        None => kv("Config file:", "(no config directory)", w),
    }
    println!();

    println!("Settings:");
    let serial = if config.serial.is_empty() {
        "(any)"
    } else {
        config.serial.as_str()
    };
    kv_indent("serial:", serial, w);
    kv_indent("timeout_ms:", config.timeout_ms, w);
    if let Err(e) = config.validate() {
        println!();
        println!("Warning: {e}");
    }
    Ok(())
}

//! `list` subcommand — show connected SDReWire devices.

use std::process::ExitCode;

use super::{DiscoveredDevice, ListOutput, Result, Settings, device};

const HEADER: [&str; 7] = ["Bus", "Addr", "Ports", "Manufacturer", "Product", "Serial", "TTY"];
const WIDTHS: [usize; 6] = [4, 5, 8, 14, 12, 14];

fn format_row(cells: [&str; 7]) -> String {
    let mut line = String::new();
    for (cell, w) in cells.iter().zip(WIDTHS) {
        line.push_str(&format!("{cell:<w$} "));
    }
    line.push_str(cells[6]);
    line
}

pub(super) fn table_header() -> String {
    format_row(HEADER)
}

pub(super) fn table_row(dev: &DiscoveredDevice) -> String {
    let bus = format!("{:03}", dev.bus);
    let addr = format!("{:03}", dev.address);
    let ports = dev.port_path();
    format_row([
        bus.as_str(),
        addr.as_str(),
        ports.as_str(),
        dev.manufacturer.as_deref().unwrap_or("-"),
        dev.product.as_deref().unwrap_or("-"),
        dev.serial.as_deref().unwrap_or("-"),
        dev.tty.as_deref().unwrap_or("unknown"),
    ])
}

/// Print the device table (header first, even when empty).
pub(super) fn print_table(devices: &[DiscoveredDevice]) {
    println!("{}", table_header());
    for dev in devices {
        println!("{}", table_row(dev));
    }
}

pub(super) fn cmd_list(settings: &Settings, json: bool) -> Result<ExitCode> {
    let devices = device::enumerate_devices(settings.serial.as_deref());
    let code = if devices.is_empty() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    };

    if json {
        let output = ListOutput {
            count: devices.len(),
            devices,
        };
        let rendered = serde_json::to_string_pretty(&output).map_err(std::io::Error::other)?;
        println!("{rendered}");
        return Ok(code);
    }

    if devices.is_empty() {
        println!("No SDReWire device found");
    }
    print_table(&devices);
    Ok(code)
}

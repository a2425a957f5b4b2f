//! Best-effort lookup of the serial device node behind a USB device.
//!
//! Linux exposes each bound USB interface under `/sys/bus/usb/devices/` as
//! `<bus>-<port.port...>:<config>.<interface>`. When `ftdi_sio` is bound, that
//! directory contains a `ttyUSBn` entry; cdc-acm style drivers nest the node
//! under a `tty/` class directory instead. Anything unexpected yields `None`.

use std::path::{Path, PathBuf};

use crate::protocol::{SYSFS_CONFIGURATION, SYSFS_INTERFACE};

/// Root of the USB device hierarchy in sysfs.
pub const SYSFS_USB_DEVICES: &str = "/sys/bus/usb/devices";

const TTY_PREFIX: &str = "tty";

/// Name of the sysfs directory for the mux's UART interface.
///
/// Returns `None` for an empty port chain (root hubs have no interface dir).
pub fn interface_dir_name(bus: u8, port_chain: &[u8]) -> Option<String> {
    if port_chain.is_empty() {
        return None;
    }
    let ports: Vec<String> = port_chain.iter().map(|p| p.to_string()).collect();
    Some(format!(
        "{bus}-{}:{SYSFS_CONFIGURATION}.{SYSFS_INTERFACE}",
        ports.join(".")
    ))
}

/// Resolve the tty node for a device, using `root` as the sysfs USB directory.
pub fn resolve_tty_in(root: &Path, bus: u8, port_chain: &[u8]) -> Option<PathBuf> {
    let dir = root.join(interface_dir_name(bus, port_chain)?);
    let name = first_tty_entry(&dir)?;
    if name == TTY_PREFIX {
        // Class directory: the actual node name is one level down.
        let nested = first_tty_entry(&dir.join(TTY_PREFIX))?;
        if nested == TTY_PREFIX {
            return None;
        }
        return Some(Path::new("/dev").join(nested));
    }
    Some(Path::new("/dev").join(name))
}

/// Resolve the tty node for a device on this host.
///
/// Only Linux exposes the sysfs hierarchy; other platforms always get `None`.
pub fn resolve_tty(bus: u8, port_chain: &[u8]) -> Option<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        let tty = resolve_tty_in(Path::new(SYSFS_USB_DEVICES), bus, port_chain);
        if tty.is_none() {
            log::debug!(
                "no tty found for bus {bus} ports {port_chain:?} (driver not bound?)"
            );
        }
        tty
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = (bus, port_chain);
        log::debug!("tty resolution is not supported on this platform");
        None
    }
}

/// First directory entry (sorted) whose name starts with `tty`.
fn first_tty_entry(dir: &Path) -> Option<String> {
    let entries = std::fs::read_dir(dir).ok()?;
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|name| name.starts_with(TTY_PREFIX))
        .collect();
    names.sort();
    names.into_iter().next()
}

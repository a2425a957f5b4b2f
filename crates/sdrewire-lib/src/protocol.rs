//! Protocol constants for the FTDI FT230X-based SDReWire mux.
//!
//! The mux hardware hangs off the chip's CBUS pins. Switching is done by
//! putting the chip into CBUS bit-bang mode with a pin mask; the current
//! position is read back through the "read pins" vendor request.
//!
//! ## Bitmask layout
//!
//! High nibble = pin directions (1 = output), low nibble = output levels.
//! Only CBUS3 is used: direction bit `0x80`, level bit `0x08`.

use std::fmt;

use serde::Serialize;

// ── USB identity ──

/// FTDI vendor id.
pub const SDREWIRE_VID: u16 = 0x0403;

/// FT230X product id, as programmed on SDReWire boards.
pub const SDREWIRE_PID: u16 = 0x6015;

// ── Vendor requests ──

/// `SIO_SET_BITMODE`: value = `(mode << 8) | bitmask`, no data stage.
pub const SIO_SET_BITMODE_REQUEST: u8 = 0x0b;

/// `SIO_READ_PINS`: returns one byte with the current pin levels.
pub const SIO_READ_PINS_REQUEST: u8 = 0x0c;

/// Bit-mode selector for CBUS bit-bang.
pub const BITMODE_CBUS: u8 = 0x20;

// ── Bitmasks ──

/// CBUS3 output, driven high — SD card routed to the test system.
pub const MASK_TS: u8 = 0x88;

/// CBUS3 output, driven low — SD card routed to the device under test.
pub const MASK_DUT: u8 = 0x80;

/// Mask passed along with the pin read. The device ignores it.
pub const MASK_READ: u8 = 0x80;

/// Pin-state bit that is set while the mux points at the test system.
pub const PIN_TS: u8 = 0x08;

// ── sysfs ──

/// USB configuration value used when locating the tty interface in sysfs.
pub const SYSFS_CONFIGURATION: u8 = 1;

/// Interface number of the FTDI UART.
pub const SYSFS_INTERFACE: u8 = 0;

/// Default timeout for a single control transfer.
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Build the 16-bit `wValue` of a CBUS `SET_BITMODE` request.
pub const fn bitmode_value(bitmask: u8) -> u16 {
    ((BITMODE_CBUS as u16) << 8) | bitmask as u16
}

/// Which host the SD card is currently connected to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MuxMode {
    /// Test system.
    Ts,
    /// Device under test.
    Dut,
}

impl MuxMode {
    /// Bitmask that drives the mux into this position.
    pub const fn bitmask(self) -> u8 {
        match self {
            MuxMode::Ts => MASK_TS,
            MuxMode::Dut => MASK_DUT,
        }
    }

    /// Decode a raw pin-state byte.
    pub const fn from_pins(pins: u8) -> Self {
        if pins & PIN_TS != 0 {
            MuxMode::Ts
        } else {
            MuxMode::Dut
        }
    }
}

impl fmt::Display for MuxMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MuxMode::Ts => write!(f, "TS"),
            MuxMode::Dut => write!(f, "DUT"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ts_bitmode_value() {
        assert_eq!(bitmode_value(MuxMode::Ts.bitmask()), 0x2088);
    }

    #[test]
    fn dut_bitmode_value() {
        assert_eq!(bitmode_value(MuxMode::Dut.bitmask()), 0x2080);
    }

    #[test]
    fn read_mask_fits_in_low_byte() {
        assert_eq!(bitmode_value(MASK_READ) & 0xFF00, 0x2000);
    }

    #[test]
    fn pins_with_ts_bit_decode_as_ts() {
        assert_eq!(MuxMode::from_pins(0x08), MuxMode::Ts);
        assert_eq!(MuxMode::from_pins(0xFF), MuxMode::Ts);
        assert_eq!(MuxMode::from_pins(0x88), MuxMode::Ts);
    }

    #[test]
    fn pins_without_ts_bit_decode_as_dut() {
        assert_eq!(MuxMode::from_pins(0x00), MuxMode::Dut);
        assert_eq!(MuxMode::from_pins(0x80), MuxMode::Dut);
        assert_eq!(MuxMode::from_pins(0xF7), MuxMode::Dut);
    }

    #[test]
    fn every_byte_decodes_by_bit_3() {
        for b in 0..=u8::MAX {
            let expected = if b & 0x08 != 0 {
                MuxMode::Ts
            } else {
                MuxMode::Dut
            };
            assert_eq!(MuxMode::from_pins(b), expected, "byte 0x{b:02X}");
        }
    }

    #[test]
    fn mode_display() {
        assert_eq!(MuxMode::Ts.to_string(), "TS");
        assert_eq!(MuxMode::Dut.to_string(), "DUT");
    }

    #[test]
    fn mode_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&MuxMode::Ts).unwrap(), "\"TS\"");
        assert_eq!(serde_json::to_string(&MuxMode::Dut).unwrap(), "\"DUT\"");
    }
}

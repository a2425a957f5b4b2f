//! Device discovery and control — trait + `nusb` backend.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::protocol::*;
use crate::tty;

// ── Error type ──

/// Device communication errors.
///
/// String payloads follow the convention **"context: details"** where *context*
/// identifies the operation (e.g. `"USB open"`, `"SET_BITMODE"`) and *details*
/// carries the underlying error.
#[derive(Debug)]
pub enum DeviceError {
    NotFound,
    OpenFailed(String),
    TransferFailed(String),
    NoPinData,
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::NotFound => write!(f, "No device found."),
            DeviceError::OpenFailed(e) => write!(f, "Failed to open device: {e}"),
            DeviceError::TransferFailed(e) => write!(f, "Control transfer failed: {e}"),
            DeviceError::NoPinData => write!(f, "Pin read returned no data"),
        }
    }
}

impl std::error::Error for DeviceError {}

pub type Result<T> = std::result::Result<T, DeviceError>;

// ── Device enumeration ──

/// A matching mux found on the bus (not yet opened).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveredDevice {
    pub bus: u8,
    pub address: u8,
    /// Hub port numbers from the root hub down to the device.
    pub port_chain: Vec<u8>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial: Option<String>,
    /// Serial device node, if the kernel driver exposes one.
    pub tty: Option<String>,
}

impl DiscoveredDevice {
    /// Port chain rendered as `1.4.2`.
    pub fn port_path(&self) -> String {
        let ports: Vec<String> = self.port_chain.iter().map(|p| p.to_string()).collect();
        ports.join(".")
    }

    /// Short single-line description used in candidate lists.
    pub fn label(&self) -> String {
        format!(
            "bus {:03} addr {:03} serial {}",
            self.bus,
            self.address,
            self.serial.as_deref().unwrap_or("(none)")
        )
    }
}

/// Whether a device with the given ids and serial belongs in the match set.
///
/// An empty filter means "any serial"; anything else must match exactly.
pub fn matches_filter(vid: u16, pid: u16, serial: Option<&str>, filter: Option<&str>) -> bool {
    if vid != SDREWIRE_VID || pid != SDREWIRE_PID {
        return false;
    }
    match filter.filter(|f| !f.is_empty()) {
        None => true,
        Some(wanted) => serial == Some(wanted),
    }
}

/// Enumerate all connected SDReWire devices matching `serial`.
///
/// Results are sorted by device address. Enumeration errors are logged and
/// produce an empty list.
pub fn enumerate_devices(serial: Option<&str>) -> Vec<DiscoveredDevice> {
    let devices = match nusb::list_devices() {
        Ok(devices) => devices,
        Err(e) => {
            log::warn!("USB enumeration failed: {e}");
            return Vec::new();
        }
    };

    let mut found: Vec<DiscoveredDevice> = devices
        .filter(|dev| matches_filter(dev.vendor_id(), dev.product_id(), dev.serial_number(), serial))
        .map(|dev| {
            let port_chain = dev.port_chain().to_vec();
            let tty = tty::resolve_tty(dev.bus_number(), &port_chain)
                .map(|p| p.display().to_string());
            DiscoveredDevice {
                bus: dev.bus_number(),
                address: dev.device_address(),
                port_chain,
                manufacturer: dev.manufacturer_string().map(str::to_string),
                product: dev.product_string().map(str::to_string),
                serial: dev.serial_number().map(str::to_string),
                tty,
            }
        })
        .collect();
    found.sort_by_key(|d| d.address);
    log::debug!("found {} matching device(s)", found.len());
    found
}

/// Outcome of narrowing the match set down to one device.
#[derive(Debug, PartialEq)]
pub enum Selection {
    None,
    One(DiscoveredDevice),
    Many(Vec<DiscoveredDevice>),
}

/// Pick the single device to act on.
pub fn select_device(mut devices: Vec<DiscoveredDevice>) -> Selection {
    match devices.len() {
        0 => Selection::None,
        1 => Selection::One(devices.remove(0)),
        _ => Selection::Many(devices),
    }
}

// ── Trait ──

pub trait MuxDevice {
    fn info(&self) -> &DiscoveredDevice;

    /// Put the chip into CBUS bit-bang mode with `bitmask`.
    fn set_bitmode(&self, bitmask: u8) -> Result<()>;

    /// Read the current pin levels.
    ///
    /// `bitmask` is not part of the request; it has no effect on the result.
    /// Returns `None` when the device answered with zero bytes.
    fn read_pins(&self, bitmask: u8) -> Result<Option<u8>>;

    /// Switch the mux.
    fn set_mode(&self, mode: MuxMode) -> Result<()> {
        self.set_bitmode(mode.bitmask())
    }

    /// Query where the SD card is currently connected.
    fn mode(&self) -> Result<MuxMode> {
        self.read_pins(MASK_READ)?
            .map(MuxMode::from_pins)
            .ok_or(DeviceError::NoPinData)
    }
}

impl<T: MuxDevice + ?Sized> MuxDevice for &T {
    fn info(&self) -> &DiscoveredDevice {
        (**self).info()
    }

    fn set_bitmode(&self, bitmask: u8) -> Result<()> {
        (**self).set_bitmode(bitmask)
    }

    fn read_pins(&self, bitmask: u8) -> Result<Option<u8>> {
        (**self).read_pins(bitmask)
    }
}

// ── nusb implementation ──

mod usb_impl {
    use super::*;

    use nusb::transfer::{Control, ControlType, Recipient};

    /// An opened mux. The USB handle is released when this is dropped.
    pub struct UsbMuxDevice {
        // Windows has no device-level control endpoint access; go through
        // the claimed UART interface instead.
        #[cfg(windows)]
        handle: nusb::Interface,
        #[cfg(not(windows))]
        handle: nusb::Device,
        info: DiscoveredDevice,
        timeout: Duration,
    }

    fn vendor_control(request: u8, value: u16) -> Control {
        Control {
            control_type: ControlType::Vendor,
            recipient: Recipient::Device,
            request,
            value,
            index: 0,
        }
    }

    impl UsbMuxDevice {
        /// Re-locate `dev` by bus and address and open it.
        pub fn open(dev: &DiscoveredDevice, timeout: Duration) -> Result<Self> {
            let device_info = nusb::list_devices()
                .map_err(|e| DeviceError::OpenFailed(format!("USB enumeration: {e}")))?
                .find(|d| {
                    d.bus_number() == dev.bus
                        && d.device_address() == dev.address
                        && d.vendor_id() == SDREWIRE_VID
                        && d.product_id() == SDREWIRE_PID
                })
                .ok_or(DeviceError::NotFound)?;

            let device = device_info
                .open()
                .map_err(|e| DeviceError::OpenFailed(format!("USB open: {e}")))?;

            #[cfg(windows)]
            let handle = device
                .claim_interface(SYSFS_INTERFACE)
                .map_err(|e| {
                    DeviceError::OpenFailed(format!("claim interface {SYSFS_INTERFACE}: {e}"))
                })?;
            #[cfg(not(windows))]
            let handle = device;

            log::debug!("opened {}", dev.label());
            Ok(UsbMuxDevice {
                handle,
                info: dev.clone(),
                timeout,
            })
        }
    }

    impl MuxDevice for UsbMuxDevice {
        fn info(&self) -> &DiscoveredDevice {
            &self.info
        }

        fn set_bitmode(&self, bitmask: u8) -> Result<()> {
            let value = bitmode_value(bitmask);
            log::debug!("SET_BITMODE value=0x{value:04X}");
            self.handle
                .control_out_blocking(
                    vendor_control(SIO_SET_BITMODE_REQUEST, value),
                    &[],
                    self.timeout,
                )
                .map_err(|e| DeviceError::TransferFailed(format!("SET_BITMODE: {e}")))?;
            Ok(())
        }

        fn read_pins(&self, _bitmask: u8) -> Result<Option<u8>> {
            let mut buf = [0u8; 1];
            let n = self
                .handle
                .control_in_blocking(
                    vendor_control(SIO_READ_PINS_REQUEST, 0),
                    &mut buf,
                    self.timeout,
                )
                .map_err(|e| DeviceError::TransferFailed(format!("READ_PINS: {e}")))?;
            log::debug!("READ_PINS returned {n} byte(s): {:02X?}", &buf[..n]);
            Ok((n >= 1).then_some(buf[0]))
        }
    }

    impl Drop for UsbMuxDevice {
        fn drop(&mut self) {
            log::debug!("closing {}", self.info.label());
        }
    }
}

pub use usb_impl::UsbMuxDevice;

/// Open a discovered device with the given control-transfer timeout.
pub fn open_device(dev: &DiscoveredDevice, timeout: Duration) -> Result<UsbMuxDevice> {
    UsbMuxDevice::open(dev, timeout)
}

// ── Mock device for testing ──

/// In-memory mock device for unit and integration tests.
///
/// Always compiled (zero runtime cost), hidden from public docs.
#[doc(hidden)]
pub mod mock {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    /// One recorded control transfer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ControlRecord {
        pub request: u8,
        pub value: u16,
        pub index: u16,
    }

    /// Records control transfers and replays queued pin bytes.
    ///
    /// `read_pins` pops from `pin_responses`; an empty queue yields `None`
    /// (a zero-length answer).
    pub struct MockDevice {
        info: DiscoveredDevice,
        pub transfers: RefCell<Vec<ControlRecord>>,
        pub pin_responses: RefCell<VecDeque<u8>>,
        /// If true, every transfer returns an error.
        pub fail_transfers: Cell<bool>,
    }

    impl Default for MockDevice {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockDevice {
        pub fn new() -> Self {
            Self::with_info(sample_device(7, Some("MOCK123")))
        }

        pub fn with_info(info: DiscoveredDevice) -> Self {
            MockDevice {
                info,
                transfers: RefCell::new(Vec::new()),
                pin_responses: RefCell::new(VecDeque::new()),
                fail_transfers: Cell::new(false),
            }
        }

        /// Queue a byte for the next `read_pins` call.
        pub fn push_pins(&self, pins: u8) {
            self.pin_responses.borrow_mut().push_back(pins);
        }

        fn record(&self, request: u8, value: u16) -> Result<()> {
            self.transfers.borrow_mut().push(ControlRecord {
                request,
                value,
                index: 0,
            });
            if self.fail_transfers.get() {
                return Err(DeviceError::TransferFailed(
                    "mock: transfer failure injected".into(),
                ));
            }
            Ok(())
        }
    }

    impl MuxDevice for MockDevice {
        fn info(&self) -> &DiscoveredDevice {
            &self.info
        }

        fn set_bitmode(&self, bitmask: u8) -> Result<()> {
            self.record(SIO_SET_BITMODE_REQUEST, bitmode_value(bitmask))
        }

        fn read_pins(&self, _bitmask: u8) -> Result<Option<u8>> {
            self.record(SIO_READ_PINS_REQUEST, 0)?;
            Ok(self.pin_responses.borrow_mut().pop_front())
        }
    }

    /// A plausible discovered device for tests.
    pub fn sample_device(address: u8, serial: Option<&str>) -> DiscoveredDevice {
        DiscoveredDevice {
            bus: 1,
            address,
            port_chain: vec![2, address],
            manufacturer: Some("FTDI".into()),
            product: Some("SDReWire".into()),
            serial: serial.map(str::to_string),
            tty: Some(format!("/dev/ttyUSB{address}")),
        }
    }
}

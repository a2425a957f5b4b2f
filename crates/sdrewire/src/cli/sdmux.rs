//! `sdmux` subcommand — switch the mux and/or report its position.

use std::process::ExitCode;

use super::{
    DiscoveredDevice, ListOutput, MuxDevice, MuxMode, MuxRequest, Result, Selection, SdmuxOutput,
    Settings, device, list, mux,
};

pub(super) fn status_line(mode: MuxMode) -> String {
    format!("SD mux connected to: {mode}")
}

pub(super) fn cmd_sdmux(settings: &Settings, request: MuxRequest, json: bool) -> Result<ExitCode> {
    let devices = device::enumerate_devices(settings.serial.as_deref());
    select_and_control(
        devices,
        |dev| device::open_device(dev, settings.timeout),
        request,
        json,
    )
}

/// Narrow `devices` to exactly one, then open it with `open` and apply `request`.
///
/// Zero or several matches print a diagnostic and return failure without
/// calling `open`. An empty request succeeds without opening the device.
pub(super) fn select_and_control<D: MuxDevice>(
    devices: Vec<DiscoveredDevice>,
    open: impl FnOnce(&DiscoveredDevice) -> device::Result<D>,
    request: MuxRequest,
    json: bool,
) -> Result<ExitCode> {
    let dev = match device::select_device(devices) {
        Selection::None => {
            eprintln!("No device found.");
            return Ok(ExitCode::FAILURE);
        }
        Selection::Many(candidates) => {
            eprintln!("Found {} devices:", candidates.len());
            if json {
                let output = ListOutput {
                    count: candidates.len(),
                    devices: candidates,
                };
                let rendered =
                    serde_json::to_string_pretty(&output).map_err(std::io::Error::other)?;
                println!("{rendered}");
            } else {
                list::print_table(&candidates);
            }
            eprintln!("Use --serial to select which device to control.");
            return Ok(ExitCode::FAILURE);
        }
        Selection::One(dev) => dev,
    };

    if request.is_empty() {
        log::warn!("nothing to do: pass --ts, --dut or --status");
        return Ok(ExitCode::SUCCESS);
    }

    let usb = open(&dev)?;
    control(&usb, request, json)?;
    Ok(ExitCode::SUCCESS)
}

/// Apply `request` to an opened device and print the result.
pub(super) fn control(dev: &impl MuxDevice, request: MuxRequest, json: bool) -> Result<()> {
    let mode = mux::apply(dev, request)?;

    if json {
        let output = SdmuxOutput {
            device: dev.info().clone(),
            switched_to: request.switch,
            mode,
        };
        let rendered = serde_json::to_string_pretty(&output).map_err(std::io::Error::other)?;
        println!("{rendered}");
        return Ok(());
    }

    if let Some(mode) = mode {
        println!("{}", status_line(mode));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdrewire_lib::device::DeviceError;
    use sdrewire_lib::device::mock::{MockDevice, sample_device};
    use std::cell::Cell;

    fn dut() -> MuxRequest {
        MuxRequest::from_flags(false, true, false)
    }

    #[test]
    fn status_line_ts() {
        assert_eq!(status_line(MuxMode::Ts), "SD mux connected to: TS");
    }

    #[test]
    fn status_line_dut() {
        assert_eq!(status_line(MuxMode::Dut), "SD mux connected to: DUT");
    }

    // ── Selection ──

    #[test]
    fn no_device_fails_without_opening() {
        let opened = Cell::new(false);
        let code = select_and_control(
            vec![],
            |_| {
                opened.set(true);
                Ok(MockDevice::new())
            },
            dut(),
            false,
        )
        .unwrap();
        assert_eq!(code, ExitCode::FAILURE);
        assert!(!opened.get());
    }

    #[test]
    fn two_devices_fail_without_opening() {
        let opened = Cell::new(false);
        let devices = vec![sample_device(3, Some("AAA")), sample_device(4, Some("BBB"))];
        let code = select_and_control(
            devices,
            |_| {
                opened.set(true);
                Ok(MockDevice::new())
            },
            MuxRequest::from_flags(true, false, false),
            false,
        )
        .unwrap();
        assert_eq!(code, ExitCode::FAILURE);
        assert!(!opened.get());
    }

    #[test]
    fn two_devices_json_fail_without_opening() {
        let opened = Cell::new(false);
        let devices = vec![sample_device(3, Some("AAA")), sample_device(4, Some("BBB"))];
        let code = select_and_control(
            devices,
            |_| {
                opened.set(true);
                Ok(MockDevice::new())
            },
            dut(),
            true,
        )
        .unwrap();
        assert_eq!(code, ExitCode::FAILURE);
        assert!(!opened.get());
    }

    #[test]
    fn single_device_dut_sends_one_transfer() {
        let mock = MockDevice::with_info(sample_device(5, Some("ABC123")));
        let code = select_and_control(
            vec![sample_device(5, Some("ABC123"))],
            |dev| {
                assert_eq!(dev.serial.as_deref(), Some("ABC123"));
                Ok(&mock)
            },
            dut(),
            false,
        )
        .unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
        let t = mock.transfers.borrow();
        assert_eq!(t.len(), 1);
        assert_eq!(t[0].request, 0x0b);
        assert_eq!(t[0].value, 0x2080);
    }

    #[test]
    fn single_device_status_reads_pins() {
        let mock = MockDevice::new();
        mock.push_pins(0x08);
        let code = select_and_control(
            vec![sample_device(7, Some("MOCK123"))],
            |_| Ok(&mock),
            MuxRequest::from_flags(false, false, true),
            false,
        )
        .unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
        assert_eq!(mock.transfers.borrow()[0].request, 0x0c);
    }

    #[test]
    fn empty_request_succeeds_without_opening() {
        let code = select_and_control(
            vec![sample_device(5, None)],
            |_| -> device::Result<MockDevice> {
                Err(DeviceError::OpenFailed("USB open: permission denied".into()))
            },
            MuxRequest::default(),
            false,
        )
        .unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[test]
    fn open_failure_is_an_error() {
        let err = select_and_control(
            vec![sample_device(5, None)],
            |_| -> device::Result<MockDevice> {
                Err(DeviceError::OpenFailed("USB open: permission denied".into()))
            },
            dut(),
            false,
        )
        .unwrap_err();
        assert!(err.to_string().contains("permission denied"));
    }

    // ── Control ──

    #[test]
    fn control_status_json_succeeds() {
        let dev = MockDevice::new();
        dev.push_pins(0x08);
        assert!(control(&dev, MuxRequest::from_flags(false, false, true), true).is_ok());
    }

    #[test]
    fn control_surfaces_transfer_errors() {
        let dev = MockDevice::new();
        dev.fail_transfers.set(true);
        let err = control(&dev, MuxRequest::from_flags(true, false, false), false).unwrap_err();
        assert!(err.to_string().contains("Control transfer failed"));
    }

    #[test]
    fn control_empty_request_is_noop() {
        let dev = MockDevice::new();
        control(&dev, MuxRequest::default(), false).unwrap();
        assert!(dev.transfers.borrow().is_empty());
    }
}

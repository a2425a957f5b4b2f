//! `sdmux` action — switch the mux and/or query its position on one device.

use crate::device::{MuxDevice, Result};
use crate::protocol::MuxMode;

/// What to do with the selected device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MuxRequest {
    /// Position to switch to, if any.
    pub switch: Option<MuxMode>,
    /// Read back and decode the pin state afterwards.
    pub status: bool,
}

impl MuxRequest {
    /// Build a request from the `--ts` / `--dut` / `--status` flags.
    ///
    /// Callers guarantee `ts` and `dut` are not both set; `ts` wins if they are.
    pub fn from_flags(ts: bool, dut: bool, status: bool) -> Self {
        let switch = if ts {
            Some(MuxMode::Ts)
        } else if dut {
            Some(MuxMode::Dut)
        } else {
            None
        };
        MuxRequest { switch, status }
    }

    pub fn is_empty(&self) -> bool {
        self.switch.is_none() && !self.status
    }
}

/// Apply `request` to `device`.
///
/// Returns the decoded mode when a status read was requested.
pub fn apply(device: &impl MuxDevice, request: MuxRequest) -> Result<Option<MuxMode>> {
    if let Some(mode) = request.switch {
        log::info!("switching {} to {mode}", device.info().label());
        device.set_mode(mode)?;
    }
    if request.status {
        let mode = device.mode()?;
        log::debug!("pin state decodes to {mode}");
        return Ok(Some(mode));
    }
    Ok(None)
}

//! HID++ change-host reports.
//!
//! Both receiver generations use the same layout, differing only in report
//! id, report length, and the feature-call byte:
//!
//! ```text
//!   [report id][receiver slot][device id][feature call][channel - 1][padding...]
//!   Bolt:     0x11 ...          0x1E                       15 zero bytes (20 total)
//!   Unifying: 0x10 ...          0x1C                        2 zero bytes  (7 total)
//! ```

use logiflow_types::{Channel, DeviceKind, Protocol, ReceiverProfile};

/// Vendor-defined usage page both protocols are exposed on.
pub const USAGE_PAGE: u16 = 0xFF00;

const BOLT_REPORT_ID: u8 = 0x11;
const BOLT_CHANGE_HOST: u8 = 0x1E;
const BOLT_REPORT_LEN: usize = 20;

const UNIFYING_REPORT_ID: u8 = 0x10;
const UNIFYING_CHANGE_HOST: u8 = 0x1C;
const UNIFYING_REPORT_LEN: usize = 7;

/// An encoded channel-switch report for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchCommand {
    pub device: DeviceKind,
    pub bytes: Vec<u8>,
}

impl SwitchCommand {
    /// Report length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Comma-separated `0xNN` list, as the transport expects.
    #[must_use]
    pub fn hex_list(&self) -> String {
        self.bytes
            .iter()
            .map(|b| format!("0x{b:02X}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Top-level HID usage the receiver exposes for `protocol`.
#[must_use]
pub fn usage(protocol: Protocol) -> u16 {
    match protocol {
        Protocol::Bolt => 2,
        Protocol::Unifying => 1,
    }
}

/// Build the report that moves `device` to `channel`.
#[must_use]
pub fn encode_switch(profile: &ReceiverProfile, device: DeviceKind, channel: Channel) -> SwitchCommand {
    let (report_id, feature, len) = match profile.protocol {
        Protocol::Bolt => (BOLT_REPORT_ID, BOLT_CHANGE_HOST, BOLT_REPORT_LEN),
        Protocol::Unifying => (UNIFYING_REPORT_ID, UNIFYING_CHANGE_HOST, UNIFYING_REPORT_LEN),
    };

    let mut bytes = Vec::with_capacity(len);
    bytes.extend_from_slice(&[
        report_id,
        profile.slot(device),
        profile.device_id(device),
        feature,
        channel.wire_index(),
    ]);
    bytes.resize(len, 0x00);

    SwitchCommand { device, bytes }
}

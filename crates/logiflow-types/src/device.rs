//! Receiver profile and device identity types.

use serde::{Deserialize, Serialize};

/// Which half of a keyboard/mouse pair a command is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Keyboard,
    Mouse,
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Keyboard => write!(f, "keyboard"),
            Self::Mouse => write!(f, "mouse"),
        }
    }
}

/// Receiver wire protocol generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Long (20 byte) HID++ reports.
    #[default]
    Bolt,
    /// Short (7 byte) HID++ reports.
    Unifying,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bolt => write!(f, "bolt"),
            Self::Unifying => write!(f, "unifying"),
        }
    }
}

/// How logical devices map onto wire addresses for one receiver.
///
/// Identifiers serialise as upper-case hex strings (`"046D"`, `"0A"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverProfile {
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(with = "hex")]
    pub vendor_id: u16,
    #[serde(with = "hex")]
    pub product_id: u16,
    #[serde(with = "hex")]
    pub kb_slot: u8,
    #[serde(with = "hex")]
    pub ms_slot: u8,
    #[serde(with = "hex")]
    pub keyboard_id: u8,
    #[serde(with = "hex")]
    pub mouse_id: u8,
}

impl Default for ReceiverProfile {
    fn default() -> Self {
        Self {
            protocol: Protocol::Bolt,
            vendor_id: 0x046D,
            product_id: 0xC548,
            kb_slot: 0x01,
            ms_slot: 0x02,
            keyboard_id: 0x09,
            mouse_id: 0x0A,
        }
    }
}

impl ReceiverProfile {
    /// Receiver slot addressed for `device`.
    #[must_use]
    pub fn slot(&self, device: DeviceKind) -> u8 {
        match device {
            DeviceKind::Keyboard => self.kb_slot,
            DeviceKind::Mouse => self.ms_slot,
        }
    }

    /// Device id addressed for `device`.
    #[must_use]
    pub fn device_id(&self, device: DeviceKind) -> u8 {
        match device {
            DeviceKind::Keyboard => self.keyboard_id,
            DeviceKind::Mouse => self.mouse_id,
        }
    }

    /// `VVVV:PPPP` selector understood by the HID transport.
    #[must_use]
    pub fn vidpid(&self) -> String {
        format!("{:04X}:{:04X}", self.vendor_id, self.product_id)
    }
}

/// Parse a hex number with an optional `0x` prefix.
pub fn parse_hex(text: &str) -> Result<u64, String> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    u64::from_str_radix(digits, 16).map_err(|e| format!("invalid hex value {text:?}: {e}"))
}

mod hex {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(u64),
        Text(String),
    }

    pub(super) fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Copy + Into<u64>,
        S: Serializer,
    {
        let width = std::mem::size_of::<T>() * 2;
        let n: u64 = (*value).into();
        serializer.serialize_str(&format!("{n:0width$X}"))
    }

    pub(super) fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: TryFrom<u64>,
        D: Deserializer<'de>,
    {
        let raw = match Raw::deserialize(deserializer)? {
            Raw::Int(n) => n,
            Raw::Text(s) => super::parse_hex(&s).map_err(D::Error::custom)?,
        };
        T::try_from(raw).map_err(|_| D::Error::custom(format!("value 0x{raw:X} out of range")))
    }
}

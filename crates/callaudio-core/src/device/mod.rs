//! Audio output device descriptors
//!
//! Local devices are identified by type alone (plus an optional transport
//! address for Bluetooth); distributed devices carry a typed
//! `{devName, devId}` payload identifying the remote endpoint.

pub mod manager;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use manager::{AudioDeviceManager, DeviceEvent};

/// Kind of audio output an in-progress call can be routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioDeviceType {
    Earpiece,
    Speaker,
    WiredHeadset,
    BluetoothSco,
    /// Routing disabled while no call audio is active
    Disabled,
    DistributedPhone,
    DistributedPad,
    DistributedAutomotive,
    Unknown,
}

impl AudioDeviceType {
    /// True for devices living on another node of the distributed network
    pub fn is_distributed(&self) -> bool {
        matches!(
            self,
            Self::DistributedPhone | Self::DistributedPad | Self::DistributedAutomotive
        )
    }
}

impl fmt::Display for AudioDeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Earpiece => "earpiece",
            Self::Speaker => "speaker",
            Self::WiredHeadset => "wired-headset",
            Self::BluetoothSco => "bluetooth-sco",
            Self::Disabled => "disabled",
            Self::DistributedPhone => "distributed-phone",
            Self::DistributedPad => "distributed-pad",
            Self::DistributedAutomotive => "distributed-automotive",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Identity of a distributed audio endpoint
///
/// The field names are fixed by the companion service's wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributedDeviceId {
    #[serde(rename = "devName", default)]
    pub dev_name: String,
    #[serde(rename = "devId", default)]
    pub dev_id: String,
}

impl DistributedDeviceId {
    /// Parse the address payload, tolerating malformed input
    pub fn from_json(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }

    /// Serialize to the companion service's wire format
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Address of an audio device
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DeviceAddress {
    /// Local devices routed by type only
    #[default]
    None,
    /// Bluetooth transport address
    Mac(String),
    /// Distributed endpoint identity
    Distributed(DistributedDeviceId),
}

impl DeviceAddress {
    /// Remote device id for distributed addresses, empty otherwise
    pub fn distributed_dev_id(&self) -> &str {
        match self {
            Self::Distributed(id) => &id.dev_id,
            _ => "",
        }
    }
}

/// An audio output device a call can be routed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    pub device_type: AudioDeviceType,
    pub address: DeviceAddress,
}

impl AudioDevice {
    pub fn new(device_type: AudioDeviceType) -> Self {
        Self {
            device_type,
            address: DeviceAddress::None,
        }
    }

    pub fn earpiece() -> Self {
        Self::new(AudioDeviceType::Earpiece)
    }

    pub fn speaker() -> Self {
        Self::new(AudioDeviceType::Speaker)
    }

    pub fn wired_headset() -> Self {
        Self::new(AudioDeviceType::WiredHeadset)
    }

    pub fn bluetooth_sco(mac: impl Into<String>) -> Self {
        Self {
            device_type: AudioDeviceType::BluetoothSco,
            address: DeviceAddress::Mac(mac.into()),
        }
    }

    pub fn distributed(
        device_type: AudioDeviceType,
        dev_name: impl Into<String>,
        dev_id: impl Into<String>,
    ) -> Self {
        Self {
            device_type,
            address: DeviceAddress::Distributed(DistributedDeviceId {
                dev_name: dev_name.into(),
                dev_id: dev_id.into(),
            }),
        }
    }
}

impl fmt::Display for AudioDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.address {
            DeviceAddress::None => write!(f, "{}", self.device_type),
            DeviceAddress::Mac(mac) => write!(f, "{} ({mac})", self.device_type),
            DeviceAddress::Distributed(id) => {
                write!(f, "{} ({})", self.device_type, id.dev_name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distributed_address_parses_wire_names() {
        let id = DistributedDeviceId::from_json(r#"{"devName":"pad","devId":"abc123"}"#)
            .unwrap();
        assert_eq!(id.dev_name, "pad");
        assert_eq!(id.dev_id, "abc123");
    }

    #[test]
    fn malformed_address_yields_none() {
        assert!(DistributedDeviceId::from_json("not json").is_none());
        assert!(DistributedDeviceId::from_json("").is_none());
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let id = DistributedDeviceId::from_json(r#"{"devName":"car"}"#).unwrap();
        assert_eq!(id.dev_name, "car");
        assert_eq!(id.dev_id, "");
    }

    #[test]
    fn local_addresses_have_no_dev_id() {
        assert_eq!(AudioDevice::speaker().address.distributed_dev_id(), "");
        assert_eq!(
            AudioDevice::bluetooth_sco("00:11:22:33:44:55")
                .address
                .distributed_dev_id(),
            ""
        );
    }
}

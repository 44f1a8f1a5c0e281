// Device Domain Model

use serde::{Deserialize, Serialize};

/// Bridge-assigned device identifier (e.g. `emulator-5554`, `R58M12ABCDE`)
pub type Serial = String;

/// Reachability of a device as seen through its property dump
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceState {
    /// No usable properties (unreachable or still booting)
    #[default]
    Offline,
    /// At least one property was read back
    Online,
}

impl std::fmt::Display for DeviceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceState::Offline => write!(f, "OFFLINE"),
            DeviceState::Online => write!(f, "ONLINE"),
        }
    }
}

/// One discovered device
///
/// Built fresh on every query. Two records from different polls are distinct
/// values; use [`DeviceRecord::same_device`] to compare them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    serial: Serial,
    pub state: DeviceState,
    pub model: String,
    pub name: String,
}

impl DeviceRecord {
    /// Create an `Offline` record with empty display attributes
    pub fn new(serial: impl Into<Serial>) -> Self {
        Self {
            serial: serial.into(),
            state: DeviceState::Offline,
            model: String::new(),
            name: String::new(),
        }
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn is_online(&self) -> bool {
        self.state == DeviceState::Online
    }

    /// True if both records describe the same physical connection
    pub fn same_device(&self, other: &DeviceRecord) -> bool {
        self.serial == other.serial
    }

    /// Label for menus and tables: model, then product name, then serial
    pub fn display_name(&self) -> &str {
        if !self.model.is_empty() {
            &self.model
        } else if !self.name.is_empty() {
            &self.name
        } else {
            &self.serial
        }
    }
}

/// State word reported by the bridge in its `devices` listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeState {
    Device,
    Offline,
    Unauthorized,
    NoPermissions,
    Recovery,
    Sideload,
    Bootloader,
    Host,
    Other(String),
}

impl BridgeState {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw {
            "device" => BridgeState::Device,
            "offline" => BridgeState::Offline,
            "unauthorized" => BridgeState::Unauthorized,
            "recovery" => BridgeState::Recovery,
            "sideload" => BridgeState::Sideload,
            "bootloader" => BridgeState::Bootloader,
            "host" => BridgeState::Host,
            _ if raw.starts_with("no permissions") => BridgeState::NoPermissions,
            other => BridgeState::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for BridgeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BridgeState::Device => write!(f, "device"),
            BridgeState::Offline => write!(f, "offline"),
            BridgeState::Unauthorized => write!(f, "unauthorized"),
            BridgeState::NoPermissions => write!(f, "no permissions"),
            BridgeState::Recovery => write!(f, "recovery"),
            BridgeState::Sideload => write!(f, "sideload"),
            BridgeState::Bootloader => write!(f, "bootloader"),
            BridgeState::Host => write!(f, "host"),
            BridgeState::Other(raw) => write!(f, "{}", raw),
        }
    }
}

/// One entry of the bridge's `devices` listing, before any property query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachedDevice {
    pub serial: Serial,
    pub bridge_state: BridgeState,
}

impl AttachedDevice {
    pub fn new(serial: impl Into<Serial>, bridge_state: BridgeState) -> Self {
        Self {
            serial: serial.into(),
            bridge_state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_offline_and_empty() {
        let record = DeviceRecord::new("emulator-5554");

        assert_eq!(record.serial(), "emulator-5554");
        assert_eq!(record.state, DeviceState::Offline);
        assert!(record.model.is_empty());
        assert!(record.name.is_empty());
        assert!(!record.is_online());
    }

    #[test]
    fn test_same_device_compares_serial_only() {
        let mut a = DeviceRecord::new("abc");
        let b = DeviceRecord::new("abc");
        a.state = DeviceState::Online;
        a.model = "Pixel 4".to_string();

        assert!(a.same_device(&b));
        assert_ne!(a, b);
        assert!(!a.same_device(&DeviceRecord::new("xyz")));
    }

    #[test]
    fn test_display_name_fallbacks() {
        let mut record = DeviceRecord::new("abc");
        assert_eq!(record.display_name(), "abc");

        record.name = "flame".to_string();
        assert_eq!(record.display_name(), "flame");

        record.model = "Pixel 4".to_string();
        assert_eq!(record.display_name(), "Pixel 4");
    }

    #[test]
    fn test_bridge_state_vocabulary() {
        assert_eq!(BridgeState::parse("device"), BridgeState::Device);
        assert_eq!(BridgeState::parse("offline"), BridgeState::Offline);
        assert_eq!(BridgeState::parse("unauthorized"), BridgeState::Unauthorized);
        assert_eq!(
            BridgeState::parse("no permissions (user in plugdev group)"),
            BridgeState::NoPermissions
        );
        assert_eq!(
            BridgeState::parse("rescue"),
            BridgeState::Other("rescue".to_string())
        );
    }

    #[test]
    fn test_state_serializes_screaming_case() {
        let json = serde_json::to_string(&DeviceState::Online).unwrap();
        assert_eq!(json, "\"ONLINE\"");
    }
}

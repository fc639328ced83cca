use std::fmt;

use serde::Serialize;

/// Name used for devices the user addressed directly instead of picking
/// from discovery.
pub const UNKNOWN_DEVICE_NAME: &str = "unknown";

/// An appliance that can be connected to.
///
/// Identity is the `(name, address)` pair: one appliance reachable on two
/// addresses is two devices.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Device {
    pub name: String,
    pub address: String,
}

impl Device {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }

    /// A device for a user-entered address.
    pub fn manual(address: impl Into<String>) -> Self {
        Self::new(UNKNOWN_DEVICE_NAME, address)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.address)
    }
}

//! Defines shared data structures for the Bluetooth module.

use bluest::{Characteristic, Device};
use serde::Serialize;

use crate::core::frame::FrameChannel;

/// Represents a discovered Bluetooth peripheral as surfaced during scanning.
/// Replaced wholesale on each new scan, never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BluetoothDevice {
    /// Platform-specific unique identifier for the device (especially important on macOS)
    pub id: String,
    /// The advertised name of the device, if available
    pub name: Option<String>,
    /// The address of the device (MAC address on most platforms, may be 00:00:00:00:00:00 on macOS)
    pub address: String,
    /// The signal strength (RSSI) of the device
    pub rssi: Option<i16>,
}

impl BluetoothDevice {
    pub fn new(id: String, name: Option<String>, address: String, rssi: Option<i16>) -> Self {
        Self {
            id,
            name,
            address,
            rssi,
        }
    }

    /// Returns true if the advertised name contains the target fragment,
    /// case-insensitively.
    pub fn matches_name(&self, fragment: &str) -> bool {
        self.name
            .as_ref()
            .map(|name| name.to_lowercase().contains(&fragment.to_lowercase()))
            .unwrap_or(false)
    }
}

/// Connection state of the single logical sensor link. Exactly one
/// connection is active at a time; entering `Disconnected` resets all
/// sensor readings to their zero baseline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected(BluetoothDevice),
}

/// Represents the state of a successfully connected device.
/// This struct holds the active handles needed for interaction.
#[derive(Clone)]
pub struct ConnectedDeviceState {
    /// The device handle, used for things like checking connection status or disconnecting.
    pub device: Device,
    /// The notification characteristics subscribed for this connection,
    /// tagged with the frame channel each one feeds.
    pub notify_characteristics: Vec<(FrameChannel, Characteristic)>,
}

//! Bluetooth functionality for the soil-sensor bridge
//! This module handles all bluetooth operations including scanning,
//! connecting, and receiving data from the soil sensor.

mod connection;
pub mod constants;
mod manager;
mod notification;
mod scanner;
pub mod types;

// Re-export types that should be publicly accessible
pub use connection::ConnectionManager;
pub use constants::*;
pub use manager::BluetoothManager;
pub use notification::NotificationHandler;
pub use scanner::BluetoothScanner;
pub use types::{BluetoothDevice, ConnectedDeviceState, ConnectionState};

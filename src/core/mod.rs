//! Core functionality for the soil-sensor bridge
//! This module contains the device-data acquisition and decoding layer:
//! transport, frame decoding, the sensor state store and the device
//! selection policy.

pub mod bluetooth;
pub mod frame;
pub mod selection;
pub mod store;

// Re-export commonly used types
pub use bluetooth::BluetoothManager;
pub use frame::{FrameChannel, FrameDecoder, FramingStrategy, SensorReading};
pub use selection::rank_devices;
pub use store::{ReadingSink, SensorStore};

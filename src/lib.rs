//! Soil-sensor bridge library
//! Reads soil telemetry over Bluetooth Low Energy, decodes notification
//! frames into seven-field readings and exposes them through an observable
//! state store, with local persistence of named reading packages.

// Module declarations
pub mod config;
pub mod core;
pub mod error;
pub mod events;
pub mod state;
pub mod storage;

pub use crate::config::AppConfig;
pub use crate::core::{
    rank_devices, BluetoothManager, FrameChannel, FrameDecoder, FramingStrategy, SensorReading,
    SensorStore,
};
pub use crate::error::BridgeError;
pub use crate::events::{AppEvent, EventBus};
pub use crate::state::AppState;
pub use crate::storage::{PackageStore, SavedPackage, SavedSensorRecord};

/// Initialize logging
pub fn setup_logging() {
    env_logger::init();
    log::info!("Logging initialized");
}

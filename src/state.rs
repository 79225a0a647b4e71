//! Application state management
//! This module defines and manages the global application state.

use std::sync::Arc;

use log::info;
use tokio::sync::Mutex;

use crate::config::AppConfig;
use crate::core::store::SensorStore;
use crate::core::BluetoothManager;
use crate::error::BridgeError;
use crate::events::EventBus;
use crate::storage::PackageStore;

/// Global application state
pub struct AppState {
    /// The Bluetooth manager instance
    pub bluetooth_manager: Arc<Mutex<BluetoothManager>>,
    /// Observable sensor state consumed by presentation
    pub store: Arc<SensorStore>,
    /// Event stream for presentation observers
    pub events: EventBus,
    /// Saved-package persistence
    pub packages: PackageStore,
}

impl AppState {
    /// Creates a new AppState instance
    pub async fn new(config: AppConfig) -> Result<Self, BridgeError> {
        let events = EventBus::default();
        let store = Arc::new(SensorStore::new(events.clone()));

        info!("Initializing BluetoothManager...");
        let manager =
            BluetoothManager::new(config.sensor.clone(), store.clone(), events.clone()).await?;

        Ok(Self {
            bluetooth_manager: Arc::new(Mutex::new(manager)),
            store,
            events,
            packages: PackageStore::new(config.packages_file),
        })
    }

    /// Gets a reference to the Bluetooth manager
    pub fn bluetooth_manager_arc(&self) -> Arc<Mutex<BluetoothManager>> {
        self.bluetooth_manager.clone()
    }
}

//! Sensor state store
//! Plain observable state container: holds the seven current readings, the
//! connection state and the discovered-peripheral set. Written only by the
//! bluetooth core (frame decoder and transport adapter), read by any number
//! of presentation observers. Mutations are published on the event bus.

use std::sync::RwLock;

use async_trait::async_trait;
use log::info;

use crate::core::bluetooth::types::{BluetoothDevice, ConnectionState};
use crate::core::frame::SensorReading;
use crate::events::{AppEvent, EventBus};

/// Sink for validated readings, injected into the notification pipeline so
/// the decoder never references the store as ambient global state.
#[async_trait]
pub trait ReadingSink: Send + Sync {
    async fn publish(&self, reading: SensorReading);
}

pub struct SensorStore {
    reading: RwLock<SensorReading>,
    connection: RwLock<ConnectionState>,
    discovered: RwLock<Vec<BluetoothDevice>>,
    events: EventBus,
}

impl SensorStore {
    pub fn new(events: EventBus) -> Self {
        Self {
            reading: RwLock::new(SensorReading::default()),
            connection: RwLock::new(ConnectionState::Disconnected),
            discovered: RwLock::new(Vec::new()),
            events,
        }
    }

    /// Returns a copy of the current reading. Readings are replaced as a
    /// unit, so a copy is always internally consistent.
    pub fn reading(&self) -> SensorReading {
        *self.reading.read().unwrap()
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection.read().unwrap().clone()
    }

    pub fn discovered(&self) -> Vec<BluetoothDevice> {
        self.discovered.read().unwrap().clone()
    }

    /// Transitions the connection state. Entering `Disconnected` resets all
    /// seven readings to the zero baseline.
    pub fn set_connection(&self, state: ConnectionState) {
        let reset = state == ConnectionState::Disconnected;
        {
            let mut guard = self.connection.write().unwrap();
            *guard = state.clone();
        }
        if reset {
            self.reset_reading();
        }
        self.events.emit(AppEvent::ConnectionChanged(state));
    }

    /// Adds a discovered peripheral, de-duplicated by identifier. Returns
    /// true when the device was new.
    pub fn add_discovered(&self, device: BluetoothDevice) -> bool {
        {
            let mut guard = self.discovered.write().unwrap();
            if guard.iter().any(|d| d.id == device.id) {
                return false;
            }
            guard.push(device.clone());
        }
        self.events.emit(AppEvent::DeviceDiscovered(device));
        true
    }

    /// Drops the discovered set; called at the start of every scan so the
    /// set is replaced wholesale rather than accumulated.
    pub fn clear_discovered(&self) {
        self.discovered.write().unwrap().clear();
    }

    fn reset_reading(&self) {
        let mut guard = self.reading.write().unwrap();
        if *guard != SensorReading::default() {
            info!("Resetting sensor readings to baseline");
        }
        *guard = SensorReading::default();
    }
}

#[async_trait]
impl ReadingSink for SensorStore {
    async fn publish(&self, reading: SensorReading) {
        {
            let mut guard = self.reading.write().unwrap();
            *guard = reading;
        }
        self.events.emit(AppEvent::ReadingUpdated(reading));
    }
}

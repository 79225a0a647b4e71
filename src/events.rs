//! Application event bus
//! Replaces the UI callback surface with an async broadcast stream: the
//! presentation layer subscribes, the bluetooth core publishes. Closing a
//! subscription never blocks the core.

use log::debug;
use tokio::sync::broadcast;

use crate::core::bluetooth::constants::EVENT_CHANNEL_CAPACITY;
use crate::core::bluetooth::types::{BluetoothDevice, ConnectionState};
use crate::core::frame::SensorReading;

/// Events published by the bluetooth core for presentation observers.
#[derive(Debug, Clone)]
pub enum AppEvent {
    ScanStarted,
    ScanStopped,
    ScanComplete,
    DeviceDiscovered(BluetoothDevice),
    ConnectionChanged(ConnectionState),
    ReadingUpdated(SensorReading),
}

/// Broadcast channel wrapper shared by everything that emits events.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AppEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publishes an event. Having no subscribers is not an error; the event
    /// is simply dropped.
    pub fn emit(&self, event: AppEvent) {
        if let Err(e) = self.tx.send(event) {
            debug!("No event subscribers, dropping event: {}", e);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EVENT_CHANNEL_CAPACITY)
    }
}

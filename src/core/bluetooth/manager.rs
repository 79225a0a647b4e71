//! Bluetooth manager for the soil-sensor bridge
//! This module provides the main interface for bluetooth operations: the
//! process-scoped adapter, the permission surface, discovery, and the
//! single-connection state machine
//! `Disconnected → Connecting → Connected → Disconnected`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use bluest::{Adapter, Device};
use log::{error, info, warn};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::sensor_config::SensorConfig;
use crate::core::bluetooth::connection::ConnectionManager;
use crate::core::bluetooth::notification::NotificationHandler;
use crate::core::bluetooth::scanner::BluetoothScanner;
use crate::core::bluetooth::types::{BluetoothDevice, ConnectedDeviceState, ConnectionState};
use crate::core::frame::{FrameChannel, FrameDecoder, FramingStrategy};
use crate::core::selection::rank_devices;
use crate::core::store::SensorStore;
use crate::error::BridgeError;
use crate::events::EventBus;

/// Manages Bluetooth operations
pub struct BluetoothManager {
    config: SensorConfig,
    adapter: Adapter,
    /// Map of device identifiers to platform device handles
    devices: Arc<StdMutex<HashMap<String, Device>>>,
    /// Currently connected device, if any. At most one.
    connected_state: Arc<Mutex<Option<ConnectedDeviceState>>>,
    /// Cancellation token for the active connection's notification tasks
    notify_cancel: Option<CancellationToken>,
    connection_manager: ConnectionManager,
    scanner: BluetoothScanner,
    notification_handler: NotificationHandler,
    store: Arc<SensorStore>,
}

impl BluetoothManager {
    /// Creates a new BluetoothManager. Fails with `TransportUnavailable`
    /// when the platform exposes no Bluetooth adapter at all.
    pub async fn new(
        config: SensorConfig,
        store: Arc<SensorStore>,
        events: EventBus,
    ) -> Result<Self, BridgeError> {
        let adapter = Adapter::default()
            .await
            .ok_or(BridgeError::TransportUnavailable)?;
        adapter.wait_available().await?;
        info!("Bluetooth adapter is available.");
        let devices = Arc::new(StdMutex::new(HashMap::new()));

        let decoder = Arc::new(StdMutex::new(FrameDecoder::new(
            config.framing,
            Duration::from_millis(config.debounce_ms),
            Duration::from_millis(config.min_update_interval_ms),
        )));
        let connection_manager = ConnectionManager::new(
            adapter.clone(),
            config.max_connect_retries,
            config.connect_retry_delay_ms,
        );
        let scanner = BluetoothScanner::new(
            adapter.clone(),
            devices.clone(),
            store.clone(),
            events.clone(),
            Duration::from_secs(config.scan_window_secs),
        );
        let notification_handler = NotificationHandler::new(decoder, store.clone());

        Ok(Self {
            config,
            adapter,
            devices,
            connected_state: Arc::new(Mutex::new(None)),
            notify_cancel: None,
            connection_manager,
            scanner,
            notification_handler,
            store,
        })
    }

    /// Requests the grants needed for scanning and connecting.
    ///
    /// On the desktop targets this crate builds for, Bluetooth access is
    /// granted at the operating-system level once an adapter is present, so
    /// there is no per-permission prompt to drive: the check degrades to
    /// adapter availability. Returns `Ok(false)` rather than an error when
    /// the radio is switched off or the platform refuses access, so the
    /// caller can surface actionable guidance.
    pub async fn request_permissions(&self) -> Result<bool, BridgeError> {
        match self.adapter.wait_available().await {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!("Bluetooth adapter not available: {}", e);
                Ok(false)
            }
        }
    }

    /// Scans for Bluetooth devices using the bluest library
    pub async fn start_scan(&mut self) -> Result<(), BridgeError> {
        self.scanner
            .start_scan()
            .await
            .map_err(|e| BridgeError::Scan(e.to_string()))
    }

    pub async fn stop_scan(&mut self) -> Result<(), BridgeError> {
        self.scanner
            .stop_scan()
            .await
            .map_err(|e| BridgeError::Scan(e.to_string()))
    }

    /// Returns the discovered set ranked by the device selection policy:
    /// target-name matches first, then named devices, then signal strength.
    pub fn ranked_devices(&self) -> Vec<BluetoothDevice> {
        rank_devices(&self.store.discovered(), &self.config.target_device_name)
    }

    /// Connects to a device with the given ID, discovers the sensor service
    /// and starts streaming subscriptions. Any active scan is stopped first.
    pub async fn connect_device(&mut self, device_id: &str) -> Result<(), BridgeError> {
        {
            let connected_state = self.connected_state.lock().await;
            if connected_state.is_some() {
                // Never hold two connections; the caller decides whether to
                // disconnect and retry.
                return Err(BridgeError::Connection(
                    "a device is already connected, disconnect first".into(),
                ));
            }
        }

        let device = {
            let devices = self.devices.lock().unwrap();
            devices.get(device_id).cloned().ok_or_else(|| {
                BridgeError::Connection(format!("device not found with ID: {}", device_id))
            })?
        };

        self.store.set_connection(ConnectionState::Connecting);
        self.scanner
            .stop_scan()
            .await
            .map_err(|e| BridgeError::Scan(e.to_string()))?;

        let wanted_chars = self.wanted_characteristics();
        let notify_chars = match self
            .connection_manager
            .connect_with_retry(&device, self.config.service_uuid, &wanted_chars)
            .await
        {
            Ok(chars) => chars,
            Err(e) => {
                self.store.set_connection(ConnectionState::Disconnected);
                return Err(e);
            }
        };

        let cancel_token = CancellationToken::new();
        self.notification_handler
            .setup_notifications(notify_chars.clone(), cancel_token.clone())
            .await?;
        self.notify_cancel = Some(cancel_token);

        let name = device.name().ok();
        let rssi = device.rssi().await.ok();
        let handle = BluetoothDevice::new(device_id.to_string(), name, "N/A".to_string(), rssi);

        let state = ConnectedDeviceState {
            device,
            notify_characteristics: notify_chars,
        };
        *self.connected_state.lock().await = Some(state);
        self.store.set_connection(ConnectionState::Connected(handle));

        info!("Device successfully connected and state stored in the main service.");
        Ok(())
    }

    /// Disconnects from the currently connected device, cancels the
    /// notification tasks and resets the sensor store to its defaults.
    /// Idempotent: calling with no active connection is a no-op.
    pub async fn disconnect(&mut self) -> Result<(), BridgeError> {
        let connected_state = {
            let mut guard = self.connected_state.lock().await;
            guard.take()
        };

        let Some(connected_state) = connected_state else {
            info!("No device connected, nothing to disconnect.");
            return Ok(());
        };

        // Cancel first so no stale notification can write into the store
        // after the reset below.
        if let Some(token) = self.notify_cancel.take() {
            token.cancel();
        }
        self.notification_handler.reset_decoder();

        if let Err(e) = self
            .connection_manager
            .disconnect(&connected_state.device)
            .await
        {
            error!("Error while disconnecting device: {}", e);
        }

        self.store.set_connection(ConnectionState::Disconnected);
        info!("Connected state cleared, releasing device and characteristic objects.");
        Ok(())
    }

    /// Checks if a device is currently connected.
    pub async fn is_connected(&self) -> bool {
        let guard = self.connected_state.lock().await;
        if let Some(state) = guard.as_ref() {
            state.device.is_connected().await
        } else {
            false
        }
    }

    /// Returns the ID of the currently connected device
    pub async fn connected_device_id(&self) -> Option<String> {
        let guard = self.connected_state.lock().await;
        guard.as_ref().map(|state| state.device.id().to_string())
    }

    /// Returns the name of the currently connected device.
    pub async fn connected_device_name(&self) -> Option<String> {
        let guard = self.connected_state.lock().await;
        if let Some(state) = guard.as_ref() {
            let device = state.device.clone();
            drop(guard);
            device.name().ok()
        } else {
            None
        }
    }

    /// The notification characteristics the configured framing strategy
    /// subscribes to.
    fn wanted_characteristics(&self) -> Vec<(FrameChannel, bluest::Uuid)> {
        match self.config.framing {
            FramingStrategy::Combined => {
                vec![(FrameChannel::Combined, self.config.combined_char_uuid)]
            }
            FramingStrategy::Split => vec![
                (FrameChannel::Front, self.config.front_packet_char_uuid),
                (FrameChannel::Back, self.config.back_packet_char_uuid),
            ],
        }
    }
}

//! Peripheral discovery for the soil-sensor bridge
//! Runs the scan as a background task so discovery callbacks never block
//! the caller. Discovered devices are de-duplicated by identifier into the
//! sensor store and announced on the event bus.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use bluest::{Adapter, Device};
use futures_util::StreamExt;
use log::{debug, error, info};
use regex::Regex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::bluetooth::types::BluetoothDevice;
use crate::core::store::SensorStore;
use crate::events::{AppEvent, EventBus};

pub struct BluetoothScanner {
    adapter: Adapter,
    devices: Arc<Mutex<HashMap<String, Device>>>,
    store: Arc<SensorStore>,
    events: EventBus,
    scan_window: Duration,
    cancel_token: Arc<CancellationToken>,
    scan_task_handle: Option<JoinHandle<()>>,
}

impl BluetoothScanner {
    pub fn new(
        adapter: Adapter,
        devices: Arc<Mutex<HashMap<String, Device>>>,
        store: Arc<SensorStore>,
        events: EventBus,
        scan_window: Duration,
    ) -> Self {
        Self {
            adapter,
            devices,
            store,
            events,
            scan_window,
            cancel_token: Arc::new(CancellationToken::new()),
            scan_task_handle: None,
        }
    }

    /// Begins discovery. The discovered set is replaced wholesale: any
    /// previous scan results are cleared first. The scan cancels itself
    /// after the configured window if not stopped sooner.
    pub async fn start_scan(&mut self) -> Result<()> {
        self.devices.lock().unwrap().clear();
        self.store.clear_discovered();
        if self.scan_task_handle.is_some() {
            self.stop_scan().await?;
        }

        self.cancel_token = Arc::new(CancellationToken::new());
        let cancel_token_for_task = self.cancel_token.clone();

        let adapter_for_task = self.adapter.clone();
        let devices_for_task = self.devices.clone();
        let store_for_task = self.store.clone();
        let events_for_task = self.events.clone();
        let scan_window = self.scan_window;

        let handle = tokio::spawn(async move {
            if let Err(e) = Self::internal_scan_task(
                adapter_for_task,
                devices_for_task,
                store_for_task,
                cancel_token_for_task,
                scan_window,
            )
            .await
            {
                error!("Scan task failed: {}", e);
            }
            events_for_task.emit(AppEvent::ScanComplete);
        });

        self.scan_task_handle = Some(handle);

        self.events.emit(AppEvent::ScanStarted);
        info!("Device scan task started.");
        Ok(())
    }

    async fn internal_scan_task(
        adapter: Adapter,
        devices: Arc<Mutex<HashMap<String, Device>>>,
        store: Arc<SensorStore>,
        cancel_token: Arc<CancellationToken>,
        scan_window: Duration,
    ) -> Result<()> {
        info!("Starting bluetooth scan");
        let mut scan_stream = adapter.scan(&[]).await?;
        let deadline = tokio::time::sleep(scan_window);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                result = scan_stream.next() => {
                    match result {
                        Some(discovered_device) => {
                            let device = discovered_device.device;
                            let rssi = discovered_device.rssi;

                            debug!("Found device - Device: {:?}, RSSI: {:?}", device, rssi);
                            Self::register_device(&devices, &store, device, rssi);
                        }
                        None => {
                            // The stream ends when the underlying stack
                            // reports a fatal scan error; nothing further
                            // will be discovered.
                            info!("Bluetooth scan stream has ended.");
                            break;
                        }
                    }
                }
                _ = &mut deadline => {
                    info!("Scan window of {:?} elapsed, stopping discovery.", scan_window);
                    break;
                }
                _ = cancel_token.cancelled() => {
                    break;
                }
            }
        }
        Ok(())
    }

    /// Records a discovered peripheral, keyed by identifier. Duplicate
    /// discoveries of the same identifier are ignored.
    fn register_device(
        devices: &Arc<Mutex<HashMap<String, Device>>>,
        store: &Arc<SensorStore>,
        device: Device,
        rssi: Option<i16>,
    ) {
        let id = device.id().to_string();
        let name = device.name().ok();
        let address = Self::extract_mac_address(&id).unwrap_or_else(|| "N/A".to_string());

        {
            let mut devices = devices.lock().unwrap();
            if devices.contains_key(&id) {
                return;
            }
            devices.insert(id.clone(), device);
        }

        let bluetooth_device = BluetoothDevice::new(id.clone(), name.clone(), address, rssi);
        info!(
            "Discovered device: ID: {}, Name: {:?}, RSSI: {:?}",
            id, name, rssi
        );
        if !store.add_discovered(bluetooth_device) {
            debug!("Device {} already present in discovered set", id);
        }
    }

    /// Stops an active scan and waits for the task to wind down. A no-op
    /// when no scan is running.
    pub async fn stop_scan(&mut self) -> Result<()> {
        info!("Stopping Bluetooth scan.");
        self.cancel_token.cancel();

        if let Some(handle) = self.scan_task_handle.take() {
            info!("Waiting for scan task to finish...");
            match handle.await {
                Ok(()) => info!("Scan task finished after cancellation."),
                Err(e) => {
                    if e.is_cancelled() {
                        info!("Scan task was cancelled successfully.");
                    } else {
                        error!("Scan task finished with an unexpected join error: {:?}", e);
                    }
                }
            }
        } else {
            info!("No active scan task handle found to wait for.");
        }

        self.events.emit(AppEvent::ScanStopped);
        Ok(())
    }

    fn extract_mac_address(device_id_str: &str) -> Option<String> {
        let re = Regex::new(r"([0-9A-Fa-f]{2}[:-]){5}([0-9A-Fa-f]{2})").unwrap();
        re.find_iter(device_id_str)
            .last()
            .map(|m| m.as_str().to_string().to_uppercase())
    }
}

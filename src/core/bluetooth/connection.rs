//! Bluetooth connection handling for the soil sensor
//! This module handles connecting to and disconnecting from the sensor,
//! including service discovery and locating the notification
//! characteristics the configured framing strategy needs.

use std::time::Duration;

use bluest::{Adapter, Characteristic, Device, Uuid};
use log::{info, warn};

use crate::core::frame::FrameChannel;
use crate::error::BridgeError;

/// Connection manager for the sensor link
#[derive(Clone)]
pub struct ConnectionManager {
    adapter: Adapter,
    max_retries: u32,
    retry_delay: u64,
}

impl ConnectionManager {
    pub fn new(adapter: Adapter, max_retries: u32, retry_delay: u64) -> Self {
        Self {
            adapter,
            max_retries,
            retry_delay,
        }
    }

    /// Connect to the sensor with retry mechanism. `wanted_chars` names the
    /// notification characteristics the framing strategy subscribes to,
    /// tagged with the frame channel each one feeds.
    pub async fn connect_with_retry(
        &self,
        device: &Device,
        service_uuid: Uuid,
        wanted_chars: &[(FrameChannel, Uuid)],
    ) -> Result<Vec<(FrameChannel, Characteristic)>, BridgeError> {
        let mut retry_count = 0;
        let mut last_error = None;

        while retry_count < self.max_retries {
            match self.try_connect(device, service_uuid, wanted_chars).await {
                Ok(chars) => {
                    info!("Successfully connected to device");
                    return Ok(chars);
                }
                Err(e) => {
                    warn!("Connection attempt {} failed: {}", retry_count + 1, e);
                    last_error = Some(e);

                    if retry_count < self.max_retries - 1 {
                        info!("Retrying connection in {} ms...", self.retry_delay);
                        tokio::time::sleep(Duration::from_millis(self.retry_delay)).await;
                    }
                }
            }
            retry_count += 1;
        }

        Err(last_error.unwrap_or_else(|| {
            BridgeError::Connection(format!(
                "failed to connect after {} attempts",
                self.max_retries
            ))
        }))
    }

    /// Try to connect and discover the sensor service and characteristics
    async fn try_connect(
        &self,
        device: &Device,
        service_uuid: Uuid,
        wanted_chars: &[(FrameChannel, Uuid)],
    ) -> Result<Vec<(FrameChannel, Characteristic)>, BridgeError> {
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let id = device.id().to_string();
        info!("Device details - ID: {}, Name: {:?}", id, name);

        if !device.is_connected().await {
            info!("Initiating connection to {}...", id);
            self.adapter.connect_device(device).await?;
        }

        info!("Connection successful, discovering services...");
        let services = device.services().await?;
        let sensor_service = services
            .iter()
            .find(|s| s.uuid() == service_uuid)
            .ok_or_else(|| {
                for service in &services {
                    info!("Available service: {}", service.uuid());
                }
                BridgeError::Connection(format!("sensor service not found: {}", service_uuid))
            })?
            .clone();

        info!("Found sensor service: {}", sensor_service.uuid());

        let discovered = sensor_service.characteristics().await?;
        let mut resolved = Vec::with_capacity(wanted_chars.len());
        for (channel, wanted_uuid) in wanted_chars {
            let characteristic = discovered
                .iter()
                .find(|c| c.uuid() == *wanted_uuid)
                .cloned()
                .ok_or_else(|| {
                    BridgeError::Connection(format!(
                        "notification characteristic not found: {}",
                        wanted_uuid
                    ))
                })?;
            info!(
                "Found {:?} notification characteristic: {}",
                channel, wanted_uuid
            );
            resolved.push((*channel, characteristic));
        }

        Ok(resolved)
    }

    /// Disconnect from the sensor. A no-op when the device is already gone.
    pub async fn disconnect(&self, device: &Device) -> Result<(), BridgeError> {
        if device.is_connected().await {
            info!("Disconnecting from device {}", device.id());
            self.adapter.disconnect_device(device).await?;
            info!("Successfully disconnected");
        } else {
            info!("Device {} not connected", device.id());
        }
        Ok(())
    }
}

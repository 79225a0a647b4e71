//! Demo harness for the soil-sensor bridge: scans for the sensor, connects
//! to the best-ranked device and streams readings to the log until
//! interrupted, saving a final snapshot into the package store.

use std::path::Path;

use anyhow::{bail, Context, Result};
use log::{info, warn};
use soil_sensor_bridge::storage::{GeoLocation, SavedSensorRecord};
use soil_sensor_bridge::{setup_logging, AppConfig, AppEvent, AppState, BridgeError};

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();

    let config_path = AppConfig::default_path(Path::new("."));
    let config = AppConfig::load_config(&config_path).await?;
    let target_name = config.sensor.target_device_name.clone();
    let scan_window_secs = config.sensor.scan_window_secs;

    let app_state = match AppState::new(config).await {
        Ok(state) => state,
        Err(BridgeError::TransportUnavailable) => {
            bail!("No Bluetooth adapter found. This machine cannot reach the sensor.")
        }
        Err(e) => return Err(e).context("failed to initialize application state"),
    };

    let manager_arc = app_state.bluetooth_manager_arc();
    let mut events = app_state.events.subscribe();

    {
        let manager = manager_arc.lock().await;
        if !manager.request_permissions().await? {
            bail!(
                "Bluetooth is not available. Enable the adapter in your system \
                 settings and try again."
            );
        }
    }

    info!("Scanning for {:?} ({}s window)...", target_name, scan_window_secs);
    manager_arc.lock().await.start_scan().await?;

    // The scan cancels itself after its window; wait for it to wind down.
    loop {
        match events.recv().await {
            Ok(AppEvent::ScanComplete) | Ok(AppEvent::ScanStopped) => break,
            Ok(AppEvent::DeviceDiscovered(device)) => {
                info!("  found {:?} ({})", device.name, device.id);
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Event stream interrupted during scan: {}", e);
                break;
            }
        }
    }

    let ranked = manager_arc.lock().await.ranked_devices();
    let Some(best) = ranked.first() else {
        bail!("No devices discovered. Is the sensor powered on and in range?");
    };
    if !best.matches_name(&target_name) {
        warn!(
            "No {:?} in range; best candidate is {:?}",
            target_name, best.name
        );
    }
    info!("Connecting to {:?} ({})...", best.name, best.id);
    manager_arc.lock().await.connect_device(&best.id).await?;

    info!("Streaming readings, press Ctrl-C to stop.");
    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(AppEvent::ReadingUpdated(reading)) => {
                        info!(
                            "temp={}°C humi={}% cond={}µS/cm ph={} N={} P={} K={}",
                            reading.temp, reading.humi, reading.cond, reading.ph,
                            reading.nitro, reading.phos, reading.pota,
                        );
                    }
                    Ok(AppEvent::ConnectionChanged(state)) => {
                        info!("Connection state: {:?}", state);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Event stream ended: {}", e);
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, saving snapshot and disconnecting.");
                break;
            }
        }
    }

    let reading = app_state.store.reading();
    let record = SavedSensorRecord::from_reading("manual snapshot", &reading);
    let location = GeoLocation {
        latitude: 0.0,
        longitude: 0.0,
        date: chrono::Local::now().to_rfc3339(),
    };
    if let Err(e) = app_state.packages.append_record("Paquete 1", location, record).await {
        warn!("Could not save snapshot: {}", e);
    }

    manager_arc.lock().await.disconnect().await?;
    Ok(())
}

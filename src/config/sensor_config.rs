//! Sensor link configuration: which device to look for, which GATT
//! identifiers to subscribe to, and the framing/timing knobs of the
//! decoder.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::bluetooth::constants::{
    CONNECT_RETRY_DELAY_MS, DEFAULT_DEBOUNCE_MS, DEFAULT_MIN_UPDATE_INTERVAL_MS,
    DEFAULT_SCAN_WINDOW_SECS, MAX_CONNECT_RETRIES, TARGET_DEVICE_NAME, UUID_BACK_PACKET_CHAR,
    UUID_COMBINED_DATA_CHAR, UUID_FRONT_PACKET_CHAR, UUID_SOIL_SENSOR_SERVICE,
};
use crate::core::frame::FramingStrategy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Name fragment used by the device selection policy (case-insensitive
    /// substring match against the advertised name).
    pub target_device_name: String,

    /// The soil-sensor data service.
    pub service_uuid: Uuid,

    /// Characteristic carrying the full combined CSV frame.
    pub combined_char_uuid: Uuid,

    /// Characteristic carrying the front half of a split frame
    /// (temperature, humidity, conductivity).
    pub front_packet_char_uuid: Uuid,

    /// Characteristic carrying the back half of a split frame
    /// (pH, nitrogen, phosphorus, potassium).
    pub back_packet_char_uuid: Uuid,

    /// Which framing the peripheral firmware uses.
    pub framing: FramingStrategy,

    /// How long an unstopped scan runs before cancelling itself.
    pub scan_window_secs: u64,

    /// Split reassembly: window that collapses a burst of pair completions
    /// into a single update.
    pub debounce_ms: u64,

    /// Split reassembly: minimum interval between downstream updates.
    pub min_update_interval_ms: u64,

    pub max_connect_retries: u32,
    pub connect_retry_delay_ms: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        SensorConfig {
            target_device_name: TARGET_DEVICE_NAME.to_string(),
            service_uuid: UUID_SOIL_SENSOR_SERVICE,
            combined_char_uuid: UUID_COMBINED_DATA_CHAR,
            front_packet_char_uuid: UUID_FRONT_PACKET_CHAR,
            back_packet_char_uuid: UUID_BACK_PACKET_CHAR,
            framing: FramingStrategy::Split,
            scan_window_secs: DEFAULT_SCAN_WINDOW_SECS,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            min_update_interval_ms: DEFAULT_MIN_UPDATE_INTERVAL_MS,
            max_connect_retries: MAX_CONNECT_RETRIES,
            connect_retry_delay_ms: CONNECT_RETRY_DELAY_MS,
        }
    }
}

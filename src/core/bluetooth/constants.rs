//! Constants used throughout the application
//! This module contains all the constant values used in the application,
//! such as UUIDs, timeouts, and other configuration values.

use uuid::Uuid;

/// Name fragment advertised by the target soil sensor
pub const TARGET_DEVICE_NAME: &str = "SensorTierra";

/// The UUID of the soil-sensor data service
pub const UUID_SOIL_SENSOR_SERVICE: Uuid = Uuid::from_u128(0x19b10000_e8f2_537e_4f6c_d104768a1214);

/// The UUID of the combined-CSV notification characteristic (all seven
/// values in one payload)
pub const UUID_COMBINED_DATA_CHAR: Uuid = Uuid::from_u128(0xbeb5483e_36e1_4688_b7f5_ea07361b26a8);

/// The UUID of the front split-packet characteristic (temperature,
/// humidity, conductivity)
pub const UUID_FRONT_PACKET_CHAR: Uuid = Uuid::from_u128(0x86dd3402_7feb_4e7c_80d0_a4ba5709f1ad);

/// The UUID of the back split-packet characteristic (pH, nitrogen,
/// phosphorus, potassium)
pub const UUID_BACK_PACKET_CHAR: Uuid = Uuid::from_u128(0xa38cdf97_2ace_42e3_8ec8_c4a2caffb1fe);

/// Maximum number of connection retries
pub const MAX_CONNECT_RETRIES: u32 = 5;

/// Delay between connection retries in milliseconds
pub const CONNECT_RETRY_DELAY_MS: u64 = 1000;

/// Scan window in seconds; a scan not stopped explicitly is cancelled
/// after this long
pub const DEFAULT_SCAN_WINDOW_SECS: u64 = 5;

/// Debounce window for split-frame reassembly in milliseconds
pub const DEFAULT_DEBOUNCE_MS: u64 = 150;

/// Minimum interval between downstream reading updates in milliseconds
pub const DEFAULT_MIN_UPDATE_INTERVAL_MS: u64 = 500;

/// Capacity of the application event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

//! Error taxonomy for the bridge
//! Scan and decode failures are non-fatal and are logged at the site where
//! they occur; connection failures abort the attempt and return the state
//! machine to `Disconnected`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// The platform refused the grants needed for scanning or connecting.
    #[error("bluetooth permissions denied")]
    PermissionDenied,

    /// The platform has no usable Bluetooth transport at all.
    #[error("bluetooth transport unavailable on this platform")]
    TransportUnavailable,

    /// A discovery-time failure. Reported per callback, never fatal to the
    /// process; the scan simply stops reporting further devices.
    #[error("scan failed: {0}")]
    Scan(String),

    /// Connect or service-discovery failure, fatal to that attempt.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Malformed notification payload. The frame is dropped and the last
    /// good reading is retained.
    #[error("frame decode failed: {0}")]
    Decode(String),

    #[error(transparent)]
    Bluetooth(#[from] bluest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;

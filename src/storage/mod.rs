//! Local persistence of saved sensor packages.

pub mod packages;

pub use packages::{GeoLocation, PackageStore, SavedPackage, SavedSensorRecord};

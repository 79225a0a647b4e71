//! Saved-package persistence
//! A package groups named snapshots of sensor readings. The list is
//! JSON-serialized and read/written wholesale on every mutation; there is
//! no incremental diffing. The bluetooth core never owns this data, it
//! only supplies the live reading a snapshot is taken from.

use std::path::PathBuf;

use chrono::Local;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::fs;
use uuid::Uuid;

use crate::core::frame::SensorReading;
use crate::error::BridgeError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub date: String,
}

/// An immutable snapshot of one sensor reading plus a name and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSensorRecord {
    pub id: String,
    pub name: String,
    pub date: String,
    pub humi: f64,
    pub temp: f64,
    pub cond: f64,
    pub ph: f64,
    pub nitro: f64,
    pub phos: f64,
    pub pota: f64,
}

impl SavedSensorRecord {
    /// Snapshots the given reading under `name`, stamped with the current
    /// local time.
    pub fn from_reading(name: &str, reading: &SensorReading) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            date: Local::now().to_rfc3339(),
            humi: reading.humi,
            temp: reading.temp,
            cond: reading.cond,
            ph: reading.ph,
            nitro: reading.nitro,
            phos: reading.phos,
            pota: reading.pota,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedPackage {
    pub package_name: String,
    pub package_id: String,
    pub location: GeoLocation,
    pub sensors: Vec<SavedSensorRecord>,
}

impl SavedPackage {
    pub fn new(package_name: &str, location: GeoLocation) -> Self {
        Self {
            package_name: package_name.to_string(),
            package_id: Uuid::new_v4().to_string(),
            location,
            sensors: Vec::new(),
        }
    }
}

/// Wholesale load/save of the package list.
pub struct PackageStore {
    path: PathBuf,
}

impl PackageStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Reads the full package list. A missing file is an empty list, not an
    /// error.
    pub async fn load(&self) -> Result<Vec<SavedPackage>, BridgeError> {
        if !self.path.exists() {
            warn!("Package file not found at {:?}, starting empty.", self.path);
            return Ok(Vec::new());
        }
        let json = fs::read_to_string(&self.path).await?;
        let packages: Vec<SavedPackage> = serde_json::from_str(&json)?;
        info!("Loaded {} saved packages from {:?}", packages.len(), self.path);
        Ok(packages)
    }

    /// Writes the full package list, replacing whatever was on disk.
    pub async fn save(&self, packages: &[SavedPackage]) -> Result<(), BridgeError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string_pretty(packages)?;
        fs::write(&self.path, json).await?;
        info!("Saved {} packages to {:?}", packages.len(), self.path);
        Ok(())
    }

    /// Appends a record to the named package, creating the package when it
    /// does not exist yet, and persists the whole list.
    pub async fn append_record(
        &self,
        package_name: &str,
        location: GeoLocation,
        record: SavedSensorRecord,
    ) -> Result<(), BridgeError> {
        let mut packages = self.load().await?;
        match packages
            .iter_mut()
            .find(|p| p.package_name == package_name)
        {
            Some(package) => package.sensors.push(record),
            None => {
                let mut package = SavedPackage::new(package_name, location);
                package.sensors.push(record);
                packages.push(package);
            }
        }
        self.save(&packages).await
    }

    /// Upload stub: the surrounding app has no server-side ingestion, so
    /// this only logs what would be sent.
    pub async fn upload(&self) -> Result<(), BridgeError> {
        let packages = self.load().await?;
        let payload = serde_json::to_string(&packages)?;
        info!(
            "Upload requested: {} packages, {} bytes (no ingestion endpoint, logging only)",
            packages.len(),
            payload.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> PackageStore {
        let path = std::env::temp_dir().join(format!("soil_packages_{}.json", Uuid::new_v4()));
        PackageStore::new(path)
    }

    fn sample_reading() -> SensorReading {
        SensorReading {
            temp: 22.5,
            humi: 55.0,
            cond: 410.0,
            ph: 6.7,
            nitro: 30.0,
            phos: 15.0,
            pota: 20.0,
        }
    }

    fn sample_location() -> GeoLocation {
        GeoLocation {
            latitude: 19.43,
            longitude: -99.13,
            date: "2024-06-01T12:00:00-06:00".into(),
        }
    }

    #[tokio::test]
    async fn missing_file_loads_as_empty_list() {
        let store = temp_store();
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn packages_round_trip_wholesale() {
        let store = temp_store();
        let mut package = SavedPackage::new("Paquete 1", sample_location());
        package
            .sensors
            .push(SavedSensorRecord::from_reading("east field", &sample_reading()));
        store.save(std::slice::from_ref(&package)).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, vec![package]);
        let _ = tokio::fs::remove_file(&store.path).await;
    }

    #[tokio::test]
    async fn append_creates_package_then_extends_it() {
        let store = temp_store();
        store
            .append_record(
                "Paquete 1",
                sample_location(),
                SavedSensorRecord::from_reading("a", &sample_reading()),
            )
            .await
            .unwrap();
        store
            .append_record(
                "Paquete 1",
                sample_location(),
                SavedSensorRecord::from_reading("b", &sample_reading()),
            )
            .await
            .unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].sensors.len(), 2);
        let _ = tokio::fs::remove_file(&store.path).await;
    }

    #[test]
    fn record_snapshot_copies_all_seven_fields() {
        let reading = sample_reading();
        let record = SavedSensorRecord::from_reading("spot", &reading);
        assert_eq!(record.temp, 22.5);
        assert_eq!(record.humi, 55.0);
        assert_eq!(record.cond, 410.0);
        assert_eq!(record.ph, 6.7);
        assert_eq!(record.nitro, 30.0);
        assert_eq!(record.phos, 15.0);
        assert_eq!(record.pota, 20.0);
    }

    #[test]
    fn wire_format_uses_camel_case_keys() {
        let package = SavedPackage::new("Paquete 1", sample_location());
        let json = serde_json::to_string(&package).unwrap();
        assert!(json.contains("\"packageName\""));
        assert!(json.contains("\"packageId\""));
    }
}

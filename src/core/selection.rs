//! Device selection policy
//! Ranks the discovered-peripheral set for presentation. The policy is
//! inclusive-with-priority: non-matching devices are kept but ranked below
//! the target sensor, so a user can still pick an unexpected device by
//! hand. Order: target-name match first, then named devices before unnamed
//! ones, then descending signal strength.

use std::cmp::Ordering;

use crate::core::bluetooth::types::BluetoothDevice;

/// RSSI assumed for devices that did not report one; ranks them below any
/// device with a real measurement.
const MISSING_RSSI: i16 = -100;

/// Produces a de-duplicated, ordered device list. `target_fragment` is
/// matched case-insensitively as a substring of the advertised name.
pub fn rank_devices(devices: &[BluetoothDevice], target_fragment: &str) -> Vec<BluetoothDevice> {
    let mut ranked: Vec<BluetoothDevice> = Vec::with_capacity(devices.len());
    for device in devices {
        if !ranked.iter().any(|d| d.id == device.id) {
            ranked.push(device.clone());
        }
    }
    ranked.sort_by(|a, b| compare(a, b, target_fragment));
    ranked
}

fn compare(a: &BluetoothDevice, b: &BluetoothDevice, target_fragment: &str) -> Ordering {
    let a_match = a.matches_name(target_fragment);
    let b_match = b.matches_name(target_fragment);
    if a_match != b_match {
        return if a_match { Ordering::Less } else { Ordering::Greater };
    }

    let a_named = a.name.is_some();
    let b_named = b.name.is_some();
    if a_named != b_named {
        return if a_named { Ordering::Less } else { Ordering::Greater };
    }

    let a_rssi = a.rssi.unwrap_or(MISSING_RSSI);
    let b_rssi = b.rssi.unwrap_or(MISSING_RSSI);
    b_rssi.cmp(&a_rssi)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: &str, name: Option<&str>, rssi: Option<i16>) -> BluetoothDevice {
        BluetoothDevice::new(id.into(), name.map(String::from), "N/A".into(), rssi)
    }

    #[test]
    fn target_match_ranks_first_regardless_of_signal() {
        let devices = vec![
            device("1", Some("Living Room TV"), Some(-30)),
            device("2", Some("SensorTierra"), Some(-90)),
            device("3", Some("Headphones"), Some(-40)),
        ];
        let ranked = rank_devices(&devices, "SensorTierra");
        assert_eq!(ranked[0].id, "2");
    }

    #[test]
    fn match_is_case_insensitive_substring() {
        let devices = vec![
            device("1", Some("other"), Some(-10)),
            device("2", Some("sensortierra-02"), Some(-95)),
        ];
        let ranked = rank_devices(&devices, "SensorTierra");
        assert_eq!(ranked[0].id, "2");
    }

    #[test]
    fn named_devices_rank_before_unnamed() {
        let devices = vec![
            device("1", None, Some(-20)),
            device("2", Some("anything"), Some(-80)),
        ];
        let ranked = rank_devices(&devices, "SensorTierra");
        assert_eq!(ranked[0].id, "2");
    }

    #[test]
    fn remaining_devices_sort_by_descending_rssi() {
        let devices = vec![
            device("1", Some("a"), Some(-70)),
            device("2", Some("b"), Some(-40)),
            device("3", Some("c"), None),
        ];
        let ranked = rank_devices(&devices, "SensorTierra");
        assert_eq!(ranked[0].id, "2");
        assert_eq!(ranked[1].id, "1");
        assert_eq!(ranked[2].id, "3");
    }

    #[test]
    fn duplicates_by_id_are_removed() {
        let devices = vec![
            device("1", Some("a"), Some(-40)),
            device("1", Some("a"), Some(-40)),
        ];
        assert_eq!(rank_devices(&devices, "SensorTierra").len(), 1);
    }

    #[test]
    fn non_matching_devices_are_kept() {
        let devices = vec![
            device("1", Some("SensorTierra"), Some(-50)),
            device("2", Some("other"), Some(-50)),
            device("3", None, None),
        ];
        assert_eq!(rank_devices(&devices, "SensorTierra").len(), 3);
    }
}

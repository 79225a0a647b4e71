//! End-to-end decode scenarios over the public API: raw notification bytes
//! in, observable store state out.

use std::sync::Arc;
use std::time::Duration;

use soil_sensor_bridge::core::store::ReadingSink;
use soil_sensor_bridge::core::bluetooth::types::{BluetoothDevice, ConnectionState};
use soil_sensor_bridge::{
    rank_devices, EventBus, FrameChannel, FrameDecoder, FramingStrategy, SensorReading,
    SensorStore,
};

fn expected() -> SensorReading {
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

async fn drive(
    decoder: &mut FrameDecoder,
    store: &Arc<SensorStore>,
    channel: FrameChannel,
    raw: &[u8],
) {
    if let Some(reading) = decoder.on_notification(channel, raw) {
        store.publish(reading).await;
    }
}

#[tokio::test]
async fn combined_frame_reaches_the_store() {
    let store = Arc::new(SensorStore::new(EventBus::default()));
    let mut decoder = FrameDecoder::new(FramingStrategy::Combined, Duration::ZERO, Duration::ZERO);

    drive(&mut decoder, &store, FrameChannel::Combined, b"22.5,55,410,6.7,30,15,20").await;
    assert_eq!(store.reading(), expected());
}

#[tokio::test]
async fn short_frame_leaves_store_unchanged() {
    let store = Arc::new(SensorStore::new(EventBus::default()));
    let mut decoder = FrameDecoder::new(FramingStrategy::Combined, Duration::ZERO, Duration::ZERO);

    drive(&mut decoder, &store, FrameChannel::Combined, b"22.5,55,410,6.7,30,15,20").await;
    drive(&mut decoder, &store, FrameChannel::Combined, b"22.5,55,410").await;
    // The malformed frame is dropped; the previous reading stands in full.
    assert_eq!(store.reading(), expected());
}

#[tokio::test]
async fn split_pair_yields_exactly_one_update() {
    let events = EventBus::default();
    let mut rx = events.subscribe();
    let store = Arc::new(SensorStore::new(events));
    // A generous window so a slow test runner cannot fall outside it.
    let mut decoder = FrameDecoder::new(
        FramingStrategy::Split,
        Duration::from_secs(1),
        Duration::ZERO,
    );

    drive(&mut decoder, &store, FrameChannel::Front, b"22.5,55,410").await;
    drive(&mut decoder, &store, FrameChannel::Back, b"6.7,30,15,20").await;
    // Both sides refreshing within the debounce window is one burst.
    drive(&mut decoder, &store, FrameChannel::Front, b"22.5,55,410").await;
    drive(&mut decoder, &store, FrameChannel::Back, b"6.7,30,15,20").await;

    assert_eq!(store.reading(), expected());
    let mut updates = 0;
    while let Ok(event) = rx.try_recv() {
        if matches!(event, soil_sensor_bridge::AppEvent::ReadingUpdated(_)) {
            updates += 1;
        }
    }
    assert_eq!(updates, 1);
}

#[tokio::test]
async fn disconnect_resets_readings_and_partials() {
    let store = Arc::new(SensorStore::new(EventBus::default()));
    let mut decoder = FrameDecoder::new(FramingStrategy::Split, Duration::ZERO, Duration::ZERO);

    drive(&mut decoder, &store, FrameChannel::Front, b"22.5,55,410").await;
    drive(&mut decoder, &store, FrameChannel::Back, b"6.7,30,15,20").await;
    assert_eq!(store.reading(), expected());

    decoder.reset();
    store.set_connection(ConnectionState::Disconnected);

    assert_eq!(store.reading(), SensorReading::default());
    // The cleared front half must not pair with a fresh back half.
    drive(&mut decoder, &store, FrameChannel::Back, b"6.7,30,15,20").await;
    assert_eq!(store.reading(), SensorReading::default());
}

#[test]
fn selection_policy_prefers_target_over_signal() {
    let devices = vec![
        BluetoothDevice::new("1".into(), Some("Speaker".into()), "N/A".into(), Some(-20)),
        BluetoothDevice::new(
            "2".into(),
            Some("SensorTierra".into()),
            "N/A".into(),
            Some(-85),
        ),
        BluetoothDevice::new("3".into(), None, "N/A".into(), Some(-30)),
    ];
    let ranked = rank_devices(&devices, "SensorTierra");
    assert_eq!(ranked[0].id, "2");
    assert_eq!(ranked.len(), 3);
}

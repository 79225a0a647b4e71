//! Soil-sensor frame decoding
//! This module turns subscribed-characteristic notifications into validated
//! `SensorReading` values. Two framing strategies are supported, selected at
//! configuration time:
//!
//! - `Combined`: one characteristic notifies a CSV payload carrying all
//!   seven values at once.
//! - `Split`: two characteristics each notify half of a reading (front:
//!   temperature/humidity/conductivity, back: pH/N/P/K) which are reassembled
//!   before parsing.
//!
//! The canonical field order of a combined frame is
//! `temp,humi,cond,ph,nitro,phos,pota`. Payloads may arrive either as plain
//! UTF-8 text or as base64-of-UTF-8; CSV text is never itself valid base64
//! (`,` and `.` are outside the alphabet), so base64 is tried first and raw
//! text used as the fallback.

use std::time::{Duration, Instant};

use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// One complete set of soil measurements. All fields default to zero while
/// no sensor is connected and are only ever replaced as a unit.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorReading {
    /// Temperature in °C
    pub temp: f64,
    /// Relative humidity in %
    pub humi: f64,
    /// Conductivity in µS/cm
    pub cond: f64,
    /// Soil pH
    pub ph: f64,
    /// Nitrogen in mg/kg
    pub nitro: f64,
    /// Phosphorus in mg/kg
    pub phos: f64,
    /// Potassium in mg/kg
    pub pota: f64,
}

/// How the peripheral frames its notifications.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FramingStrategy {
    /// All seven values in one CSV notification.
    Combined,
    /// Two half-payloads reassembled into one frame.
    Split,
}

/// Which notification channel a payload arrived on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameChannel {
    /// The single combined-CSV characteristic.
    Combined,
    /// Split characteristic carrying temperature/humidity/conductivity.
    Front,
    /// Split characteristic carrying pH/nitrogen/phosphorus/potassium.
    Back,
}

/// Decodes a raw notification payload into text. Base64-of-UTF-8 is tried
/// first; if the bytes are not valid base64 they are interpreted as plain
/// UTF-8.
pub fn decode_payload(raw: &[u8]) -> Result<String, BridgeError> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| BridgeError::Decode(format!("payload is not UTF-8: {}", e)))?;
    let trimmed = text.trim();

    if let Ok(decoded) = BASE64_STANDARD.decode(trimmed) {
        if let Ok(inner) = std::str::from_utf8(&decoded) {
            return Ok(inner.trim().to_string());
        }
    }
    Ok(trimmed.to_string())
}

fn tokens(csv: &str) -> Vec<&str> {
    csv.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

fn reading_from_tokens(fields: &[&str]) -> Result<SensorReading, BridgeError> {
    let mut values = [0.0f64; 7];
    for (i, token) in fields.iter().take(7).enumerate() {
        // A token that does not parse rejects the whole frame; the historical
        // zero-fallback could silently mix a stale field into a fresh frame.
        values[i] = token.parse::<f64>().map_err(|e| {
            BridgeError::Decode(format!("token {:?} is not numeric: {}", token, e))
        })?;
    }
    Ok(SensorReading {
        temp: values[0],
        humi: values[1],
        cond: values[2],
        ph: values[3],
        nitro: values[4],
        phos: values[5],
        pota: values[6],
    })
}

/// Parses a combined CSV frame. Exactly seven non-empty tokens are required.
pub fn parse_combined_frame(csv: &str) -> Result<SensorReading, BridgeError> {
    let fields = tokens(csv);
    if fields.len() != 7 {
        return Err(BridgeError::Decode(format!(
            "expected 7 fields, got {} in {:?}",
            fields.len(),
            csv
        )));
    }
    reading_from_tokens(&fields)
}

/// Parses a reassembled split frame. The combined check is looser than the
/// single-characteristic one: at least seven tokens are accepted and only
/// the first seven are used.
pub fn parse_reassembled_frame(csv: &str) -> Result<SensorReading, BridgeError> {
    let fields = tokens(csv);
    if fields.len() < 7 {
        return Err(BridgeError::Decode(format!(
            "expected at least 7 fields, got {} in {:?}",
            fields.len(),
            csv
        )));
    }
    reading_from_tokens(&fields)
}

/// Reassembles the two halves of a split frame.
///
/// The most recent string from each side is retained; whenever a new arrival
/// completes a pair the halves are joined with a comma and parsed. No
/// ordering is assumed between the two sides. A half that never gets its
/// counterpart simply never produces a reading; it is not an error and does
/// not time out.
pub struct SplitAssembler {
    front: Option<String>,
    back: Option<String>,
    /// Collapses a pair of completions arriving in quick succession (both
    /// sides notifying back-to-back) into one update.
    debounce: Duration,
    /// Throttles downstream updates when the peripheral notifies faster
    /// than the presentation layer needs.
    min_update_interval: Duration,
    last_emit: Option<Instant>,
}

impl SplitAssembler {
    pub fn new(debounce: Duration, min_update_interval: Duration) -> Self {
        Self {
            front: None,
            back: None,
            debounce,
            min_update_interval,
            last_emit: None,
        }
    }

    /// Feeds one decoded half-payload. Returns a reading when this arrival
    /// completes a pair that passes the debounce and throttle gates.
    pub fn push(&mut self, channel: FrameChannel, payload: String) -> Option<SensorReading> {
        match channel {
            FrameChannel::Front => self.front = Some(payload),
            FrameChannel::Back => self.back = Some(payload),
            FrameChannel::Combined => {
                warn!("Combined payload routed into split assembler, ignoring");
                return None;
            }
        }
        self.try_complete(Instant::now())
    }

    fn try_complete(&mut self, now: Instant) -> Option<SensorReading> {
        let (front, back) = match (self.front.as_deref(), self.back.as_deref()) {
            (Some(f), Some(b)) if !f.is_empty() && !b.is_empty() => (f, b),
            _ => return None,
        };

        if let Some(last) = self.last_emit {
            let elapsed = now.duration_since(last);
            if elapsed < self.debounce {
                debug!("Split pair completed within debounce window, collapsing");
                return None;
            }
            if elapsed < self.min_update_interval {
                debug!("Split pair throttled by minimum update interval");
                return None;
            }
        }

        let combined = format!("{},{}", front, back);
        match parse_reassembled_frame(&combined) {
            Ok(reading) => {
                self.last_emit = Some(now);
                Some(reading)
            }
            Err(e) => {
                warn!("Dropping malformed split frame: {}", e);
                None
            }
        }
    }

    /// Drops both retained half-payloads and the rate-limit state. Called on
    /// disconnect so a stale half can never pair with a fresh one.
    pub fn clear(&mut self) {
        self.front = None;
        self.back = None;
        self.last_emit = None;
    }
}

/// Frame decoder with one strategy selected at configuration time.
///
/// All decode failures are non-fatal: the frame is dropped with a warning
/// and no reading is produced, so the store keeps its last good value.
pub struct FrameDecoder {
    strategy: FramingStrategy,
    assembler: SplitAssembler,
}

impl FrameDecoder {
    pub fn new(
        strategy: FramingStrategy,
        debounce: Duration,
        min_update_interval: Duration,
    ) -> Self {
        Self {
            strategy,
            assembler: SplitAssembler::new(debounce, min_update_interval),
        }
    }

    pub fn strategy(&self) -> FramingStrategy {
        self.strategy
    }

    /// Processes one raw notification. Returns a complete reading when the
    /// payload (or the pair it completes) validates, `None` otherwise.
    pub fn on_notification(&mut self, channel: FrameChannel, raw: &[u8]) -> Option<SensorReading> {
        let payload = match decode_payload(raw) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Dropping undecodable notification: {}", e);
                return None;
            }
        };

        match (self.strategy, channel) {
            (FramingStrategy::Combined, FrameChannel::Combined) => {
                match parse_combined_frame(&payload) {
                    Ok(reading) => Some(reading),
                    Err(e) => {
                        warn!("Dropping malformed combined frame: {}", e);
                        None
                    }
                }
            }
            (FramingStrategy::Split, FrameChannel::Front)
            | (FramingStrategy::Split, FrameChannel::Back) => {
                self.assembler.push(channel, payload)
            }
            (strategy, channel) => {
                warn!(
                    "Notification on {:?} does not match configured {:?} framing, ignoring",
                    channel, strategy
                );
                None
            }
        }
    }

    /// Clears any retained partial state. Called on disconnect.
    pub fn reset(&mut self) {
        self.assembler.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPECTED: SensorReading = SensorReading {
        temp: 22.5,
        humi: 55.0,
        cond: 410.0,
        ph: 6.7,
        nitro: 30.0,
        phos: 15.0,
        pota: 20.0,
    };

    fn split_decoder() -> FrameDecoder {
        // Zero gates so tests exercise reassembly without timing.
        FrameDecoder::new(FramingStrategy::Split, Duration::ZERO, Duration::ZERO)
    }

    #[test]
    fn combined_frame_decodes_in_canonical_order() {
        let reading = parse_combined_frame("22.5,55,410,6.7,30,15,20").unwrap();
        assert_eq!(reading, EXPECTED);
    }

    #[test]
    fn combined_frame_is_deterministic() {
        let a = parse_combined_frame("22.5,55,410,6.7,30,15,20").unwrap();
        let b = parse_combined_frame("22.5,55,410,6.7,30,15,20").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn combined_frame_rejects_short_token_count() {
        assert!(parse_combined_frame("22.5,55,410").is_err());
    }

    #[test]
    fn combined_frame_rejects_extra_tokens() {
        assert!(parse_combined_frame("1,2,3,4,5,6,7,8").is_err());
    }

    #[test]
    fn combined_frame_rejects_non_numeric_token() {
        assert!(parse_combined_frame("22.5,abc,410,6.7,30,15,20").is_err());
    }

    #[test]
    fn combined_frame_tolerates_whitespace() {
        let reading = parse_combined_frame(" 22.5 , 55 ,410, 6.7,30 ,15,20 ").unwrap();
        assert_eq!(reading, EXPECTED);
    }

    #[test]
    fn payload_decodes_plain_text() {
        assert_eq!(
            decode_payload(b"22.5,55,410,6.7,30,15,20").unwrap(),
            "22.5,55,410,6.7,30,15,20"
        );
    }

    #[test]
    fn payload_decodes_base64_of_text() {
        let encoded = BASE64_STANDARD.encode("22.5,55,410,6.7,30,15,20");
        assert_eq!(
            decode_payload(encoded.as_bytes()).unwrap(),
            "22.5,55,410,6.7,30,15,20"
        );
    }

    #[test]
    fn payload_rejects_non_utf8() {
        assert!(decode_payload(&[0xff, 0xfe, 0x00]).is_err());
    }

    #[test]
    fn decoder_combined_end_to_end() {
        let mut decoder =
            FrameDecoder::new(FramingStrategy::Combined, Duration::ZERO, Duration::ZERO);
        let reading = decoder
            .on_notification(FrameChannel::Combined, b"22.5,55,410,6.7,30,15,20")
            .unwrap();
        assert_eq!(reading, EXPECTED);
        assert!(decoder
            .on_notification(FrameChannel::Combined, b"22.5,55,410")
            .is_none());
    }

    #[test]
    fn split_pair_produces_one_combined_reading() {
        let mut decoder = split_decoder();
        assert!(decoder
            .on_notification(FrameChannel::Front, b"22.5,55,410")
            .is_none());
        let reading = decoder
            .on_notification(FrameChannel::Back, b"6.7,30,15,20")
            .unwrap();
        assert_eq!(reading, EXPECTED);
    }

    #[test]
    fn split_pair_order_does_not_matter() {
        let mut decoder = split_decoder();
        assert!(decoder
            .on_notification(FrameChannel::Back, b"6.7,30,15,20")
            .is_none());
        let reading = decoder
            .on_notification(FrameChannel::Front, b"22.5,55,410")
            .unwrap();
        assert_eq!(reading, EXPECTED);
    }

    #[test]
    fn split_pair_from_base64_halves() {
        let mut decoder = split_decoder();
        let front = BASE64_STANDARD.encode("22.5,55,410");
        let back = BASE64_STANDARD.encode("6.7,30,15,20");
        decoder.on_notification(FrameChannel::Front, front.as_bytes());
        let reading = decoder
            .on_notification(FrameChannel::Back, back.as_bytes())
            .unwrap();
        assert_eq!(reading, EXPECTED);
    }

    #[test]
    fn split_pair_rejects_short_combination() {
        let mut decoder = split_decoder();
        decoder.on_notification(FrameChannel::Front, b"22.5,55");
        assert!(decoder
            .on_notification(FrameChannel::Back, b"6.7,30,15")
            .is_none());
    }

    #[test]
    fn split_pair_accepts_at_least_seven_tokens() {
        let reading = parse_reassembled_frame("22.5,55,410,6.7,30,15,20,99").unwrap();
        assert_eq!(reading, EXPECTED);
    }

    #[test]
    fn debounce_collapses_rapid_completions() {
        let mut assembler =
            SplitAssembler::new(Duration::from_millis(200), Duration::ZERO);
        assert!(assembler
            .push(FrameChannel::Front, "22.5,55,410".into())
            .is_none());
        assert!(assembler
            .push(FrameChannel::Back, "6.7,30,15,20".into())
            .is_some());
        // Both sides refresh immediately: still inside the debounce window.
        assert!(assembler
            .push(FrameChannel::Front, "23.0,56,400".into())
            .is_none());
        assert!(assembler
            .push(FrameChannel::Back, "6.8,31,16,21".into())
            .is_none());
    }

    #[test]
    fn min_interval_throttles_then_allows() {
        let mut assembler =
            SplitAssembler::new(Duration::ZERO, Duration::from_millis(20));
        assembler.push(FrameChannel::Front, "22.5,55,410".into());
        assert!(assembler
            .push(FrameChannel::Back, "6.7,30,15,20".into())
            .is_some());
        assert!(assembler
            .push(FrameChannel::Back, "6.7,30,15,20".into())
            .is_none());
        std::thread::sleep(Duration::from_millis(30));
        assert!(assembler
            .push(FrameChannel::Back, "6.7,30,15,20".into())
            .is_some());
    }

    #[test]
    fn clear_drops_retained_halves() {
        let mut decoder = split_decoder();
        decoder.on_notification(FrameChannel::Front, b"22.5,55,410");
        decoder.reset();
        // The cleared front half must not pair with a fresh back half.
        assert!(decoder
            .on_notification(FrameChannel::Back, b"6.7,30,15,20")
            .is_none());
    }

    #[test]
    fn stuck_half_pair_never_emits() {
        let mut decoder = split_decoder();
        for _ in 0..5 {
            assert!(decoder
                .on_notification(FrameChannel::Front, b"22.5,55,410")
                .is_none());
        }
    }
}

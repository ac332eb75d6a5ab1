//! Fuzz target: `FrameDecoder::decode`
//!
//! Splits arbitrary bytes into (identifier, length, payload) records and
//! decodes each against both table revisions.  The decoder must never
//! panic, never exceed its per-frame event budget and never pass an
//! energy value at or above the ceiling.
//!
//! cargo fuzz run fuzz_frame_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use leafmon::can::RawFrame;
use leafmon::can::decoder::{FrameDecoder, MAX_EVENTS_PER_FRAME};
use leafmon::can::signals::TableRevision;
use leafmon::config::SystemConfig;
use leafmon::events::TelemetryEvent;

fuzz_target!(|data: &[u8]| {
    for revision in [TableRevision::Current, TableRevision::Early] {
        let config = SystemConfig {
            table_revision: revision,
            ..SystemConfig::default()
        };
        let mut decoder = FrameDecoder::new(&config);
        let mut now = 0u64;
        let mut rest = data;

        while rest.len() >= 3 {
            let id = u16::from_be_bytes([rest[0], rest[1]]) & 0x7FF;
            let len = usize::from(rest[2] % 9).min(rest.len() - 3);
            let payload = &rest[3..3 + len];
            rest = &rest[3 + len..];

            let Some(frame) = RawFrame::standard(id, payload) else {
                continue;
            };
            let events = decoder.decode(&frame, now);
            assert!(events.len() <= MAX_EVENTS_PER_FRAME);
            for e in &events {
                if let TelemetryEvent::BatteryEnergyKwh(v) = e {
                    assert!(*v < config.energy_ceiling_kwh);
                }
            }
            let _ = decoder.poll_vehicle_state(now);
            now += u64::from(id & 0x3F);
        }
    }
});

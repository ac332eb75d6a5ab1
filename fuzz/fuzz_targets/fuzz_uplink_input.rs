//! Fuzz target: modem-side text parsers
//!
//! Feeds arbitrary bytes to the control-topic parser and, when they are
//! valid UTF-8, to the network time parser.  Any accepted network time
//! must be within calendar ranges.
//!
//! cargo fuzz run fuzz_uplink_input

#![no_main]

use libfuzzer_sys::fuzz_target;
use leafmon::app::uplink::{RemoteControl, parse_control, parse_network_time};
use leafmon::events::TelemetryEvent;

fuzz_target!(|data: &[u8]| {
    if let Some(RemoteControl::Command(event)) = parse_control(data) {
        assert!(event.kind().is_command());
    }

    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    if let Some(fields) = parse_network_time(text) {
        for f in fields {
            match f {
                TelemetryEvent::GsmMonth(m) => assert!((1..=12).contains(&m)),
                TelemetryEvent::GsmDay(d) => assert!((1..=31).contains(&d)),
                TelemetryEvent::GsmHours(h) => assert!((0..=23).contains(&h)),
                TelemetryEvent::GsmMinutes(m) => assert!((0..=59).contains(&m)),
                _ => {}
            }
        }
    }
});

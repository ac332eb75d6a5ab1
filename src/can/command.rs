//! Outbound command dispatcher.
//!
//! The EV bus gives no acknowledgment for body/climate requests, so every
//! command is sent as a burst: one wake frame to bring the gateway out of
//! sleep, then the command frame repeated on a fixed cadence.  Transmit
//! failures are logged and the burst carries on.

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use super::RawFrame;
use crate::app::ports::CanPort;
use crate::bus::TraceSignal;
use crate::config::RepeatPolicy;
use crate::events::{AcStatus, ChargerStatus, DoorRequest, TelemetryEvent};

/// Identifier of the gateway wake-up frame.
pub const WAKE_ID: u16 = 0x68C;
const WAKE_PAYLOAD: [u8; 1] = [0x00];

/// Identifier carrying climate, charge and door requests.
pub const COMMAND_ID: u16 = 0x56E;

/// Payload of the command frame for a control event, if it has one.
pub fn command_payload(event: &TelemetryEvent) -> Option<[u8; 4]> {
    match event {
        TelemetryEvent::AcRequest(AcStatus::StartRequested) => Some([0x4E, 0x08, 0x12, 0x00]),
        TelemetryEvent::AcRequest(AcStatus::StopRequested) => Some([0x56, 0x00, 0x01, 0x00]),
        TelemetryEvent::ChargeRequest(ChargerStatus::StartRequested) => {
            Some([0x66, 0x08, 0x12, 0x00])
        }
        TelemetryEvent::DoorRequest(DoorRequest::Lock) => Some([0x60, 0x80, 0x00, 0x00]),
        TelemetryEvent::DoorRequest(DoorRequest::Unlock) => Some([0x11, 0x00, 0x00, 0x00]),
        _ => None,
    }
}

/// What [`CommandDispatcher::handle`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Not a control request this dispatcher acts on.
    Ignored,
    /// Trace flag flipped to the contained value.
    TraceToggled(bool),
    /// Wake frame plus command repeats were attempted.
    Burst { sent: u8, failed: u8 },
}

pub struct CommandDispatcher<'a, C: CanPort, D: DelayNs> {
    can: C,
    delay: D,
    policy: RepeatPolicy,
    trace_enabled: bool,
    trace: &'a TraceSignal,
}

impl<'a, C: CanPort, D: DelayNs> CommandDispatcher<'a, C, D> {
    pub fn new(can: C, delay: D, policy: RepeatPolicy, trace: &'a TraceSignal) -> Self {
        Self {
            can,
            delay,
            policy,
            trace_enabled: false,
            trace,
        }
    }

    pub fn trace_enabled(&self) -> bool {
        self.trace_enabled
    }

    /// Act on one control event.  Blocks for the length of a burst.
    pub fn handle(&mut self, event: &TelemetryEvent) -> Dispatch {
        if matches!(event, TelemetryEvent::ToggleTrace) {
            self.trace_enabled = !self.trace_enabled;
            self.trace.signal(self.trace_enabled);
            info!(
                "frame trace {}",
                if self.trace_enabled { "on" } else { "off" }
            );
            return Dispatch::TraceToggled(self.trace_enabled);
        }

        let Some(payload) = command_payload(event) else {
            debug!("no command frame for {event:?}");
            return Dispatch::Ignored;
        };
        info!("sending {event:?}");
        self.burst(&payload)
    }

    fn burst(&mut self, payload: &[u8; 4]) -> Dispatch {
        let mut sent = 0u8;
        let mut failed = 0u8;

        // Both identifiers are constants below 0x7FF.
        let (Some(wake), Some(command)) = (
            RawFrame::standard(WAKE_ID, &WAKE_PAYLOAD),
            RawFrame::standard(COMMAND_ID, payload),
        ) else {
            return Dispatch::Burst { sent, failed };
        };

        if let Err(e) = self.can.transmit(&wake) {
            warn!("wake frame: {e}");
            failed += 1;
        } else {
            sent += 1;
        }

        for _ in 0..self.policy.count {
            match self.can.transmit(&command) {
                Ok(()) => sent = sent.saturating_add(1),
                Err(e) => {
                    warn!("command frame: {e}");
                    failed = failed.saturating_add(1);
                }
            }
            self.delay.delay_ms(self.policy.interval_ms);
        }

        if failed > 0 {
            warn!("burst finished with {failed} failed transmissions");
        }
        Dispatch::Burst { sent, failed }
    }
}

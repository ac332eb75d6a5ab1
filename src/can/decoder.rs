//! Frame decoder and derived vehicle state.
//!
//! [`FrameDecoder::decode`] turns one raw frame into zero or more
//! [`TelemetryEvent`]s using the configured [`DecodeTable`].  It never
//! fails: unknown identifiers, short payloads and implausible values
//! produce nothing.
//!
//! Car on/off is not on the bus.  It is inferred from the motor speed
//! frame, which the vehicle only broadcasts while it is powered: the
//! [`VehicleStateTracker`] reports `On` while a speed sample is fresh.

use log::trace;

use super::RawFrame;
use super::signals::{Ceiling, DecodeTable, Freshness, SignalRule};
use crate::config::SystemConfig;
use crate::events::{CarStatus, TelemetryEvent};

/// Upper bound on events produced by one frame.
pub const MAX_EVENTS_PER_FRAME: usize = 4;

pub type DecodedEvents = heapless::Vec<TelemetryEvent, MAX_EVENTS_PER_FRAME>;

// ── Vehicle state ─────────────────────────────────────────────

/// Infers car on/off from the arrival time of motor speed frames.
#[derive(Debug, Clone)]
pub struct VehicleStateTracker {
    interval_ms: u64,
    staleness_ms: u64,
    last_speed_ms: Option<u64>,
    last_eval_ms: Option<u64>,
}

impl VehicleStateTracker {
    pub fn new(interval_ms: u32, staleness_ms: u32) -> Self {
        Self {
            interval_ms: u64::from(interval_ms),
            staleness_ms: u64::from(staleness_ms),
            last_speed_ms: None,
            last_eval_ms: None,
        }
    }

    /// Record a speed sample decoded at `now_ms`.
    pub fn note_speed(&mut self, now_ms: u64) {
        self.last_speed_ms = Some(now_ms);
    }

    /// Car state as of `now_ms`, without affecting the evaluation cadence.
    pub fn state_at(&self, now_ms: u64) -> CarStatus {
        match self.last_speed_ms {
            Some(t) if now_ms.saturating_sub(t) < self.staleness_ms => CarStatus::On,
            _ => CarStatus::Off,
        }
    }

    /// Emit a `CarStatus` event if an evaluation is due.
    ///
    /// The first call always evaluates; later calls evaluate once per
    /// interval.  The state is reported on every evaluation, changed or not.
    pub fn poll(&mut self, now_ms: u64) -> Option<TelemetryEvent> {
        let due = self
            .last_eval_ms
            .is_none_or(|t| now_ms.saturating_sub(t) >= self.interval_ms);
        if !due {
            return None;
        }
        self.last_eval_ms = Some(now_ms);
        Some(TelemetryEvent::CarStatus(self.state_at(now_ms)))
    }
}

// ── Decoder ───────────────────────────────────────────────────

pub struct FrameDecoder {
    table: &'static DecodeTable,
    energy_ceiling_kwh: f32,
    tracker: VehicleStateTracker,
}

impl FrameDecoder {
    pub fn new(config: &SystemConfig) -> Self {
        Self::with_table(
            config.table_revision.table(),
            config.energy_ceiling_kwh,
            VehicleStateTracker::new(config.car_state_interval_ms, config.car_staleness_ms),
        )
    }

    pub fn with_table(
        table: &'static DecodeTable,
        energy_ceiling_kwh: f32,
        tracker: VehicleStateTracker,
    ) -> Self {
        Self {
            table,
            energy_ceiling_kwh,
            tracker,
        }
    }

    pub fn table(&self) -> &'static DecodeTable {
        self.table
    }

    /// Decode one frame received at `now_ms`.
    pub fn decode(&mut self, frame: &RawFrame, now_ms: u64) -> DecodedEvents {
        let mut out = DecodedEvents::new();
        let Some(rule) = self.table.lookup(frame.identifier()) else {
            return out;
        };
        let data = frame.payload();

        for signal in rule.signals {
            let event = match *signal {
                SignalRule::Scalar {
                    spec,
                    emit,
                    ceiling,
                    freshness,
                } => {
                    let Some(value) = spec.read(data) else { continue };
                    if !self.plausible(value, ceiling) {
                        trace!(
                            "{:#05x}: dropped implausible value {value}",
                            frame.identifier()
                        );
                        continue;
                    }
                    if freshness == Freshness::Speed {
                        self.tracker.note_speed(now_ms);
                    }
                    emit(value)
                }
                SignalRule::Power { current, voltage } => {
                    let (Some(amps), Some(volts)) = (current.read(data), voltage.read(data)) else {
                        continue;
                    };
                    TelemetryEvent::BatteryPowerKw(amps * volts * 1e-3)
                }
                SignalRule::Flag {
                    byte,
                    mask,
                    set,
                    clear,
                } => {
                    let Some(&b) = data.get(usize::from(byte)) else { continue };
                    if b & mask == 0 { clear } else { set }
                }
                SignalRule::Lookup { byte, map } => {
                    let Some(&b) = data.get(usize::from(byte)) else { continue };
                    let Some(&(_, event)) = map.iter().find(|(v, _)| *v == b) else {
                        continue;
                    };
                    event
                }
            };
            // Capacity exceeds the longest rule list in either table.
            let _ = out.push(event);
        }
        out
    }

    /// Periodic car on/off evaluation; call on every reception cycle.
    pub fn poll_vehicle_state(&mut self, now_ms: u64) -> Option<TelemetryEvent> {
        self.tracker.poll(now_ms)
    }

    fn plausible(&self, value: f32, ceiling: Ceiling) -> bool {
        match ceiling {
            Ceiling::Unbounded => true,
            Ceiling::BatteryEnergy => value < self.energy_ceiling_kwh,
        }
    }
}

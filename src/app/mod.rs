//! Application core: consumer models over the event bus, zero I/O.
//!
//! Each consumer (display, trip logger, cellular uplink) owns its own
//! state and smoothing, reads its queue without blocking, and talks to
//! hardware only through the [`ports`] traits.

pub mod display;
pub mod logger;
pub mod ports;
pub mod uplink;

use crate::bus::{ConsumerId, EventBus};
use crate::events::TelemetryEvent;

/// A task-owned event consumer.
pub trait Consumer {
    /// Queue this consumer reads.
    const ID: ConsumerId;

    /// Fold one routed event into local state.
    fn on_event(&mut self, event: &TelemetryEvent);

    /// Periodic work (redraw, write a row, publish).  May publish back
    /// onto the bus.
    fn on_tick(&mut self, now_ms: u64, bus: &EventBus);
}

/// Drain everything queued for `consumer`, then tick it once.
/// Returns the number of events consumed.
pub fn service<C: Consumer>(consumer: &mut C, bus: &EventBus, now_ms: u64) -> usize {
    let mut n = 0;
    while let Some(event) = bus.try_next(C::ID) {
        consumer.on_event(&event);
        n += 1;
    }
    consumer.on_tick(now_ms, bus);
    n
}

//! Task bodies.
//!
//! Each `run_*` function is the whole life of one firmware task and never
//! returns.  The single-iteration helpers are what the tests drive.
//!
//! | Task       | Blocks on                         |
//! |------------|-----------------------------------|
//! | reception  | CAN receive timeout (2 ms)        |
//! | router     | ingress queue                     |
//! | dispatcher | commands queue, then the burst    |
//! | consumers  | own poll interval                 |

use std::io;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use futures_lite::future::block_on;
use log::{info, warn};

use crate::app::ports::{CanPort, ClockPort};
use crate::app::{self, Consumer};
use crate::bus::router::Router;
use crate::bus::{ConsumerId, EventBus};
use crate::can::command::CommandDispatcher;
use crate::can::decoder::FrameDecoder;
use crate::diagnostics::FrameTrace;

// ── Reception ─────────────────────────────────────────────────

/// Pause after a failed receive so a bus-off controller does not spin the
/// reception task.
pub const RECEIVE_ERROR_BACKOFF_MS: u32 = 100;

/// One reception cycle: apply any trace toggle, receive at most one frame,
/// decode and publish it, then run the car state evaluation.
///
/// Returns the number of events published.
pub fn reception_step<C, K, D, W>(
    can: &C,
    decoder: &mut FrameDecoder,
    bus: &EventBus,
    clock: &K,
    delay: &mut D,
    trace: &mut FrameTrace,
    trace_out: &mut W,
) -> usize
where
    C: CanPort + ?Sized,
    K: ClockPort + ?Sized,
    D: DelayNs,
    W: io::Write,
{
    if let Some(enabled) = bus.trace_signal().try_take() {
        trace.set_enabled(enabled);
    }

    let mut published = 0;
    match can.receive() {
        Ok(Some(frame)) => {
            if let Err(e) = trace.emit(&frame, trace_out) {
                warn!("frame trace: {e}");
            }
            for event in decoder.decode(&frame, clock.now_ms()) {
                if bus.publish(event) {
                    published += 1;
                }
            }
        }
        Ok(None) => {}
        Err(e) => {
            warn!("{e}");
            delay.delay_ms(RECEIVE_ERROR_BACKOFF_MS);
        }
    }

    if let Some(event) = decoder.poll_vehicle_state(clock.now_ms()) {
        if bus.publish(event) {
            published += 1;
        }
    }
    published
}

pub fn run_reception<C: CanPort, K: ClockPort, D: DelayNs>(
    can: &C,
    mut decoder: FrameDecoder,
    bus: &EventBus,
    clock: &K,
    mut delay: D,
) -> ! {
    info!(
        "reception started ({:?} table)",
        decoder.table().revision
    );
    let mut trace = FrameTrace::new();
    let mut out = io::stdout();
    loop {
        reception_step(
            can,
            &mut decoder,
            bus,
            clock,
            &mut delay,
            &mut trace,
            &mut out,
        );
    }
}

// ── Router ────────────────────────────────────────────────────

pub fn run_router(mut router: Router<'_>) -> ! {
    match block_on(router.run()) {}
}

// ── Command dispatcher ────────────────────────────────────────

/// Handle every queued control request without waiting.  Returns the count.
pub fn dispatch_pending<C: CanPort, D: DelayNs>(
    dispatcher: &mut CommandDispatcher<'_, C, D>,
    bus: &EventBus,
) -> usize {
    let mut n = 0;
    while let Some(event) = bus.try_next(ConsumerId::Commands) {
        dispatcher.handle(&event);
        n += 1;
    }
    n
}

pub fn run_dispatcher<C: CanPort, D: DelayNs>(
    mut dispatcher: CommandDispatcher<'_, C, D>,
    bus: &EventBus,
) -> ! {
    info!("command dispatcher started");
    let queue = bus.queue(ConsumerId::Commands);
    loop {
        let event = block_on(queue.receive());
        dispatcher.handle(&event);
    }
}

// ── Consumers ─────────────────────────────────────────────────

pub fn run_consumer<C: Consumer, K: ClockPort>(
    mut consumer: C,
    bus: &EventBus,
    clock: &K,
    poll: Duration,
) -> ! {
    info!("{} consumer started", C::ID.name());
    loop {
        app::service(&mut consumer, bus, clock.now_ms());
        std::thread::sleep(poll);
    }
}

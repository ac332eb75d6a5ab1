//! Event bus: bounded queues between the reception task, the router and
//! the consumer tasks.
//!
//! ```text
//!  ┌───────────┐ publish ┌─────────┐ route ┌──────────┐
//!  │ reception │────────▶│ ingress │──────▶│ display  │
//!  │ consumers │         │  (50)   │       │ logger   │ (10 each)
//!  └───────────┘         └─────────┘       │ uplink   │
//!                                          │ commands │
//!                                          └──────────┘
//! ```
//!
//! Every queue is an `embassy-sync` bounded channel.  Producers never
//! block: a full queue drops the event and is counted.  The bus is a plain
//! value with a `const` constructor so firmware can place it in a `static`
//! while tests build their own.

pub mod router;
pub mod subscriptions;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use log::debug;

use crate::events::TelemetryEvent;

/// Depth of the shared ingress queue.
pub const INGRESS_DEPTH: usize = 50;
/// Depth of each per-consumer queue.
pub const CONSUMER_DEPTH: usize = 10;

pub type IngressQueue = Channel<CriticalSectionRawMutex, TelemetryEvent, INGRESS_DEPTH>;
pub type ConsumerQueue = Channel<CriticalSectionRawMutex, TelemetryEvent, CONSUMER_DEPTH>;

/// Latest requested frame-trace setting, from the command dispatcher to
/// the reception task.
pub type TraceSignal = Signal<CriticalSectionRawMutex, bool>;

/// Destination of routed events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConsumerId {
    Display,
    Logger,
    Uplink,
    /// The command dispatcher.
    Commands,
}

impl ConsumerId {
    pub const ALL: [ConsumerId; 4] = [
        ConsumerId::Display,
        ConsumerId::Logger,
        ConsumerId::Uplink,
        ConsumerId::Commands,
    ];

    pub const COUNT: usize = Self::ALL.len();

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Display => "display",
            Self::Logger => "logger",
            Self::Uplink => "uplink",
            Self::Commands => "commands",
        }
    }
}

pub struct EventBus {
    ingress: IngressQueue,
    display: ConsumerQueue,
    logger: ConsumerQueue,
    uplink: ConsumerQueue,
    commands: ConsumerQueue,
    trace: TraceSignal,
}

impl EventBus {
    pub const fn new() -> Self {
        Self {
            ingress: Channel::new(),
            display: Channel::new(),
            logger: Channel::new(),
            uplink: Channel::new(),
            commands: Channel::new(),
            trace: Signal::new(),
        }
    }

    /// Offer an event to the router.  Returns `false` (and drops the event)
    /// if the ingress queue is full.
    pub fn publish(&self, event: TelemetryEvent) -> bool {
        match self.ingress.try_send(event) {
            Ok(()) => true,
            Err(_) => {
                debug!("ingress full, dropped {:?}", event.kind());
                false
            }
        }
    }

    pub fn ingress(&self) -> &IngressQueue {
        &self.ingress
    }

    pub fn queue(&self, consumer: ConsumerId) -> &ConsumerQueue {
        match consumer {
            ConsumerId::Display => &self.display,
            ConsumerId::Logger => &self.logger,
            ConsumerId::Uplink => &self.uplink,
            ConsumerId::Commands => &self.commands,
        }
    }

    /// Next queued event for `consumer`, without waiting.
    pub fn try_next(&self, consumer: ConsumerId) -> Option<TelemetryEvent> {
        self.queue(consumer).try_receive().ok()
    }

    pub fn trace_signal(&self) -> &TraceSignal {
        &self.trace
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

//! Ingress → consumer fan-out.
//!
//! The router drains the ingress queue and copies each event into the
//! queue of every subscriber.  A full consumer queue loses that copy only;
//! the other subscribers still get theirs and the router never waits.

use core::convert::Infallible;

use log::{debug, info};

use super::subscriptions::{ConsumerSet, SubscriptionTable};
use super::{ConsumerId, EventBus};
use crate::diagnostics;
use crate::events::TelemetryEvent;

/// Delivery counters are logged after this many routed events.
const STATS_EVERY: u32 = 10_000;

/// Delivery counters, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterStats {
    /// Events taken off the ingress queue.
    pub routed: u32,
    /// Events whose kind has no subscriber.
    pub unsubscribed: u32,
    /// Copies lost to a full consumer queue, per [`ConsumerId::index`].
    pub dropped: [u32; ConsumerId::COUNT],
}

pub struct Router<'a> {
    bus: &'a EventBus,
    table: SubscriptionTable,
    stats: RouterStats,
}

impl<'a> Router<'a> {
    pub fn new(bus: &'a EventBus, table: SubscriptionTable) -> Self {
        Self {
            bus,
            table,
            stats: RouterStats::default(),
        }
    }

    pub fn stats(&self) -> &RouterStats {
        &self.stats
    }

    /// Deliver one event.  Returns the consumers that actually received it.
    pub fn route(&mut self, event: TelemetryEvent) -> ConsumerSet {
        self.stats.routed = self.stats.routed.wrapping_add(1);

        let subscribers = self.table.subscribers(event.kind());
        if subscribers.is_empty() {
            self.stats.unsubscribed = self.stats.unsubscribed.wrapping_add(1);
            return ConsumerSet::EMPTY;
        }

        let mut delivered = ConsumerSet::EMPTY;
        for consumer in subscribers.iter() {
            if self.bus.queue(consumer).try_send(event).is_ok() {
                delivered = delivered.with(consumer);
            } else {
                let n = &mut self.stats.dropped[consumer.index()];
                *n = n.wrapping_add(1);
                debug!("{} queue full, dropped {:?}", consumer.name(), event.kind());
            }
        }
        delivered
    }

    /// Route everything currently queued on ingress.  Returns the count.
    pub fn route_pending(&mut self) -> usize {
        let mut n = 0;
        while let Ok(event) = self.bus.ingress().try_receive() {
            self.route(event);
            n += 1;
        }
        n
    }

    /// Route forever, waiting on the ingress queue.
    pub async fn run(&mut self) -> Infallible {
        info!("router started");
        loop {
            let event = self.bus.ingress().receive().await;
            self.route(event);
            if self.stats.routed % STATS_EVERY == 0 {
                diagnostics::log_router_stats(&self.stats);
            }
        }
    }
}

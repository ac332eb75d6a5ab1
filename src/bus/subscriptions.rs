//! Which consumer receives which event kind.
//!
//! The table is an array indexed by [`EventKind`], filled from an
//! exhaustive `match`: adding a kind without deciding its subscribers does
//! not compile.

use super::ConsumerId;
use crate::error::ConfigError;
use crate::events::EventKind;

/// Small set of [`ConsumerId`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConsumerSet(u8);

impl ConsumerSet {
    pub const EMPTY: Self = Self(0);

    pub const fn with(self, consumer: ConsumerId) -> Self {
        Self(self.0 | 1 << consumer as u8)
    }

    pub const fn contains(self, consumer: ConsumerId) -> bool {
        self.0 & (1 << consumer as u8) != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = ConsumerId> {
        ConsumerId::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl FromIterator<ConsumerId> for ConsumerSet {
    fn from_iter<I: IntoIterator<Item = ConsumerId>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::with)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionTable {
    routes: [ConsumerSet; EventKind::COUNT],
}

impl SubscriptionTable {
    pub const fn empty() -> Self {
        Self {
            routes: [ConsumerSet::EMPTY; EventKind::COUNT],
        }
    }

    /// The device wiring: screen, trip log, cellular uplink, command
    /// dispatcher.
    pub const fn standard() -> Self {
        let mut table = Self::empty();
        let mut i = 0;
        while i < EventKind::COUNT {
            let kind = EventKind::ALL[i];
            table.routes[kind.index()] = standard_route(kind);
            i += 1;
        }
        table
    }

    /// Replace the subscribers of one kind.
    pub const fn route(mut self, kind: EventKind, consumers: ConsumerSet) -> Self {
        self.routes[kind.index()] = consumers;
        self
    }

    pub const fn subscribers(&self, kind: EventKind) -> ConsumerSet {
        self.routes[kind.index()]
    }

    /// Control requests must reach the command dispatcher and nothing
    /// else, and the dispatcher must see nothing but control requests.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for kind in EventKind::ALL {
            let subs = self.subscribers(kind);
            if kind.is_command() {
                if subs != ConsumerSet::EMPTY.with(ConsumerId::Commands) {
                    return Err(ConfigError::ValidationFailed(
                        "control requests must route to the command dispatcher only",
                    ));
                }
            } else if subs.contains(ConsumerId::Commands) {
                return Err(ConfigError::ValidationFailed(
                    "command dispatcher subscribed to a non-control kind",
                ));
            }
        }
        Ok(())
    }
}

impl Default for SubscriptionTable {
    fn default() -> Self {
        Self::standard()
    }
}

const fn standard_route(kind: EventKind) -> ConsumerSet {
    use ConsumerId::{Commands, Display, Logger, Uplink};
    let none = ConsumerSet::EMPTY;

    match kind {
        EventKind::BatteryPowerKw | EventKind::BatteryEnergyKwh => {
            none.with(Display).with(Logger).with(Uplink)
        }
        EventKind::SpeedKmh => none.with(Display).with(Logger),
        EventKind::CarStatus => none.with(Logger).with(Uplink),
        EventKind::ChargerMaxAmps | EventKind::AcStatus | EventKind::ChargerStatus => {
            none.with(Uplink)
        }

        // Produced by the uplink task itself; it keeps its own copy.
        EventKind::GnssLatitude
        | EventKind::GnssLongitude
        | EventKind::GnssAltitude
        | EventKind::GnssSpeed
        | EventKind::NetworkLatitude
        | EventKind::NetworkLongitude => none.with(Logger),

        EventKind::NetworkStatus | EventKind::LoggerStatus => none.with(Display),

        // Published for completeness; no consumer shows them yet.
        EventKind::GsmYear
        | EventKind::GsmMonth
        | EventKind::GsmDay
        | EventKind::GsmHours
        | EventKind::GsmMinutes
        | EventKind::GsmSeconds
        | EventKind::Pressure
        | EventKind::PcbTemperature
        | EventKind::PressureAltitude => none,

        EventKind::AcRequest
        | EventKind::ChargeRequest
        | EventKind::DoorRequest
        | EventKind::ToggleTrace => none.with(Commands),
    }
}

//! Typed telemetry vocabulary shared by every task.
//!
//! A [`TelemetryEvent`] is a tagged value: the variant is the
//! [`EventKind`] and its field is the one payload type valid for that
//! kind.  Constructing an event *is* calling its variant, so a float
//! can never be paired with a status kind.
//!
//! Discrete machine states are split into one enum per family
//! ([`AcStatus`], [`ChargerStatus`], ...).  Comparing an AC state with a
//! charger state is a type error, not a silent integer match.

use serde::{Deserialize, Serialize};

// ── Status families ───────────────────────────────────────────

/// Climate control state, or a request to change it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcStatus {
    On,
    Off,
    StartRequested,
    StopRequested,
}

/// On-board charger state, or a request to start charging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargerStatus {
    Idle,
    /// Plugged in, waiting for the charge timer.
    PluggedInWaiting,
    Charging,
    QuickCharging,
    Finished,
    StartRequested,
}

/// Derived vehicle power state (see [`crate::can::decoder::VehicleStateTracker`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CarStatus {
    On,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkStatus {
    Disconnected,
    Connected,
    /// Cellular link up and the publish/subscribe session established.
    ConnectedUplink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoggerStatus {
    WriteStarted,
    WriteEnded,
}

/// Door lock request.  Best effort: the EV bus may not carry it to the
/// body controller on every vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoorRequest {
    Lock,
    Unlock,
}

impl AcStatus {
    /// Stable lowercase name used on the uplink.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
            Self::StartRequested => "start_requested",
            Self::StopRequested => "stop_requested",
        }
    }
}

impl ChargerStatus {
    /// Stable lowercase name used on the uplink.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::PluggedInWaiting => "plugged_in_waiting",
            Self::Charging => "charging",
            Self::QuickCharging => "quick_charging",
            Self::Finished => "finished",
            Self::StartRequested => "start_requested",
        }
    }
}

impl CarStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }
}

/// Family-tagged status value, as seen through [`TelemetryEvent::payload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ac(AcStatus),
    Charger(ChargerStatus),
    Car(CarStatus),
    Network(NetworkStatus),
    Logger(LoggerStatus),
    Door(DoorRequest),
}

/// Untagged view of an event's value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Payload {
    Float(f32),
    Integer(i32),
    Status(Status),
    /// Signal-only kinds carry nothing.
    None,
}

// ── Events ────────────────────────────────────────────────────

/// One decoded or produced telemetry value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TelemetryEvent {
    // ── Vehicle (decoded from the EV bus) ─────────────────────
    /// Battery power in kW; positive while charging.
    BatteryPowerKw(f32),
    /// Usable battery energy in kWh.
    BatteryEnergyKwh(f32),
    SpeedKmh(f32),
    /// Charger input current ceiling in A.
    ChargerMaxAmps(f32),
    AcStatus(AcStatus),
    ChargerStatus(ChargerStatus),
    CarStatus(CarStatus),

    // ── Positioning (modem GNSS and cell network) ─────────────
    GnssLatitude(f32),
    GnssLongitude(f32),
    /// Metres above sea level.
    GnssAltitude(f32),
    /// km/h over ground.
    GnssSpeed(f32),
    NetworkLatitude(f32),
    NetworkLongitude(f32),
    /// Two-digit year from the cellular network clock.
    GsmYear(i32),
    GsmMonth(i32),
    GsmDay(i32),
    GsmHours(i32),
    GsmMinutes(i32),
    GsmSeconds(i32),

    // ── Environment (barometric sensor on the PCB) ────────────
    /// Pascals.
    Pressure(f32),
    PcbTemperature(f32),
    PressureAltitude(f32),

    // ── Device ────────────────────────────────────────────────
    NetworkStatus(NetworkStatus),
    LoggerStatus(LoggerStatus),

    // ── Control requests (command dispatcher only) ────────────
    AcRequest(AcStatus),
    ChargeRequest(ChargerStatus),
    DoorRequest(DoorRequest),
    /// Flip the raw frame trace on the serial console.
    ToggleTrace,
}

/// Discriminant of a [`TelemetryEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventKind {
    BatteryPowerKw,
    BatteryEnergyKwh,
    SpeedKmh,
    ChargerMaxAmps,
    AcStatus,
    ChargerStatus,
    CarStatus,
    GnssLatitude,
    GnssLongitude,
    GnssAltitude,
    GnssSpeed,
    NetworkLatitude,
    NetworkLongitude,
    GsmYear,
    GsmMonth,
    GsmDay,
    GsmHours,
    GsmMinutes,
    GsmSeconds,
    Pressure,
    PcbTemperature,
    PressureAltitude,
    NetworkStatus,
    LoggerStatus,
    AcRequest,
    ChargeRequest,
    DoorRequest,
    ToggleTrace,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [EventKind; 28] = [
        Self::BatteryPowerKw,
        Self::BatteryEnergyKwh,
        Self::SpeedKmh,
        Self::ChargerMaxAmps,
        Self::AcStatus,
        Self::ChargerStatus,
        Self::CarStatus,
        Self::GnssLatitude,
        Self::GnssLongitude,
        Self::GnssAltitude,
        Self::GnssSpeed,
        Self::NetworkLatitude,
        Self::NetworkLongitude,
        Self::GsmYear,
        Self::GsmMonth,
        Self::GsmDay,
        Self::GsmHours,
        Self::GsmMinutes,
        Self::GsmSeconds,
        Self::Pressure,
        Self::PcbTemperature,
        Self::PressureAltitude,
        Self::NetworkStatus,
        Self::LoggerStatus,
        Self::AcRequest,
        Self::ChargeRequest,
        Self::DoorRequest,
        Self::ToggleTrace,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// Dense index for table lookups.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Kinds that ask the vehicle (or the device) to do something.
    pub const fn is_command(self) -> bool {
        matches!(
            self,
            Self::AcRequest | Self::ChargeRequest | Self::DoorRequest | Self::ToggleTrace
        )
    }
}

impl TelemetryEvent {
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::BatteryPowerKw(_) => EventKind::BatteryPowerKw,
            Self::BatteryEnergyKwh(_) => EventKind::BatteryEnergyKwh,
            Self::SpeedKmh(_) => EventKind::SpeedKmh,
            Self::ChargerMaxAmps(_) => EventKind::ChargerMaxAmps,
            Self::AcStatus(_) => EventKind::AcStatus,
            Self::ChargerStatus(_) => EventKind::ChargerStatus,
            Self::CarStatus(_) => EventKind::CarStatus,
            Self::GnssLatitude(_) => EventKind::GnssLatitude,
            Self::GnssLongitude(_) => EventKind::GnssLongitude,
            Self::GnssAltitude(_) => EventKind::GnssAltitude,
            Self::GnssSpeed(_) => EventKind::GnssSpeed,
            Self::NetworkLatitude(_) => EventKind::NetworkLatitude,
            Self::NetworkLongitude(_) => EventKind::NetworkLongitude,
            Self::GsmYear(_) => EventKind::GsmYear,
            Self::GsmMonth(_) => EventKind::GsmMonth,
            Self::GsmDay(_) => EventKind::GsmDay,
            Self::GsmHours(_) => EventKind::GsmHours,
            Self::GsmMinutes(_) => EventKind::GsmMinutes,
            Self::GsmSeconds(_) => EventKind::GsmSeconds,
            Self::Pressure(_) => EventKind::Pressure,
            Self::PcbTemperature(_) => EventKind::PcbTemperature,
            Self::PressureAltitude(_) => EventKind::PressureAltitude,
            Self::NetworkStatus(_) => EventKind::NetworkStatus,
            Self::LoggerStatus(_) => EventKind::LoggerStatus,
            Self::AcRequest(_) => EventKind::AcRequest,
            Self::ChargeRequest(_) => EventKind::ChargeRequest,
            Self::DoorRequest(_) => EventKind::DoorRequest,
            Self::ToggleTrace => EventKind::ToggleTrace,
        }
    }

    pub fn payload(&self) -> Payload {
        match *self {
            Self::BatteryPowerKw(v)
            | Self::BatteryEnergyKwh(v)
            | Self::SpeedKmh(v)
            | Self::ChargerMaxAmps(v)
            | Self::GnssLatitude(v)
            | Self::GnssLongitude(v)
            | Self::GnssAltitude(v)
            | Self::GnssSpeed(v)
            | Self::NetworkLatitude(v)
            | Self::NetworkLongitude(v)
            | Self::Pressure(v)
            | Self::PcbTemperature(v)
            | Self::PressureAltitude(v) => Payload::Float(v),

            Self::GsmYear(v)
            | Self::GsmMonth(v)
            | Self::GsmDay(v)
            | Self::GsmHours(v)
            | Self::GsmMinutes(v)
            | Self::GsmSeconds(v) => Payload::Integer(v),

            Self::AcStatus(s) | Self::AcRequest(s) => Payload::Status(Status::Ac(s)),
            Self::ChargerStatus(s) | Self::ChargeRequest(s) => {
                Payload::Status(Status::Charger(s))
            }
            Self::CarStatus(s) => Payload::Status(Status::Car(s)),
            Self::NetworkStatus(s) => Payload::Status(Status::Network(s)),
            Self::LoggerStatus(s) => Payload::Status(Status::Logger(s)),
            Self::DoorRequest(r) => Payload::Status(Status::Door(r)),
            Self::ToggleTrace => Payload::None,
        }
    }
}

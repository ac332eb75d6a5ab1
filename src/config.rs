//! System configuration parameters
//!
//! All tunable parameters for the LeafMon box.  Defaults are the values
//! the device ships with; the decode-table revision is the one setting
//! that must match the vehicle it is installed in.

use serde::{Deserialize, Serialize};

use crate::can::signals::TableRevision;
use crate::error::ConfigError;

/// How an outbound command frame is repeated on a bus with no
/// application-level acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatPolicy {
    /// Transmissions of the command frame per request.
    pub count: u8,
    /// Pause between consecutive transmissions (milliseconds).
    pub interval_ms: u32,
}

impl Default for RepeatPolicy {
    fn default() -> Self {
        Self {
            count: 30,
            interval_ms: 5,
        }
    }
}

/// Per-consumer exponential smoothing factors (0.0 = raw, 1.0 = frozen).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SmoothingConfig {
    pub display: f32,
    pub logger: f32,
    pub uplink: f32,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            display: 0.9,
            logger: 0.95,
            uplink: 0.99,
        }
    }
}

/// Uplink publish cadence, chosen by vehicle state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UplinkIntervals {
    pub quick_charging_ms: u32,
    pub charging_ms: u32,
    pub car_on_ms: u32,
    pub idle_ms: u32,
}

impl Default for UplinkIntervals {
    fn default() -> Self {
        Self {
            quick_charging_ms: 10_000,   // 10 s
            charging_ms: 10 * 60_000,    // 10 min
            car_on_ms: 60_000,           // 1 min
            idle_ms: 60 * 60_000,        // 1 h
        }
    }
}

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Decoding ---
    /// Which decode table matches the vehicle's hardware generation.
    pub table_revision: TableRevision,
    /// Battery energy at or above this (kWh) is treated as a power-on glitch.
    pub energy_ceiling_kwh: f32,

    // --- Vehicle state ---
    /// Re-evaluation cadence of the car on/off state (milliseconds).
    pub car_state_interval_ms: u32,
    /// Car counts as on if a speed frame arrived within this window (milliseconds).
    pub car_staleness_ms: u32,

    // --- CAN ---
    /// Receive timeout per poll of the CAN driver (milliseconds).
    pub can_receive_timeout_ms: u32,
    /// Timeout for queueing one outbound frame (milliseconds).
    pub can_transmit_timeout_ms: u32,
    pub command_repeat: RepeatPolicy,

    // --- Consumers ---
    pub smoothing: SmoothingConfig,
    /// Display redraw interval (milliseconds).
    pub display_refresh_ms: u32,
    /// Interval between logged rows (milliseconds).
    pub logger_interval_ms: u32,
    pub uplink_intervals: UplinkIntervals,
    /// Topic prefix for every uplink publish.
    pub uplink_topic_prefix: heapless::String<32>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        let mut prefix = heapless::String::new();
        let _ = prefix.push_str("leafmon/");

        Self {
            // Decoding
            table_revision: TableRevision::Current,
            energy_ceiling_kwh: 81.0, // 1023 gids reads as 81.84 right after power-on

            // Vehicle state
            car_state_interval_ms: 200,
            car_staleness_ms: 100, // motor rpm is broadcast at 100 Hz while on

            // CAN
            can_receive_timeout_ms: 2,
            can_transmit_timeout_ms: 100,
            command_repeat: RepeatPolicy::default(),

            // Consumers
            smoothing: SmoothingConfig::default(),
            display_refresh_ms: 40, // 25 fps
            logger_interval_ms: 1000,
            uplink_intervals: UplinkIntervals::default(),
            uplink_topic_prefix: prefix,
        }
    }
}

impl SystemConfig {
    /// Range-check every field.  Invalid values are rejected, not clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let alphas = [
            self.smoothing.display,
            self.smoothing.logger,
            self.smoothing.uplink,
        ];
        if alphas.iter().any(|a| !(0.0..=1.0).contains(a)) {
            return Err(ConfigError::ValidationFailed(
                "smoothing factor must be within 0.0..=1.0",
            ));
        }
        if !(self.energy_ceiling_kwh > 0.0) {
            return Err(ConfigError::ValidationFailed(
                "energy ceiling must be positive",
            ));
        }
        if self.car_state_interval_ms == 0 || self.car_staleness_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "car state cadence and staleness must be non-zero",
            ));
        }
        if self.command_repeat.count == 0 {
            return Err(ConfigError::ValidationFailed(
                "command repeat count must be at least 1",
            ));
        }
        if self.display_refresh_ms == 0 || self.logger_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "consumer cadence must be non-zero",
            ));
        }
        Ok(())
    }
}

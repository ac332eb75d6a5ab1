//! Signal decode tables.
//!
//! Each monitored frame identifier maps to a list of [`SignalRule`]s.
//! Two table revisions exist because early vehicles report the charger on
//! a different frame and flag climate control on a different bit; the
//! revision is picked once from [`SystemConfig`](crate::config::SystemConfig)
//! and never mixed at runtime.

use serde::{Deserialize, Serialize};

use super::bits;
use crate::events::{AcStatus, ChargerStatus, TelemetryEvent};

// ── Signal specification ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Unsigned,
    TwosComplement,
}

/// Location and scaling of one numeric field inside a payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalSpec {
    pub byte_offset: u8,
    /// MSB-first bit position relative to `byte_offset`.
    pub bit_offset: u8,
    pub bit_width: u8,
    pub encoding: Encoding,
    pub scale: f32,
    pub bias: f32,
}

impl SignalSpec {
    pub const fn unsigned(byte_offset: u8, bit_offset: u8, bit_width: u8, scale: f32) -> Self {
        Self {
            byte_offset,
            bit_offset,
            bit_width,
            encoding: Encoding::Unsigned,
            scale,
            bias: 0.0,
        }
    }

    pub const fn signed(byte_offset: u8, bit_offset: u8, bit_width: u8, scale: f32) -> Self {
        Self {
            encoding: Encoding::TwosComplement,
            ..Self::unsigned(byte_offset, bit_offset, bit_width, scale)
        }
    }

    /// First bit past the field, counted from the start of the payload.
    const fn end_bit(&self) -> usize {
        self.byte_offset as usize * 8 + self.bit_offset as usize + self.bit_width as usize
    }

    /// Decode the field to engineering units.  `None` if the payload is too
    /// short to contain it.
    pub fn read(&self, data: &[u8]) -> Option<f32> {
        if self.end_bit() > data.len() * 8 {
            return None;
        }
        let start = self.byte_offset as usize * 8 + self.bit_offset as usize;
        let raw = bits::extract(data, start, u32::from(self.bit_width));
        let value = match self.encoding {
            Encoding::Unsigned => raw as f32,
            Encoding::TwosComplement => bits::to_signed(raw, u32::from(self.bit_width)) as f32,
        };
        Some(value * self.scale + self.bias)
    }
}

// ── Rules ─────────────────────────────────────────────────────

/// Plausibility bound applied to a scalar before it is emitted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ceiling {
    Unbounded,
    /// Values at or above the configured battery energy ceiling are dropped.
    BatteryEnergy,
}

/// Marks a scalar rule whose emission counts as a fresh motor speed sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    None,
    Speed,
}

#[derive(Debug, Clone, Copy)]
pub enum SignalRule {
    /// One scaled field, wrapped into an event by `emit`.
    Scalar {
        spec: SignalSpec,
        emit: fn(f32) -> TelemetryEvent,
        ceiling: Ceiling,
        freshness: Freshness,
    },
    /// Battery power in kW from pack current (A) and voltage (V).
    Power {
        current: SignalSpec,
        voltage: SignalSpec,
    },
    /// One bit selects between two events.
    Flag {
        byte: u8,
        mask: u8,
        set: TelemetryEvent,
        clear: TelemetryEvent,
    },
    /// A whole byte looked up in a value table.  Unlisted values emit nothing.
    Lookup {
        byte: u8,
        map: &'static [(u8, TelemetryEvent)],
    },
}

/// Every rule that applies to one identifier, in emission order.
#[derive(Debug, Clone, Copy)]
pub struct FrameRule {
    pub id: u16,
    pub signals: &'static [SignalRule],
}

#[derive(Debug)]
pub struct DecodeTable {
    pub revision: TableRevision,
    pub frames: &'static [FrameRule],
}

impl DecodeTable {
    pub fn lookup(&self, id: u16) -> Option<&FrameRule> {
        self.frames.iter().find(|f| f.id == id)
    }

    /// Identifiers this table reacts to.
    pub fn identifiers(&self) -> impl Iterator<Item = u16> + '_ {
        self.frames.iter().map(|f| f.id)
    }
}

// ── Revisions ─────────────────────────────────────────────────

/// Vehicle hardware generation the decode table is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableRevision {
    /// Charger state on 0x390, climate flag on byte 1 bit 6 of 0x54B.
    Current,
    /// Charger state on 0x5BF, climate flag on byte 0 bit 0 of 0x54B.
    Early,
}

impl TableRevision {
    pub const fn table(self) -> &'static DecodeTable {
        match self {
            Self::Current => &CURRENT,
            Self::Early => &EARLY,
        }
    }
}

/// Usable capacity per "gid" reported by the battery controller.
pub const KWH_PER_GID: f32 = 0.08;
/// Motor rpm to road speed for the stock gearing and tyre size.
pub const RPM_TO_KMH: f32 = 0.01212;

// ── Frames shared by both revisions ───────────────────────────

const BATTERY_ENERGY: FrameRule = FrameRule {
    id: 0x5BC,
    signals: &[SignalRule::Scalar {
        spec: SignalSpec::unsigned(0, 0, 10, KWH_PER_GID),
        emit: TelemetryEvent::BatteryEnergyKwh,
        ceiling: Ceiling::BatteryEnergy,
        freshness: Freshness::None,
    }],
};

const BATTERY_POWER: FrameRule = FrameRule {
    id: 0x1DB,
    signals: &[SignalRule::Power {
        current: SignalSpec::signed(0, 0, 11, 0.5),
        voltage: SignalSpec::unsigned(2, 0, 10, 0.5),
    }],
};

const MOTOR_SPEED: FrameRule = FrameRule {
    id: 0x1DA,
    signals: &[SignalRule::Scalar {
        spec: SignalSpec::signed(4, 0, 15, RPM_TO_KMH),
        emit: TelemetryEvent::SpeedKmh,
        ceiling: Ceiling::Unbounded,
        freshness: Freshness::Speed,
    }],
};

// ── Current revision ──────────────────────────────────────────

static CURRENT: DecodeTable = DecodeTable {
    revision: TableRevision::Current,
    frames: &[
        BATTERY_ENERGY,
        BATTERY_POWER,
        MOTOR_SPEED,
        FrameRule {
            id: 0x54B,
            signals: &[SignalRule::Flag {
                byte: 1,
                mask: 0x40,
                set: TelemetryEvent::AcStatus(AcStatus::On),
                clear: TelemetryEvent::AcStatus(AcStatus::Off),
            }],
        },
        FrameRule {
            id: 0x390,
            signals: &[
                SignalRule::Scalar {
                    spec: SignalSpec::unsigned(6, 0, 8, 0.5),
                    emit: TelemetryEvent::ChargerMaxAmps,
                    ceiling: Ceiling::Unbounded,
                    freshness: Freshness::None,
                },
                SignalRule::Lookup {
                    byte: 5,
                    map: &[
                        (0x80, TelemetryEvent::ChargerStatus(ChargerStatus::Idle)),
                        (0x82, TelemetryEvent::ChargerStatus(ChargerStatus::Idle)),
                        (0x92, TelemetryEvent::ChargerStatus(ChargerStatus::Idle)),
                        (0x83, TelemetryEvent::ChargerStatus(ChargerStatus::QuickCharging)),
                        (0x84, TelemetryEvent::ChargerStatus(ChargerStatus::Finished)),
                        (0x88, TelemetryEvent::ChargerStatus(ChargerStatus::Charging)),
                        (0x98, TelemetryEvent::ChargerStatus(ChargerStatus::PluggedInWaiting)),
                    ],
                },
            ],
        },
    ],
};

// ── Early revision ────────────────────────────────────────────

static EARLY: DecodeTable = DecodeTable {
    revision: TableRevision::Early,
    frames: &[
        BATTERY_ENERGY,
        BATTERY_POWER,
        MOTOR_SPEED,
        FrameRule {
            id: 0x54B,
            signals: &[SignalRule::Flag {
                byte: 0,
                mask: 0x01,
                set: TelemetryEvent::AcStatus(AcStatus::On),
                clear: TelemetryEvent::AcStatus(AcStatus::Off),
            }],
        },
        FrameRule {
            id: 0x5BF,
            signals: &[
                SignalRule::Scalar {
                    spec: SignalSpec::unsigned(0, 0, 8, 0.2),
                    emit: TelemetryEvent::ChargerMaxAmps,
                    ceiling: Ceiling::Unbounded,
                    freshness: Freshness::None,
                },
                SignalRule::Lookup {
                    byte: 4,
                    map: &[
                        (0x28, TelemetryEvent::ChargerStatus(ChargerStatus::Idle)),
                        (0x30, TelemetryEvent::ChargerStatus(ChargerStatus::PluggedInWaiting)),
                        (0x40, TelemetryEvent::ChargerStatus(ChargerStatus::Finished)),
                        (0x60, TelemetryEvent::ChargerStatus(ChargerStatus::Charging)),
                    ],
                },
            ],
        },
    ],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_reads_scaled_value() {
        let s = SignalSpec::unsigned(0, 0, 10, KWH_PER_GID);
        let v = s.read(&[0x12, 0x34]).unwrap();
        assert!((v - 72.0 * KWH_PER_GID).abs() < 1e-4);
    }

    #[test]
    fn spec_rejects_short_payload() {
        let s = SignalSpec::unsigned(2, 0, 10, 0.5);
        assert_eq!(s.read(&[0xFF, 0xFF, 0xFF]), None);
        assert!(s.read(&[0, 0, 0, 0]).is_some());
    }

    #[test]
    fn signed_spec_sign_extends() {
        let s = SignalSpec::signed(0, 0, 11, 0.5);
        // 0x400 in 11 bits = -1024
        assert_eq!(s.read(&[0x80, 0x00]), Some(-512.0));
    }

    #[test]
    fn bias_is_added_after_scale() {
        let s = SignalSpec {
            bias: -40.0,
            ..SignalSpec::unsigned(0, 0, 8, 1.0)
        };
        assert_eq!(s.read(&[50]), Some(10.0));
    }

    #[test]
    fn revisions_differ_only_in_charger_and_climate() {
        let cur: Vec<u16> = TableRevision::Current.table().identifiers().collect();
        let early: Vec<u16> = TableRevision::Early.table().identifiers().collect();
        assert!(cur.contains(&0x390) && !cur.contains(&0x5BF));
        assert!(early.contains(&0x5BF) && !early.contains(&0x390));
        for id in [0x5BC, 0x1DB, 0x1DA, 0x54B] {
            assert!(cur.contains(&id) && early.contains(&id));
        }
    }

    #[test]
    fn table_knows_its_revision() {
        for rev in [TableRevision::Current, TableRevision::Early] {
            assert_eq!(rev.table().revision, rev);
        }
    }

    #[test]
    fn identifiers_are_unique() {
        for rev in [TableRevision::Current, TableRevision::Early] {
            let ids: Vec<u16> = rev.table().identifiers().collect();
            for (i, id) in ids.iter().enumerate() {
                assert!(!ids[i + 1..].contains(id), "duplicate rule for {id:#x}");
            }
        }
    }
}

//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter    | Implements                               | Connects to           |
//! |------------|------------------------------------------|-----------------------|
//! | `twai`     | CanPort                                  | ESP32 TWAI controller |
//! | `time`     | ClockPort, `embedded_hal` DelayNs        | ESP32 system timer    |
//! | `log_sink` | DisplayPort, RowStorage, UplinkTransport | Serial log output     |

pub mod log_sink;
pub mod time;
pub mod twai;

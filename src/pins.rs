//! GPIO assignments for the LeafMon main board (ESP32-WROVER).
//!
//! Single source of truth for pin numbers; drivers reference this module
//! rather than hard-coding them.

// ---------------------------------------------------------------------------
// EV-CAN transceiver (SN65HVD230, 500 kbit/s)
// ---------------------------------------------------------------------------

/// TWAI TX → transceiver D.
pub const CAN_TX_GPIO: i32 = 25;
/// TWAI RX ← transceiver R.  Input-only pad.
pub const CAN_RX_GPIO: i32 = 39;

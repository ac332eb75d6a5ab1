//! LeafMon firmware library.
//!
//! Exposes the pure-logic modules for integration testing and fuzzing.
//! All ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module, with host simulations alongside.

#![deny(unused_must_use)]

pub mod app;
pub mod bus;
pub mod can;
pub mod config;
pub mod control;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod tasks;

mod pins;

// ESP-IDF-backed modules; host builds get the simulation halves.
pub mod adapters;
pub mod drivers;

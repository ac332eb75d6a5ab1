//! Low-level FreeRTOS helpers.

pub mod task_pin;

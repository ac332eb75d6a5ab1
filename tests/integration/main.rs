//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that drives several tasks together
//! against the simulated CAN bus and in-memory ports.  All tests run on
//! the host with no real hardware required.

mod command_flow_tests;
mod mock_hw;
mod pipeline_tests;

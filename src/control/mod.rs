//! Signal conditioning applied by consumers before presentation.

pub mod smoothing;

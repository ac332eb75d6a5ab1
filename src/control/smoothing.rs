//! Exponential smoothing for noisy telemetry.
//!
//! `next = alpha * state + (1 - alpha) * input`.  Each consumer owns its own
//! filter state and factor; nothing is shared between tasks.

/// One step of the filter.
///
/// `alpha = 0` passes `input` through unchanged and `alpha = 1` holds
/// `state` forever.  Feeding the current state back in returns it exactly.
pub fn apply(state: f32, input: f32, alpha: f32) -> f32 {
    if alpha >= 1.0 {
        return state;
    }
    input + alpha * (state - input)
}

/// A smoothed value with its factor.
#[derive(Debug, Clone, Copy)]
pub struct Smoothed {
    value: f32,
    alpha: f32,
}

impl Smoothed {
    /// Filter starting from zero.
    pub fn new(alpha: f32) -> Self {
        Self::starting_at(0.0, alpha)
    }

    pub fn starting_at(value: f32, alpha: f32) -> Self {
        Self { value, alpha }
    }

    /// Fold one sample in and return the new value.
    pub fn update(&mut self, input: f32) -> f32 {
        self.value = apply(self.value, input, self.alpha);
        self.value
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }
}

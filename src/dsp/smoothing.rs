//! # Per-Hop Parameter Glides
//!
//! Parameters arrive once per hop. Jumping straight to the new value at the
//! hop boundary produces an audible step (zipper noise on the mix, a click
//! on decay changes), so each control glides linearly from last hop's
//! value to this hop's value over the samples of the hop.
//!
//! The glide itself is nih-plug's [`Smoother`] with
//! [`SmoothingStyle::Linear`], timed so that its step count is exactly one
//! hop: `hop / sample_rate * 1000` milliseconds.

use nih_plug::prelude::{Smoother, SmoothingStyle};

/// A linear smoother that reaches each new target in exactly one hop.
pub struct HopSmoother {
    smoother: Smoother<f32>,
    sample_rate: f32,
    /// The last value handed to [`set_target()`](Self::set_target).
    target: f32,
}

impl HopSmoother {
    pub fn new(value: f32, hop: usize, sample_rate: f32) -> Self {
        let hop_ms = hop as f32 / sample_rate * 1000.0;
        let smoother = Smoother::new(SmoothingStyle::Linear(hop_ms));
        smoother.reset(value);
        Self {
            smoother,
            sample_rate,
            target: value,
        }
    }

    /// Glide to `target` over the next hop's worth of [`next()`](Self::next)
    /// calls, starting from wherever the glide currently is.
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
        self.smoother.set_target(self.sample_rate, target);
    }

    /// Advance one sample. The last step of a glide lands on the target
    /// exactly.
    #[inline]
    pub fn next(&self) -> f32 {
        self.smoother.next()
    }

    /// Jump to `value` immediately.
    pub fn reset(&mut self, value: f32) {
        self.target = value;
        self.smoother.reset(value);
    }

    /// Finish any glide in progress.
    pub fn settle(&mut self) {
        self.reset(self.target);
    }

    pub fn value(&self) -> f32 {
        self.smoother.previous_value()
    }

    pub fn target(&self) -> f32 {
        self.target
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramps_linearly_and_lands_on_target() {
        let mut ramp = HopSmoother::new(0.0, 4, 1000.0);
        ramp.set_target(1.0);

        let values: Vec<f32> = (0..6).map(|_| ramp.next()).collect();
        let expected = [0.25, 0.5, 0.75, 1.0, 1.0, 1.0];
        for (v, e) in values.iter().zip(expected) {
            assert!((v - e).abs() < 1e-6, "got {values:?}");
        }
        assert_eq!(ramp.value(), 1.0);
    }

    /// A 64-sample hop at 44.1 kHz is not a whole number of milliseconds;
    /// the glide must still take exactly 64 steps.
    #[test]
    fn test_step_count_matches_hop_at_fractional_ms() {
        let hop = 64;
        let mut ramp = HopSmoother::new(1.0, hop, 44_100.0);
        ramp.set_target(0.0);

        let values: Vec<f32> = (0..hop).map(|_| ramp.next()).collect();
        assert!(
            (values[0] - (1.0 - 1.0 / 64.0)).abs() < 1e-5,
            "first step {}",
            values[0]
        );
        assert!(values[hop - 2] > 0.0, "landed early: {values:?}");
        assert_eq!(values[hop - 1], 0.0);
    }

    #[test]
    fn test_retarget_mid_ramp_starts_from_current_value() {
        let mut ramp = HopSmoother::new(0.0, 10, 1000.0);
        ramp.set_target(1.0);
        for _ in 0..5 {
            ramp.next();
        }
        ramp.set_target(0.0);
        // 0.5 down to 0 in ten steps.
        assert!((ramp.next() - 0.45).abs() < 1e-6);
    }

    #[test]
    fn test_reset_snaps() {
        let mut ramp = HopSmoother::new(0.0, 100, 1000.0);
        ramp.set_target(1.0);
        ramp.reset(0.5);
        assert_eq!(ramp.next(), 0.5);
        assert_eq!(ramp.target(), 0.5);
    }

    #[test]
    fn test_settle_jumps_to_pending_target() {
        let mut ramp = HopSmoother::new(0.0, 100, 1000.0);
        ramp.set_target(0.8);
        ramp.next();
        ramp.settle();
        assert_eq!(ramp.value(), 0.8);
        assert_eq!(ramp.next(), 0.8);
    }
}

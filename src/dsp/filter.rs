//! # One-Pole Lowpass Filter
//!
//! The plate reverb uses the same tiny IIR filter in three places: the
//! input "bandwidth" control and the damping filter in each half of the
//! tank. Each pass through a damping filter removes a little more high
//! end, so the tail darkens as it decays, the way a real plate does.
//!
//! ## The Filter Equation
//!
//! ```text
//! y[n] = g * x[n] + (1 - g) * y[n-1]
//! ```
//!
//! `g` is the *input gain*:
//!
//! - `g = 1.0` → output = input (no filtering)
//! - `g = 0.5` → half new input, half memory (moderate smoothing)
//! - `g → 0.0` → output barely moves (extreme filtering)
//!
//! Dattorro's plate parameters are expressed directly in these terms.
//! `bandwidth` is `g` for the input filter; `damping` is `1 - g` for the
//! tank filters. No cutoff-in-Hz conversion is involved.

/// A one-pole (6 dB/octave) lowpass filter driven by its input gain.
pub struct OnePoleFilter {
    /// Input gain `g`, in `[0, 1]`.
    gain: f32,

    /// The previous output sample, the filter's only state.
    prev_output: f32,
}

/// Below this the recursive state is flushed to zero. A decaying reverb
/// tail would otherwise sink into denormal floats, which are extremely
/// slow on most CPUs.
const DENORMAL_THRESHOLD: f32 = 1.0e-20;

impl OnePoleFilter {
    /// Create a filter initialized to passthrough (`g = 1`).
    pub fn new() -> Self {
        Self {
            gain: 1.0,
            prev_output: 0.0,
        }
    }

    /// Set the input gain. Clamped to `[0, 1]`, which keeps the filter
    /// stable for any parameter value.
    #[inline]
    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain.clamp(0.0, 1.0);
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let mut output = self.gain * input + (1.0 - self.gain) * self.prev_output;
        if output.abs() < DENORMAL_THRESHOLD {
            output = 0.0;
        }
        self.prev_output = output;
        output
    }

    /// Reset the filter state to zero.
    pub fn reset(&mut self) {
        self.prev_output = 0.0;
    }
}

impl Default for OnePoleFilter {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// A gain of 1 passes input through unchanged.
    #[test]
    fn test_passthrough_at_unity_gain() {
        let mut filter = OnePoleFilter::new();

        for x in [1.0, 0.5, -0.3, 0.0] {
            let y = filter.process(x);
            assert!((y - x).abs() < 1e-6, "Expected {x}, got {y}");
        }
    }

    /// A small gain heavily attenuates the highest representable frequency
    /// (a signal alternating +1, -1 every sample).
    #[test]
    fn test_filter_attenuates_high_freq() {
        let mut filter = OnePoleFilter::new();
        filter.set_gain(0.01);

        let mut max_output = 0.0_f32;
        for i in 0..1000 {
            let input = if i % 2 == 0 { 1.0 } else { -1.0 };
            max_output = max_output.max(filter.process(input).abs());
        }

        assert!(
            max_output < 0.02,
            "Expected heavy attenuation, got max output {max_output}"
        );
    }

    /// DC passes a lowpass at any gain above zero.
    #[test]
    fn test_dc_passes_through() {
        let mut filter = OnePoleFilter::new();
        filter.set_gain(0.005);

        let mut output = 0.0;
        for _ in 0..10000 {
            output = filter.process(1.0);
        }

        assert!(
            (output - 1.0).abs() < 1e-4,
            "DC signal should pass through lowpass, got {output}"
        );
    }

    /// Gains outside [0, 1] are clamped instead of going unstable.
    #[test]
    fn test_gain_is_clamped() {
        let mut filter = OnePoleFilter::new();
        filter.set_gain(3.0);
        assert!((filter.process(0.25) - 0.25).abs() < 1e-6);

        filter.set_gain(-1.0);
        assert!((filter.process(1.0) - 0.25).abs() < 1e-6);
    }

    /// A decaying state is flushed to exact zero instead of lingering as a
    /// denormal.
    #[test]
    fn test_state_flushes_to_zero() {
        let mut filter = OnePoleFilter::new();
        filter.set_gain(0.5);
        filter.process(1.0);

        let mut output = 1.0;
        for _ in 0..200 {
            output = filter.process(0.0);
        }
        assert_eq!(output, 0.0);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut filter = OnePoleFilter::new();
        filter.set_gain(0.1);
        filter.process(1.0);
        assert!(filter.prev_output.abs() > 0.0);

        filter.reset();
        assert!(filter.prev_output.abs() < 1e-6);
    }
}

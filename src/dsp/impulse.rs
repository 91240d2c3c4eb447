//! # Synthetic Impulse Responses
//!
//! The convolution engine does not load a recorded room. It builds one:
//!
//! ```text
//!  amplitude
//!  1 ┤ │
//!    │ │  │         early reflections: a few sparse spikes,
//!    │ │  │ │   │   louder the earlier they arrive
//!    │ │ ││ │ │ │ │ ▁▂▃▂▂▁▁▁▁ ▁ ▁
//!  0 ┼─┴─┴┴─┴─┴─┴─┴─────────────────────────► time
//!      └─ room_size × 0.1 s ─┘└─ dense noise tail, exp(-damping · t)
//! ```
//!
//! The tail's *density* reshapes each noise sample as `sign(n)·|n|^p`. At
//! `p = 1` the tail is plain uniform noise; larger exponents push most
//! samples towards zero and leave a sparse crackle of isolated peaks.
//!
//! Generation writes into a caller-owned buffer and uses a seeded `StdRng`,
//! so it never allocates and the same shape always produces the same
//! impulse.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::parameters::ReverbParameterSet;

/// Number of discrete early reflections.
const EARLY_REFLECTIONS: usize = 24;

/// Seconds of early-reflection window at `room_size = 1`.
const MAX_EARLY_SECONDS: f32 = 0.1;

/// Exponent range covered by the density control.
const MAX_DENSITY_EXPONENT: f32 = 8.0;

/// The parameters an impulse response depends on. When none of these
/// change, the cached impulse (and its spectrum) stays valid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpulseShape {
    pub room_size: f32,
    pub tail_damping: f32,
    pub density: f32,
}

impl ImpulseShape {
    /// Built from the in-range copy of `params`, so a NaN field can never
    /// make two shapes compare unequal.
    pub fn from_params(params: &ReverbParameterSet) -> Self {
        let params = params.clamped();
        Self {
            room_size: params.room_size,
            tail_damping: params.tail_damping,
            density: params.density,
        }
    }

    /// Exponent applied to each tail noise sample.
    fn density_exponent(&self) -> f32 {
        1.0 + (MAX_DENSITY_EXPONENT - 1.0) * (1.0 - self.density.clamp(0.0, 1.0))
    }
}

/// Writes synthetic impulse responses for one sample rate.
pub struct ImpulseSynth {
    sample_rate: f32,
    seed: u64,
}

impl ImpulseSynth {
    pub fn new(sample_rate: f32, seed: u64) -> Self {
        Self { sample_rate, seed }
    }

    /// Length of the early-reflection section for `shape`, in samples.
    pub fn early_len(&self, shape: &ImpulseShape) -> usize {
        (shape.room_size.clamp(0.0, 1.0) * MAX_EARLY_SECONDS * self.sample_rate) as usize
    }

    /// Fill `out` with the impulse for `shape`, peak-normalized to 1.
    pub fn generate_into(&self, shape: &ImpulseShape, out: &mut [f32]) {
        let mut rng = StdRng::seed_from_u64(self.seed);
        out.fill(0.0);

        let early_len = self.early_len(shape).min(out.len());

        // Early reflections: random arrival times, amplitude falling
        // linearly with arrival time, random polarity.
        if early_len > 0 {
            for _ in 0..EARLY_REFLECTIONS {
                let at = rng.random_range(0..early_len);
                let amplitude = 1.0 - at as f32 / early_len as f32;
                let polarity = if rng.random::<bool>() { 1.0 } else { -1.0 };
                out[at] += polarity * amplitude;
            }
        }

        // Late tail: shaped noise under an exponential envelope.
        let exponent = shape.density_exponent();
        let damping = shape.tail_damping.max(0.0);
        let inv_sample_rate = 1.0 / self.sample_rate;
        for (i, sample) in out[early_len..].iter_mut().enumerate() {
            let envelope = (-damping * i as f32 * inv_sample_rate).exp();
            let noise: f32 = rng.random_range(-1.0..1.0);
            *sample = noise.signum() * noise.abs().powf(exponent) * envelope;
        }

        normalize_peak(out);
    }
}

/// Scale `samples` so the largest magnitude is 1. Silence stays silent.
pub fn normalize_peak(samples: &mut [f32]) {
    let peak = samples.iter().fold(0.0_f32, |max, &x| max.max(x.abs()));
    if peak > 0.0 {
        let gain = 1.0 / peak;
        for sample in samples.iter_mut() {
            *sample *= gain;
        }
    }
}

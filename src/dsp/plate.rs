//! # Plate Reverb (Modulated Delay Network)
//!
//! The figure-of-eight plate from Jon Dattorro's "Effect Design, Part 1:
//! Reverberator and Other Filters" (JAES, 1997):
//!
//! ```text
//!  in ─► pre-delay ─► bandwidth LP ─► AP1 ─► AP2 ─► AP3 ─► AP4 ─┬──────────────┐
//!                                    (input diffusion)          │              │
//!          ┌────────────────────────────────────────────────── (+)            (+) ◄──────────┐
//!          │                                                    │              │             │
//!          │   left half:  modAP ─► delay ─► damp LP ─► ×decay ─► AP ─► delay ─┼─► ×decay ───┘
//!          │                                                                   │
//!          └── ×decay ◄─ delay ◄─ AP ◄─ ×decay ◄─ damp LP ◄─ delay ◄─ modAP ◄──┘  right half
//! ```
//!
//! Each half of the "tank" feeds the other, so energy circulates around
//! the figure eight and loses a little at every `×decay`. The all-passes
//! smear each reflection into many; the two modulated all-passes wobble
//! their delay by a fraction of a millisecond, which breaks up the metallic
//! ringing a static network would have. Stereo outputs are sums of taps
//! read from seven points of the tank (table below).
//!
//! ## Arena Layout
//!
//! All thirteen delay lines live in one `Vec` owned by [`PlateReverb`] and
//! are addressed by the index constants below. The cross-coupling between
//! the halves is just "read line 8, write line 5". No line holds a reference
//! to another, and a single `tick()` advances the whole network by one
//! sample.
//!
//! Dattorro specifies every length in samples at 29 761 Hz. They are scaled
//! to the running sample rate at construction.

use std::f32::consts::TAU;
use std::num::NonZeroUsize;

use super::delay_line::DelayLine;
use super::engine::ReverbAlgorithm;
use super::filter::OnePoleFilter;
use super::parameters::ReverbParameterSet;
use super::smoothing::HopSmoother;
use crate::{ReverbConfig, ReverbError};

/// The sample rate Dattorro's delay lengths are specified at.
const REFERENCE_RATE: f32 = 29_761.0;

/// Output gain applied to the summed taps.
const TANK_OUTPUT_GAIN: f32 = 0.6;

/// Largest excursion depth the modulated lines are sized for.
const MAX_EXCURSION_MS: f32 = 2.0;

/// Extra slots beyond the excursion for the cubic interpolation neighbours.
const INTERPOLATION_GUARD: usize = 4;

/// The right half's oscillator runs a quarter cycle behind the left.
const RIGHT_PHASE_OFFSET: f32 = 0.25;

// Arena indices.
const PRE_DELAY: usize = 0;
const INPUT_DIFFUSER_1: usize = 1;
const INPUT_DIFFUSER_2: usize = 2;
const INPUT_DIFFUSER_3: usize = 3;
const INPUT_DIFFUSER_4: usize = 4;
const LEFT_MOD_ALLPASS: usize = 5;
const LEFT_DELAY_1: usize = 6;
const LEFT_ALLPASS: usize = 7;
const LEFT_DELAY_2: usize = 8;
const RIGHT_MOD_ALLPASS: usize = 9;
const RIGHT_DELAY_1: usize = 10;
const RIGHT_ALLPASS: usize = 11;
const RIGHT_DELAY_2: usize = 12;
const LINE_COUNT: usize = 13;

/// Name and reference length of every line after the pre-delay, in arena
/// order.
const TOPOLOGY: [(&str, f32); LINE_COUNT - 1] = [
    ("input_diffuser_1", 142.0),
    ("input_diffuser_2", 107.0),
    ("input_diffuser_3", 379.0),
    ("input_diffuser_4", 277.0),
    ("left_mod_allpass", 672.0),
    ("left_delay_1", 4453.0),
    ("left_allpass", 1800.0),
    ("left_delay_2", 3720.0),
    ("right_mod_allpass", 908.0),
    ("right_delay_1", 4217.0),
    ("right_allpass", 2656.0),
    ("right_delay_2", 3163.0),
];

/// One half of the tank, as arena indices.
#[derive(Clone, Copy)]
struct TankHalf {
    mod_allpass: usize,
    delay_1: usize,
    allpass: usize,
    delay_2: usize,
}

const LEFT_HALF: TankHalf = TankHalf {
    mod_allpass: LEFT_MOD_ALLPASS,
    delay_1: LEFT_DELAY_1,
    allpass: LEFT_ALLPASS,
    delay_2: LEFT_DELAY_2,
};

const RIGHT_HALF: TankHalf = TankHalf {
    mod_allpass: RIGHT_MOD_ALLPASS,
    delay_1: RIGHT_DELAY_1,
    allpass: RIGHT_ALLPASS,
    delay_2: RIGHT_DELAY_2,
};

/// `(line, reference offset, sign)`: Dattorro's output tap table.
const LEFT_TAPS: [(usize, f32, f32); 7] = [
    (RIGHT_DELAY_1, 266.0, 1.0),
    (RIGHT_DELAY_1, 2974.0, 1.0),
    (RIGHT_ALLPASS, 1913.0, -1.0),
    (RIGHT_DELAY_2, 1996.0, 1.0),
    (LEFT_DELAY_1, 1990.0, -1.0),
    (LEFT_ALLPASS, 187.0, -1.0),
    (LEFT_DELAY_2, 1066.0, -1.0),
];

const RIGHT_TAPS: [(usize, f32, f32); 7] = [
    (LEFT_DELAY_1, 353.0, 1.0),
    (LEFT_DELAY_1, 3627.0, 1.0),
    (LEFT_ALLPASS, 1228.0, -1.0),
    (LEFT_DELAY_2, 2673.0, 1.0),
    (RIGHT_DELAY_1, 2111.0, -1.0),
    (RIGHT_ALLPASS, 335.0, -1.0),
    (RIGHT_DELAY_2, 121.0, -1.0),
];

/// An output tap scaled to the running sample rate.
#[derive(Clone, Copy)]
struct Tap {
    line: usize,
    offset: usize,
    sign: f32,
}

/// Scale a reference length to `sample_rate`, rejecting zero.
fn scaled_length(
    name: &'static str,
    reference: f32,
    sample_rate: f32,
) -> Result<NonZeroUsize, ReverbError> {
    let samples = (reference * sample_rate / REFERENCE_RATE).round();
    NonZeroUsize::new(samples as usize).ok_or(ReverbError::MisconfiguredTopology { line: name })
}

/// Control values for one sample, after smoothing.
#[derive(Clone, Copy)]
struct Controls {
    pre_delay: f32,
    bandwidth: f32,
    input_diffusion_1: f32,
    input_diffusion_2: f32,
    decay: f32,
    decay_diffusion_1: f32,
    decay_diffusion_2: f32,
    damping: f32,
    excursion_rate: f32,
    excursion_depth: f32,
    wet: f32,
    dry: f32,
}

/// One per-hop glide per control.
struct ControlRamps {
    pre_delay: HopSmoother,
    bandwidth: HopSmoother,
    input_diffusion_1: HopSmoother,
    input_diffusion_2: HopSmoother,
    decay: HopSmoother,
    decay_diffusion_1: HopSmoother,
    decay_diffusion_2: HopSmoother,
    damping: HopSmoother,
    excursion_rate: HopSmoother,
    excursion_depth: HopSmoother,
    wet: HopSmoother,
    dry: HopSmoother,
}

impl ControlRamps {
    fn new(params: &ReverbParameterSet, hop: usize, sample_rate: f32) -> Self {
        Self {
            pre_delay: HopSmoother::new(params.pre_delay, hop, sample_rate),
            bandwidth: HopSmoother::new(params.bandwidth, hop, sample_rate),
            input_diffusion_1: HopSmoother::new(params.input_diffusion_1, hop, sample_rate),
            input_diffusion_2: HopSmoother::new(params.input_diffusion_2, hop, sample_rate),
            decay: HopSmoother::new(params.decay, hop, sample_rate),
            decay_diffusion_1: HopSmoother::new(params.decay_diffusion_1, hop, sample_rate),
            decay_diffusion_2: HopSmoother::new(params.decay_diffusion_2, hop, sample_rate),
            damping: HopSmoother::new(params.damping, hop, sample_rate),
            excursion_rate: HopSmoother::new(params.excursion_rate, hop, sample_rate),
            excursion_depth: HopSmoother::new(params.excursion_depth, hop, sample_rate),
            wet: HopSmoother::new(params.wet, hop, sample_rate),
            dry: HopSmoother::new(params.dry, hop, sample_rate),
        }
    }

    fn set_targets(&mut self, params: &ReverbParameterSet) {
        self.pre_delay.set_target(params.pre_delay);
        self.bandwidth.set_target(params.bandwidth);
        self.input_diffusion_1.set_target(params.input_diffusion_1);
        self.input_diffusion_2.set_target(params.input_diffusion_2);
        self.decay.set_target(params.decay);
        self.decay_diffusion_1.set_target(params.decay_diffusion_1);
        self.decay_diffusion_2.set_target(params.decay_diffusion_2);
        self.damping.set_target(params.damping);
        self.excursion_rate.set_target(params.excursion_rate);
        self.excursion_depth.set_target(params.excursion_depth);
        self.wet.set_target(params.wet);
        self.dry.set_target(params.dry);
    }

    #[inline]
    fn next(&mut self) -> Controls {
        Controls {
            pre_delay: self.pre_delay.next(),
            bandwidth: self.bandwidth.next(),
            input_diffusion_1: self.input_diffusion_1.next(),
            input_diffusion_2: self.input_diffusion_2.next(),
            decay: self.decay.next(),
            decay_diffusion_1: self.decay_diffusion_1.next(),
            decay_diffusion_2: self.decay_diffusion_2.next(),
            damping: self.damping.next(),
            excursion_rate: self.excursion_rate.next(),
            excursion_depth: self.excursion_depth.next(),
            wet: self.wet.next(),
            dry: self.dry.next(),
        }
    }

    /// Finish any ramp in progress.
    fn settle(&mut self) {
        for ramp in [
            &mut self.pre_delay,
            &mut self.bandwidth,
            &mut self.input_diffusion_1,
            &mut self.input_diffusion_2,
            &mut self.decay,
            &mut self.decay_diffusion_1,
            &mut self.decay_diffusion_2,
            &mut self.damping,
            &mut self.excursion_rate,
            &mut self.excursion_depth,
            &mut self.wet,
            &mut self.dry,
        ] {
            ramp.settle();
        }
    }
}

/// Schroeder all-pass around a delay line:
///
/// ```text
/// w[n] = x[n] - g · w[n-M]
/// y[n] = w[n-M] + g · w[n]
/// ```
#[inline]
fn allpass(line: &mut DelayLine, input: f32, coefficient: f32) -> f32 {
    let delayed = line.read();
    let w = input - coefficient * delayed;
    line.write(w);
    delayed + coefficient * w
}

/// The same all-pass, with its delayed sample read at a fractional offset.
#[inline]
fn modulated_allpass(line: &mut DelayLine, input: f32, coefficient: f32, offset: f32) -> f32 {
    let delayed = line.read_cubic(offset);
    let w = input - coefficient * delayed;
    line.write(w);
    delayed + coefficient * w
}

/// The Dattorro plate reverb.
pub struct PlateReverb {
    sample_rate: f32,
    hop_size: usize,

    /// The delay-line arena. See the index constants.
    lines: Vec<DelayLine>,

    left_taps: [Tap; 7],
    right_taps: [Tap; 7],

    bandwidth_filter: OnePoleFilter,
    damping_filters: [OnePoleFilter; 2],

    /// Excursion oscillator phase in cycles, kept in `[0, 1)`.
    lfo_phase: f32,

    controls: ControlRamps,
}

impl PlateReverb {
    /// Build the network for `sample_rate`, starting from `initial`
    /// parameter values.
    ///
    /// Fails with [`ReverbError::MisconfiguredTopology`] if any line would
    /// be shorter than one sample (a zero, negative, non-finite or absurdly
    /// low sample rate).
    pub fn new(
        sample_rate: f32,
        config: &ReverbConfig,
        initial: &ReverbParameterSet,
    ) -> Result<Self, ReverbError> {
        if config.hop_size == 0 {
            return Err(ReverbError::InvalidBlockSize {
                hop: 0,
                window: config.window_size,
            });
        }
        if !sample_rate.is_finite() {
            return Err(ReverbError::MisconfiguredTopology { line: "pre_delay" });
        }

        // One second of pre-delay.
        let one_second = NonZeroUsize::new(sample_rate.round().max(0.0) as usize)
            .ok_or(ReverbError::MisconfiguredTopology { line: "pre_delay" })?;
        let mut lines = Vec::with_capacity(LINE_COUNT);
        lines.push(DelayLine::new(one_second, 0));

        let excursion_headroom =
            (MAX_EXCURSION_MS * 0.001 * sample_rate).ceil() as usize + INTERPOLATION_GUARD;
        for (index, &(name, reference)) in TOPOLOGY.iter().enumerate() {
            let length = scaled_length(name, reference, sample_rate)?;
            let headroom = match index + 1 {
                LEFT_MOD_ALLPASS | RIGHT_MOD_ALLPASS => excursion_headroom,
                _ => 0,
            };
            lines.push(DelayLine::new(length, headroom));
        }

        let scale_tap = |&(line, offset, sign): &(usize, f32, f32)| Tap {
            line,
            offset: ((offset * sample_rate / REFERENCE_RATE).round() as usize).max(1),
            sign,
        };

        let mut plate = Self {
            sample_rate,
            hop_size: config.hop_size,
            lines,
            left_taps: LEFT_TAPS.each_ref().map(scale_tap),
            right_taps: RIGHT_TAPS.each_ref().map(scale_tap),
            bandwidth_filter: OnePoleFilter::new(),
            damping_filters: [OnePoleFilter::new(), OnePoleFilter::new()],
            lfo_phase: 0.0,
            controls: ControlRamps::new(
                &Self::sanitize(initial, sample_rate),
                config.hop_size,
                sample_rate,
            ),
        };
        plate.apply_pre_delay(plate.controls.pre_delay.value());
        Ok(plate)
    }

    /// Clamp parameters into range; pre-delay is capped at one second.
    fn sanitize(params: &ReverbParameterSet, sample_rate: f32) -> ReverbParameterSet {
        let mut params = params.clamped();
        params.pre_delay = params.pre_delay.min(sample_rate.round());
        params
    }

    fn apply_pre_delay(&mut self, samples: f32) {
        self.lines[PRE_DELAY].set_length(samples.round().max(0.0) as usize);
    }

    /// Length of arena line `index` at the running sample rate.
    pub fn line_length(&self, index: usize) -> usize {
        self.lines[index].length()
    }

    /// Advance the whole network by one sample. Returns the (left, right)
    /// tank output before wet/dry mixing.
    #[inline]
    fn tick(&mut self, input: f32, c: &Controls) -> (f32, f32) {
        // Output taps read what the tank held before this sample.
        let mut left = 0.0;
        for tap in &self.left_taps {
            left += tap.sign * self.lines[tap.line].tap(tap.offset);
        }
        let mut right = 0.0;
        for tap in &self.right_taps {
            right += tap.sign * self.lines[tap.line].tap(tap.offset);
        }

        // Pre-delay: written first so a zero delay passes straight through.
        self.apply_pre_delay(c.pre_delay);
        let pre_delay = &mut self.lines[PRE_DELAY];
        pre_delay.write(input);
        let mut x = pre_delay.read();

        self.bandwidth_filter.set_gain(c.bandwidth);
        x = self.bandwidth_filter.process(x);

        x = allpass(&mut self.lines[INPUT_DIFFUSER_1], x, c.input_diffusion_1);
        x = allpass(&mut self.lines[INPUT_DIFFUSER_2], x, c.input_diffusion_1);
        x = allpass(&mut self.lines[INPUT_DIFFUSER_3], x, c.input_diffusion_2);
        x = allpass(&mut self.lines[INPUT_DIFFUSER_4], x, c.input_diffusion_2);

        // Cross-feedback: each half hears the other's last delay.
        let into_left = x + c.decay * self.lines[RIGHT_DELAY_2].read();
        let into_right = x + c.decay * self.lines[LEFT_DELAY_2].read();

        let depth = c.excursion_depth * 0.001 * self.sample_rate;
        let halves = [
            (LEFT_HALF, into_left, self.lfo_phase),
            (RIGHT_HALF, into_right, self.lfo_phase + RIGHT_PHASE_OFFSET),
        ];
        for (side, (half, tank_in, phase)) in halves.into_iter().enumerate() {
            let lines = &mut self.lines;

            let nominal = lines[half.mod_allpass].length() as f32;
            let excursion = depth * (TAU * phase).sin();
            // Dattorro's first decay diffuser runs with the opposite sign.
            let diffused = modulated_allpass(
                &mut lines[half.mod_allpass],
                tank_in,
                -c.decay_diffusion_1,
                nominal + excursion,
            );

            let delayed = lines[half.delay_1].read();
            lines[half.delay_1].write(diffused);

            let filter = &mut self.damping_filters[side];
            filter.set_gain(1.0 - c.damping);
            let damped = filter.process(delayed) * c.decay;

            let diffused = allpass(&mut lines[half.allpass], damped, c.decay_diffusion_2);
            lines[half.delay_2].write(diffused);
        }

        for line in &mut self.lines {
            line.advance();
        }

        self.lfo_phase = (self.lfo_phase + c.excursion_rate / self.sample_rate).fract();

        (left * TANK_OUTPUT_GAIN, right * TANK_OUTPUT_GAIN)
    }

    /// Samples around one half of the tank at the running rate.
    fn half_loop_samples(&self, half: TankHalf) -> usize {
        [half.mod_allpass, half.delay_1, half.allpass, half.delay_2]
            .iter()
            .map(|&i| self.lines[i].length())
            .sum()
    }

    #[cfg(test)]
    fn lfo_phase(&self) -> f32 {
        self.lfo_phase
    }
}

impl ReverbAlgorithm for PlateReverb {
    fn hop_size(&self) -> usize {
        self.hop_size
    }

    fn process_hop<I, O>(&mut self, inputs: &[I], outputs: &mut [O], params: &ReverbParameterSet)
    where
        I: AsRef<[f32]>,
        O: AsMut<[f32]>,
    {
        let hop = self.hop_size;
        let params = Self::sanitize(params, self.sample_rate);
        self.controls.set_targets(&params);

        let input_gain = if inputs.is_empty() {
            0.0
        } else {
            1.0 / inputs.len() as f32
        };

        for i in 0..hop {
            let c = self.controls.next();

            let mono = inputs
                .iter()
                .map(|block| block.as_ref().get(i).copied().unwrap_or(0.0))
                .sum::<f32>()
                * input_gain;
            let (left, right) = self.tick(mono, &c);

            let num_outputs = outputs.len();
            for (channel, output) in outputs.iter_mut().enumerate() {
                let Some(out) = output.as_mut().get_mut(i) else {
                    continue;
                };
                let wet = match (num_outputs, channel) {
                    (1, _) => 0.5 * (left + right),
                    (_, 0) => left,
                    (_, 1) => right,
                    // Extra channels alternate left/right.
                    (_, ch) if ch % 2 == 0 => left,
                    _ => right,
                };
                let dry = inputs
                    .get(channel)
                    .or_else(|| inputs.last())
                    .and_then(|block| block.as_ref().get(i).copied())
                    .unwrap_or(0.0);
                *out = c.wet * wet + c.dry * dry;
            }
        }
    }

    fn reset(&mut self) {
        for line in &mut self.lines {
            line.clear();
        }
        self.bandwidth_filter.reset();
        for filter in &mut self.damping_filters {
            filter.reset();
        }
        self.lfo_phase = 0.0;
        self.controls.settle();
    }

    /// Time for the tank to fall 60 dB.
    ///
    /// Each trip through one half multiplies the signal by `decay²`, so
    /// `-3 / (2 · log10(decay))` half-trips reach -60 dB. The pre-delay and
    /// input diffusion are added on top.
    fn tail_samples(&self, params: &ReverbParameterSet) -> usize {
        const MAX_TAIL_SECONDS: f32 = 60.0;

        let params = Self::sanitize(params, self.sample_rate);
        let diffusion: usize = [
            INPUT_DIFFUSER_1,
            INPUT_DIFFUSER_2,
            INPUT_DIFFUSER_3,
            INPUT_DIFFUSER_4,
        ]
        .iter()
        .map(|&i| self.lines[i].length())
        .sum();
        let entry = diffusion + params.pre_delay as usize;

        let half_loop =
            (self.half_loop_samples(LEFT_HALF) + self.half_loop_samples(RIGHT_HALF)) as f32 * 0.5;
        let max_tail = MAX_TAIL_SECONDS * self.sample_rate;

        let ringing = if params.decay <= 1.0e-3 {
            half_loop
        } else if params.decay >= 1.0 {
            max_tail
        } else {
            let trips = -3.0 / (2.0 * params.decay.log10());
            (trips * half_loop).min(max_tail)
        };

        entry + ringing as usize
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn config(hop_size: usize) -> ReverbConfig {
        ReverbConfig {
            hop_size,
            ..Default::default()
        }
    }

    /// Run a mono signal through a plate, returning (left, right).
    fn run(
        plate: &mut PlateReverb,
        input: &[f32],
        params: &ReverbParameterSet,
    ) -> (Vec<f32>, Vec<f32>) {
        let hop = plate.hop_size();
        let mut left = Vec::with_capacity(input.len());
        let mut right = Vec::with_capacity(input.len());
        let mut outs = [vec![0.0; hop], vec![0.0; hop]];
        let mut padded = vec![0.0; hop];

        for chunk in input.chunks(hop) {
            padded[..chunk.len()].copy_from_slice(chunk);
            padded[chunk.len()..].fill(0.0);
            plate.process_hop(&[&padded[..]], &mut outs, params);
            left.extend_from_slice(&outs[0][..chunk.len()]);
            right.extend_from_slice(&outs[1][..chunk.len()]);
        }
        (left, right)
    }

    fn impulse(len: usize) -> Vec<f32> {
        let mut x = vec![0.0; len];
        x[0] = 1.0;
        x
    }

    /// At the reference rate the lines have Dattorro's published lengths.
    #[test]
    fn test_reference_rate_uses_published_lengths() {
        let plate = PlateReverb::new(REFERENCE_RATE, &config(128), &Default::default()).unwrap();
        for (index, &(name, reference)) in TOPOLOGY.iter().enumerate() {
            assert_eq!(
                plate.line_length(index + 1),
                reference as usize,
                "line {name}"
            );
        }
        assert_eq!(plate.line_length(PRE_DELAY), 0);
    }

    #[test]
    fn test_lengths_scale_with_sample_rate() {
        let plate = PlateReverb::new(44_100.0, &config(128), &Default::default()).unwrap();
        // 4453 * 44100 / 29761 = 6598.48
        assert_eq!(plate.line_length(LEFT_DELAY_1), 6598);
        // 142 * 44100 / 29761 = 210.42
        assert_eq!(plate.line_length(INPUT_DIFFUSER_1), 210);
    }

    /// A sample rate that collapses any line to zero samples is rejected,
    /// naming the first line that failed.
    #[test]
    fn test_rejects_degenerate_sample_rates() {
        for sr in [0.0, -48_000.0, f32::NAN, f32::INFINITY] {
            assert!(
                matches!(
                    PlateReverb::new(sr, &config(128), &Default::default()),
                    Err(ReverbError::MisconfiguredTopology { .. })
                ),
                "sample rate {sr} should be rejected"
            );
        }

        let result = PlateReverb::new(10.0, &config(128), &Default::default());
        assert_eq!(
            result.err(),
            Some(ReverbError::MisconfiguredTopology {
                line: "input_diffuser_1"
            })
        );
    }

    #[test]
    fn test_rejects_zero_hop() {
        assert!(matches!(
            PlateReverb::new(44_100.0, &config(0), &Default::default()),
            Err(ReverbError::InvalidBlockSize { hop: 0, .. })
        ));
    }

    /// With no feedback and no diffusion the plate is a plain multi-tap
    /// delay: the impulse reaches the tank after the four input delays,
    /// crosses each modulated line, and the only live output taps are the
    /// ones on the first delay of each half.
    #[test]
    fn test_degenerates_to_fixed_delay_echo() {
        let params = ReverbParameterSet {
            pre_delay: 0.0,
            bandwidth: 1.0,
            input_diffusion_1: 0.0,
            input_diffusion_2: 0.0,
            decay: 0.0,
            decay_diffusion_1: 0.0,
            decay_diffusion_2: 0.0,
            damping: 0.0,
            excursion_rate: 0.5,
            excursion_depth: 0.0,
            wet: 1.0,
            dry: 0.0,
            ..Default::default()
        };
        let mut plate = PlateReverb::new(REFERENCE_RATE, &config(128), &params).unwrap();
        let len = 128 * 48;
        let (left, right) = run(&mut plate, &impulse(len), &params);

        // At the reference rate: 142 + 107 + 379 + 277 = 905 samples of
        // input diffusion, then 672 (left) or 908 (right) of modulated all-pass.
        let entry = 905;
        let mut expected_left = vec![0.0; len];
        expected_left[entry + 908 + 266] += TANK_OUTPUT_GAIN;
        expected_left[entry + 908 + 2974] += TANK_OUTPUT_GAIN;
        expected_left[entry + 672 + 1990] -= TANK_OUTPUT_GAIN;

        let mut expected_right = vec![0.0; len];
        expected_right[entry + 672 + 353] += TANK_OUTPUT_GAIN;
        expected_right[entry + 672 + 3627] += TANK_OUTPUT_GAIN;
        expected_right[entry + 908 + 2111] -= TANK_OUTPUT_GAIN;

        for n in 0..len {
            assert!(
                (left[n] - expected_left[n]).abs() < 1e-5,
                "left[{n}]: expected {}, got {}",
                expected_left[n],
                left[n]
            );
            assert!(
                (right[n] - expected_right[n]).abs() < 1e-5,
                "right[{n}]: expected {}, got {}",
                expected_right[n],
                right[n]
            );
        }
    }

    /// Pre-delay shifts the whole wet response later.
    #[test]
    fn test_pre_delay_shifts_response() {
        let mut params = ReverbParameterSet {
            wet: 1.0,
            dry: 0.0,
            excursion_depth: 0.0,
            ..Default::default()
        };
        let len = 128 * 40;

        let mut plate = PlateReverb::new(REFERENCE_RATE, &config(128), &params).unwrap();
        let (base, _) = run(&mut plate, &impulse(len), &params);

        params.pre_delay = 300.0;
        let mut plate = PlateReverb::new(REFERENCE_RATE, &config(128), &params).unwrap();
        let (delayed, _) = run(&mut plate, &impulse(len), &params);

        for n in 300..len {
            assert!((delayed[n] - base[n - 300]).abs() < 1e-6, "n={n}");
        }
    }

    /// Dry-only output is the input, per channel.
    #[test]
    fn test_dry_passthrough() {
        let params = ReverbParameterSet {
            wet: 0.0,
            dry: 1.0,
            ..Default::default()
        };
        let mut plate = PlateReverb::new(44_100.0, &config(64), &params).unwrap();
        let left: Vec<f32> = (0..64).map(|n| (n as f32 * 0.3).sin()).collect();
        let right: Vec<f32> = (0..64).map(|n| (n as f32 * 0.7).cos()).collect();
        let mut outs = [vec![0.0; 64], vec![0.0; 64]];

        plate.process_hop(&[&left[..], &right[..]], &mut outs, &params);
        assert_eq!(outs[0], left);
        assert_eq!(outs[1], right);
    }

    /// 44.1 kHz, 128-sample hops, default tank (wet 0.3, dry 0.6), one unit
    /// impulse. The dry click comes out at once, then near-silence for a
    /// couple of hops, then a dense stereo tail that has fallen 60 dB by
    /// three seconds.
    #[test]
    fn test_impulse_scenario_at_44k() {
        let sr = 44_100.0;
        let params = ReverbParameterSet {
            pre_delay: 0.0,
            bandwidth: 0.9999,
            decay: 0.5,
            wet: 0.3,
            dry: 0.6,
            ..Default::default()
        };
        let mut plate = PlateReverb::new(sr, &config(128), &params).unwrap();
        let len = (3.1 * sr) as usize;
        let (left, right) = run(&mut plate, &impulse(len), &params);

        assert!((left[0] - 0.6).abs() < 1e-6);
        assert!((right[0] - 0.6).abs() < 1e-6);
        let (left, right) = (&left[1..], &right[1..]);

        assert!(
            left[..255].iter().chain(&right[..255]).all(|s| s.abs() < 1e-9),
            "wet output should be silent for the first hops"
        );

        let first = left.iter().position(|s| s.abs() > 1e-6).unwrap();
        assert!(first < (0.02 * sr) as usize, "tail began at sample {first}");

        let peak = left.iter().chain(right).fold(0.0_f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.001);

        // Dense: in the middle of the tail most samples are non-zero, and
        // the channels differ.
        let mid = (0.5 * sr) as usize..(0.6 * sr) as usize;
        let busy = left[mid.clone()].iter().filter(|s| s.abs() > peak * 1e-4).count();
        assert!(busy > mid.len() / 2, "only {busy} busy samples");
        let difference: f32 = left[mid.clone()]
            .iter()
            .zip(&right[mid])
            .map(|(l, r)| (l - r).abs())
            .sum();
        assert!(difference > 0.0);

        let late = (3.0 * sr) as usize;
        let late_peak = left[late..]
            .iter()
            .chain(&right[late..])
            .fold(0.0_f32, |m, s| m.max(s.abs()));
        assert!(
            late_peak < peak * 1e-3,
            "late peak {late_peak} vs peak {peak}"
        );
    }

    /// A near-unity decay stays bounded under sustained noise.
    #[test]
    fn test_stable_at_high_decay() {
        let params = ReverbParameterSet {
            decay: 0.99,
            damping: 0.0,
            bandwidth: 1.0,
            wet: 1.0,
            dry: 0.0,
            excursion_depth: 2.0,
            excursion_rate: 2.0,
            ..Default::default()
        };
        let mut plate = PlateReverb::new(48_000.0, &config(256), &params).unwrap();
        let mut seed = 1_u32;
        let noise: Vec<f32> = (0..48_000 * 2)
            .map(|_| {
                seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (seed >> 8) as f32 / (1 << 24) as f32 - 0.5
            })
            .collect();

        let (left, right) = run(&mut plate, &noise, &params);
        for s in left.iter().chain(&right) {
            assert!(s.is_finite() && s.abs() < 100.0, "runaway sample {s}");
        }
    }

    /// The excursion phase wraps every sample instead of growing.
    #[test]
    fn test_lfo_phase_stays_wrapped() {
        let params = ReverbParameterSet {
            excursion_rate: 2.0,
            ..Default::default()
        };
        let mut plate = PlateReverb::new(8_000.0, &config(100), &params).unwrap();
        let silence = vec![0.0; 100];
        let mut outs = [vec![0.0; 100], vec![0.0; 100]];

        for _ in 0..1000 {
            plate.process_hop(&[&silence[..]], &mut outs, &params);
            let phase = plate.lfo_phase();
            assert!((0.0..1.0).contains(&phase), "phase {phase}");
        }
    }

    /// Every line keeps its cursor invariant through processing.
    #[test]
    fn test_line_invariants_hold_while_processing() {
        let params = ReverbParameterSet::default();
        let mut plate = PlateReverb::new(44_100.0, &config(128), &params).unwrap();
        let (_, _) = run(&mut plate, &impulse(128 * 20), &params);

        for line in &plate.lines {
            assert_eq!(line.cursor_distance(), line.length());
        }
    }

    /// Parameter changes glide across the hop instead of stepping.
    #[test]
    fn test_wet_change_is_smoothed() {
        let mut params = ReverbParameterSet {
            wet: 0.0,
            dry: 1.0,
            ..Default::default()
        };
        let mut plate = PlateReverb::new(44_100.0, &config(64), &params).unwrap();
        let ones = vec![1.0; 64];
        let mut outs = [vec![0.0; 64], vec![0.0; 64]];

        plate.process_hop(&[&ones[..]], &mut outs, &params);
        params.dry = 0.0;
        plate.process_hop(&[&ones[..]], &mut outs, &params);

        // Dry gain ramps 1 → 0 over the hop; the wet tank is still silent.
        assert!((outs[0][0] - (1.0 - 1.0 / 64.0)).abs() < 1e-5);
        assert!((outs[0][31] - 0.5).abs() < 1e-5);
        assert!(outs[0][63].abs() < 1e-6);
    }

    #[test]
    fn test_mono_output_averages_channels() {
        let params = ReverbParameterSet {
            wet: 1.0,
            dry: 0.0,
            ..Default::default()
        };
        let mut stereo = PlateReverb::new(44_100.0, &config(128), &params).unwrap();
        let mut mono = PlateReverb::new(44_100.0, &config(128), &params).unwrap();
        let input = impulse(128);
        let silence = vec![0.0; 128];
        let mut stereo_out = [vec![0.0; 128], vec![0.0; 128]];
        let mut mono_out = [vec![0.0; 128]];

        for hop in 0..40 {
            let x = if hop == 0 { &input } else { &silence };
            stereo.process_hop(&[&x[..]], &mut stereo_out, &params);
            mono.process_hop(&[&x[..]], &mut mono_out, &params);
            for i in 0..128 {
                let expected = 0.5 * (stereo_out[0][i] + stereo_out[1][i]);
                assert!((mono_out[0][i] - expected).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_reset_silences_tail() {
        let params = ReverbParameterSet {
            wet: 1.0,
            dry: 0.0,
            ..Default::default()
        };
        let mut plate = PlateReverb::new(44_100.0, &config(128), &params).unwrap();
        run(&mut plate, &impulse(128 * 50), &params);
        plate.reset();

        let (left, right) = run(&mut plate, &vec![0.0; 128 * 100], &params);
        assert!(left.iter().chain(&right).all(|&s| s == 0.0));
    }

    #[test]
    fn test_tail_estimate() {
        let sr = 44_100.0;
        let plate = PlateReverb::new(sr, &config(128), &Default::default()).unwrap();

        let default_tail = plate.tail_samples(&ReverbParameterSet::default());
        assert!(
            default_tail > (0.5 * sr) as usize && default_tail < (3.0 * sr) as usize,
            "tail {default_tail}"
        );

        let dead = ReverbParameterSet {
            decay: 0.0,
            ..Default::default()
        };
        assert!(plate.tail_samples(&dead) < default_tail);

        let long = ReverbParameterSet {
            decay: 0.95,
            ..Default::default()
        };
        assert!(plate.tail_samples(&long) > default_tail);
    }
}

//! # Spectral Convolution Reverb
//!
//! Convolving with an impulse response in the time domain costs one
//! multiply per impulse sample per output sample, far too much for a
//! second-long room. In the frequency domain it is one complex multiply
//! per FFT bin:
//!
//! ```text
//! window ──► FFT ──► × impulse spectrum ──► IFFT ──► overlap-add
//! ```
//!
//! The FFT works on a large window, so the engine rides a
//! [`BlockAccumulator`] that turns the host's small hops into overlapping
//! windows and stitches the results back together.
//!
//! ## Transform Size
//!
//! Multiplying spectra performs a *circular* convolution. It equals the
//! linear convolution we want only if the FFT has room for the whole
//! result, `B + L - 1` samples for a `B`-sample window and an `L`-sample
//! impulse. Anything shorter wraps the reverb tail around onto the start
//! of the block. The FFT size is derived from the impulse capacity, and a
//! forced size that is too small fails construction with
//! [`ReverbError::TransformSizeInsufficient`].
//!
//! ## Impulse Caching
//!
//! The impulse (and its spectrum) is regenerated only when room size, tail
//! damping or density change. Regeneration happens at the start of a hop,
//! on the audio thread, into preallocated buffers, so every block is
//! convolved with exactly one impulse: wholly old or wholly new.

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use super::accumulator::{BlockAccumulator, BlockTransform};
use super::engine::ReverbAlgorithm;
use super::impulse::{ImpulseShape, ImpulseSynth};
use super::parameters::ReverbParameterSet;
use super::smoothing::HopSmoother;
use crate::{ReverbConfig, ReverbError};

/// FFT convolution of one window against the cached impulse spectrum.
pub struct SpectralConvolver {
    fft_size: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,

    /// Impulse samples; `impulse.len()` is the capacity.
    impulse: Vec<f32>,
    impulse_spectrum: Vec<Complex<f32>>,

    /// Working buffer for the window being convolved.
    buffer: Vec<Complex<f32>>,
    /// rustfft scratch space, so transforms never allocate.
    scratch: Vec<Complex<f32>>,
}

impl SpectralConvolver {
    /// `impulse_capacity` is the longest impulse this convolver can hold.
    /// `fft_size` must be a power of two that fits
    /// `window + impulse_capacity - 1` samples.
    pub fn new(
        window: usize,
        impulse_capacity: usize,
        fft_size: Option<usize>,
    ) -> Result<Self, ReverbError> {
        let required = window + impulse_capacity - 1;
        let fft_size = match fft_size {
            Some(size) if size < required => {
                return Err(ReverbError::TransformSizeInsufficient {
                    fft_size: size,
                    required,
                });
            }
            Some(size) if !size.is_power_of_two() => {
                return Err(ReverbError::TransformSizeNotPowerOfTwo { fft_size: size });
            }
            Some(size) => size,
            None => required.next_power_of_two(),
        };

        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(fft_size);
        let inverse = planner.plan_fft_inverse(fft_size);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());

        let mut convolver = Self {
            fft_size,
            forward,
            inverse,
            impulse: vec![0.0; impulse_capacity],
            impulse_spectrum: vec![Complex::new(0.0, 0.0); fft_size],
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
        };
        // Start as a unit impulse (a wire) until a real one is loaded.
        convolver.impulse[0] = 1.0;
        convolver.update_spectrum();
        Ok(convolver)
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn impulse_capacity(&self) -> usize {
        self.impulse.len()
    }

    pub fn impulse(&self) -> &[f32] {
        &self.impulse
    }

    /// Direct access for in-place synthesis. Call
    /// [`update_spectrum()`](Self::update_spectrum) afterwards.
    pub fn impulse_mut(&mut self) -> &mut [f32] {
        &mut self.impulse
    }

    /// Replace the impulse with `samples`, zero-padded to the capacity.
    pub fn load_impulse(&mut self, samples: &[f32]) -> Result<(), ReverbError> {
        if samples.len() > self.impulse.len() {
            return Err(ReverbError::ImpulseTooLong {
                len: samples.len(),
                capacity: self.impulse.len(),
            });
        }
        self.impulse[..samples.len()].copy_from_slice(samples);
        self.impulse[samples.len()..].fill(0.0);
        self.update_spectrum();
        Ok(())
    }

    /// Recompute the cached spectrum from the impulse samples.
    pub fn update_spectrum(&mut self) {
        for (bin, &sample) in self.impulse_spectrum.iter_mut().zip(&self.impulse) {
            *bin = Complex::new(sample, 0.0);
        }
        self.impulse_spectrum[self.impulse.len()..].fill(Complex::new(0.0, 0.0));
        self.forward.process_with_scratch(&mut self.impulse_spectrum, &mut self.scratch);
    }
}

impl BlockTransform for SpectralConvolver {
    fn output_len(&self, window_len: usize) -> usize {
        window_len + self.impulse.len() - 1
    }

    fn process_window(&mut self, _channel: usize, window: &[f32], output: &mut [f32]) {
        for (bin, &sample) in self.buffer.iter_mut().zip(window) {
            *bin = Complex::new(sample, 0.0);
        }
        self.buffer[window.len()..].fill(Complex::new(0.0, 0.0));

        self.forward.process_with_scratch(&mut self.buffer, &mut self.scratch);
        for (bin, ir_bin) in self.buffer.iter_mut().zip(&self.impulse_spectrum) {
            *bin = *bin * *ir_bin;
        }
        self.inverse.process_with_scratch(&mut self.buffer, &mut self.scratch);

        // rustfft does not normalize; a forward + inverse pair scales by N.
        let scale = 1.0 / self.fft_size as f32;
        for (out, bin) in output.iter_mut().zip(&self.buffer) {
            *out = bin.re * scale;
        }
    }
}

/// The convolution reverb engine: accumulator + convolver + impulse cache
/// + wet/dry mix.
pub struct ConvolutionReverb {
    accumulator: BlockAccumulator,
    convolver: SpectralConvolver,
    synth: ImpulseSynth,

    /// The shape the cached impulse was generated from. `None` forces a
    /// regeneration on the next hop.
    cached_shape: Option<ImpulseShape>,
    /// A user-supplied impulse is installed; synthesis is suspended.
    custom_impulse: bool,
    generations: u64,

    wet: HopSmoother,
    dry: HopSmoother,
    wet_gains: Vec<f32>,
    dry_gains: Vec<f32>,
}

impl ConvolutionReverb {
    pub fn new(
        sample_rate: f32,
        config: &ReverbConfig,
        channels: usize,
    ) -> Result<Self, ReverbError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(ReverbError::MisconfiguredTopology { line: "impulse" });
        }
        let impulse_capacity = (config.impulse_seconds * sample_rate).round();
        if !(impulse_capacity >= 1.0) {
            return Err(ReverbError::MisconfiguredTopology { line: "impulse" });
        }

        let convolver = SpectralConvolver::new(
            config.window_size,
            impulse_capacity as usize,
            config.fft_size,
        )?;
        let accumulator =
            BlockAccumulator::new(config.hop_size, config.window_size, channels, &convolver)?;
        let defaults = ReverbParameterSet::default();

        Ok(Self {
            accumulator,
            convolver,
            synth: ImpulseSynth::new(sample_rate, config.seed),
            cached_shape: None,
            custom_impulse: false,
            generations: 0,
            wet: HopSmoother::new(defaults.wet, config.hop_size, sample_rate),
            dry: HopSmoother::new(defaults.dry, config.hop_size, sample_rate),
            wet_gains: vec![0.0; config.hop_size],
            dry_gains: vec![0.0; config.hop_size],
        })
    }

    /// Install a fixed impulse (a measured room, or a test kernel).
    /// Parameter-driven synthesis is suspended until
    /// [`use_synthetic_impulse()`](Self::use_synthetic_impulse).
    pub fn set_impulse(&mut self, samples: &[f32]) -> Result<(), ReverbError> {
        self.convolver.load_impulse(samples)?;
        self.custom_impulse = true;
        Ok(())
    }

    /// Go back to synthesizing the impulse from the parameters. The next
    /// hop regenerates it.
    pub fn use_synthetic_impulse(&mut self) {
        self.custom_impulse = false;
        self.cached_shape = None;
    }

    /// How many times the impulse has been synthesized.
    pub fn impulse_generations(&self) -> u64 {
        self.generations
    }

    pub fn fft_size(&self) -> usize {
        self.convolver.fft_size()
    }

    pub fn impulse(&self) -> &[f32] {
        self.convolver.impulse()
    }

    /// Regenerate the impulse if its shape changed since the last hop.
    fn refresh_impulse(&mut self, params: &ReverbParameterSet) {
        if self.custom_impulse {
            return;
        }
        let shape = ImpulseShape::from_params(params);
        if self.cached_shape == Some(shape) {
            return;
        }

        self.synth.generate_into(&shape, self.convolver.impulse_mut());
        self.convolver.update_spectrum();
        self.cached_shape = Some(shape);
        self.generations += 1;
    }
}

impl ReverbAlgorithm for ConvolutionReverb {
    fn hop_size(&self) -> usize {
        self.accumulator.hop()
    }

    fn process_hop<I, O>(&mut self, inputs: &[I], outputs: &mut [O], params: &ReverbParameterSet)
    where
        I: AsRef<[f32]>,
        O: AsMut<[f32]>,
    {
        // A NaN shape never compares equal to the cached one.
        let params = params.clamped();
        self.refresh_impulse(&params);

        let hop = self.accumulator.hop();
        self.wet.set_target(params.wet);
        self.dry.set_target(params.dry);
        for (wet, dry) in self.wet_gains.iter_mut().zip(self.dry_gains.iter_mut()) {
            *wet = self.wet.next();
            *dry = self.dry.next();
        }

        // Outputs now hold the convolved (wet) signal.
        self.accumulator.process(&mut self.convolver, inputs, outputs);

        for (channel, output) in outputs.iter_mut().enumerate() {
            let output = output.as_mut();
            if channel >= inputs.len() {
                output.fill(0.0);
                continue;
            }
            let dry_in = self.accumulator.aligned_input(channel);
            for (i, out) in output.iter_mut().enumerate().take(hop) {
                *out = *out * self.wet_gains[i] + dry_in[i] * self.dry_gains[i];
            }
        }
    }

    fn reset(&mut self) {
        self.accumulator.reset();
        self.wet.reset(self.wet.value());
        self.dry.reset(self.dry.value());
    }

    fn latency(&self) -> usize {
        self.accumulator.latency()
    }

    fn tail_samples(&self, _params: &ReverbParameterSet) -> usize {
        self.convolver.impulse_capacity() + self.accumulator.latency()
    }
}

//! # Plugin Parameters
//!
//! The knobs the DAW shows. Each one maps onto a field of
//! [`ReverbParameterSet`], the plain snapshot the engines consume.
//!
//! - A **unique string ID** (`#[id = "..."]`) is what the host stores in
//!   presets and automation. Never change a published ID.
//! - Ranges and defaults follow the engine's parameter table, except
//!   pre-delay, which is shown in milliseconds and converted to samples at
//!   the running sample rate.
//!
//! ## No Host-Side Smoothing
//!
//! The engines read parameters once per hop and glide every value across
//! the hop with their own nih-plug `Smoother`s. A second smoother on the
//! `FloatParam` would only lag the controls further, so the values are read
//! raw with `.value()`.

use nih_plug::prelude::*;

use crate::dsp::parameters::{ParamId, ReverbParameterSet};

/// Which reverb engine is running.
#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// Dattorro plate: modulated all-pass/delay network.
    #[id = "plate"]
    #[name = "Plate"]
    Plate,

    /// FFT convolution with a synthetic room impulse.
    #[id = "convolution"]
    #[name = "Convolution"]
    Convolution,
}

#[derive(Params)]
pub struct ReverbParams {
    #[id = "algo"]
    pub algorithm: EnumParam<Algorithm>,

    /// **Pre-Delay**: gap before the reverb starts, in milliseconds.
    /// Up to one second.
    #[id = "predly"]
    pub pre_delay_ms: FloatParam,

    /// **Bandwidth**: lowpass on the signal entering the tank. 1 lets
    /// everything through.
    #[id = "bw"]
    pub bandwidth: FloatParam,

    #[id = "indif1"]
    pub input_diffusion_1: FloatParam,

    #[id = "indif2"]
    pub input_diffusion_2: FloatParam,

    /// **Decay**: gain around each half of the tank. Longer tails as it
    /// approaches 1.
    #[id = "decay"]
    pub decay: FloatParam,

    #[id = "dcydif1"]
    pub decay_diffusion_1: FloatParam,

    #[id = "dcydif2"]
    pub decay_diffusion_2: FloatParam,

    /// **Damping**: how quickly high frequencies die away inside the tank.
    #[id = "damp"]
    pub damping: FloatParam,

    #[id = "exrate"]
    pub excursion_rate: FloatParam,

    #[id = "exdepth"]
    pub excursion_depth: FloatParam,

    #[id = "wet"]
    pub wet: FloatParam,

    #[id = "dry"]
    pub dry: FloatParam,

    /// **Room Size** (convolution): length of the early-reflection window.
    #[id = "room"]
    pub room_size: FloatParam,

    /// **Tail Damping** (convolution): exponential decay rate of the
    /// synthetic tail, per second.
    #[id = "taildmp"]
    pub tail_damping: FloatParam,

    /// **Density** (convolution): 1 is a smooth noise tail, 0 a sparse
    /// crackle.
    #[id = "dens"]
    pub density: FloatParam,
}

const fn ms_to_samples(ms: f32, sample_rate: f32) -> f32 {
    ms * sample_rate / 1000.0
}

/// A 0..1 parameter shown as a percentage, with its range taken from the
/// engine's parameter table.
fn unit_param(name: &str, id: ParamId) -> FloatParam {
    let (min, max) = id.range();
    FloatParam::new(name, id.default_value(), FloatRange::Linear { min, max })
        .with_unit("%")
        .with_value_to_string(formatters::v2s_f32_percentage(1))
        .with_string_to_value(formatters::s2v_f32_percentage())
}

impl ReverbParams {
    /// Snapshot the current values for one hop.
    pub fn parameter_set(&self, sample_rate: f32) -> ReverbParameterSet {
        ReverbParameterSet {
            pre_delay: ms_to_samples(self.pre_delay_ms.value(), sample_rate),
            bandwidth: self.bandwidth.value(),
            input_diffusion_1: self.input_diffusion_1.value(),
            input_diffusion_2: self.input_diffusion_2.value(),
            decay: self.decay.value(),
            decay_diffusion_1: self.decay_diffusion_1.value(),
            decay_diffusion_2: self.decay_diffusion_2.value(),
            damping: self.damping.value(),
            excursion_rate: self.excursion_rate.value(),
            excursion_depth: self.excursion_depth.value(),
            wet: self.wet.value(),
            dry: self.dry.value(),
            room_size: self.room_size.value(),
            tail_damping: self.tail_damping.value(),
            density: self.density.value(),
        }
    }
}

impl Default for ReverbParams {
    fn default() -> Self {
        let (rate_min, rate_max) = ParamId::ExcursionRate.range();
        let (depth_min, depth_max) = ParamId::ExcursionDepth.range();
        let (damping_min, damping_max) = ParamId::TailDamping.range();

        Self {
            algorithm: EnumParam::new("Algorithm", Algorithm::Plate),

            pre_delay_ms: FloatParam::new(
                "Pre-Delay",
                0.0,
                FloatRange::Skewed {
                    min: 0.0,
                    max: 1000.0,
                    // Most useful pre-delays are under 100 ms.
                    factor: FloatRange::skew_factor(-1.5),
                },
            )
            .with_unit(" ms")
            .with_step_size(0.1),

            bandwidth: unit_param("Bandwidth", ParamId::Bandwidth),
            input_diffusion_1: unit_param("Input Diffusion 1", ParamId::InputDiffusion1),
            input_diffusion_2: unit_param("Input Diffusion 2", ParamId::InputDiffusion2),
            decay: unit_param("Decay", ParamId::Decay),
            decay_diffusion_1: unit_param("Decay Diffusion 1", ParamId::DecayDiffusion1),
            decay_diffusion_2: unit_param("Decay Diffusion 2", ParamId::DecayDiffusion2),
            damping: unit_param("Damping", ParamId::Damping),

            excursion_rate: FloatParam::new(
                "Mod Rate",
                ParamId::ExcursionRate.default_value(),
                FloatRange::Linear {
                    min: rate_min,
                    max: rate_max,
                },
            )
            .with_unit(" Hz")
            .with_step_size(0.01),

            excursion_depth: FloatParam::new(
                "Mod Depth",
                ParamId::ExcursionDepth.default_value(),
                FloatRange::Linear {
                    min: depth_min,
                    max: depth_max,
                },
            )
            .with_unit(" ms")
            .with_step_size(0.01),

            wet: unit_param("Wet", ParamId::Wet),
            dry: unit_param("Dry", ParamId::Dry),

            room_size: unit_param("Room Size", ParamId::RoomSize),

            tail_damping: FloatParam::new(
                "Tail Damping",
                ParamId::TailDamping.default_value(),
                FloatRange::Skewed {
                    min: damping_min,
                    max: damping_max,
                    factor: FloatRange::skew_factor(-1.0),
                },
            )
            .with_unit(" /s")
            .with_step_size(0.01),

            density: unit_param("Density", ParamId::Density),
        }
    }
}

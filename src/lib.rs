//! # Loveless Reverb: An AU/VST3/CLAP Reverb Plugin
//!
//! Two reverbs behind one set of knobs, built with
//! [nih-plug](https://github.com/robbert-vdh/nih-plug). Outputs Audio Unit
//! (AUv2), VST3, and CLAP formats from a single codebase.
//!
//! - **Plate**: Dattorro's figure-of-eight all-pass/delay network
//!   ([`dsp::plate`]).
//! - **Convolution**: FFT convolution with a seeded synthetic room impulse
//!   ([`dsp::spectral`]).
//!
//! The engines are plain library code. Anything that can hand over
//! fixed-size blocks can drive them through
//! [`ReverbProcessor`](dsp::engine::ReverbProcessor); the plugin is one such
//! host.
//!
//! ## Signal Flow (plugin)
//!
//! ```text
//!  host buffer ──► HopFramer ──► ReverbProcessor<Plate | Convolution> ──┐
//!  (any size)      (H-sample          (one hop, parameters sampled       │
//!       ▲           hops)              once per hop)                     │
//!       └────────────────────────── HopFramer ◄──────────────────────────┘
//! ```
//!
//! Reported latency is the framer's `H` plus the active engine's own
//! latency (`B - H` for convolution, 0 for the plate).

mod config;
pub mod dsp;
mod error;
mod framer;
mod params;

pub use config::ReverbConfig;
pub use error::ReverbError;

use std::num::NonZeroU32;
use std::sync::Arc;

use dsp::engine::{ProcessFlow, ReverbProcessor};
use dsp::parameters::ReverbParameterSet;
use dsp::plate::PlateReverb;
use dsp::spectral::ConvolutionReverb;
use framer::HopFramer;
use nih_plug::prelude::*;
use params::{Algorithm, ReverbParams};

/// Both engines, built together in `initialize()` so switching algorithms
/// never allocates on the audio thread.
struct Engines {
    plate: ReverbProcessor<PlateReverb>,
    convolution: ReverbProcessor<ConvolutionReverb>,
}

impl Engines {
    fn new(
        sample_rate: f32,
        config: &ReverbConfig,
        channels: usize,
        initial: &ReverbParameterSet,
    ) -> Result<Self, ReverbError> {
        Ok(Self {
            plate: ReverbProcessor::new(PlateReverb::new(sample_rate, config, initial)?),
            convolution: ReverbProcessor::new(ConvolutionReverb::new(
                sample_rate,
                config,
                channels,
            )?),
        })
    }

    fn latency(&self, algorithm: Algorithm) -> usize {
        match algorithm {
            Algorithm::Plate => self.plate.latency(),
            Algorithm::Convolution => self.convolution.latency(),
        }
    }

    fn tail_samples(&self, algorithm: Algorithm, params: &ReverbParameterSet) -> usize {
        match algorithm {
            Algorithm::Plate => self.plate.tail_samples(params),
            Algorithm::Convolution => self.convolution.tail_samples(params),
        }
    }

    fn reset(&mut self, algorithm: Algorithm) {
        match algorithm {
            Algorithm::Plate => self.plate.reset(),
            Algorithm::Convolution => self.convolution.reset(),
        }
    }

    fn process(
        &mut self,
        algorithm: Algorithm,
        inputs: &[Vec<f32>],
        outputs: &mut [Vec<f32>],
        params: &ReverbParameterSet,
    ) -> ProcessFlow {
        match algorithm {
            Algorithm::Plate => self.plate.process(inputs, outputs, params),
            Algorithm::Convolution => self.convolution.process(inputs, outputs, params),
        }
    }
}

/// The main plugin struct.
///
/// Parameters are shared with the host through the `Arc`; everything else
/// is owned by the audio thread and only touched in `initialize()`,
/// `reset()` and `process()`.
struct LovelessReverb {
    params: Arc<ReverbParams>,
    config: ReverbConfig,

    /// Set in `initialize()`. Used to convert pre-delay from milliseconds.
    sample_rate: f32,

    framer: HopFramer,

    /// `None` until `initialize()` succeeds.
    engines: Option<Engines>,

    /// The engine that processed the last hop. Compared against the
    /// algorithm parameter to notice a switch.
    active: Algorithm,
}

impl Default for LovelessReverb {
    fn default() -> Self {
        let config = ReverbConfig::default();
        Self {
            params: Arc::new(ReverbParams::default()),
            framer: HopFramer::new(config.hop_size, 0),
            config,
            // Placeholder until the host tells us the real rate.
            sample_rate: 44100.0,
            engines: None,
            active: Algorithm::Plate,
        }
    }
}

impl LovelessReverb {
    fn reported_latency(&self, engines: &Engines) -> u32 {
        (self.framer.latency() + engines.latency(self.active)) as u32
    }
}

impl Plugin for LovelessReverb {
    const NAME: &'static str = "Loveless Reverb";
    const VENDOR: &'static str = "Loveless Audio";
    const URL: &'static str = "";
    const EMAIL: &'static str = "steve.loveless@gmail.com";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[
        // Stereo layout
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(2),
            main_output_channels: NonZeroU32::new(2),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
        // Mono fallback. The plate's two outputs are averaged.
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(1),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
    ];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;

    // Parameters are sampled once per hop; splitting host buffers at
    // automation points would buy nothing.
    const SAMPLE_ACCURATE_AUTOMATION: bool = false;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    /// Build both engines for the host's sample rate and channel count.
    ///
    /// A construction error (for example a sample rate so low that a plate
    /// delay rounds to zero samples) is logged and reported to the host by
    /// returning `false`, which keeps the plugin out of the graph.
    fn initialize(
        &mut self,
        audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        context: &mut impl InitContext<Self>,
    ) -> bool {
        self.sample_rate = buffer_config.sample_rate;

        let num_channels = audio_io_layout
            .main_output_channels
            .map(|c| c.get() as usize)
            .unwrap_or(2);

        let initial = self.params.parameter_set(self.sample_rate);
        let engines = match Engines::new(self.sample_rate, &self.config, num_channels, &initial) {
            Ok(engines) => engines,
            Err(err) => {
                nih_error!("Failed to build reverb engines: {err}");
                self.engines = None;
                return false;
            }
        };

        self.framer = HopFramer::new(self.config.hop_size, num_channels);
        self.active = self.params.algorithm.value();
        context.set_latency_samples(self.reported_latency(&engines));

        nih_log!(
            "Reverb ready: {} Hz, {num_channels} channel(s), hop {}, FFT size {}",
            self.sample_rate,
            self.config.hop_size,
            engines.convolution.algorithm().fft_size()
        );
        self.engines = Some(engines);

        true
    }

    /// Playback stopped or the plugin was bypassed: drop every tail so old
    /// audio doesn't bleed into the next playback.
    fn reset(&mut self) {
        self.framer.reset();
        if let Some(engines) = self.engines.as_mut() {
            engines.plate.reset();
            engines.convolution.reset();
        }
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        let Some(engines) = self.engines.as_mut() else {
            return ProcessStatus::Error("reverb engines not initialized");
        };

        // An algorithm switch starts the new engine from silence, and the
        // host has to re-align the track for its latency.
        let selected = self.params.algorithm.value();
        if selected != self.active {
            engines.reset(selected);
            self.active = selected;
            let latency = self.framer.latency() + engines.latency(selected);
            context.set_latency_samples(latency as u32);
        }

        let params = &self.params;
        let sample_rate = self.sample_rate;
        let flow = self.framer.process(buffer.as_slice(), |inputs, outputs| {
            let hop_params = params.parameter_set(sample_rate);
            engines.process(selected, inputs, outputs, &hop_params)
        });

        if flow == ProcessFlow::Halt {
            return ProcessStatus::Error("reverb engine halted");
        }

        // Keep process() coming after the input stops so the tail rings out.
        let tail = engines.tail_samples(selected, &params.parameter_set(sample_rate))
            + self.framer.latency();
        ProcessStatus::Tail(tail as u32)
    }
}

// ─────────────────────────────────────────────────────────────────────
// Plugin format trait implementations
// ─────────────────────────────────────────────────────────────────────

impl ClapPlugin for LovelessReverb {
    const CLAP_ID: &'static str = "com.loveless-audio.loveless-reverb-v1";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("Plate and convolution reverb with a synthetic room impulse");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Reverb,
    ];
}

impl Vst3Plugin for LovelessReverb {
    // `*b"..."` turns a 16-character ASCII literal into the `[u8; 16]`
    // class ID.
    const VST3_CLASS_ID: [u8; 16] = *b"LvlssReverb_v001";

    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Reverb];
}

// ─────────────────────────────────────────────────────────────────────
// Export macros
// ─────────────────────────────────────────────────────────────────────
//
// nih_export_clap! exports the `clap_entry` symbol for CLAP hosts.
// nih_export_vst3! exports `GetPluginFactory` for VST3 hosts.
// clap_wrapper re-exports the CLAP entry point as AUv2 so Logic Pro
// (Audio Units only) can load it.

nih_export_clap!(LovelessReverb);
nih_export_vst3!(LovelessReverb);

clap_wrapper::export_auv2!();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engines_report_their_latency() {
        let config = ReverbConfig::default();
        let engines = Engines::new(44_100.0, &config, 2, &ReverbParameterSet::default()).unwrap();

        assert_eq!(engines.latency(Algorithm::Plate), 0);
        assert_eq!(
            engines.latency(Algorithm::Convolution),
            config.window_size - config.hop_size
        );
    }

    #[test]
    fn test_engine_failure_is_an_error() {
        let result = Engines::new(0.0, &ReverbConfig::default(), 2, &Default::default());
        assert!(matches!(
            result,
            Err(ReverbError::MisconfiguredTopology { .. })
        ));
    }

    /// Through the framer, the convolution engine's dry path comes out
    /// delayed by the framer hop plus the engine latency, which is what
    /// the plugin reports to the host.
    #[test]
    fn test_reported_latency_aligns_dry_signal() {
        let config = ReverbConfig {
            hop_size: 32,
            window_size: 128,
            impulse_seconds: 0.01,
            ..Default::default()
        };
        let sr = 8000.0;
        let mut engines = Engines::new(sr, &config, 1, &Default::default()).unwrap();
        let mut framer = HopFramer::new(config.hop_size, 1);
        let params = ReverbParameterSet {
            wet: 0.0,
            dry: 1.0,
            ..Default::default()
        };

        let len = 1024;
        let input: Vec<f32> = (0..len).map(|n| ((n * 7) % 13) as f32 - 6.0).collect();
        let mut output = input.clone();
        for chunk in output.chunks_mut(50) {
            framer.process(&mut [chunk], |inputs, outputs| {
                engines.process(Algorithm::Convolution, inputs, outputs, &params)
            });
        }

        let latency = framer.latency() + engines.latency(Algorithm::Convolution);
        assert_eq!(latency, 32 + 96);
        for n in latency..len {
            assert!(
                (output[n] - input[n - latency]).abs() < 1e-5,
                "n={n}: {} vs {}",
                output[n],
                input[n - latency]
            );
        }
    }
}

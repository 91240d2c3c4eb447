//! # Reverb Parameters and the Lock-Free Handoff
//!
//! Every control is a plain `f32` sampled once per hop ("k-rate"). The
//! audio thread works on a [`ReverbParameterSet`], a `Copy` snapshot.
//!
//! When the engines are used as a library rather than through the plugin
//! host, a control thread (UI, automation, a network handler) publishes
//! values through a [`ParameterHandoff`]. Each parameter is a single
//! atomic cell: the writer stores, the audio thread loads. There is no
//! lock and no queue, so a busy writer can never stall the audio thread,
//! and only the most recent value of each parameter is ever seen.

use atomic_float::AtomicF32;
use std::sync::atomic::Ordering;

/// Identifies one reverb control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamId {
    PreDelay,
    Bandwidth,
    InputDiffusion1,
    InputDiffusion2,
    Decay,
    DecayDiffusion1,
    DecayDiffusion2,
    Damping,
    ExcursionRate,
    ExcursionDepth,
    Wet,
    Dry,
    RoomSize,
    TailDamping,
    Density,
}

const PARAM_COUNT: usize = 15;

impl ParamId {
    pub const ALL: [ParamId; PARAM_COUNT] = [
        ParamId::PreDelay,
        ParamId::Bandwidth,
        ParamId::InputDiffusion1,
        ParamId::InputDiffusion2,
        ParamId::Decay,
        ParamId::DecayDiffusion1,
        ParamId::DecayDiffusion2,
        ParamId::Damping,
        ParamId::ExcursionRate,
        ParamId::ExcursionDepth,
        ParamId::Wet,
        ParamId::Dry,
        ParamId::RoomSize,
        ParamId::TailDamping,
        ParamId::Density,
    ];

    /// The external name of the control.
    pub fn name(self) -> &'static str {
        match self {
            ParamId::PreDelay => "preDelay",
            ParamId::Bandwidth => "bandwidth",
            ParamId::InputDiffusion1 => "inputDiffusion1",
            ParamId::InputDiffusion2 => "inputDiffusion2",
            ParamId::Decay => "decay",
            ParamId::DecayDiffusion1 => "decayDiffusion1",
            ParamId::DecayDiffusion2 => "decayDiffusion2",
            ParamId::Damping => "damping",
            ParamId::ExcursionRate => "excursionRate",
            ParamId::ExcursionDepth => "excursionDepth",
            ParamId::Wet => "wet",
            ParamId::Dry => "dry",
            ParamId::RoomSize => "roomSize",
            ParamId::TailDamping => "tailDamping",
            ParamId::Density => "density",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.name() == name)
    }

    /// `(min, max)`. Pre-delay is in samples; its upper bound of one
    /// second depends on the sample rate, so it is enforced by the engine.
    pub fn range(self) -> (f32, f32) {
        match self {
            ParamId::PreDelay => (0.0, f32::MAX),
            ParamId::DecayDiffusion1 => (0.0, 0.999_999),
            ParamId::ExcursionRate | ParamId::ExcursionDepth => (0.0, 2.0),
            ParamId::TailDamping => (0.1, 20.0),
            _ => (0.0, 1.0),
        }
    }

    pub fn default_value(self) -> f32 {
        ReverbParameterSet::default().get(self)
    }

    pub fn clamp(self, value: f32) -> f32 {
        let (min, max) = self.range();
        if value.is_nan() {
            self.default_value()
        } else {
            value.clamp(min, max)
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// One hop's worth of control values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReverbParameterSet {
    /// Pre-delay in samples.
    pub pre_delay: f32,
    /// Input lowpass gain. 1 = full bandwidth.
    pub bandwidth: f32,
    pub input_diffusion_1: f32,
    pub input_diffusion_2: f32,
    /// Tank feedback gain.
    pub decay: f32,
    pub decay_diffusion_1: f32,
    pub decay_diffusion_2: f32,
    /// Tank lowpass amount; the filter gain is `1 - damping`.
    pub damping: f32,
    /// Tank modulation rate in Hz.
    pub excursion_rate: f32,
    /// Tank modulation depth in milliseconds.
    pub excursion_depth: f32,
    pub wet: f32,
    pub dry: f32,
    /// Convolution engine: early-reflection window, as a fraction of 0.1 s.
    pub room_size: f32,
    /// Convolution engine: exponential tail decay rate per second.
    pub tail_damping: f32,
    /// Convolution engine: 1 = dense noise tail, 0 = sparse crackle.
    pub density: f32,
}

impl Default for ReverbParameterSet {
    fn default() -> Self {
        Self {
            pre_delay: 0.0,
            bandwidth: 0.9999,
            input_diffusion_1: 0.75,
            input_diffusion_2: 0.625,
            decay: 0.5,
            decay_diffusion_1: 0.7,
            decay_diffusion_2: 0.5,
            damping: 0.005,
            excursion_rate: 0.5,
            excursion_depth: 0.7,
            wet: 0.3,
            dry: 0.6,
            room_size: 0.5,
            tail_damping: 3.0,
            density: 0.7,
        }
    }
}

impl ReverbParameterSet {
    pub fn get(&self, id: ParamId) -> f32 {
        match id {
            ParamId::PreDelay => self.pre_delay,
            ParamId::Bandwidth => self.bandwidth,
            ParamId::InputDiffusion1 => self.input_diffusion_1,
            ParamId::InputDiffusion2 => self.input_diffusion_2,
            ParamId::Decay => self.decay,
            ParamId::DecayDiffusion1 => self.decay_diffusion_1,
            ParamId::DecayDiffusion2 => self.decay_diffusion_2,
            ParamId::Damping => self.damping,
            ParamId::ExcursionRate => self.excursion_rate,
            ParamId::ExcursionDepth => self.excursion_depth,
            ParamId::Wet => self.wet,
            ParamId::Dry => self.dry,
            ParamId::RoomSize => self.room_size,
            ParamId::TailDamping => self.tail_damping,
            ParamId::Density => self.density,
        }
    }

    /// Store a value, clamped to the parameter's range.
    pub fn set(&mut self, id: ParamId, value: f32) {
        let value = id.clamp(value);
        let slot = match id {
            ParamId::PreDelay => &mut self.pre_delay,
            ParamId::Bandwidth => &mut self.bandwidth,
            ParamId::InputDiffusion1 => &mut self.input_diffusion_1,
            ParamId::InputDiffusion2 => &mut self.input_diffusion_2,
            ParamId::Decay => &mut self.decay,
            ParamId::DecayDiffusion1 => &mut self.decay_diffusion_1,
            ParamId::DecayDiffusion2 => &mut self.decay_diffusion_2,
            ParamId::Damping => &mut self.damping,
            ParamId::ExcursionRate => &mut self.excursion_rate,
            ParamId::ExcursionDepth => &mut self.excursion_depth,
            ParamId::Wet => &mut self.wet,
            ParamId::Dry => &mut self.dry,
            ParamId::RoomSize => &mut self.room_size,
            ParamId::TailDamping => &mut self.tail_damping,
            ParamId::Density => &mut self.density,
        };
        *slot = value;
    }

    /// A copy with every field forced into range.
    pub fn clamped(&self) -> Self {
        let mut out = *self;
        for id in ParamId::ALL {
            out.set(id, self.get(id));
        }
        out
    }
}

/// Single-writer / single-reader, last-value-wins parameter cells.
///
/// Share it between threads in an `Arc`. The control side calls
/// [`set()`](Self::set) whenever it likes; the audio side calls
/// [`snapshot()`](Self::snapshot) once at the start of every hop.
pub struct ParameterHandoff {
    values: [AtomicF32; PARAM_COUNT],
}

impl ParameterHandoff {
    pub fn new(initial: ReverbParameterSet) -> Self {
        Self {
            values: ParamId::ALL.map(|id| AtomicF32::new(id.clamp(initial.get(id)))),
        }
    }

    /// Publish a new value. Clamped to the parameter's range.
    ///
    /// Each cell is independent, so `Relaxed` ordering is enough: the
    /// reader only needs to eventually see the latest store to each cell.
    pub fn set(&self, id: ParamId, value: f32) {
        self.values[id.index()].store(id.clamp(value), Ordering::Relaxed);
    }

    /// Publish by external name. Returns `false` for an unknown name.
    pub fn set_by_name(&self, name: &str, value: f32) -> bool {
        match ParamId::from_name(name) {
            Some(id) => {
                self.set(id, value);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: ParamId) -> f32 {
        self.values[id.index()].load(Ordering::Relaxed)
    }

    /// Read every cell once. Wait-free; called on the audio thread.
    pub fn snapshot(&self) -> ReverbParameterSet {
        let mut params = ReverbParameterSet::default();
        for id in ParamId::ALL {
            params.set(id, self.get(id));
        }
        params
    }
}

impl Default for ParameterHandoff {
    fn default() -> Self {
        Self::new(ReverbParameterSet::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_defaults_match_parameter_table() {
        let p = ReverbParameterSet::default();
        assert_eq!(p.pre_delay, 0.0);
        assert_eq!(p.bandwidth, 0.9999);
        assert_eq!(p.input_diffusion_1, 0.75);
        assert_eq!(p.input_diffusion_2, 0.625);
        assert_eq!(p.decay, 0.5);
        assert_eq!(p.decay_diffusion_1, 0.7);
        assert_eq!(p.decay_diffusion_2, 0.5);
        assert_eq!(p.damping, 0.005);
        assert_eq!(p.excursion_rate, 0.5);
        assert_eq!(p.excursion_depth, 0.7);
        assert_eq!(p.wet, 0.3);
        assert_eq!(p.dry, 0.6);
    }

    #[test]
    fn test_names_round_trip() {
        for id in ParamId::ALL {
            assert_eq!(ParamId::from_name(id.name()), Some(id));
        }
        assert_eq!(ParamId::from_name("feedback"), None);
    }

    #[test]
    fn test_index_matches_declaration_order() {
        for (i, id) in ParamId::ALL.into_iter().enumerate() {
            assert_eq!(id.index(), i);
        }
    }

    #[test]
    fn test_set_clamps_to_range() {
        let mut p = ReverbParameterSet::default();
        p.set(ParamId::DecayDiffusion1, 1.5);
        assert_eq!(p.decay_diffusion_1, 0.999_999);

        p.set(ParamId::ExcursionRate, 5.0);
        assert_eq!(p.excursion_rate, 2.0);

        p.set(ParamId::Wet, -0.2);
        assert_eq!(p.wet, 0.0);

        p.set(ParamId::Decay, f32::NAN);
        assert_eq!(p.decay, 0.5);
    }

    #[test]
    fn test_handoff_is_last_value_wins() {
        let handoff = ParameterHandoff::default();
        handoff.set(ParamId::Decay, 0.1);
        handoff.set(ParamId::Decay, 0.2);
        handoff.set(ParamId::Decay, 0.85);

        let snapshot = handoff.snapshot();
        assert_eq!(snapshot.decay, 0.85);
        assert_eq!(snapshot.wet, 0.3);
    }

    #[test]
    fn test_handoff_by_name() {
        let handoff = ParameterHandoff::default();
        assert!(handoff.set_by_name("dry", 0.1));
        assert!(!handoff.set_by_name("nope", 0.1));
        assert_eq!(handoff.snapshot().dry, 0.1);
    }

    /// A writer thread's final value is what the reader sees once the
    /// writer is done.
    #[test]
    fn test_handoff_across_threads() {
        let handoff = Arc::new(ParameterHandoff::default());

        let writer = {
            let handoff = Arc::clone(&handoff);
            thread::spawn(move || {
                for i in 0..=1000 {
                    handoff.set(ParamId::Wet, i as f32 / 1000.0);
                }
            })
        };

        // Reads while the writer runs always observe an in-range value.
        for _ in 0..1000 {
            let wet = handoff.snapshot().wet;
            assert!((0.0..=1.0).contains(&wet));
        }

        writer.join().unwrap();
        assert_eq!(handoff.snapshot().wet, 1.0);
    }
}

//! # Hop-Level Processing Entry Point
//!
//! Both reverb engines implement [`ReverbAlgorithm`]. A
//! [`ReverbProcessor`] wraps one of them and is what a host calls once per
//! hop:
//!
//! ```text
//! process(inputs, outputs, parameters) -> ProcessFlow::{Continue, Halt}
//! ```
//!
//! The processor owns the halt flag. Another thread may raise it at any
//! time; it is only looked at *between* hops, so a hop that has started
//! always finishes and the engine is never torn down mid-block.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nih_plug::nih_debug_assert;

use super::parameters::{ParameterHandoff, ReverbParameterSet};

/// Whether the host should keep calling `process()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessFlow {
    Continue,
    Halt,
}

/// A reverb that processes fixed-size hops.
///
/// Inputs and outputs are per-channel blocks of exactly
/// [`hop_size()`](Self::hop_size) samples. They are generic so callers can
/// pass borrowed slices or owned buffers without building a new `Vec`.
pub trait ReverbAlgorithm {
    fn hop_size(&self) -> usize;

    fn process_hop<I, O>(&mut self, inputs: &[I], outputs: &mut [O], params: &ReverbParameterSet)
    where
        I: AsRef<[f32]>,
        O: AsMut<[f32]>;

    /// Silence all internal state.
    fn reset(&mut self);

    /// Samples of delay the algorithm adds to the dry signal path.
    fn latency(&self) -> usize {
        0
    }

    /// Roughly how many samples the output keeps ringing after the input
    /// goes silent, until it is 60 dB down.
    fn tail_samples(&self, params: &ReverbParameterSet) -> usize;
}

/// The host-facing wrapper around one [`ReverbAlgorithm`].
pub struct ReverbProcessor<A> {
    algorithm: A,
    halt: Arc<AtomicBool>,
}

impl<A: ReverbAlgorithm> ReverbProcessor<A> {
    pub fn new(algorithm: A) -> Self {
        Self {
            algorithm,
            halt: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A handle to the cancellation flag. Storing `true` makes every later
    /// call to [`process()`](Self::process) return [`ProcessFlow::Halt`].
    pub fn halt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.halt)
    }

    /// Process one hop with the given block-rate parameters.
    ///
    /// When halted, the outputs are silenced and the engine state is left
    /// untouched.
    pub fn process<I, O>(
        &mut self,
        inputs: &[I],
        outputs: &mut [O],
        params: &ReverbParameterSet,
    ) -> ProcessFlow
    where
        I: AsRef<[f32]>,
        O: AsMut<[f32]>,
    {
        if self.halt.load(Ordering::Acquire) {
            for output in outputs.iter_mut() {
                output.as_mut().fill(0.0);
            }
            return ProcessFlow::Halt;
        }

        let hop = self.algorithm.hop_size();
        nih_debug_assert!(
            inputs.iter().all(|block| block.as_ref().len() == hop),
            "input blocks must be exactly one hop long"
        );
        nih_debug_assert!(
            outputs.iter_mut().all(|block| block.as_mut().len() == hop),
            "output blocks must be exactly one hop long"
        );

        self.algorithm.process_hop(inputs, outputs, params);
        ProcessFlow::Continue
    }

    /// Process one hop, sampling the parameters from a lock-free handoff.
    pub fn process_shared<I, O>(
        &mut self,
        inputs: &[I],
        outputs: &mut [O],
        handoff: &ParameterHandoff,
    ) -> ProcessFlow
    where
        I: AsRef<[f32]>,
        O: AsMut<[f32]>,
    {
        let params = handoff.snapshot();
        self.process(inputs, outputs, &params)
    }

    pub fn reset(&mut self) {
        self.algorithm.reset();
    }

    pub fn latency(&self) -> usize {
        self.algorithm.latency()
    }

    pub fn tail_samples(&self, params: &ReverbParameterSet) -> usize {
        self.algorithm.tail_samples(params)
    }

    pub fn algorithm(&self) -> &A {
        &self.algorithm
    }

    pub fn algorithm_mut(&mut self) -> &mut A {
        &mut self.algorithm
    }
}

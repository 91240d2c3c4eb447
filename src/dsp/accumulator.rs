//! # Block Accumulator (Overlap-Add Front End)
//!
//! The host hands us a small hop of `H` samples per callback (say 128),
//! but an FFT-based algorithm wants a much larger window of `B = k · H`
//! samples to work on. The accumulator bridges the two without clicks:
//!
//! ```text
//!  hop t-3   hop t-2   hop t-1   hop t
//! ┌─────────┬─────────┬─────────┬─────────┐
//! │         │         │         │ new hop │  rolling input (B + H)
//! └─────────┴─────────┴─────────┴─────────┘
//!           └──────── head (B samples) ───┘ ──► transform ──► window
//!
//!  output accumulator:  += window / k,  emit first H,  shift left by H
//! ```
//!
//! Every hop the newest `B` samples are transformed, so each input sample
//! is seen by `k` consecutive windows. Each window's contribution is scaled
//! by `1/k`; once a sample has passed through all `k` windows the scaled
//! copies sum back to unit gain. The price is `B - H` samples of latency.
//!
//! A transform may return more than `B` samples. A linear convolution with
//! an `L`-sample impulse produces `B + L - 1`; the whole window is
//! overlap-added so the convolution tail is never cut off.

use crate::ReverbError;

/// The algorithm wrapped by a [`BlockAccumulator`].
pub trait BlockTransform {
    /// How many output samples a `window_len`-sample input produces.
    fn output_len(&self, window_len: usize) -> usize {
        window_len
    }

    /// Transform one channel's head window into `output`.
    ///
    /// `output` is exactly `output_len(window.len())` samples long (or `B`,
    /// whichever is larger) and must be fully overwritten.
    fn process_window(&mut self, channel: usize, window: &[f32], output: &mut [f32]);
}

/// Per-channel buffers, allocated together and never resized while
/// processing.
struct ChannelBuffers {
    /// The last `B + H` input samples, oldest first.
    rolling: Vec<f32>,

    /// Not-yet-emitted output. Always `output_len + H` long.
    accumulator: Vec<f32>,

    /// Transform output for the current hop.
    scratch: Vec<f32>,
}

impl ChannelBuffers {
    fn new(hop: usize, window: usize, output_len: usize) -> Self {
        Self {
            rolling: vec![0.0; window + hop],
            accumulator: vec![0.0; output_len + hop],
            scratch: vec![0.0; output_len],
        }
    }

    fn clear(&mut self) {
        self.rolling.fill(0.0);
        self.accumulator.fill(0.0);
        self.scratch.fill(0.0);
    }
}

/// Decouples a window size `B` from the host hop size `H` by weighted
/// overlap-add.
pub struct BlockAccumulator {
    hop: usize,
    window: usize,
    output_len: usize,

    /// `1 / k`, the weight of each overlapping window.
    overlap_gain: f32,

    channels: Vec<ChannelBuffers>,
}

impl BlockAccumulator {
    /// Create an accumulator for `hop`-sample callbacks and a `window`-sample
    /// transform. `window` must be a non-zero multiple of `hop`.
    ///
    /// Buffers for `channels` channels are allocated immediately.
    pub fn new<T: BlockTransform>(
        hop: usize,
        window: usize,
        channels: usize,
        transform: &T,
    ) -> Result<Self, ReverbError> {
        if hop == 0 || window == 0 || window % hop != 0 {
            return Err(ReverbError::InvalidBlockSize { hop, window });
        }

        let output_len = transform.output_len(window).max(window);
        let overlap = window / hop;

        Ok(Self {
            hop,
            window,
            output_len,
            overlap_gain: 1.0 / overlap as f32,
            channels: (0..channels)
                .map(|_| ChannelBuffers::new(hop, window, output_len))
                .collect(),
        })
    }

    pub fn hop(&self) -> usize {
        self.hop
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// `k = B / H`, the number of windows each sample passes through.
    pub fn overlap(&self) -> usize {
        self.window / self.hop
    }

    /// Samples between a sample entering and its reconstruction leaving.
    pub fn latency(&self) -> usize {
        self.window - self.hop
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Run one hop.
    ///
    /// The number of input slices decides the channel count. If it differs
    /// from the previous hop the buffers are reallocated and start from
    /// silence. Inputs and outputs shorter than the hop are zero-padded
    /// and truncated respectively.
    pub fn process<T, I, O>(&mut self, transform: &mut T, inputs: &[I], outputs: &mut [O])
    where
        T: BlockTransform,
        I: AsRef<[f32]>,
        O: AsMut<[f32]>,
    {
        if inputs.len() != self.channels.len() {
            self.reallocate(inputs.len());
        }

        let hop = self.hop;
        let window = self.window;
        let gain = self.overlap_gain;

        for (channel, (state, input)) in self.channels.iter_mut().zip(inputs).enumerate() {
            // 1. Slide the rolling buffer and append the new hop.
            let input = input.as_ref();
            let n = input.len().min(hop);
            state.rolling.copy_within(hop.., 0);
            state.rolling[window..window + n].copy_from_slice(&input[..n]);
            state.rolling[window + n..].fill(0.0);

            // 2-3. Transform the newest B samples.
            transform.process_window(channel, &state.rolling[hop..], &mut state.scratch);

            // 4. Weighted overlap-add.
            for (acc, &y) in state.accumulator.iter_mut().zip(&state.scratch) {
                *acc += y * gain;
            }

            // 5. Emit, shift, zero-fill.
            if let Some(output) = outputs.get_mut(channel) {
                let output = output.as_mut();
                let n = output.len().min(hop);
                output[..n].copy_from_slice(&state.accumulator[..n]);
            }
            state.accumulator.copy_within(hop.., 0);
            let len = state.accumulator.len();
            state.accumulator[len - hop..].fill(0.0);
        }
    }

    /// This hop's input delayed by [`latency()`](Self::latency), for mixing
    /// a dry signal that lines up with the processed output.
    pub fn aligned_input(&self, channel: usize) -> &[f32] {
        match self.channels.get(channel) {
            Some(state) => &state.rolling[self.hop..2 * self.hop],
            None => &[],
        }
    }

    /// Silence every buffer.
    pub fn reset(&mut self) {
        for state in &mut self.channels {
            state.clear();
        }
    }

    fn reallocate(&mut self, channels: usize) {
        let (hop, window, output_len) = (self.hop, self.window, self.output_len);
        self.channels = (0..channels)
            .map(|_| ChannelBuffers::new(hop, window, output_len))
            .collect();
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

//! # Host Buffer → Fixed Hop Framing
//!
//! A DAW hands `process()` whatever buffer size it likes: 64 samples, 441,
//! sometimes a single sample at a loop point. The engines want exactly `H`
//! samples per call. The framer sits in between:
//!
//! ```text
//!  host:   |--37--|------------200------------|--19--|...
//!  framer: |------ H ------|------ H ------|------ H ------|
//!                          ▲ hop k is processed here and played back
//!                            during hop k + 1
//! ```
//!
//! Each incoming sample is swapped for the sample at the same position of
//! the previous hop's output. That adds exactly `H` samples of latency for
//! any host buffer size, and no allocation after construction.

use crate::dsp::engine::ProcessFlow;

pub struct HopFramer {
    hop: usize,
    /// The hop being filled, one block per channel.
    pending_input: Vec<Vec<f32>>,
    /// The last processed hop, being played back.
    ready_output: Vec<Vec<f32>>,
    /// Position inside the current hop.
    position: usize,
}

impl HopFramer {
    pub fn new(hop: usize, channels: usize) -> Self {
        Self {
            hop,
            pending_input: vec![vec![0.0; hop]; channels],
            ready_output: vec![vec![0.0; hop]; channels],
            position: 0,
        }
    }

    /// Samples between a sample entering and its processed version leaving.
    pub fn latency(&self) -> usize {
        self.hop
    }

    pub fn reset(&mut self) {
        for block in self.pending_input.iter_mut().chain(self.ready_output.iter_mut()) {
            block.fill(0.0);
        }
        self.position = 0;
    }

    /// Run the host's channels through in place, calling `process_hop` every
    /// time a hop fills up.
    ///
    /// Channels beyond the framer's channel count are silenced. Returns
    /// [`ProcessFlow::Halt`] if any hop in this buffer asked to halt.
    pub fn process<F>(&mut self, channels: &mut [&mut [f32]], mut process_hop: F) -> ProcessFlow
    where
        F: FnMut(&[Vec<f32>], &mut [Vec<f32>]) -> ProcessFlow,
    {
        let mut flow = ProcessFlow::Continue;
        if self.hop == 0 {
            return flow;
        }

        for channel in channels.iter_mut().skip(self.pending_input.len()) {
            channel.fill(0.0);
        }

        let num_samples = channels.iter().map(|c| c.len()).min().unwrap_or(0);
        for i in 0..num_samples {
            for (ch, channel) in channels.iter_mut().enumerate().take(self.pending_input.len()) {
                self.pending_input[ch][self.position] = channel[i];
                channel[i] = self.ready_output[ch][self.position];
            }

            self.position += 1;
            if self.position == self.hop {
                self.position = 0;
                if process_hop(&self.pending_input, &mut self.ready_output) == ProcessFlow::Halt {
                    flow = ProcessFlow::Halt;
                }
            }
        }

        flow
    }
}

//! # Engine Configuration
//!
//! Sizes that are fixed for the lifetime of an engine. Everything the user
//! can turn while audio is running is a parameter instead (see
//! [`ReverbParameterSet`](crate::dsp::parameters::ReverbParameterSet)).

/// Construction-time sizes shared by both reverb engines.
#[derive(Debug, Clone, PartialEq)]
pub struct ReverbConfig {
    /// Samples per processing hop (`H`). Every call to `process()` handles
    /// exactly this many samples per channel.
    pub hop_size: usize,

    /// Convolution analysis window (`B`). Must be a multiple of
    /// `hop_size`; the overlap factor is `B / H`.
    pub window_size: usize,

    /// Length of the synthetic impulse response in seconds. Decides the
    /// impulse capacity and therefore the FFT size.
    pub impulse_seconds: f32,

    /// Force a specific FFT size. `None` picks the smallest power of two
    /// that holds a full linear convolution. A forced size that is too
    /// small is rejected at construction.
    pub fft_size: Option<usize>,

    /// Seed for the impulse noise generator.
    pub seed: u64,
}

impl Default for ReverbConfig {
    fn default() -> Self {
        Self {
            hop_size: 128,
            window_size: 1024,
            impulse_seconds: 1.0,
            fft_size: None,
            seed: 0x5EED_1997,
        }
    }
}

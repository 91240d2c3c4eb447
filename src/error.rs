//! # Construction Errors
//!
//! Everything that can go wrong with a reverb engine goes wrong while it is
//! being built. Once an engine exists, `process()` cannot fail: there is
//! nothing meaningful to retry in the middle of a real-time audio callback,
//! so every size and topology check happens up front and a failed check
//! keeps the engine out of the processing graph entirely.

use thiserror::Error;

/// Errors returned by the engine constructors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReverbError {
    /// A delay line's length rounded to zero samples. This happens when
    /// the sample rate is zero, negative, NaN, or so low that the scaled
    /// topology collapses.
    #[error("delay line `{line}` rounds to zero samples at this sample rate")]
    MisconfiguredTopology { line: &'static str },

    /// The analysis window must be a non-zero whole multiple of the hop.
    #[error("window of {window} samples is not a non-zero multiple of the {hop}-sample hop")]
    InvalidBlockSize { hop: usize, window: usize },

    /// The FFT is too short to hold a full linear convolution, so the tail
    /// would wrap around into the start of the block.
    #[error("FFT size {fft_size} is smaller than the {required} samples a linear convolution needs")]
    TransformSizeInsufficient { fft_size: usize, required: usize },

    /// An explicit FFT size must be a power of two.
    #[error("FFT size {fft_size} is not a power of two")]
    TransformSizeNotPowerOfTwo { fft_size: usize },

    /// A custom impulse response does not fit the impulse capacity chosen
    /// at construction.
    #[error("impulse response of {len} samples exceeds the capacity of {capacity}")]
    ImpulseTooLong { len: usize, capacity: usize },
}

//! # DSP (Digital Signal Processing) Building Blocks
//!
//! Everything that touches audio lives here. None of it depends on the
//! plugin wrapper, so the engines can be driven from tests or any other
//! host that hands over fixed-size blocks.
//!
//! - **`delay_line`**: power-of-two ring buffer with taps and cubic
//!   fractional reads. Every block of the plate is one of these.
//!
//! - **`filter`**: the one-pole lowpass used for the plate's input
//!   bandwidth and in-tank damping.
//!
//! - **`smoothing`**: linear ramps that spread a per-hop parameter change
//!   across the samples of the hop.
//!
//! - **`parameters`**: the named parameter table, the per-hop parameter
//!   snapshot, and the lock-free handoff a control thread writes into.
//!
//! - **`engine`**: the `ReverbAlgorithm` trait and the `ReverbProcessor`
//!   entry point with its continue/halt contract.
//!
//! - **`accumulator`**: overlap-add framing from small hops to large
//!   analysis windows.
//!
//! - **`impulse`**: seeded synthetic room impulses.
//!
//! - **`plate`** and **`spectral`**: the two reverb engines.

pub mod accumulator;
pub mod delay_line;
pub mod engine;
pub mod filter;
pub mod impulse;
pub mod parameters;
pub mod plate;
pub mod smoothing;
pub mod spectral;

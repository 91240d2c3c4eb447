//! # Delay Line (Power-of-Two Ring Buffer)
//!
//! A delay line stores audio samples and hands them back a fixed number of
//! samples later. Every block in the plate reverb (pre-delay, diffusers,
//! tank delays) is one of these.
//!
//! ## Cursors and the Length Invariant
//!
//! The line owns a write cursor and a read cursor. Both advance by exactly
//! one slot per processed sample, so the distance between them never
//! changes on its own:
//!
//! ```text
//! (write_pos - read_pos) mod capacity == length
//! ```
//!
//! `read()` therefore always returns the sample written `length` steps ago.
//! Changing the delay (the pre-delay knob, for example) moves the read
//! cursor; it never touches the buffer.
//!
//! ## Why Power-of-Two Capacity?
//!
//! With a capacity of `2^n`, wrapping an index is a single AND with
//! `capacity - 1` instead of a `%` (an integer division). The capacity is
//! rounded up from the requested length plus any headroom, plus one spare
//! slot so that a line of length `L` never has its read and write cursors
//! on the same slot.
//!
//! ## Taps and Fractional Reads
//!
//! Besides the main read cursor, any number of extra read points ("taps")
//! can be taken at integer offsets behind the write cursor. The modulated
//! all-passes in the plate tank read at a *fractional* offset that wobbles
//! a few samples back and forth; those reads use 4-point cubic (Hermite)
//! interpolation over the nearest stored samples, which returns the stored
//! sample exactly when the offset is a whole number.

use std::num::NonZeroUsize;

/// Smallest ring that still holds the four neighbours of a cubic read.
const MIN_CAPACITY: usize = 4;

/// A circular buffer with a bitmask-wrapped write cursor and read cursor.
///
/// Allocated once; no memory is allocated while processing.
pub struct DelayLine {
    buffer: Vec<f32>,

    /// `capacity - 1`. ANDing an index with this wraps it into the buffer.
    mask: usize,

    /// Where the current sample will be written.
    write_pos: usize,

    /// Where the sample written `length` steps ago lives.
    read_pos: usize,

    /// Current delay in samples, always `< capacity`.
    length: usize,
}

impl DelayLine {
    /// Create a delay line of `length` samples.
    ///
    /// `headroom` reserves extra slots beyond `length` for reads that reach
    /// further back than the nominal delay (modulated taps, interpolation
    /// neighbours, a pre-delay that can grow at runtime).
    ///
    /// `NonZeroUsize` guarantees the line has at least one sample of
    /// delay. Callers turn a zero-length request into a
    /// [`ReverbError::MisconfiguredTopology`](crate::ReverbError) before
    /// getting here.
    pub fn new(length: NonZeroUsize, headroom: usize) -> Self {
        let length = length.get();
        let capacity = (length + headroom + 1)
            .next_power_of_two()
            .max(MIN_CAPACITY);
        let mut line = Self {
            buffer: vec![0.0; capacity],
            mask: capacity - 1,
            write_pos: 0,
            read_pos: 0,
            length: 0,
        };
        line.set_length(length);
        line
    }

    /// Number of slots in the ring. Always a power of two.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Current delay in samples.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Change the delay. Clamped to `capacity - 1`. A length of zero is
    /// allowed; `read()` then returns the slot about to be written, so the
    /// caller must `write()` before it `read()`s.
    pub fn set_length(&mut self, length: usize) {
        self.length = length.min(self.mask);
        self.read_pos = self.write_pos.wrapping_sub(self.length) & self.mask;
    }

    /// The sample written `length` steps ago.
    #[inline]
    pub fn read(&self) -> f32 {
        self.buffer[self.read_pos]
    }

    /// Store a sample at the write cursor. Does not advance.
    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
    }

    /// The sample written `offset` steps ago.
    ///
    /// `tap(length())` is the same as `read()`. Offsets beyond the capacity
    /// wrap around the ring.
    #[inline]
    pub fn tap(&self, offset: usize) -> f32 {
        self.buffer[self.write_pos.wrapping_sub(offset) & self.mask]
    }

    /// Read `offset` samples back with 4-point cubic (Catmull-Rom Hermite)
    /// interpolation.
    ///
    /// With `offset = i + f` the curve passes through `tap(i)` at `f = 0`
    /// and `tap(i + 1)` at `f = 1`, using `tap(i - 1)` and `tap(i + 2)` to
    /// shape the slope. The offset is clamped to `[1, capacity - 3]` so
    /// all four neighbours stay inside the ring. NaN reads at offset 1.
    #[inline]
    pub fn read_cubic(&self, offset: f32) -> f32 {
        debug_assert!(self.capacity() >= MIN_CAPACITY);
        let max_offset = (self.capacity() - 3) as f32;
        // `f32::max` drops a NaN operand.
        let offset = offset.max(1.0).min(max_offset);

        let whole = offset as usize;
        let frac = offset - whole as f32;

        let x0 = self.tap(whole - 1);
        let x1 = self.tap(whole);
        let x2 = self.tap(whole + 1);
        let x3 = self.tap(whole + 2);

        let c1 = 0.5 * (x2 - x0);
        let c2 = x0 - 2.5 * x1 + 2.0 * x2 - 0.5 * x3;
        let c3 = 0.5 * (x3 - x0) + 1.5 * (x1 - x2);

        ((c3 * frac + c2) * frac + c1) * frac + x1
    }

    /// Move both cursors one slot forward.
    #[inline]
    pub fn advance(&mut self) {
        self.write_pos = (self.write_pos + 1) & self.mask;
        self.read_pos = (self.read_pos + 1) & self.mask;
    }

    /// Silence the buffer and rewind the cursors, keeping the length.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
        self.read_pos = self.write_pos.wrapping_sub(self.length) & self.mask;
    }

    /// `(write - read) mod capacity`. Equal to `length()` at every step.
    pub fn cursor_distance(&self) -> usize {
        self.write_pos.wrapping_sub(self.read_pos) & self.mask
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

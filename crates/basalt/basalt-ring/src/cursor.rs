//! Bounds-checked ring index arithmetic.
//!
//! Cursors stored in the shared segment are raw `u32`s; everything that
//! touches the byte ring goes through `RingIndex`, which keeps the value in
//! `[0, N)` no matter what was read back from shared memory.

/// A position inside a ring of `N` byte slots.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct RingIndex<const N: usize>(u32);

impl<const N: usize> RingIndex<N> {
    /// Wraps a raw cursor value into range.
    ///
    /// A cursor outside `[0, N)` can only appear if another process corrupted
    /// the segment; clamping via modulo keeps every buffer access in bounds.
    #[inline(always)]
    pub(crate) fn new(raw: u32) -> Self {
        Self(raw % N as u32)
    }

    #[inline(always)]
    pub(crate) fn get(self) -> usize {
        self.0 as usize
    }

    #[inline(always)]
    pub(crate) fn raw(self) -> u32 {
        self.0
    }

    /// The following slot, wrapping at the capacity.
    #[inline(always)]
    pub(crate) fn next(self) -> Self {
        Self((self.0 + 1) % N as u32)
    }
}

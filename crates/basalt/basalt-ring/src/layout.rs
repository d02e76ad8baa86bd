//! Shared-memory layout of the ring segment.
//!
//! One `RingSegment` lives at offset 0 of the shared-memory object. The
//! header fields let an attaching process verify it is looking at a segment
//! created by a compatible owner before trusting the cursors.
//!
//! ```text
//! ┌──────────┬──────────┬──────────┬───────────┬──────────┬───────┬─────────────┐
//! │  magic   │ version  │ capacity │ write_pos │ read_pos │ alive │ buffer[N]   │
//! │  (8B)    │  (8B)    │  (8B)    │ (4B atom) │ (4B atom)│ (1B)  │ (N atomics) │
//! └──────────┴──────────┴──────────┴───────────┴──────────┴───────┴─────────────┘
//! ```

use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32};

/// Magic number identifying a valid ring segment.
///
/// ASCII encoding of "BASALT3C".
pub(crate) const RING_MAGIC: u64 = 0x4241_5341_4C54_3343;

/// Current segment format version. Attachers reject a mismatch.
pub(crate) const RING_VERSION: u64 = 1;

/// Byte capacity of the default solution channel.
pub const DEFAULT_CAPACITY: usize = 2048;

/// The shared segment: validation header, cursors, liveness flag, byte ring.
///
/// # Representation
/// `#[repr(C)]` so every attaching process agrees on the field offsets.
///
/// # Cursor ownership
/// `write_pos` is advanced only by the producer currently holding the writer
/// semaphore; `read_pos` only by the single consumer. Visibility of the byte
/// data itself is carried by the semaphore post/wait pairs; the atomics keep
/// the flag and cursor accesses tear-free across processes.
#[repr(C)]
pub(crate) struct RingSegment<const N: usize> {
    pub magic: u64,
    pub version: u64,
    pub capacity: u64,
    pub write_pos: AtomicU32,
    pub read_pos: AtomicU32,
    pub alive: AtomicBool,
    pub buffer: [AtomicU8; N],
}

impl<const N: usize> RingSegment<N> {
    /// Initializes a freshly created segment in place.
    ///
    /// # Safety
    /// `seg` must point to at least `size_of::<Self>()` writable bytes that
    /// no other process is accessing yet.
    pub(crate) unsafe fn init(seg: *mut Self) {
        unsafe {
            ptr::write(
                seg,
                RingSegment {
                    magic: RING_MAGIC,
                    version: RING_VERSION,
                    capacity: N as u64,
                    write_pos: AtomicU32::new(0),
                    read_pos: AtomicU32::new(0),
                    alive: AtomicBool::new(true),
                    buffer: std::array::from_fn(|_| AtomicU8::new(0)),
                },
            );
        }
    }

    /// Validates the header of an attached segment.
    pub(crate) fn validate(&self) -> Result<(), &'static str> {
        if self.magic != RING_MAGIC {
            return Err("bad magic");
        }
        if self.version != RING_VERSION {
            return Err("wrong version");
        }
        if self.capacity != N as u64 {
            return Err("capacity mismatch");
        }
        Ok(())
    }
}

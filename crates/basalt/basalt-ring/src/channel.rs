//! The ring channel: shared segment plus semaphore triple.
//!
//! One supervisor process creates the channel and is the only consumer; any
//! number of generator processes attach and produce. Messages are non-empty
//! byte sequences; the channel appends a NUL terminator on write and strips
//! it on read.
//!
//! # Synchronization protocol
//!
//! Three named semaphores coordinate all processes:
//! - `free_slots` (initially N): writable byte slots. A producer takes one
//!   permit per byte before storing it; the consumer returns the permit after
//!   loading the byte.
//! - `used_slots` (initially 0): readable byte slots, the mirror image.
//! - `writer_turn` (initially 1): held by a producer for a whole message, so
//!   messages from concurrent producers never interleave.
//!
//! At all times `free_slots + used_slots == N`; a violation means a
//! synchronization bug ([`slot_counts`](RingChannel::slot_counts) exposes
//! both counters so tests can check this).
//!
//! # Shutdown
//!
//! The owner flips the segment's liveness flag and posts one `free_slots`
//! permit. Blocking waits are sliced `sem_timedwait` calls that re-poll the
//! flag and the caller's [`ShutdownToken`] between slices, so every parked
//! process wakes within one slice even when several producers are blocked at
//! once.

use crate::cursor::RingIndex;
use crate::layout::RingSegment;
use crate::name::ChannelName;
use crate::sem::{NamedSemaphore, SemError};
use crate::shutdown::ShutdownToken;
use basalt_shm::{ShmError, ShmObject};
use std::mem::size_of;
use std::sync::atomic::Ordering;
use std::time::Duration;

/// How long one kernel wait lasts before liveness and cancellation are
/// re-polled. Bounds the shutdown latency of any blocked process.
const WAIT_SLICE: Duration = Duration::from_millis(25);

/// Initial capacity of the read accumulator; it doubles as needed.
const READ_CHUNK: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum RingError {
    #[error(transparent)]
    Shm(#[from] ShmError),

    #[error(transparent)]
    Sem(#[from] SemError),

    #[error("attached segment is not a valid ring: {0}")]
    InvalidSegment(&'static str),

    #[error("operation cancelled by shutdown request")]
    Cancelled,

    #[error("channel is shut down")]
    Closed,

    #[error("message payload must not be empty")]
    EmptyPayload,

    #[error("message payload must not contain NUL bytes")]
    EmbeddedNul,
}

/// Aggregated teardown failure. Every step ran; these are the ones that
/// reported an error.
#[derive(Debug, thiserror::Error)]
#[error("channel teardown failed at: {steps:?}")]
pub struct CloseError {
    pub steps: Vec<&'static str>,
}

/// A view of one ring channel, either as its owner or as an attached
/// producer.
///
/// `N` is the byte capacity of the ring; all processes sharing a channel must
/// agree on it (the segment header records it and attach validates).
pub struct RingChannel<const N: usize> {
    shm: ShmObject,
    free_slots: NamedSemaphore,
    used_slots: NamedSemaphore,
    writer_turn: NamedSemaphore,
    owner: bool,
}

/// The channel the supervisor and generators use.
pub type SolutionChannel = RingChannel<{ crate::layout::DEFAULT_CAPACITY }>;

impl<const N: usize> RingChannel<N> {
    /// Creates the channel: segment plus all three semaphores, each with
    /// exclusive-create semantics.
    ///
    /// If any step fails, everything acquired before it is released and its
    /// kernel name unlinked before the error is returned, so a failed create
    /// leaks nothing.
    pub fn create(name: &ChannelName) -> Result<Self, RingError> {
        let mut shm = ShmObject::create_excl(&name.segment(), size_of::<RingSegment<N>>())?;
        // SAFETY: the object was created exclusively just now and sized for
        // RingSegment<N>; no other process can have attached yet.
        unsafe { RingSegment::<N>::init(shm.as_mut_ptr() as *mut RingSegment<N>) };

        // Drop impls reap each of these (and the segment above) should a
        // later create fail.
        let free_slots = NamedSemaphore::create(&name.free_slots(), N as u32)?;
        let used_slots = NamedSemaphore::create(&name.used_slots(), 0)?;
        let writer_turn = NamedSemaphore::create(&name.writer_turn(), 1)?;

        Ok(Self {
            shm,
            free_slots,
            used_slots,
            writer_turn,
            owner: true,
        })
    }

    /// Attaches to a channel the owner already created.
    ///
    /// Fails if the segment or any semaphore does not exist yet, or if the
    /// segment header does not describe a compatible ring.
    pub fn attach(name: &ChannelName) -> Result<Self, RingError> {
        let shm = ShmObject::open_rw(&name.segment(), size_of::<RingSegment<N>>())?;

        // SAFETY: size was checked by open_rw; validate() rejects anything
        // that is not an initialized ring segment.
        let seg = unsafe { &*(shm.as_ptr() as *const RingSegment<N>) };
        seg.validate().map_err(RingError::InvalidSegment)?;

        let free_slots = NamedSemaphore::open(&name.free_slots())?;
        let used_slots = NamedSemaphore::open(&name.used_slots())?;
        let writer_turn = NamedSemaphore::open(&name.writer_turn())?;

        Ok(Self {
            shm,
            free_slots,
            used_slots,
            writer_turn,
            owner: false,
        })
    }

    #[inline(always)]
    fn segment(&self) -> &RingSegment<N> {
        // SAFETY: the mapping is valid and sized for RingSegment<N> for the
        // lifetime of self; all mutation goes through the atomics inside.
        unsafe { &*(self.shm.as_ptr() as *const RingSegment<N>) }
    }

    pub fn is_owner(&self) -> bool {
        self.owner
    }

    /// Whether the owner still considers the channel operative.
    pub fn is_alive(&self) -> bool {
        self.segment().alive.load(Ordering::SeqCst)
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Current `(free, used)` semaphore values, for diagnostics. The two
    /// always sum to the capacity in a quiescent channel.
    pub fn slot_counts(&self) -> Result<(i32, i32), RingError> {
        Ok((self.free_slots.value()?, self.used_slots.value()?))
    }

    /// Sliced wait on one semaphore, re-polling cancellation and liveness
    /// between slices.
    fn acquire(&self, sem: &NamedSemaphore, token: &ShutdownToken) -> Result<(), RingError> {
        loop {
            if sem.wait_timeout(WAIT_SLICE)? {
                return Ok(());
            }
            if token.is_cancelled() {
                return Err(RingError::Cancelled);
            }
            if !self.is_alive() {
                return Err(RingError::Closed);
            }
        }
    }

    /// Blocks until the whole message (payload plus terminator) is in the
    /// ring.
    ///
    /// Holding `writer_turn` for the full message keeps concurrent producers
    /// from interleaving bytes. Returns [`RingError::Cancelled`] if the token
    /// fires, or [`RingError::Closed`] once the owner shuts the channel down;
    /// in either case bytes already committed stay in the ring with no way to
    /// retract them, and the consumer is expected to discard the truncated
    /// message when it fails to decode.
    pub fn write(&self, payload: &[u8], token: &ShutdownToken) -> Result<(), RingError> {
        if payload.is_empty() {
            return Err(RingError::EmptyPayload);
        }
        if payload.contains(&0) {
            return Err(RingError::EmbeddedNul);
        }
        if token.is_cancelled() {
            return Err(RingError::Cancelled);
        }
        if !self.is_alive() {
            return Err(RingError::Closed);
        }

        self.acquire(&self.writer_turn, token)?;
        let result = self.write_message(payload, token);
        if let Err(err) = self.writer_turn.post() {
            tracing::warn!("failed to release writer turn: {err}");
        }
        result
    }

    fn write_message(&self, payload: &[u8], token: &ShutdownToken) -> Result<(), RingError> {
        let seg = self.segment();
        for byte in payload.iter().copied().chain(std::iter::once(0u8)) {
            self.acquire(&self.free_slots, token)?;

            let idx = RingIndex::<N>::new(seg.write_pos.load(Ordering::Acquire));
            seg.buffer[idx.get()].store(byte, Ordering::Release);
            seg.write_pos.store(idx.next().raw(), Ordering::Release);
            self.used_slots.post()?;

            // Owner shutdown mid-message: the remaining bytes would never be
            // drained. The terminator is the last byte anyway, so a write
            // that reached it reports success.
            if byte != 0 && !self.is_alive() {
                return Err(RingError::Closed);
            }
        }
        Ok(())
    }

    /// Blocks until one complete message is available and returns it without
    /// its terminator.
    ///
    /// Only the single consumer calls this; `read_pos` has no lock because
    /// nothing else advances it.
    pub fn read(&self, token: &ShutdownToken) -> Result<Vec<u8>, RingError> {
        let seg = self.segment();
        let mut message = Vec::with_capacity(READ_CHUNK);
        loop {
            self.acquire(&self.used_slots, token)?;

            let idx = RingIndex::<N>::new(seg.read_pos.load(Ordering::Acquire));
            let byte = seg.buffer[idx.get()].load(Ordering::Acquire);
            self.free_slots.post()?;
            seg.read_pos.store(idx.next().raw(), Ordering::Release);

            if byte == 0 {
                return Ok(message);
            }
            message.push(byte);

            // A dead channel cannot complete this message; do not spin on
            // stale continuation bytes.
            if !self.is_alive() {
                return Err(RingError::Closed);
            }
        }
    }

    /// Tears the channel down. Every step runs even if an earlier one fails;
    /// failures are logged and aggregated.
    ///
    /// The owner first flips the liveness flag and posts one `free_slots`
    /// permit so a parked producer wakes immediately, then unlinks all four
    /// kernel names after closing its handles. Attached processes only close
    /// their handles and unmap.
    pub fn close(mut self) -> Result<(), CloseError> {
        fn note<E: std::fmt::Display>(
            steps: &mut Vec<&'static str>,
            step: &'static str,
            result: Result<(), E>,
        ) {
            if let Err(err) = result {
                tracing::warn!("teardown step `{step}` failed: {err}");
                steps.push(step);
            }
        }

        let mut steps: Vec<&'static str> = Vec::new();

        if self.owner {
            self.segment().alive.store(false, Ordering::SeqCst);
            note(&mut steps, "post free-slots", self.free_slots.post());
        }

        note(&mut steps, "close free-slots", self.free_slots.close());
        note(&mut steps, "close used-slots", self.used_slots.close());
        note(&mut steps, "close writer-turn", self.writer_turn.close());

        if self.owner {
            note(&mut steps, "unlink free-slots", self.free_slots.unlink());
            note(&mut steps, "unlink used-slots", self.used_slots.unlink());
            note(&mut steps, "unlink writer-turn", self.writer_turn.unlink());
            note(&mut steps, "unlink segment", self.shm.unlink());
        }

        // The mapping itself unmaps when self drops here.
        if steps.is_empty() {
            Ok(())
        } else {
            Err(CloseError { steps })
        }
    }
}

impl<const N: usize> std::fmt::Debug for RingChannel<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingChannel")
            .field("segment", &self.shm.name())
            .field("capacity", &N)
            .field("owner", &self.owner)
            .finish()
    }
}

//! # Ring Construction
//!
//! Helpers for building the closed `next` cycle and an optional check that
//! it really is closed. The scheduler itself never validates the ring: a
//! broken ring is a caller contract violation. [`validate`] exists so that
//! debug builds can catch it once, before the first switch. It accepts
//! rings of any length.

use core::fmt;
use core::ptr;

use crate::tcb::Tcb;

/// Why a chain of TCBs is not a usable ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingError {
    /// The TCB `position` hops away from the start has no `next` link.
    Unlinked { position: usize },
    /// Following `next` enters a cycle that does not contain the start.
    NotClosed,
    /// The TCB `position` hops away from the start has no context frame.
    Uninitialized { position: usize },
}

impl fmt::Display for RingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RingError::Unlinked { position } => {
                write!(f, "thread {} in the ring has no next link", position)
            }
            RingError::NotClosed => {
                write!(f, "ring loops without returning to its first thread")
            }
            RingError::Uninitialized { position } => {
                write!(f, "thread {} in the ring was never initialized", position)
            }
        }
    }
}

/// Link `threads` in order into a closed ring: each TCB points at the one
/// after it and the last points back at the first.
///
/// A single TCB is linked to itself. An empty slice is left alone.
pub fn link_ring(threads: &[&'static Tcb]) {
    let (Some(&first), Some(&last)) = (threads.first(), threads.last()) else {
        return;
    };
    for pair in threads.windows(2) {
        pair[0].link(pair[1]);
    }
    last.link(first);
}

/// Walk the ring starting at `first` and return its length.
///
/// Uses Brent's cycle detection, so a chain that loops back into itself
/// somewhere after `first` is reported without any bound on ring length.
pub fn validate(first: &'static Tcb) -> Result<usize, RingError> {
    let mut tortoise = first;
    let mut hare = first;
    let mut power = 1usize;
    let mut lap = 0usize;
    let mut hops = 0usize;
    loop {
        hare = hare.next().ok_or(RingError::Unlinked { position: hops })?;
        hops += 1;
        if ptr::eq(hare, first) {
            return Ok(hops);
        }
        if ptr::eq(hare, tortoise) {
            return Err(RingError::NotClosed);
        }
        lap += 1;
        if lap == power {
            tortoise = hare;
            power *= 2;
            lap = 0;
        }
    }
}

/// [`validate`], and also require every thread in the ring to have been
/// prepared by [`crate::frame::init_thread`].
pub fn check_ready(first: &'static Tcb) -> Result<usize, RingError> {
    let len = validate(first)?;
    let mut tcb = first;
    for position in 0..len {
        if !tcb.is_initialized() {
            return Err(RingError::Uninitialized { position });
        }
        tcb = tcb.next().ok_or(RingError::Unlinked { position })?;
    }
    Ok(len)
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

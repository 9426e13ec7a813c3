//! # Scheduler
//!
//! Round-robin scheduling state shared by the two exception handlers.
//!
//! ## Scheduling Algorithm
//!
//! At each SysTick interrupt ([`Scheduler::on_tick`]):
//! 1. `next := current.next` (one hop, no priorities, no skipping)
//! 2. Pend PendSV through the [`Port`]
//!
//! When PendSV runs (after every other handler has returned):
//! 1. [`Scheduler::outgoing`]: the thread to save, or `None` on the very
//!    first switch
//! 2. [`Scheduler::switch_in`]: `current := next`, the thread to restore
//!
//! ## Shared State
//!
//! `current` and `next` are single machine words written from different
//! exception handlers. There is no lock: SysTick is configured more urgent
//! than PendSV, so the tick's write to `next` and its pend request always
//! complete before the switch observes them. Each field has exactly one
//! writer per switch cycle (`next`: tick, `current`: switch).

use core::ptr;
use core::sync::atomic::{AtomicPtr, Ordering};

use crate::arch::Port;
use crate::tcb::Tcb;

/// The scheduler context: which thread runs now and which runs next.
///
/// A null `current` is the "no thread has run yet" sentinel.
pub struct Scheduler {
    current: AtomicPtr<Tcb>,
    next: AtomicPtr<Tcb>,
}

impl Scheduler {
    pub const fn new() -> Self {
        Self {
            current: AtomicPtr::new(ptr::null_mut()),
            next: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Select the first thread to run. Must happen before the first switch
    /// is requested.
    pub fn seed(&self, first: &'static Tcb) {
        self.next.store(as_ptr(first), Ordering::Release);
    }

    /// The running thread, or `None` before the first switch.
    #[inline]
    pub fn current(&self) -> Option<&'static Tcb> {
        load(&self.current)
    }

    /// The thread selected to run after the next switch.
    #[inline]
    pub fn next(&self) -> Option<&'static Tcb> {
        load(&self.next)
    }

    /// Tick handler body: advance one hop along the ring and request a
    /// switch. Never saves or restores registers itself.
    ///
    /// A tick that arrives before the first switch keeps the seeded `next`.
    pub fn on_tick<P: Port>(&self, port: &P) {
        if let Some(current) = self.current() {
            let next = current.next().map_or(ptr::null_mut(), as_ptr);
            self.next.store(next, Ordering::Release);
        }
        port.request_switch();
    }

    /// Switch save phase: the thread whose R4–R11 must be pushed, or `None`
    /// on the first switch, when there is nothing to save.
    #[inline]
    pub fn outgoing(&self) -> Option<&'static Tcb> {
        self.current()
    }

    /// Switch commit phase: make the selected thread current and return it.
    ///
    /// `None` means no thread was ever selected (started without a seed).
    pub fn switch_in(&self) -> Option<&'static Tcb> {
        let next = self.next.load(Ordering::Acquire);
        self.current.store(next, Ordering::Release);
        // Only ever holds pointers derived from `&'static Tcb`.
        unsafe { next.as_ref() }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn as_ptr(tcb: &'static Tcb) -> *mut Tcb {
    tcb as *const Tcb as *mut Tcb
}

#[inline]
fn load(slot: &AtomicPtr<Tcb>) -> Option<&'static Tcb> {
    unsafe { slot.load(Ordering::Acquire).as_ref() }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

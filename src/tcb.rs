//! # Thread Control Block
//!
//! One `Tcb` per thread, declared by the application as a `static`. The
//! nucleus never allocates or frees them; it only reads the `next` link and
//! reads/writes the saved stack pointer.
//!
//! ```text
//!   ┌──────┐ next ┌──────┐ next ┌──────┐
//!   │  T1  │ ───► │  T2  │ ───► │  T3  │
//!   └──────┘      └──────┘      └──────┘
//!       ▲                           │
//!       └───────────── next ────────┘
//! ```
//!
//! The `next` relation is navigation only. TCBs are `'static`, so a link is
//! a plain `&'static Tcb`; it is stored as an atomic pointer so that statics
//! can be linked after construction without `static mut`.

use core::ptr;
use core::sync::atomic::{AtomicPtr, Ordering};

/// Thread Control Block.
///
/// ## Layout
///
/// `stack_pointer` is the first word. The switch trampoline never relies on
/// the offset (it receives the address from [`Tcb::save_slot`]) but keeping
/// it first matches the classic `{ sp, next }` layout seen by debuggers.
#[repr(C)]
pub struct Tcb {
    /// Saved process stack pointer. Points at the saved R4 of the thread's
    /// context image. Meaningless while the thread is running.
    stack_pointer: AtomicPtr<u32>,

    /// Next thread in round-robin order. Null until linked.
    next: AtomicPtr<Tcb>,
}

impl Tcb {
    /// An unlinked TCB with no saved context.
    pub const fn new() -> Self {
        Self {
            stack_pointer: AtomicPtr::new(ptr::null_mut()),
            next: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Make `next` the thread scheduled after this one.
    ///
    /// Must only be done before the scheduler is started; the ring is
    /// fixed once threads are running.
    pub fn link(&'static self, next: &'static Tcb) {
        self.next
            .store(next as *const Tcb as *mut Tcb, Ordering::Release);
    }

    /// The thread scheduled after this one, if linked.
    #[inline]
    pub fn next(&self) -> Option<&'static Tcb> {
        let next = self.next.load(Ordering::Acquire);
        // Only ever set from a `&'static Tcb` in `link`.
        unsafe { next.as_ref() }
    }

    /// Whether the frame builder has prepared a context for this thread.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        !self.saved_stack_pointer().is_null()
    }

    /// The last saved stack top.
    #[inline]
    pub fn saved_stack_pointer(&self) -> *mut u32 {
        self.stack_pointer.load(Ordering::Acquire)
    }

    /// Record a new stack top. Called by the frame builder and by the
    /// switch save phase.
    #[inline]
    pub(crate) fn set_saved_stack_pointer(&self, sp: *mut u32) {
        self.stack_pointer.store(sp, Ordering::Release);
    }

    /// Address of the saved stack-pointer word, for the trampoline's
    /// `STR` after it has pushed R4–R11.
    #[inline]
    pub fn save_slot(&self) -> *mut *mut u32 {
        self.stack_pointer.as_ptr()
    }
}

impl Default for Tcb {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

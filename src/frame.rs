//! # Stack Frame Builder
//!
//! Builds the initial saved-register image on a thread's stack so that the
//! switch trampoline can "resume" a thread that has never run, exactly as
//! if it had been preempted just before its first instruction.
//!
//! ## Saved Context Layout (top = high address, growing down)
//!
//! ```text
//! [Hardware stacked frame]   <- popped by the exception return
//!   xPSR  (Thumb bit set)
//!   PC    (thread entry point)
//!   LR    (0 — threads never return)
//!   R12   (0)
//!   R3    (0)
//!   R2    (0)
//!   R1    (0)
//!   R0    (0)
//! [Software saved context]   <- pushed/popped by PendSV (STMDB/LDMIA)
//!   R11   (0)
//!   R10   (0)
//!   R9    (0)
//!   R8    (0)
//!   R7    (0)
//!   R6    (0)
//!   R5    (0)
//!   R4    (0)              <- Tcb::stack_pointer after init
//! ```
//!
//! This order is a binary contract with the trampoline in
//! `arch::cortex_m4`; [`ContextFrame`] spells it out as a type.

use core::cell::UnsafeCell;
use core::mem::size_of;
use core::ptr;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::config::{FRAME_WORDS, MIN_STACK_WORDS, XPSR_THUMB};
use crate::tcb::Tcb;

const WORD: usize = size_of::<u32>();

/// AAPCS requires the stack to be 8-byte aligned at public interfaces.
const STACK_ALIGN: usize = 8;

// ---------------------------------------------------------------------------
// Context image
// ---------------------------------------------------------------------------

/// The 16-word context image found at a saved stack pointer, lowest
/// address first.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextFrame {
    pub r4: u32,
    pub r5: u32,
    pub r6: u32,
    pub r7: u32,
    pub r8: u32,
    pub r9: u32,
    pub r10: u32,
    pub r11: u32,
    pub r0: u32,
    pub r1: u32,
    pub r2: u32,
    pub r3: u32,
    pub r12: u32,
    pub lr: u32,
    pub pc: u32,
    pub xpsr: u32,
}

const _: () = assert!(size_of::<ContextFrame>() == FRAME_WORDS * WORD);

impl ContextFrame {
    /// Words pushed by software (R4–R11).
    pub const SOFTWARE_WORDS: usize = 8;

    /// Words pushed by the exception entry sequence.
    pub const HARDWARE_WORDS: usize = FRAME_WORDS - Self::SOFTWARE_WORDS;

    /// Copy out the context image stored at `sp`.
    ///
    /// # Safety
    /// `sp` must point at a complete, readable saved context.
    pub unsafe fn read(sp: *const u32) -> Self {
        ptr::read(sp as *const ContextFrame)
    }
}

// ---------------------------------------------------------------------------
// Frame builder
// ---------------------------------------------------------------------------

/// Pushes words onto a full-descending stack held in a slice.
pub(crate) struct StackPusher<'a> {
    stack: &'a mut [u32],
    top: usize,
}

impl<'a> StackPusher<'a> {
    /// Start with the stack empty: top is one past the last element.
    pub(crate) fn new(stack: &'a mut [u32]) -> Self {
        let top = stack.len();
        Self { stack, top }
    }

    /// Decrement, then store.
    pub(crate) fn push(&mut self, word: u32) {
        self.top -= 1;
        self.stack[self.top] = word;
    }

    /// Index of the most recently pushed word.
    pub(crate) fn top(&self) -> usize {
        self.top
    }
}

/// Write a fresh context image at the top of `stack` and return the index
/// of the saved R4 word (the thread's initial saved stack pointer).
///
/// The top is one past the last element, rounded down to 8 bytes when the
/// buffer does not end on an 8-byte boundary.
pub(crate) fn build_frame(stack: &mut [u32], entry: u32) -> usize {
    let end = stack.as_ptr() as usize + stack.len() * WORD;
    let skip = (end % STACK_ALIGN) / WORD;
    let usable = stack.len().saturating_sub(skip);

    debug_assert!(
        usable >= MIN_STACK_WORDS,
        "thread stack smaller than one context frame after 8-byte alignment"
    );

    let mut sp = StackPusher::new(&mut stack[..usable]);

    // Hardware frame, unstacked by the exception return
    sp.push(XPSR_THUMB); // xPSR
    sp.push(entry & !1); // PC: the Thumb bit lives in xPSR, not the PC
    sp.push(0); // LR
    sp.push(0); // R12
    sp.push(0); // R3
    sp.push(0); // R2
    sp.push(0); // R1
    sp.push(0); // R0

    // Software frame, restored by LDMIA {r4-r11}
    for _ in 0..ContextFrame::SOFTWARE_WORDS {
        sp.push(0); // R11 down to R4
    }

    sp.top()
}

/// Prepare `tcb` so the first switch into it starts `entry` on a fresh
/// stack.
///
/// The stacked PC is `entry` with bit 0 cleared: function pointers carry
/// the Thumb bit, but an exception return to an odd PC is UNPREDICTABLE,
/// so Thumb state comes from xPSR instead.
///
/// # Contract
/// - `stack` must hold at least [`MIN_STACK_WORDS`] words *after* its top
///   is rounded down to 8 bytes, plus whatever the thread itself needs. A
///   [`Stack`] with even `N` always ends aligned; a raw slice whose end is
///   only 4-byte aligned needs one extra word (17 minimum). Only debug
///   builds check this.
/// - `entry` must never return: the saved LR is 0.
/// - Must not be called on a thread that is in the running ring.
pub fn init_thread(tcb: &Tcb, stack: &'static mut [u32], entry: extern "C" fn() -> !) {
    prepare_thread(tcb, stack, entry as usize as u32);
}

/// [`init_thread`] with a raw entry address.
pub(crate) fn prepare_thread(tcb: &Tcb, stack: &'static mut [u32], entry: u32) {
    let top = build_frame(stack, entry);
    tcb.set_saved_stack_pointer(stack.as_mut_ptr().wrapping_add(top));
}

// ---------------------------------------------------------------------------
// Static stack storage
// ---------------------------------------------------------------------------

/// Statically allocated thread stack of `N` words, 8-byte aligned.
///
/// A `Stack` hands out its memory once, so it can be declared as a plain
/// `static` and passed to [`init_thread`] without `static mut`.
///
/// ```ignore
/// static STACK1: Stack<256> = Stack::new();
/// static T1: Tcb = Tcb::new();
///
/// init_thread(&T1, STACK1.take().unwrap(), thread1);
/// ```
#[repr(C, align(8))]
pub struct Stack<const N: usize> {
    words: UnsafeCell<[u32; N]>,
    taken: AtomicBool,
}

// Safety: the words are only reachable through the single `&mut` returned
// by `take`, guarded by the `taken` flag.
unsafe impl<const N: usize> Sync for Stack<N> {}

impl<const N: usize> Stack<N> {
    const FITS_FRAME: () = assert!(N >= MIN_STACK_WORDS, "stack cannot hold a context frame");

    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::FITS_FRAME;
        Self {
            words: UnsafeCell::new([0; N]),
            taken: AtomicBool::new(false),
        }
    }

    /// Claim the stack memory. Returns `None` if it was already claimed.
    pub fn take(&'static self) -> Option<&'static mut [u32]> {
        if self.taken.swap(true, Ordering::AcqRel) {
            return None;
        }
        // Safety: first and only claim, see `taken`.
        Some(unsafe { &mut *self.words.get() })
    }
}

impl<const N: usize> Default for Stack<N> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

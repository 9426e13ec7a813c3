//! # Kernel
//!
//! Top-level startup and the single global scheduler instance.
//!
//! ## Startup Sequence
//!
//! ```text
//! reset_handler (cortex-m-rt)
//!   └─► main()
//!         ├─► init_thread()             ← Build each thread's frame (×N)
//!         ├─► link_ring()               ← Close the T1 → … → TN → T1 ring
//!         ├─► set_interrupt_priorities() / configure_systick()
//!         └─► kernel::start(&T1)        ← Seed and pend the first switch
//!               └─► PendSV (first switch, nothing saved)
//!                     └─► T1 runs on PSP; main's MSP context is abandoned
//! ```
//!
//! After `start`, only the two exception handlers touch the scheduler.

use crate::arch::cortex_m4::CortexM4;
use crate::arch::Port;
use crate::scheduler::Scheduler;
use crate::tcb::Tcb;
use crate::{ring, sync};

// ---------------------------------------------------------------------------
// Global scheduler instance
// ---------------------------------------------------------------------------

/// The scheduler context shared by SysTick and PendSV.
///
/// Not exposed outside the crate: the handlers and [`start`] are the only
/// code that drives it.
pub(crate) static SCHEDULER: Scheduler = Scheduler::new();

// ---------------------------------------------------------------------------
// Kernel API
// ---------------------------------------------------------------------------

/// Start round-robin scheduling with `first`. **Does not return.**
///
/// # Contract
/// - Every thread in the ring was prepared with [`crate::init_thread`] and
///   the ring is closed. Debug builds check this and panic otherwise.
/// - PendSV is the lowest priority exception and SysTick is more urgent
///   (see [`crate::arch::cortex_m4::set_interrupt_priorities`]).
/// - SysTick is configured by the caller; it may already be running.
///
/// Must be called from `main` (Thread mode, MSP), not from an exception.
pub fn start(first: &'static Tcb) -> ! {
    if cfg!(debug_assertions) {
        if let Err(err) = ring::check_ready(first) {
            panic!("cannot start scheduler: {}", err);
        }
    }

    // A tick before the first switch only pends it; the seed is kept.
    sync::critical_section(|_cs| SCHEDULER.seed(first));
    CortexM4.request_switch();

    // PendSV fires as soon as interrupts allow and never returns here.
    loop {
        cortex_m::asm::wfi();
    }
}

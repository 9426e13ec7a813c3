//! # Cortex-M4 Port Layer
//!
//! Hardware-specific code for the ARM Cortex-M4 (Thumb-2) processor:
//! the SysTick and PendSV handlers, and optional helpers the application
//! can use to configure the timer and exception priorities.
//!
//! ## Context Switch Mechanism
//!
//! The Cortex-M4 uses a split-stack model:
//! - **MSP** (Main Stack Pointer): used by `main` before the first switch
//!   and by every exception handler
//! - **PSP** (Process Stack Pointer): used by threads in Thread mode
//!
//! On exception entry, the hardware automatically stacks R0–R3, R12, LR, PC,
//! and xPSR onto the process stack. The PendSV handler manually saves and
//! restores R4–R11, which completes the full context save/restore.
//!
//! ## Interrupt Priorities
//!
//! - SysTick: [`SYSTICK_PRIORITY`] — preempts PendSV
//! - PendSV: [`PENDSV_PRIORITY`] (lowest) — runs only when no other ISR is
//!   active or pending
//!
//! This ordering is what makes the scheduler lock-free: the tick's update
//! of `next` always completes before the switch reads it. The nucleus does
//! not set priorities itself; call [`set_interrupt_priorities`] (or do the
//! equivalent) before [`crate::kernel::start`].
//!
//! Only the basic (non-FPU) exception frame is handled, so threads must not
//! use the FPU (`thumbv7em-none-eabi`).

use core::arch::naked_asm;
use core::ptr;

use cortex_m::peripheral::scb::SystemHandler;
use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::{SCB, SYST};

use super::Port;
use crate::config::{EXC_RETURN_THREAD_PSP, PENDSV_PRIORITY, SYSTEM_CLOCK_HZ, SYSTICK_PRIORITY};
use crate::kernel::SCHEDULER;
use crate::tcb::Tcb;

// ---------------------------------------------------------------------------
// PendSV trigger
// ---------------------------------------------------------------------------

/// The Cortex-M4 interrupt-control primitive.
pub struct CortexM4;

impl Port for CortexM4 {
    /// Sets PENDSVSET in the Interrupt Control and State Register (ICSR).
    #[inline]
    fn request_switch(&self) {
        SCB::set_pendsv();
    }
}

// ---------------------------------------------------------------------------
// Caller-side configuration helpers
// ---------------------------------------------------------------------------

/// Configure SysTick to fire at `tick_hz` from the processor clock.
///
/// Timer setup belongs to the application; this is the usual setup for
/// a board running at [`SYSTEM_CLOCK_HZ`].
pub fn configure_systick(syst: &mut SYST, tick_hz: u32) {
    let reload = SYSTEM_CLOCK_HZ / tick_hz - 1;
    syst.set_reload(reload);
    syst.clear_current();
    syst.set_clock_source(SystClkSource::Core);
    syst.enable_counter();
    syst.enable_interrupt();
}

/// Put PendSV at the lowest priority and SysTick strictly above it.
///
/// Any other interrupt the application enables must also be more urgent
/// than PendSV.
pub fn set_interrupt_priorities(scb: &mut SCB) {
    // Safety: changing priorities can break priority-based critical
    // sections; the nucleus has none, and this runs before `start`.
    unsafe {
        scb.set_priority(SystemHandler::PendSV, PENDSV_PRIORITY);
        scb.set_priority(SystemHandler::SysTick, SYSTICK_PRIORITY);
    }
}

// ---------------------------------------------------------------------------
// SysTick handler
// ---------------------------------------------------------------------------

/// SysTick exception handler: advance the ring by one thread and pend the
/// switch.
#[no_mangle]
pub extern "C" fn SysTick() {
    SCHEDULER.on_tick(&CortexM4);
}

// ---------------------------------------------------------------------------
// PendSV handler (context switch)
// ---------------------------------------------------------------------------

/// PendSV exception handler — performs the actual context switch.
///
/// ## Sequence
/// 1. Ask the scheduler for the outgoing thread's save slot; if there is
///    none (first switch), skip to 4
/// 2. Push R4–R11 onto the outgoing thread's stack (PSP)
/// 3. Store the updated PSP into the outgoing TCB
/// 4. Commit `current := next` and get the incoming thread's saved SP
/// 5. Pop R4–R11 from the incoming stack and load it into PSP
/// 6. Return to Thread mode on PSP (hardware restores R0–R3, R12, LR, PC,
///    xPSR)
///
/// The two calls into Rust only clobber R0–R3, R12 and LR, all of which
/// are either stacked by hardware or rewritten before the return.
///
/// # Safety
/// This is a naked function called directly by the NVIC. It must follow
/// the exact Cortex-M4 exception entry/exit convention.
#[no_mangle]
#[unsafe(naked)]
pub unsafe extern "C" fn PendSV() {
    naked_asm!(
        // --- Save outgoing context ---
        "bl {outgoing}",           // r0 = &outgoing.stack_pointer, or 0
        "cbz r0, 1f",              // first switch: nothing to save
        "mrs r1, psp",
        "stmdb r1!, {{r4-r11}}",   // Push R4-R11 (decrement before store)
        "str r1, [r0]",

        // --- Commit and restore incoming context ---
        "1:",
        "bl {incoming}",           // r0 = incoming saved stack pointer
        "ldmia r0!, {{r4-r11}}",   // Pop R4-R11
        "msr psp, r0",
        "isb",

        // Return from exception to Thread mode using PSP
        "ldr lr, ={exc_return}",
        "bx lr",

        outgoing = sym pendsv_outgoing_slot,
        incoming = sym pendsv_incoming_stack,
        exc_return = const EXC_RETURN_THREAD_PSP,
    );
}

/// Save slot of the thread being switched out, or null on the first switch.
extern "C" fn pendsv_outgoing_slot() -> *mut *mut u32 {
    SCHEDULER
        .outgoing()
        .map_or(ptr::null_mut(), Tcb::save_slot)
}

/// Commit the scheduling decision and return the incoming thread's saved
/// stack pointer.
extern "C" fn pendsv_incoming_stack() -> *mut u32 {
    match SCHEDULER.switch_in() {
        Some(tcb) => tcb.saved_stack_pointer(),
        // `start` always seeds; only reachable if PendSV is pended by hand
        None => panic!("context switch with no thread selected"),
    }
}

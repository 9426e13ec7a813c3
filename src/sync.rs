//! # Synchronization Primitives
//!
//! Interrupt-safe critical section for the Cortex-M4.
//!
//! The scheduler handlers themselves take no locks (priority ordering
//! serializes them); this is only for setup code in Thread mode that must
//! not be interleaved with a tick.
//!
//! `kernel::start` seeds `next` inside one: SysTick may already be running,
//! and a tick that lands mid-seed must see either no thread selected or the
//! complete first thread, with the seed finished before any tick reads it.

use cortex_m::interrupt;

/// Execute a closure within a critical section (interrupts disabled).
///
/// Interrupts are disabled on entry and restored on exit.
///
/// # Usage
/// ```ignore
/// sync::critical_section(|_cs| {
///     SCHEDULER.seed(&T1);
/// });
/// ```
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(&interrupt::CriticalSection) -> R,
{
    interrupt::free(f)
}

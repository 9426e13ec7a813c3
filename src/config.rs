//! # Nucleus Configuration
//!
//! Compile-time constants for the round-robin nucleus and its Cortex-M port.
//! Nothing here is allocated at runtime; thread stacks and control blocks
//! are declared statically by the application.

/// SysTick frequency in Hz used by the demo firmware. Every tick advances
/// the ring by exactly one thread, so this is also the time-slice rate.
pub const TICK_HZ: u32 = 1000;

/// System clock frequency in Hz (STM32F4 16 MHz HSI after reset).
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;

/// Words in the saved context image: 8 pushed by the exception entry
/// sequence plus R4–R11 pushed by the switch trampoline.
pub const FRAME_WORDS: usize = 16;

/// Smallest stack, in words, that can hold a thread's initial frame.
/// Real threads need their own call depth on top of this.
pub const MIN_STACK_WORDS: usize = FRAME_WORDS;

/// xPSR value for a fresh thread: only the Thumb state bit (T, bit 24).
pub const XPSR_THUMB: u32 = 0x0100_0000;

/// EXC_RETURN encoding: return to Thread mode, use the process stack,
/// basic (non-FPU) frame.
pub const EXC_RETURN_THREAD_PSP: u32 = 0xFFFF_FFFD;

/// PendSV priority. Must be the lowest in the system so the switch only
/// runs once every other handler has returned.
pub const PENDSV_PRIORITY: u8 = 0xFF;

/// SysTick priority. Must be strictly more urgent than [`PENDSV_PRIORITY`].
pub const SYSTICK_PRIORITY: u8 = 0x80;

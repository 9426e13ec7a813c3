//! # rrnucleus Demo Firmware
//!
//! Three threads in a ring, T1 → T2 → T3 → T1, switched on every SysTick.
//!
//! | Thread | Behavior |
//! |--------|----------|
//! | `reporter` | Counts, and periodically prints every thread's count |
//! | `counter`  | Counts as fast as it can |
//! | `checker`  | Keeps a pattern in locals and halts if it ever changes |
//!
//! None of the threads yield; all switching is preemptive. Output goes
//! over semihosting, so the demo runs under QEMU:
//!
//! ```text
//! cargo run --release --target thumbv7em-none-eabi
//! ```
//!
//! On a host target this binary only prints how to build it.

#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(target_os = "none")]
use core::sync::atomic::{AtomicU32, Ordering};

#[cfg(target_os = "none")]
use cortex_m_rt::entry;
#[cfg(target_os = "none")]
use cortex_m_semihosting::{debug, hprintln};
#[cfg(target_os = "none")]
use panic_halt as _;

#[cfg(target_os = "none")]
use rrnucleus::arch::cortex_m4;
#[cfg(target_os = "none")]
use rrnucleus::config::TICK_HZ;
#[cfg(target_os = "none")]
use rrnucleus::{init_thread, kernel, link_ring, Stack, Tcb};

/// Per-thread stack size in words.
#[cfg(target_os = "none")]
const STACK_WORDS: usize = 256;

/// Reports printed before the demo exits QEMU.
#[cfg(target_os = "none")]
const REPORTS: u32 = 5;

// ---------------------------------------------------------------------------
// Static threads
// ---------------------------------------------------------------------------

#[cfg(target_os = "none")]
static T1: Tcb = Tcb::new();
#[cfg(target_os = "none")]
static T2: Tcb = Tcb::new();
#[cfg(target_os = "none")]
static T3: Tcb = Tcb::new();

#[cfg(target_os = "none")]
static S1: Stack<STACK_WORDS> = Stack::new();
#[cfg(target_os = "none")]
static S2: Stack<STACK_WORDS> = Stack::new();
#[cfg(target_os = "none")]
static S3: Stack<STACK_WORDS> = Stack::new();

/// Loop iterations completed by each thread.
#[cfg(target_os = "none")]
static COUNTS: [AtomicU32; 3] = [AtomicU32::new(0), AtomicU32::new(0), AtomicU32::new(0)];

// ---------------------------------------------------------------------------
// Thread entry points
// ---------------------------------------------------------------------------

/// **Reporter** (T1)
///
/// Prints all counters every 2^20 of its own iterations. Every counter
/// moving between reports shows that every thread is being scheduled.
#[cfg(target_os = "none")]
extern "C" fn reporter() -> ! {
    let mut reports = 0;
    loop {
        let n = COUNTS[0].fetch_add(1, Ordering::Relaxed);
        if n & 0xF_FFFF == 0 {
            hprintln!(
                "T1={} T2={} T3={}",
                n,
                COUNTS[1].load(Ordering::Relaxed),
                COUNTS[2].load(Ordering::Relaxed)
            );
            reports += 1;
            if reports > REPORTS {
                debug::exit(debug::EXIT_SUCCESS);
            }
        }
    }
}

/// **Counter** (T2)
///
/// Pure CPU consumption. Only preemption takes the CPU away from it.
#[cfg(target_os = "none")]
extern "C" fn counter() -> ! {
    loop {
        COUNTS[1].fetch_add(1, Ordering::Relaxed);
    }
}

/// **Checker** (T3)
///
/// Holds values in locals across preemptions; the compiler keeps them in
/// callee-saved registers, which only survive if PendSV restores R4–R11.
#[cfg(target_os = "none")]
extern "C" fn checker() -> ! {
    let mut a: u32 = 0x1357_9BDF;
    let mut b: u32 = !a;
    loop {
        a = a.rotate_left(1);
        b = b.rotate_left(1);
        if a != !b {
            hprintln!("T3: register state corrupted");
            debug::exit(debug::EXIT_FAILURE);
        }
        COUNTS[2].fetch_add(1, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

/// Firmware entry point. Builds the ring, configures SysTick and the
/// exception priorities, and hands the CPU to T1. Does not return.
#[cfg(target_os = "none")]
#[entry]
fn main() -> ! {
    let mut cp = cortex_m::Peripherals::take().expect("core peripherals already taken");

    init_thread(&T1, S1.take().expect("S1 already in use"), reporter);
    init_thread(&T2, S2.take().expect("S2 already in use"), counter);
    init_thread(&T3, S3.take().expect("S3 already in use"), checker);
    link_ring(&[&T1, &T2, &T3]);

    hprintln!("rrnucleus: starting 3 threads at {} Hz", TICK_HZ);

    cortex_m4::set_interrupt_priorities(&mut cp.SCB);
    cortex_m4::configure_systick(&mut cp.SYST, TICK_HZ);

    kernel::start(&T1)
}

#[cfg(not(target_os = "none"))]
fn main() {
    eprintln!("rrnucleus-demo is firmware: build it with --target thumbv7em-none-eabi");
}

//! # rrnucleus — Round-Robin Nucleus
//!
//! A minimal preemptive round-robin kernel nucleus for single-core ARM
//! Cortex-M (Armv7-M / Armv7E-M) processors.
//!
//! ## Overview
//!
//! A fixed set of threads, declared statically by the application, is
//! switched on every timer tick:
//!
//! - **No dynamic threads**: TCBs and stacks are `static`s owned by the caller
//! - **No priorities**: strict round-robin, one hop along the ring per tick
//! - **No blocking**: threads run until the next tick, forever
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                   Application Threads                   │
//! ├────────────────────────────────────────────────────────┤
//! │                 Kernel API (kernel.rs)                  │
//! │        init_thread() · link_ring() · start()            │
//! ├──────────────┬────────────────────┬───────────────────┤
//! │  Scheduler   │   Frame Builder    │  Ring             │
//! │  scheduler.rs│   frame.rs         │  ring.rs          │
//! │  ─ on_tick() │   ─ init_thread()  │  ─ link_ring()    │
//! │  ─ switch_in │   ─ Stack<N>       │  ─ check_ready()  │
//! ├──────────────┴────────────────────┴───────────────────┤
//! │              Thread Control Block (tcb.rs)              │
//! │               saved stack pointer · next                │
//! ├────────────────────────────────────────────────────────┤
//! │            Arch Port (arch/cortex_m4.rs)                │
//! │          PendSV trampoline · SysTick handler            │
//! ├────────────────────────────────────────────────────────┤
//! │         ARM Cortex-M4 Hardware (Thumb-2)                │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! static T1: Tcb = Tcb::new();
//! static T2: Tcb = Tcb::new();
//! static S1: Stack<256> = Stack::new();
//! static S2: Stack<256> = Stack::new();
//!
//! init_thread(&T1, S1.take().unwrap(), thread1);
//! init_thread(&T2, S2.take().unwrap(), thread2);
//! link_ring(&[&T1, &T2]);
//!
//! cortex_m4::set_interrupt_priorities(&mut cp.SCB);
//! cortex_m4::configure_systick(&mut cp.SYST, TICK_HZ);
//! kernel::start(&T1)
//! ```
//!
//! ## Contracts
//!
//! The nucleus reports no runtime errors. A broken ring, an undersized
//! stack or PendSV not being the lowest priority are caller errors with
//! undefined results. Debug builds check the ring and stack sizes once,
//! before the first switch.
//!
//! ## Memory Model
//!
//! - **No heap**: all state is statically allocated
//! - **No `alloc`**: pure `core` only
//! - **No locks**: exception priority ordering serializes the handlers

#![no_std]

pub mod arch;
pub mod config;
pub mod frame;
#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod kernel;
pub mod ring;
pub mod scheduler;
pub mod sync;
pub mod tcb;

pub use frame::{init_thread, ContextFrame, Stack};
pub use ring::{link_ring, RingError};
pub use tcb::Tcb;

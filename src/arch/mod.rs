//! # Architecture Abstraction Layer
//!
//! The only place where registers and exception-control registers are
//! touched. Everything above it (ring walk, TCB model, scheduling policy)
//! is ordinary safe code.
//!
//! Currently implements the Cortex-M4 port; `sim` is a host-side model of
//! the same exception sequence used by the unit tests.

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod cortex_m4;

#[cfg(test)]
pub(crate) mod sim;

/// Interrupt-control primitive needed by the tick handler.
pub trait Port {
    /// Pend the low-priority switch exception. The switch itself runs
    /// later, once no more urgent handler is active.
    fn request_switch(&self);
}

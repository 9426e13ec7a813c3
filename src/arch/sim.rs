//! Host-side model of the Cortex-M exception sequence.
//!
//! Models just enough of the processor to exercise the nucleus end to end:
//! the automatic exception frame on PSP, PendSV tail-chaining after the
//! tick handler, the EXC_RETURN encoding, and a PendSV body that performs
//! the same steps as the naked trampoline in `cortex_m4`, against the same
//! `Scheduler` bookkeeping.

use core::cell::Cell;

use super::Port;
use crate::config::EXC_RETURN_THREAD_PSP;
use crate::frame::ContextFrame;
use crate::scheduler::Scheduler;
use crate::tcb::Tcb;

/// EXC_RETURN for "back to Thread mode on MSP", i.e. into `main`.
const EXC_RETURN_THREAD_MSP: u32 = 0xFFFF_FFF9;

/// Values the handler leaves in the caller-saved registers. The exception
/// return must overwrite all of them.
const SCRATCH: u32 = 0xBAD0_0000;

/// Pending bit for the switch exception.
#[derive(Default)]
pub(crate) struct SimPort {
    pending: Cell<bool>,
}

impl Port for SimPort {
    fn request_switch(&self) {
        self.pending.set(true);
    }
}

/// Which stack Thread mode is using.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    /// `main` on MSP, before the first switch.
    Main,
    /// A scheduled thread on PSP.
    Thread,
}

/// Register file plus the bits of exception state the nucleus relies on.
pub(crate) struct Cpu<'s> {
    /// R0–R12.
    pub r: [u32; 13],
    pub lr: u32,
    pub pc: u32,
    pub xpsr: u32,
    pub psp: *mut u32,
    pub mode: Mode,
    /// Completed PendSV runs.
    pub switches: u32,
    sched: &'s Scheduler,
    port: SimPort,
}

impl<'s> Cpu<'s> {
    pub fn new(sched: &'s Scheduler) -> Self {
        Self {
            r: [0; 13],
            lr: 0,
            pc: 0,
            xpsr: 0,
            psp: core::ptr::null_mut(),
            mode: Mode::Main,
            switches: 0,
            sched,
            port: SimPort::default(),
        }
    }

    /// What `kernel::start` does: seed the first thread and pend the
    /// switch from `main`.
    pub fn start(&mut self, first: &'static Tcb) {
        self.sched.seed(first);
        self.port.request_switch();
        self.exception(|_| {});
    }

    /// One SysTick interrupt, including any PendSV it tail-chains into.
    pub fn tick(&mut self) {
        let sched = self.sched;
        self.exception(|port| sched.on_tick(port));
    }

    /// The thread the scheduler considers current.
    pub fn current(&self) -> Option<&'static Tcb> {
        self.sched.current()
    }

    /// Thread code: overwrite every general-purpose register with a
    /// pattern derived from `seed` and advance the PC.
    pub fn scribble(&mut self, seed: u32) {
        for (i, reg) in self.r.iter_mut().enumerate() {
            *reg = seed.wrapping_mul(0x0101_0101) ^ i as u32;
        }
        self.lr = seed | 1;
        self.pc = self.pc.wrapping_add(0x10);
    }

    fn exception<F: FnOnce(&SimPort)>(&mut self, handler: F) {
        self.enter();
        handler(&self.port);
        while self.port.pending.get() {
            self.pendsv();
        }
        self.exit();
    }

    fn enter(&mut self) {
        match self.mode {
            Mode::Thread => {
                let frame = [
                    self.r[0], self.r[1], self.r[2], self.r[3], self.r[12], self.lr, self.pc,
                    self.xpsr,
                ];
                self.psp = self.psp.wrapping_sub(ContextFrame::HARDWARE_WORDS);
                for (i, word) in frame.into_iter().enumerate() {
                    unsafe { self.psp.add(i).write(word) };
                }
                self.lr = EXC_RETURN_THREAD_PSP;
            }
            // main's frame goes on MSP, which is never switched
            Mode::Main => self.lr = EXC_RETURN_THREAD_MSP,
        }
        for reg in [0, 1, 2, 3, 12] {
            self.r[reg] = SCRATCH | reg as u32;
        }
    }

    /// Body of the trampoline.
    fn pendsv(&mut self) {
        self.port.pending.set(false);

        if let Some(outgoing) = self.sched.outgoing() {
            let sp = self.psp.wrapping_sub(ContextFrame::SOFTWARE_WORDS);
            for i in 0..ContextFrame::SOFTWARE_WORDS {
                unsafe { sp.add(i).write(self.r[4 + i]) };
            }
            unsafe { *outgoing.save_slot() = sp };
        }

        let incoming = self
            .sched
            .switch_in()
            .expect("context switch with no thread selected");
        let sp = incoming.saved_stack_pointer();
        for i in 0..ContextFrame::SOFTWARE_WORDS {
            self.r[4 + i] = unsafe { sp.add(i).read() };
        }
        self.psp = sp.wrapping_add(ContextFrame::SOFTWARE_WORDS);
        self.lr = EXC_RETURN_THREAD_PSP;
        self.switches += 1;
    }

    fn exit(&mut self) {
        match self.lr {
            EXC_RETURN_THREAD_PSP => {
                let mut frame = [0u32; ContextFrame::HARDWARE_WORDS];
                for (i, word) in frame.iter_mut().enumerate() {
                    *word = unsafe { self.psp.add(i).read() };
                }
                let [r0, r1, r2, r3, r12, lr, pc, xpsr] = frame;
                self.r[0] = r0;
                self.r[1] = r1;
                self.r[2] = r2;
                self.r[3] = r3;
                self.r[12] = r12;
                self.lr = lr;
                self.pc = pc;
                self.xpsr = xpsr;
                self.psp = self.psp.wrapping_add(ContextFrame::HARDWARE_WORDS);
                self.mode = Mode::Thread;
            }
            EXC_RETURN_THREAD_MSP => self.mode = Mode::Main,
            other => panic!("unsupported EXC_RETURN {:#010x}", other),
        }
    }
}

// ---------------------------------------------------------------------------
// Scenario tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::config::XPSR_THUMB;
    use crate::frame::prepare_thread;
    use crate::ring::link_ring;
    use core::ptr;
    use std::boxed::Box;
    use std::vec;
    use std::vec::Vec;

    const STACK_WORDS: usize = 128;

    fn entry(i: usize) -> u32 {
        0x0800_0100 + 0x100 * i as u32
    }

    /// `n` initialized threads linked T0 → T1 → … → T0.
    fn threads(n: usize) -> Vec<&'static Tcb> {
        let ring: Vec<&'static Tcb> = (0..n)
            .map(|i| {
                let tcb: &'static Tcb = Box::leak(Box::new(Tcb::new()));
                let stack = Box::leak(vec![0u32; STACK_WORDS].into_boxed_slice());
                prepare_thread(tcb, stack, entry(i));
                tcb
            })
            .collect();
        link_ring(&ring);
        ring
    }

    fn running(cpu: &Cpu<'_>, tcb: &'static Tcb) -> bool {
        cpu.current().is_some_and(|c| ptr::eq(c, tcb))
    }

    #[test]
    fn test_first_switch_starts_at_entry_with_zeroed_registers() {
        let ring = threads(2);
        let sched = Scheduler::new();
        let mut cpu = Cpu::new(&sched);

        cpu.start(ring[0]);

        assert!(running(&cpu, ring[0]));
        assert_eq!(cpu.mode, Mode::Thread);
        assert_eq!(cpu.pc, entry(0));
        assert_eq!(cpu.lr, 0);
        assert_eq!(cpu.xpsr, XPSR_THUMB);
        assert_eq!(cpu.r, [0; 13]);
        assert_eq!(cpu.switches, 1);
    }

    #[test]
    fn test_three_thread_scenario() {
        let ring = threads(3);
        let sched = Scheduler::new();
        let mut cpu = Cpu::new(&sched);

        cpu.start(ring[0]);
        assert_eq!(cpu.pc, entry(0));

        // T0 runs for a while, then the tick preempts it.
        cpu.scribble(0x11);
        let t0_regs = cpu.r;
        let t0_pc = cpu.pc;
        let t0_psp = cpu.psp;

        cpu.tick();
        assert!(running(&cpu, ring[1]));
        assert_eq!(cpu.pc, entry(1));
        assert_eq!(cpu.r, [0; 13]);

        // T0's image now holds its R4-R11 and resume point.
        let saved = unsafe { ContextFrame::read(ring[0].saved_stack_pointer()) };
        assert_eq!(
            [saved.r4, saved.r5, saved.r6, saved.r7, saved.r8, saved.r9, saved.r10, saved.r11],
            t0_regs[4..12]
        );
        assert_eq!(saved.pc, t0_pc);

        cpu.scribble(0x22);
        cpu.tick();
        assert!(running(&cpu, ring[2]));
        assert_eq!(cpu.pc, entry(2));

        cpu.scribble(0x33);
        cpu.tick();
        assert!(running(&cpu, ring[0]));
        assert_eq!(cpu.r, t0_regs);
        assert_eq!(cpu.pc, t0_pc);
        assert_eq!(cpu.psp, t0_psp);
        assert_eq!(cpu.switches, 4);
    }

    #[test]
    fn test_registers_round_trip_through_switch() {
        let ring = threads(2);
        let sched = Scheduler::new();
        let mut cpu = Cpu::new(&sched);
        cpu.start(ring[0]);

        let mut expected = [[0u32; 13]; 2];
        let mut expected_pc = [0u32; 2];
        for round in 0..8u32 {
            let who = (round % 2) as usize;
            if round >= 2 {
                assert_eq!(cpu.r, expected[who], "round {}", round);
                assert_eq!(cpu.pc, expected_pc[who]);
            }
            cpu.scribble(0xA5 + round);
            expected[who] = cpu.r;
            expected_pc[who] = cpu.pc;
            cpu.tick();
        }
    }

    #[test]
    fn test_ring_closure_from_any_start() {
        for n in 1..=5 {
            for start in 0..n {
                let ring = threads(n);
                let sched = Scheduler::new();
                let mut cpu = Cpu::new(&sched);
                cpu.start(ring[start]);

                for hop in 1..=n {
                    cpu.tick();
                    assert!(running(&cpu, ring[(start + hop) % n]));
                }
                assert!(running(&cpu, ring[start]));
            }
        }
    }

    #[test]
    fn test_single_thread_switch_is_noop() {
        let ring = threads(1);
        let sched = Scheduler::new();
        let mut cpu = Cpu::new(&sched);
        cpu.start(ring[0]);

        cpu.scribble(0x5A);
        let regs = cpu.r;
        let (pc, lr, xpsr, psp) = (cpu.pc, cpu.lr, cpu.xpsr, cpu.psp);

        for n in 1..=10 {
            cpu.tick();
            assert!(running(&cpu, ring[0]));
            assert_eq!(cpu.r, regs);
            assert_eq!((cpu.pc, cpu.lr, cpu.xpsr, cpu.psp), (pc, lr, xpsr, psp));
            assert_eq!(cpu.switches, 1 + n);
        }
    }

    #[test]
    fn test_stack_pointer_returns_to_initial_top() {
        let ring = threads(2);
        let initial: Vec<*mut u32> = ring.iter().map(|t| t.saved_stack_pointer()).collect();
        let sched = Scheduler::new();
        let mut cpu = Cpu::new(&sched);

        cpu.start(ring[0]);
        assert_eq!(cpu.psp, initial[0].wrapping_add(16));

        cpu.tick();
        assert_eq!(cpu.psp, initial[1].wrapping_add(16));

        // T1 pushed nothing of its own, so it was saved where it started.
        cpu.tick();
        cpu.tick();
        assert_eq!(ring[1].saved_stack_pointer(), initial[1]);
    }

    #[test]
    fn test_tick_before_start_keeps_seed() {
        let ring = threads(3);
        let sched = Scheduler::new();
        sched.seed(ring[2]);
        let mut cpu = Cpu::new(&sched);

        // SysTick enabled early: the first switch still goes to the seed.
        cpu.tick();
        assert!(running(&cpu, ring[2]));
        assert_eq!(cpu.pc, entry(2));
    }

    #[test]
    #[should_panic(expected = "no thread selected")]
    fn test_switch_without_seed_halts() {
        let sched = Scheduler::new();
        let mut cpu = Cpu::new(&sched);
        cpu.tick();
    }
}

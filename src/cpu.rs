//! CPU state and the fetch-decode-execute loop.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::decoder::OPS;
use crate::exec;
use crate::flags::Flags;
use crate::instructions::Op;
use crate::memory::Memory;

/// Where execution begins. The bytes below this are a reserved
/// zero-filled page at the front of every executable.
pub const PROGRAM_START: u16 = 0x100;

pub const STACK_SIZE: usize = 256;

/// The whole machine. The stack pointer and base pointer are 8-bit and
/// wrap silently within the 256-byte stack; nothing range-checks them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cpu {
    pub pc: u16,
    pub acc: u8,
    pub r0: u8,
    pub r1: u8,
    pub h: u8,
    pub l: u8,
    pub flags: Flags,
    pub sp: u8,
    pub bp: u8,
    /// Always `STACK_SIZE` bytes.
    pub stack: Vec<u8>,
    pub mem: Memory,
}

impl Cpu {
    pub fn new() -> Self {
        Self {
            pc: PROGRAM_START,
            acc: 0,
            r0: 0,
            r1: 0,
            h: 0,
            l: 0,
            flags: Flags::empty(),
            sp: 0,
            bp: 0,
            stack: vec![0; STACK_SIZE],
            mem: Memory::new(),
        }
    }

    /// The H:L pair read as one big-endian 16-bit register.
    pub fn hl(&self) -> u16 {
        ((self.h as u16) << 8) | self.l as u16
    }

    pub fn set_hl(&mut self, val: u16) {
        self.h = (val >> 8) as u8;
        self.l = val as u8;
    }

    /// Reinitializes everything, memory included.
    pub fn reset(&mut self) {
        *self = Cpu::new();
    }

    /// Copies an executable image into memory starting at address 0.
    /// The PC is left at `PROGRAM_START`, where the image's code begins.
    pub fn load_program(&mut self, image: &[u8]) {
        self.mem.load(image);
        debug!(len = image.len(), "program loaded");
    }

    /// Executes exactly one instruction and returns the opcode byte it
    /// fetched. Opcodes with no table entry advance the PC by one and do
    /// nothing else.
    pub fn step(&mut self) -> u8 {
        let code = self.mem.read(self.pc);
        match OPS.decode(code) {
            Some(desc) => {
                trace!(pc = self.pc, code, mnemonic = desc.mnemonic, "step");
                exec::execute(self, desc);
            }
            None => self.pc = self.pc.wrapping_add(1),
        }
        code
    }

    /// Steps until a HALT opcode is fetched. HALT itself changes no
    /// state; the loop stops on seeing it.
    pub fn run(&mut self) {
        self.run_with(|_| {});
    }

    /// Like [`run`](Cpu::run), but while the trap flag is set the given
    /// hook is invoked after every step, giving the driver a single-step
    /// inspection point.
    pub fn run_with<F: FnMut(&Cpu)>(&mut self, mut inspect: F) {
        loop {
            let code = self.step();
            if OPS.decode(code).map(|d| d.op) == Some(Op::Halt) {
                break;
            }
            if self.flags.contains(Flags::T) {
                inspect(self);
            }
        }
    }

    pub(crate) fn push8(&mut self, val: u8) {
        self.stack[self.sp as usize] = val;
        self.sp = self.sp.wrapping_add(1);
    }

    pub(crate) fn pop8(&mut self) -> u8 {
        self.sp = self.sp.wrapping_sub(1);
        self.stack[self.sp as usize]
    }

    /// Stack index of a frame operand byte: `BP + byte - 1`, so a wire
    /// byte of 1 ({BP+0} in source) is the first local slot.
    pub(crate) fn frame_slot(&self, byte: u8) -> usize {
        self.bp.wrapping_add(byte).wrapping_sub(1) as usize
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

//! An 8-bit virtual CPU and the two-pass assembler that targets it.
//!
//! The assembler side (`tokenizer`, `parser`, `assembler`, `diag`)
//! turns line-oriented assembly text into a loadable [`Executable`];
//! the engine side (`cpu`, `exec`, `decoder`, `memory`) runs it. Both
//! sides share the instruction table in [`instructions`], so operand
//! classification and opcode dispatch cannot disagree.

pub mod assembler;
pub mod cpu;
pub mod decoder;
pub mod diag;
pub mod exec;
pub mod flags;
pub mod instructions;
pub mod memory;
pub mod parser;
pub mod tokenizer;

pub use assembler::{assemble, AssembleOutput, Executable};
pub use cpu::{Cpu, PROGRAM_START, STACK_SIZE};
pub use diag::{DiagKind, Diagnostic, Severity};
pub use flags::Flags;
pub use memory::{Memory, MEMORY_SIZE};

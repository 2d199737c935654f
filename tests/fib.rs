//! End-to-end: assemble a Fibonacci program, run it, and check the
//! result, plus byte-level parity against a hand-encoded image.

use pretty_assertions::assert_eq;

use oc8_rs::instructions::{encode, Op, Operand};
use oc8_rs::{assemble, Cpu, PROGRAM_START};

// fib(0) = 0, fib(1) = 1. Each pass computes L + H, shifts H into L and
// the sum into H, so after 9 passes H holds fib(10) = 55.
const SOURCE: &str = "\
CLRA
STORE L
LOAD 1
STORE H
LOAD 9
STORE R0
loop:
CLRA
ADD L
ADD H
XCH H
STORE L
DEC R0
JNZ .loop
LOAD H
HALT
";

#[test]
fn fibonacci_runs_to_55() {
    let out = assemble(SOURCE, "fib.s");
    assert!(out.diagnostics.is_empty(), "{:#?}", out.diagnostics);

    let mut cpu = Cpu::new();
    cpu.load_program(&out.executable.bytes);
    cpu.run();

    assert_eq!(cpu.acc, 55);
    assert_eq!(cpu.h, 55);
    assert_eq!(cpu.l, 34);
    assert_eq!(cpu.r0, 0);
}

#[test]
fn fibonacci_assembles_to_the_expected_bytes() {
    let loop_addr = PROGRAM_START + 8;
    let expected = vec![
        encode(Op::Clra, Operand::None),
        encode(Op::Store, Operand::L),
        encode(Op::Load, Operand::Imm8),
        1,
        encode(Op::Store, Operand::H),
        encode(Op::Load, Operand::Imm8),
        9,
        encode(Op::Store, Operand::R0),
        // loop:
        encode(Op::Clra, Operand::None),
        encode(Op::Add, Operand::L),
        encode(Op::Add, Operand::H),
        encode(Op::Xch, Operand::H),
        encode(Op::Store, Operand::L),
        encode(Op::Dec, Operand::R0),
        encode(Op::Jnz, Operand::Imm16),
        (loop_addr >> 8) as u8,
        loop_addr as u8,
        encode(Op::Load, Operand::H),
        encode(Op::Halt, Operand::None),
        encode(Op::Halt, Operand::None), // implicit trailing halt
    ];

    let out = assemble(SOURCE, "fib.s");
    assert_eq!(out.executable.code(), &expected[..]);

    // The assembled image and the hand-built one drive a CPU to the
    // same final state.
    let mut image = vec![0u8; PROGRAM_START as usize];
    image.extend_from_slice(&expected);
    let mut by_hand = Cpu::new();
    by_hand.load_program(&image);
    by_hand.run();

    let mut assembled = Cpu::new();
    assembled.load_program(&out.executable.bytes);
    assembled.run();

    assert_eq!(
        serde_json::to_value(&by_hand).unwrap(),
        serde_json::to_value(&assembled).unwrap()
    );
}

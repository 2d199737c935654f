//! Assembler integration tests: encodings, label resolution and the
//! diagnostics surface.

use pretty_assertions::assert_eq;

use oc8_rs::instructions::{encode, Op, Operand};
use oc8_rs::{assemble, Cpu, DiagKind, Flags, Severity, PROGRAM_START};

fn code_of(source: &str) -> Vec<u8> {
    let out = assemble(source, "test.s");
    assert!(
        out.diagnostics.is_empty(),
        "unexpected diagnostics: {:#?}",
        out.diagnostics
    );
    out.executable.code().to_vec()
}

#[test]
fn scenario_a_encoding() {
    let code = code_of("LOAD 5\nADD 3\nHALT\n");
    assert_eq!(
        code,
        vec![
            encode(Op::Load, Operand::Imm8),
            5,
            encode(Op::Add, Operand::Imm8),
            3,
            encode(Op::Halt, Operand::None),
            encode(Op::Halt, Operand::None), // implicit trailing halt
        ]
    );
}

#[test]
fn scenario_a_runs_to_eight() {
    let out = assemble("LOAD 5\nADD 3\nHALT\n", "test.s");
    assert!(out.diagnostics.is_empty());

    let mut cpu = Cpu::new();
    cpu.load_program(&out.executable.bytes);
    cpu.run();

    assert_eq!(cpu.acc, 8);
    assert!(!cpu.flags.contains(Flags::Z));
    assert!(!cpu.flags.contains(Flags::S));
}

#[test]
fn reserved_prefix_is_zero_filled() {
    let out = assemble("LOAD 5\n", "test.s");
    let bytes = &out.executable.bytes;
    assert_eq!(bytes.len(), PROGRAM_START as usize + 3);
    assert!(bytes[..PROGRAM_START as usize].iter().all(|&b| b == 0));
}

#[test]
fn assembly_is_deterministic() {
    let src = "start:\nLOAD 1\nADD R0\nJNZ .start\nHALT\n";
    assert_eq!(
        assemble(src, "a.s").executable,
        assemble(src, "a.s").executable
    );
}

#[test]
fn forward_label_is_patched() {
    let code = code_of("JMP .end\nNOOP\nend:\nHALT\n");
    // JMP is 3 bytes, NOOP 1, so `end` sits at PROGRAM_START + 4.
    assert_eq!(code[0], encode(Op::Jmp, Operand::Imm16));
    assert_eq!(&code[1..3], &[0x01, 0x04]);
}

#[test]
fn constant_alias_binds_a_literal() {
    let code = code_of(".target = 0x1234\nJMP .target\n");
    assert_eq!(&code[..3], &[encode(Op::Jmp, Operand::Imm16), 0x12, 0x34]);
}

#[test]
fn scenario_c_undefined_label() {
    let out = assemble("JMP .nowhere\n", "prog.s");
    let errors: Vec<_> = out
        .diagnostics
        .iter()
        .filter(|d| d.kind == DiagKind::UndefinedLabel)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].line_nr, 1);
    assert_eq!(errors[0].col, 4);
    assert_eq!(errors[0].token, ".nowhere");
    // The buffer is still produced, placeholder left in place.
    assert_eq!(
        out.executable.code(),
        &[
            encode(Op::Jmp, Operand::Imm16),
            0,
            0,
            encode(Op::Halt, Operand::None)
        ]
    );
}

#[test]
fn duplicate_label_is_an_error() {
    let out = assemble("here:\nNOOP\nhere:\nHALT\n", "prog.s");
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.diagnostics[0].kind, DiagKind::DuplicateLabel);
}

#[test]
fn scenario_d_multiple_memory_base() {
    let out = assemble("LOAD (HL+L)\n", "prog.s");
    assert!(out
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagKind::MultipleMemoryBase));
}

#[test]
fn scenario_e_overflow_warns_and_truncates() {
    let out = assemble("LOAD 300\n", "prog.s");
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.diagnostics[0].kind, DiagKind::U8Overflow);
    assert_eq!(out.diagnostics[0].severity, Severity::Warning);
    assert_eq!(out.executable.code()[1], 44);
}

#[test]
fn warnings_alone_do_not_count_as_errors() {
    assert!(!assemble("LOAD 300\n", "prog.s").has_errors());
    assert!(assemble("JMP .nowhere\n", "prog.s").has_errors());
}

#[test]
fn raw_data_overflow_warns_and_truncates() {
    let out = assemble("1 300 2\n", "prog.s");
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.diagnostics[0].kind, DiagKind::U8Overflow);
    assert_eq!(out.diagnostics[0].severity, Severity::Warning);
    assert_eq!(
        out.executable.code(),
        &[1, 44, 2, encode(Op::Halt, Operand::None)]
    );
}

#[test]
fn raw_data_and_quoted_bytes() {
    let code = code_of("1 2 0x10\n\"hi\"\n");
    assert_eq!(
        code,
        vec![1, 2, 0x10, b'h', b'i', encode(Op::Halt, Operand::None)]
    );
}

#[test]
fn load_zero_becomes_clear_accumulator() {
    let code = code_of("LOAD 0\n");
    assert_eq!(code[0], encode(Op::Clra, Operand::None));
    let code = code_of("CLRA\n");
    assert_eq!(code[0], encode(Op::Clra, Operand::None));
}

#[test]
fn xch_immediate_degenerates_to_load() {
    assert_eq!(code_of("XCH 7\n"), code_of("LOAD 7\n"));
}

#[test]
fn memory_expression_encodings() {
    // Absolute address for data movement.
    assert_eq!(
        code_of("LOAD (0x2F00)\n")[..3],
        [encode(Op::Load, Operand::MemAbs), 0x2F, 0x00]
    );
    // HL-relative with a non-zero offset inserts the HL adjust.
    assert_eq!(
        code_of("STORE (HL+2)\n")[..4],
        [
            encode(Op::AddHl, Operand::Imm16),
            0x00,
            0x02,
            encode(Op::Store, Operand::MemHl)
        ]
    );
    // Plain HL is a single indirect opcode.
    assert_eq!(code_of("LOAD (HL)\n")[0], encode(Op::Load, Operand::MemHl));
    // L-relative with offset uses the 8-bit adjust.
    assert_eq!(
        code_of("LOAD (L+3)\n")[..3],
        [
            encode(Op::AddL, Operand::Imm8),
            3,
            encode(Op::Load, Operand::MemL)
        ]
    );
}

#[test]
fn alu_absolute_routes_through_hl() {
    assert_eq!(
        code_of("ADD (0x1234)\n")[..4],
        [
            encode(Op::LoadHl, Operand::Imm16),
            0x12,
            0x34,
            encode(Op::Add, Operand::MemHl)
        ]
    );
}

#[test]
fn indexed_label_carries_base_offset() {
    let code = code_of("LOAD table[2]\ntable:\n10 20 30\n");
    // `table` is at PROGRAM_START + 3; the placeholder base 2 is added.
    assert_eq!(
        code[..3],
        [encode(Op::Load, Operand::MemAbs), 0x01, 0x05]
    );
    assert_eq!(&code[3..6], &[10, 20, 30]);
}

#[test]
fn indexed_label_with_hl_base() {
    let code = code_of("ADD table[HL]\ntable:\n1\n");
    assert_eq!(code[0], encode(Op::AddHl, Operand::Imm16));
    assert_eq!(code[3], encode(Op::Add, Operand::MemHl));
}

#[test]
fn indexed_label_rejects_l_base() {
    let out = assemble("LOAD table[L]\ntable:\n1\n", "prog.s");
    assert!(out
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagKind::InvalidMemoryIndex));
}

#[test]
fn frame_operands() {
    // The wire byte is offset + 1.
    assert_eq!(
        code_of("LOAD {BP+0}\n")[..2],
        [encode(Op::Load, Operand::Frame), 1]
    );
    assert_eq!(
        code_of("STORE {BP+1}\n")[..2],
        [encode(Op::Store, Operand::Frame), 2]
    );
    assert_eq!(
        code_of("ADD {BP+2}\n")[..2],
        [encode(Op::Add, Operand::Frame), 3]
    );
}

#[test]
fn frame_requires_bp_base() {
    let out = assemble("LOAD {HL}\n", "prog.s");
    assert!(out
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagKind::InvalidStackIndex));
}

#[test]
fn ret_forms() {
    assert_eq!(code_of("RET\n")[0], encode(Op::Ret, Operand::None));
    assert_eq!(
        code_of("RET 2\n")[..2],
        [encode(Op::Ret, Operand::Imm8), 2]
    );
}

#[test]
fn enter_takes_locals_size() {
    assert_eq!(
        code_of("ENTER 4\n")[..2],
        [encode(Op::Enter, Operand::Imm8), 4]
    );
}

#[test]
fn jext_encoding_and_comma() {
    let code = code_of("JEXT 0b000100, 0x0123\n");
    assert_eq!(
        code[..4],
        [encode(Op::Jext, Operand::MaskImm16), 0b100, 0x01, 0x23]
    );

    let out = assemble("JEXT 4 0x123\n", "prog.s");
    assert!(out
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagKind::ExpectedComma));
}

#[test]
fn call_accepts_only_labels() {
    let code = code_of("CALL .f\nf:\nRET\n");
    assert_eq!(code[0], encode(Op::Call, Operand::Imm16));
    let out = assemble("CALL 0x200\n", "prog.s");
    assert!(out
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagKind::UnexpectedToken));
}

#[test]
fn operand_surface_violations() {
    let out = assemble("HALT 1\n", "prog.s");
    assert_eq!(out.diagnostics[0].kind, DiagKind::NoOperandAllowed);

    let out = assemble("STORE 5\n", "prog.s");
    assert_eq!(out.diagnostics[0].kind, DiagKind::UnexpectedToken);

    let out = assemble("ADDW (HL)\n", "prog.s");
    assert_eq!(out.diagnostics[0].kind, DiagKind::UnexpectedToken);

    let out = assemble("PUSH (0x200)\n", "prog.s");
    assert_eq!(out.diagnostics[0].kind, DiagKind::UnexpectedToken);
}

#[test]
fn unknown_tokens_are_reported_and_skipped() {
    let out = assemble("bogus stuff\nLOAD 1\n", "prog.s");
    assert!(out
        .diagnostics
        .iter()
        .all(|d| d.kind == DiagKind::UnknownToken));
    assert!(!out.diagnostics.is_empty());
    // The good line still assembled.
    assert_eq!(
        out.executable.code()[0],
        encode(Op::Load, Operand::Imm8)
    );
}

#[test]
fn eol_mid_expression() {
    let out = assemble("LOAD (HL+\n", "prog.s");
    assert!(out
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagKind::UnexpectedEol));
}

//! The instruction set, described once as data.
//!
//! Every opcode is one [`InstrDesc`] row: an instruction family plus the
//! operand variant it binds. The assembler encodes by `(op, operand)`
//! lookup and the CPU decodes through a 256-entry table built from the
//! same rows, so the two sides cannot drift apart.

/// Instruction families. One generic handler per family lives in
/// `exec`; the operand variant selects its source or destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Noop,
    Halt,
    Ei,
    Di,
    Et,
    Dt,
    Clra,
    Reset,
    Load,
    Store,
    Xch,
    /// Synthetic `L = imm8`, emitted for L-relative addressing.
    LoadL,
    /// Synthetic `HL = imm16`, emitted for absolute ALU memory operands.
    LoadHl,
    /// Synthetic `L += imm8`, emitted for L-relative offsets.
    AddL,
    /// Synthetic `HL += imm16`, emitted for HL-relative offsets.
    AddHl,
    Add,
    Adc,
    Sub,
    Sbc,
    Inc,
    Dec,
    Neg,
    Not,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Rol,
    Ror,
    Addw,
    Subw,
    Mulw,
    Divw,
    Jmp,
    Js,
    Jns,
    Jz,
    Jnz,
    Jc,
    Jnc,
    Jext,
    Cmp,
    Push,
    Pop,
    Call,
    Ret,
    Enter,
    Leave,
    Min,
    Max,
}

/// Operand variants an instruction family can bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    None,
    Acc,
    R0,
    R1,
    L,
    H,
    /// The 16-bit H:L pair itself (wide unary forms).
    Hl,
    Bp,
    Flags,
    /// One immediate byte following the opcode.
    Imm8,
    /// Big-endian 16-bit immediate following the opcode.
    Imm16,
    /// Absolute address: big-endian 16-bit operand, memory-indirect.
    MemAbs,
    /// Memory at address L.
    MemL,
    /// Memory at address HL.
    MemHl,
    /// Stack-frame slot: one byte holding offset+1, addressing
    /// `stack[BP + byte - 1]`.
    Frame,
    /// JEXT's flag-mask byte followed by a big-endian 16-bit target.
    MaskImm16,
}

impl Operand {
    /// Number of operand bytes following the opcode byte.
    pub const fn wire_len(self) -> u16 {
        match self {
            Operand::Imm8 | Operand::Frame => 1,
            Operand::Imm16 | Operand::MemAbs => 2,
            Operand::MaskImm16 => 3,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct InstrDesc {
    pub code: u8,
    pub op: Op,
    pub operand: Operand,
    pub mnemonic: &'static str,
}

impl InstrDesc {
    /// Total encoded length, opcode byte included.
    pub const fn len(&self) -> u16 {
        1 + self.operand.wire_len()
    }
}

const fn row(code: u8, op: Op, operand: Operand, mnemonic: &'static str) -> InstrDesc {
    InstrDesc {
        code,
        op,
        operand,
        mnemonic,
    }
}

use Operand::*;

pub const TABLE: &[InstrDesc] = &[
    row(0x00, Op::Noop, None, "NOOP"),
    row(0x01, Op::Halt, None, "HALT"),
    row(0x02, Op::Ei, None, "EI"),
    row(0x03, Op::Di, None, "DI"),
    row(0x04, Op::Et, None, "ET"),
    row(0x05, Op::Dt, None, "DT"),
    row(0x06, Op::Clra, None, "CLRA"),
    row(0x07, Op::Reset, None, "RESET"),
    row(0x08, Op::Load, Imm8, "LOAD"),
    row(0x09, Op::Load, MemAbs, "LOAD"),
    row(0x0A, Op::Load, MemL, "LOAD"),
    row(0x0B, Op::Load, MemHl, "LOAD"),
    row(0x0C, Op::Load, R0, "LOAD"),
    row(0x0D, Op::Load, R1, "LOAD"),
    row(0x0E, Op::Load, L, "LOAD"),
    row(0x0F, Op::Load, H, "LOAD"),
    row(0x10, Op::LoadL, Imm8, "LOADL"),
    row(0x11, Op::Store, MemAbs, "STORE"),
    row(0x12, Op::Store, MemL, "STORE"),
    row(0x13, Op::Store, MemHl, "STORE"),
    row(0x14, Op::Store, R0, "STORE"),
    row(0x15, Op::Store, R1, "STORE"),
    row(0x16, Op::Store, L, "STORE"),
    row(0x17, Op::Store, H, "STORE"),
    row(0x18, Op::LoadHl, Imm16, "LOADHL"),
    row(0x19, Op::Xch, MemAbs, "XCH"),
    row(0x1A, Op::Xch, MemL, "XCH"),
    row(0x1B, Op::Xch, MemHl, "XCH"),
    row(0x1C, Op::Xch, R0, "XCH"),
    row(0x1D, Op::Xch, R1, "XCH"),
    row(0x1E, Op::Xch, L, "XCH"),
    row(0x1F, Op::Xch, H, "XCH"),
    row(0x20, Op::Add, Imm8, "ADD"),
    row(0x21, Op::Add, Acc, "ADD"),
    row(0x22, Op::Add, MemL, "ADD"),
    row(0x23, Op::Add, MemHl, "ADD"),
    row(0x24, Op::Add, R0, "ADD"),
    row(0x25, Op::Add, R1, "ADD"),
    row(0x26, Op::Add, L, "ADD"),
    row(0x27, Op::Add, H, "ADD"),
    row(0x28, Op::Adc, Imm8, "ADC"),
    row(0x29, Op::Adc, Acc, "ADC"),
    row(0x2A, Op::Adc, MemL, "ADC"),
    row(0x2B, Op::Adc, MemHl, "ADC"),
    row(0x2C, Op::Adc, R0, "ADC"),
    row(0x2D, Op::Adc, R1, "ADC"),
    row(0x2E, Op::Adc, L, "ADC"),
    row(0x2F, Op::Adc, H, "ADC"),
    row(0x30, Op::Sub, Imm8, "SUB"),
    row(0x31, Op::Sub, Acc, "SUB"),
    row(0x32, Op::Sub, MemL, "SUB"),
    row(0x33, Op::Sub, MemHl, "SUB"),
    row(0x34, Op::Sub, R0, "SUB"),
    row(0x35, Op::Sub, R1, "SUB"),
    row(0x36, Op::Sub, L, "SUB"),
    row(0x37, Op::Sub, H, "SUB"),
    row(0x38, Op::Sbc, Imm8, "SBC"),
    row(0x39, Op::Sbc, Acc, "SBC"),
    row(0x3A, Op::Sbc, MemL, "SBC"),
    row(0x3B, Op::Sbc, MemHl, "SBC"),
    row(0x3C, Op::Sbc, R0, "SBC"),
    row(0x3D, Op::Sbc, R1, "SBC"),
    row(0x3E, Op::Sbc, L, "SBC"),
    row(0x3F, Op::Sbc, H, "SBC"),
    row(0x40, Op::Inc, Hl, "INC"),
    row(0x41, Op::Inc, Acc, "INC"),
    row(0x42, Op::Inc, MemL, "INC"),
    row(0x43, Op::Inc, MemHl, "INC"),
    row(0x44, Op::Inc, R0, "INC"),
    row(0x45, Op::Inc, R1, "INC"),
    row(0x46, Op::Inc, L, "INC"),
    row(0x47, Op::Inc, H, "INC"),
    row(0x48, Op::Dec, Hl, "DEC"),
    row(0x49, Op::Dec, Acc, "DEC"),
    row(0x4A, Op::Dec, MemL, "DEC"),
    row(0x4B, Op::Dec, MemHl, "DEC"),
    row(0x4C, Op::Dec, R0, "DEC"),
    row(0x4D, Op::Dec, R1, "DEC"),
    row(0x4E, Op::Dec, L, "DEC"),
    row(0x4F, Op::Dec, H, "DEC"),
    row(0x50, Op::Neg, Hl, "NEG"),
    row(0x51, Op::Neg, Acc, "NEG"),
    row(0x52, Op::Neg, MemL, "NEG"),
    row(0x53, Op::Neg, MemHl, "NEG"),
    row(0x54, Op::Neg, R0, "NEG"),
    row(0x55, Op::Neg, R1, "NEG"),
    row(0x56, Op::Neg, L, "NEG"),
    row(0x57, Op::Neg, H, "NEG"),
    row(0x58, Op::Not, Hl, "NOT"),
    row(0x59, Op::Not, Acc, "NOT"),
    row(0x5A, Op::Not, MemL, "NOT"),
    row(0x5B, Op::Not, MemHl, "NOT"),
    row(0x5C, Op::Not, R0, "NOT"),
    row(0x5D, Op::Not, R1, "NOT"),
    row(0x5E, Op::Not, L, "NOT"),
    row(0x5F, Op::Not, H, "NOT"),
    row(0x60, Op::And, Imm8, "AND"),
    row(0x61, Op::And, Acc, "AND"),
    row(0x62, Op::And, MemL, "AND"),
    row(0x63, Op::And, MemHl, "AND"),
    row(0x64, Op::And, R0, "AND"),
    row(0x65, Op::And, R1, "AND"),
    row(0x66, Op::And, L, "AND"),
    row(0x67, Op::And, H, "AND"),
    row(0x68, Op::Or, Imm8, "OR"),
    row(0x69, Op::Or, Acc, "OR"),
    row(0x6A, Op::Or, MemL, "OR"),
    row(0x6B, Op::Or, MemHl, "OR"),
    row(0x6C, Op::Or, R0, "OR"),
    row(0x6D, Op::Or, R1, "OR"),
    row(0x6E, Op::Or, L, "OR"),
    row(0x6F, Op::Or, H, "OR"),
    row(0x70, Op::Xor, Imm8, "XOR"),
    row(0x71, Op::Xor, Acc, "XOR"),
    row(0x72, Op::Xor, MemL, "XOR"),
    row(0x73, Op::Xor, MemHl, "XOR"),
    row(0x74, Op::Xor, R0, "XOR"),
    row(0x75, Op::Xor, R1, "XOR"),
    row(0x76, Op::Xor, L, "XOR"),
    row(0x77, Op::Xor, H, "XOR"),
    row(0x78, Op::Shl, Imm8, "SHL"),
    row(0x7A, Op::Shl, MemL, "SHL"),
    row(0x7B, Op::Shl, MemHl, "SHL"),
    row(0x7C, Op::Shl, R0, "SHL"),
    row(0x7D, Op::Shl, R1, "SHL"),
    row(0x7E, Op::Shl, L, "SHL"),
    row(0x7F, Op::Shl, H, "SHL"),
    row(0x80, Op::Shr, Imm8, "SHR"),
    row(0x82, Op::Shr, MemL, "SHR"),
    row(0x83, Op::Shr, MemHl, "SHR"),
    row(0x84, Op::Shr, R0, "SHR"),
    row(0x85, Op::Shr, R1, "SHR"),
    row(0x86, Op::Shr, L, "SHR"),
    row(0x87, Op::Shr, H, "SHR"),
    row(0x88, Op::Rol, Imm8, "ROL"),
    row(0x8A, Op::Rol, MemL, "ROL"),
    row(0x8B, Op::Rol, MemHl, "ROL"),
    row(0x8C, Op::Rol, R0, "ROL"),
    row(0x8D, Op::Rol, R1, "ROL"),
    row(0x8E, Op::Rol, L, "ROL"),
    row(0x8F, Op::Rol, H, "ROL"),
    row(0x90, Op::Ror, Imm8, "ROR"),
    row(0x92, Op::Ror, MemL, "ROR"),
    row(0x93, Op::Ror, MemHl, "ROR"),
    row(0x94, Op::Ror, R0, "ROR"),
    row(0x95, Op::Ror, R1, "ROR"),
    row(0x96, Op::Ror, L, "ROR"),
    row(0x97, Op::Ror, H, "ROR"),
    row(0x98, Op::Addw, Imm16, "ADDW"),
    row(0x99, Op::Addw, Acc, "ADDW"),
    row(0x9A, Op::Addw, R0, "ADDW"),
    row(0x9B, Op::Addw, R1, "ADDW"),
    row(0x9C, Op::Subw, Imm16, "SUBW"),
    row(0x9D, Op::Subw, Acc, "SUBW"),
    row(0x9E, Op::Subw, R0, "SUBW"),
    row(0x9F, Op::Subw, R1, "SUBW"),
    row(0xA0, Op::Mulw, Imm16, "MULW"),
    row(0xA1, Op::Mulw, Acc, "MULW"),
    row(0xA2, Op::Mulw, R0, "MULW"),
    row(0xA3, Op::Mulw, R1, "MULW"),
    row(0xA4, Op::Divw, Imm16, "DIVW"),
    row(0xA5, Op::Divw, Acc, "DIVW"),
    row(0xA6, Op::Divw, R0, "DIVW"),
    row(0xA7, Op::Divw, R1, "DIVW"),
    row(0xA8, Op::Jmp, Imm16, "JMP"),
    row(0xA9, Op::Js, Imm16, "JS"),
    row(0xAA, Op::Jns, Imm16, "JNS"),
    row(0xAB, Op::Jz, Imm16, "JZ"),
    row(0xAC, Op::Jnz, Imm16, "JNZ"),
    row(0xAD, Op::Jc, Imm16, "JC"),
    row(0xAE, Op::Jnc, Imm16, "JNC"),
    row(0xAF, Op::Jext, MaskImm16, "JEXT"),
    row(0xB0, Op::Cmp, Imm8, "CMP"),
    row(0xB1, Op::Cmp, Acc, "CMP"),
    row(0xB2, Op::Cmp, MemL, "CMP"),
    row(0xB3, Op::Cmp, MemHl, "CMP"),
    row(0xB4, Op::Cmp, R0, "CMP"),
    row(0xB5, Op::Cmp, R1, "CMP"),
    row(0xB6, Op::Cmp, L, "CMP"),
    row(0xB7, Op::Cmp, H, "CMP"),
    row(0xB8, Op::Push, Imm8, "PUSH"),
    row(0xB9, Op::Push, Acc, "PUSH"),
    row(0xBA, Op::Push, R0, "PUSH"),
    row(0xBB, Op::Push, R1, "PUSH"),
    row(0xBC, Op::Push, L, "PUSH"),
    row(0xBD, Op::Push, H, "PUSH"),
    row(0xBE, Op::Push, Bp, "PUSH"),
    row(0xBF, Op::Push, Flags, "PUSH"),
    row(0xC1, Op::Pop, Acc, "POP"),
    row(0xC2, Op::Pop, R0, "POP"),
    row(0xC3, Op::Pop, R1, "POP"),
    row(0xC4, Op::Pop, L, "POP"),
    row(0xC5, Op::Pop, H, "POP"),
    row(0xC6, Op::Pop, Bp, "POP"),
    row(0xC7, Op::Pop, Flags, "POP"),
    row(0xC8, Op::Call, Imm16, "CALL"),
    row(0xC9, Op::Ret, None, "RET"),
    row(0xCA, Op::Enter, Imm8, "ENTER"),
    row(0xCB, Op::Leave, None, "LEAVE"),
    row(0xCC, Op::Load, Frame, "LOAD"),
    row(0xCD, Op::Store, Frame, "STORE"),
    row(0xCE, Op::AddL, Imm8, "ADDL"),
    row(0xCF, Op::AddHl, Imm16, "ADDHL"),
    row(0xD0, Op::Min, Imm8, "MIN"),
    row(0xD2, Op::Min, MemL, "MIN"),
    row(0xD3, Op::Min, MemHl, "MIN"),
    row(0xD4, Op::Min, R0, "MIN"),
    row(0xD5, Op::Min, R1, "MIN"),
    row(0xD6, Op::Min, L, "MIN"),
    row(0xD7, Op::Min, H, "MIN"),
    row(0xD8, Op::Max, Imm8, "MAX"),
    row(0xDA, Op::Max, MemL, "MAX"),
    row(0xDB, Op::Max, MemHl, "MAX"),
    row(0xDC, Op::Max, R0, "MAX"),
    row(0xDD, Op::Max, R1, "MAX"),
    row(0xDE, Op::Max, L, "MAX"),
    row(0xDF, Op::Max, H, "MAX"),
    row(0xE0, Op::Ret, Imm8, "RET"),
    row(0xE1, Op::Xch, Frame, "XCH"),
    row(0xE2, Op::Add, Frame, "ADD"),
    row(0xE3, Op::Adc, Frame, "ADC"),
    row(0xE4, Op::Sub, Frame, "SUB"),
    row(0xE5, Op::Sbc, Frame, "SBC"),
    row(0xE6, Op::And, Frame, "AND"),
    row(0xE7, Op::Or, Frame, "OR"),
    row(0xE8, Op::Xor, Frame, "XOR"),
    row(0xE9, Op::Cmp, Frame, "CMP"),
    row(0xEA, Op::Inc, Frame, "INC"),
    row(0xEB, Op::Dec, Frame, "DEC"),
    row(0xEC, Op::Neg, Frame, "NEG"),
    row(0xED, Op::Not, Frame, "NOT"),
    row(0xEE, Op::Shl, Frame, "SHL"),
    row(0xEF, Op::Shr, Frame, "SHR"),
    row(0xF0, Op::Rol, Frame, "ROL"),
    row(0xF1, Op::Ror, Frame, "ROR"),
    row(0xF2, Op::Min, Frame, "MIN"),
    row(0xF3, Op::Max, Frame, "MAX"),
];

/// Looks up the row for an `(op, operand)` pairing.
pub fn lookup(op: Op, operand: Operand) -> Option<&'static InstrDesc> {
    TABLE.iter().find(|d| d.op == op && d.operand == operand)
}

/// Opcode byte for an `(op, operand)` pairing the table defines.
///
/// Panics when the pairing has no row; callers only request encodings for
/// forms they have already validated against the operand surface.
pub fn encode(op: Op, operand: Operand) -> u8 {
    match lookup(op, operand) {
        Some(desc) => desc.code,
        Option::None => unreachable!("no encoding for {op:?} with {operand:?}"),
    }
}

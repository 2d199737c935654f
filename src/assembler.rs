//! The two-pass assembler.
//!
//! Pass 1 walks tokenized lines, emitting opcode and operand bytes and
//! recording a patch site for every label reference. Pass 2 resolves the
//! references against the label table and patches the placeholder bytes.
//! Assembly is best-effort: diagnostics accumulate and an executable is
//! always produced.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cpu::PROGRAM_START;
use crate::diag::{DiagKind, Diagnostic, Reporter, Severity};
use crate::instructions::{self, Op, Operand};
use crate::parser::{next_token, parse_immediate, parse_mem_expr, AddrMode, TokenCursor};
use crate::tokenizer::{tokenize, Mnemonic, RegToken, Token, TokenKind, TokenLine};

/// A loadable binary image: `PROGRAM_START` reserved zero bytes, then
/// the generated code, terminated by an implicit HALT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Executable {
    pub bytes: Vec<u8>,
}

impl Executable {
    /// The generated code, without the reserved prefix page.
    pub fn code(&self) -> &[u8] {
        &self.bytes[PROGRAM_START as usize..]
    }
}

#[derive(Debug)]
pub struct AssembleOutput {
    pub executable: Executable,
    pub diagnostics: Vec<Diagnostic>,
}

impl AssembleOutput {
    /// True when any diagnostic is an error. Warnings alone still leave
    /// a runnable executable.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }
}

/// A recorded patch site, resolved in pass 2.
#[derive(Debug)]
struct LabelRef {
    name: String,
    /// Byte offset of the 16-bit placeholder in the output buffer.
    idx: usize,
    /// Source context of the referencing token.
    text: String,
    col: usize,
    line: String,
    line_nr: usize,
}

/// Assembles one source text. `path` only names the source in
/// diagnostics; no file is read.
pub fn assemble(source: &str, path: &str) -> AssembleOutput {
    let mut asm = Assembler::new(path);
    for line in tokenize(source) {
        asm.line(&line);
    }
    // Fallthrough off the end of the program always halts.
    asm.emit(Op::Halt, Operand::None);
    asm.resolve();
    debug!(
        bytes = asm.out.len(),
        diagnostics = asm.reporter.diags.len(),
        "assembly finished"
    );
    AssembleOutput {
        executable: Executable { bytes: asm.out },
        diagnostics: asm.reporter.diags,
    }
}

struct Assembler {
    out: Vec<u8>,
    labels: HashMap<String, u16>,
    refs: Vec<LabelRef>,
    reporter: Reporter,
}

fn reg_operand(reg: RegToken) -> Option<Operand> {
    Some(match reg {
        RegToken::Acc => Operand::Acc,
        RegToken::R0 => Operand::R0,
        RegToken::R1 => Operand::R1,
        RegToken::L => Operand::L,
        RegToken::H => Operand::H,
        RegToken::Hl => Operand::Hl,
        RegToken::Bp => Operand::Bp,
        RegToken::Flags => Operand::Flags,
        RegToken::Sp | RegToken::Pc => return None,
    })
}

impl Assembler {
    fn new(path: &str) -> Self {
        Self {
            out: vec![0; PROGRAM_START as usize],
            labels: HashMap::new(),
            refs: Vec::new(),
            reporter: Reporter::new(path),
        }
    }

    fn emit(&mut self, op: Op, operand: Operand) {
        self.out.push(instructions::encode(op, operand));
    }

    fn byte(&mut self, val: u8) {
        self.out.push(val);
    }

    /// Big-endian 16-bit operand.
    fn word(&mut self, val: u16) {
        self.out.push((val >> 8) as u8);
        self.out.push(val as u8);
    }

    /// Parses an 8-bit immediate, warning when the literal exceeds 255;
    /// the value is truncated to its low byte either way.
    fn imm8_checked(&mut self, token: &Token) -> u8 {
        let val = parse_immediate(token);
        if val > 0xFF {
            self.reporter.token(DiagKind::U8Overflow, token);
        }
        val as u8
    }

    /// Records a patch site for `token` and emits the 16-bit placeholder
    /// (non-zero when indexed-label syntax contributed a base offset).
    fn label_ref(&mut self, token: &Token, base: u16) {
        let name = token.text.strip_prefix('.').unwrap_or(&token.text);
        self.refs.push(LabelRef {
            name: name.to_string(),
            idx: self.out.len(),
            text: token.text.clone(),
            col: token.col,
            line: self.reporter.line().to_string(),
            line_nr: self.reporter.line_nr(),
        });
        self.word(base);
    }

    fn line(&mut self, line: &TokenLine) {
        self.reporter.set_line(line);
        let mut cur = TokenCursor::new(line);
        let Some(token) = cur.next() else { return };

        match token.kind {
            TokenKind::Mnemonic(m) => self.instruction(m, &mut cur),
            TokenKind::Int(_) => self.data_bytes(token, &mut cur),
            TokenKind::QuotedBytes => {
                for b in token.text[1..token.text.len() - 1].bytes() {
                    self.byte(b);
                }
            }
            TokenKind::LabelDef => self.define_label(token),
            TokenKind::LabelRef => self.define_constant(token, &mut cur),
            TokenKind::Comment => {}
            TokenKind::Unknown => {
                self.reporter.token(DiagKind::UnknownToken, token);
                while let Some(t) = cur.next() {
                    if t.kind == TokenKind::Unknown {
                        self.reporter.token(DiagKind::UnknownToken, t);
                    }
                }
            }
            _ => self.reporter.token(DiagKind::ExpectedOperator, token),
        }
    }

    fn instruction(&mut self, m: Mnemonic, cur: &mut TokenCursor) {
        match m {
            Mnemonic::Noop => self.basic(Op::Noop, cur),
            Mnemonic::Halt => self.basic(Op::Halt, cur),
            Mnemonic::Ei => self.basic(Op::Ei, cur),
            Mnemonic::Di => self.basic(Op::Di, cur),
            Mnemonic::Et => self.basic(Op::Et, cur),
            Mnemonic::Dt => self.basic(Op::Dt, cur),
            Mnemonic::Clra => self.basic(Op::Clra, cur),
            Mnemonic::Reset => self.basic(Op::Reset, cur),
            Mnemonic::Leave => self.basic(Op::Leave, cur),
            Mnemonic::Ret => self.ret(cur),
            Mnemonic::Load => self.data_movement(Op::Load, cur, true),
            Mnemonic::Xch => self.data_movement(Op::Xch, cur, true),
            Mnemonic::Store => self.data_movement(Op::Store, cur, false),
            Mnemonic::Add => self.acc_alu(Op::Add, cur),
            Mnemonic::Adc => self.acc_alu(Op::Adc, cur),
            Mnemonic::Sub => self.acc_alu(Op::Sub, cur),
            Mnemonic::Sbc => self.acc_alu(Op::Sbc, cur),
            Mnemonic::And => self.acc_alu(Op::And, cur),
            Mnemonic::Or => self.acc_alu(Op::Or, cur),
            Mnemonic::Xor => self.acc_alu(Op::Xor, cur),
            Mnemonic::Cmp => self.acc_alu(Op::Cmp, cur),
            Mnemonic::Inc => self.unary_alu(Op::Inc, cur),
            Mnemonic::Dec => self.unary_alu(Op::Dec, cur),
            Mnemonic::Neg => self.unary_alu(Op::Neg, cur),
            Mnemonic::Not => self.unary_alu(Op::Not, cur),
            Mnemonic::Shl => self.shift_alu(Op::Shl, cur),
            Mnemonic::Shr => self.shift_alu(Op::Shr, cur),
            Mnemonic::Rol => self.shift_alu(Op::Rol, cur),
            Mnemonic::Ror => self.shift_alu(Op::Ror, cur),
            Mnemonic::Min => self.shift_alu(Op::Min, cur),
            Mnemonic::Max => self.shift_alu(Op::Max, cur),
            Mnemonic::Addw => self.wide(Op::Addw, cur),
            Mnemonic::Subw => self.wide(Op::Subw, cur),
            Mnemonic::Mulw => self.wide(Op::Mulw, cur),
            Mnemonic::Divw => self.wide(Op::Divw, cur),
            Mnemonic::Jmp => self.jump(Op::Jmp, cur),
            Mnemonic::Js => self.jump(Op::Js, cur),
            Mnemonic::Jns => self.jump(Op::Jns, cur),
            Mnemonic::Jz => self.jump(Op::Jz, cur),
            Mnemonic::Jnz => self.jump(Op::Jnz, cur),
            Mnemonic::Jc => self.jump(Op::Jc, cur),
            Mnemonic::Jnc => self.jump(Op::Jnc, cur),
            Mnemonic::Jext => self.jext(cur),
            Mnemonic::Push => self.push(cur),
            Mnemonic::Pop => self.pop(cur),
            Mnemonic::Call => self.call(cur),
            Mnemonic::Enter => self.enter(cur),
        }
    }

    /// No-operand instructions: anything but a trailing comment is an
    /// error, and nothing is emitted for the faulty line.
    fn basic(&mut self, op: Op, cur: &mut TokenCursor) {
        match cur.next() {
            None => self.emit(op, Operand::None),
            Some(t) if t.kind.is_comment() => self.emit(op, Operand::None),
            Some(t) => self.reporter.token(DiagKind::NoOperandAllowed, t),
        }
    }

    /// RET is operand-less unless an immediate follows, in which case
    /// the returning form discards that many extra stack bytes.
    fn ret(&mut self, cur: &mut TokenCursor) {
        match cur.next() {
            None => self.emit(Op::Ret, Operand::None),
            Some(t) if t.kind.is_comment() => self.emit(Op::Ret, Operand::None),
            Some(t) if t.kind.is_immediate() => {
                let val = self.imm8_checked(t);
                self.emit(Op::Ret, Operand::Imm8);
                self.byte(val);
            }
            Some(t) => self.reporter.token(DiagKind::UnexpectedToken, t),
        }
    }

    fn reg_case(&mut self, op: Op, reg: RegToken, allowed: &[Operand], token: &Token) {
        match reg_operand(reg) {
            Some(operand) if allowed.contains(&operand) => self.emit(op, operand),
            _ => self.reporter.token(DiagKind::UnexpectedToken, token),
        }
    }

    /// LOAD/STORE/XCH. `imm_ok` admits the immediate form; an exchange
    /// with a literal degenerates to a plain load, and an immediate-zero
    /// load becomes the dedicated clear-accumulator opcode.
    fn data_movement(&mut self, op: Op, cur: &mut TokenCursor, imm_ok: bool) {
        const REGS: &[Operand] = &[Operand::R0, Operand::R1, Operand::L, Operand::H];
        let Some(token) = next_token(cur, &mut self.reporter) else { return };
        match token.kind {
            TokenKind::Register(r) => self.reg_case(op, r, REGS, token),
            TokenKind::Int(_) if imm_ok => {
                let val = self.imm8_checked(token);
                if val == 0 {
                    self.emit(Op::Clra, Operand::None);
                } else {
                    self.emit(Op::Load, Operand::Imm8);
                    self.byte(val);
                }
            }
            TokenKind::LParen => self.paren_operand(op, cur, true),
            TokenKind::IndexedLabel => self.indexed_operand(op, token, cur, true),
            TokenKind::LCurly => self.frame_operand(op, cur),
            _ => self.reporter.token(DiagKind::UnexpectedToken, token),
        }
    }

    /// ADD/ADC/SUB/SBC/AND/OR/XOR/CMP.
    fn acc_alu(&mut self, op: Op, cur: &mut TokenCursor) {
        const REGS: &[Operand] = &[
            Operand::Acc,
            Operand::R0,
            Operand::R1,
            Operand::L,
            Operand::H,
        ];
        let Some(token) = next_token(cur, &mut self.reporter) else { return };
        match token.kind {
            TokenKind::Register(r) => self.reg_case(op, r, REGS, token),
            TokenKind::Int(_) => {
                let val = self.imm8_checked(token);
                self.emit(op, Operand::Imm8);
                self.byte(val);
            }
            TokenKind::LParen => self.paren_operand(op, cur, false),
            TokenKind::IndexedLabel => self.indexed_operand(op, token, cur, false),
            TokenKind::LCurly => self.frame_operand(op, cur),
            _ => self.reporter.token(DiagKind::UnexpectedToken, token),
        }
    }

    /// INC/DEC/NEG/NOT: the accumulator surface plus the 16-bit HL form,
    /// minus immediates (there is nothing to increment in a literal).
    fn unary_alu(&mut self, op: Op, cur: &mut TokenCursor) {
        const REGS: &[Operand] = &[
            Operand::Acc,
            Operand::R0,
            Operand::R1,
            Operand::L,
            Operand::H,
            Operand::Hl,
        ];
        let Some(token) = next_token(cur, &mut self.reporter) else { return };
        match token.kind {
            TokenKind::Register(r) => self.reg_case(op, r, REGS, token),
            TokenKind::LParen => self.paren_operand(op, cur, false),
            TokenKind::IndexedLabel => self.indexed_operand(op, token, cur, false),
            TokenKind::LCurly => self.frame_operand(op, cur),
            _ => self.reporter.token(DiagKind::UnexpectedToken, token),
        }
    }

    /// SHL/SHR/ROL/ROR/MIN/MAX: like the accumulator ALU without the
    /// bare-accumulator operand.
    fn shift_alu(&mut self, op: Op, cur: &mut TokenCursor) {
        const REGS: &[Operand] = &[Operand::R0, Operand::R1, Operand::L, Operand::H];
        let Some(token) = next_token(cur, &mut self.reporter) else { return };
        match token.kind {
            TokenKind::Register(r) => self.reg_case(op, r, REGS, token),
            TokenKind::Int(_) => {
                let val = self.imm8_checked(token);
                self.emit(op, Operand::Imm8);
                self.byte(val);
            }
            TokenKind::LParen => self.paren_operand(op, cur, false),
            TokenKind::IndexedLabel => self.indexed_operand(op, token, cur, false),
            TokenKind::LCurly => self.frame_operand(op, cur),
            _ => self.reporter.token(DiagKind::UnexpectedToken, token),
        }
    }

    /// ADDW/SUBW/MULW/DIVW operate on HL; memory operands are invalid.
    fn wide(&mut self, op: Op, cur: &mut TokenCursor) {
        const REGS: &[Operand] = &[Operand::Acc, Operand::R0, Operand::R1];
        let Some(token) = next_token(cur, &mut self.reporter) else { return };
        match token.kind {
            TokenKind::Register(r) => self.reg_case(op, r, REGS, token),
            TokenKind::Int(_) => {
                let val = parse_immediate(token);
                self.emit(op, Operand::Imm16);
                self.word(val);
            }
            _ => self.reporter.token(DiagKind::UnexpectedToken, token),
        }
    }

    fn jump(&mut self, op: Op, cur: &mut TokenCursor) {
        let Some(token) = next_token(cur, &mut self.reporter) else { return };
        match token.kind {
            TokenKind::Int(_) => {
                let target = parse_immediate(token);
                self.emit(op, Operand::Imm16);
                self.word(target);
            }
            TokenKind::LabelRef => {
                self.emit(op, Operand::Imm16);
                self.label_ref(token, 0);
            }
            _ => self.reporter.token(DiagKind::UnexpectedToken, token),
        }
    }

    /// `JEXT mask, target`: a flag-mask byte, a comma, then a 16-bit
    /// target or label reference.
    fn jext(&mut self, cur: &mut TokenCursor) {
        let Some(token) = next_token(cur, &mut self.reporter) else { return };
        if !token.kind.is_immediate() {
            self.reporter.token(DiagKind::UnexpectedToken, token);
            return;
        }
        let mask = self.imm8_checked(token);

        let Some(comma) = next_token(cur, &mut self.reporter) else { return };
        if comma.kind != TokenKind::Comma {
            self.reporter.token(DiagKind::ExpectedComma, comma);
            return;
        }

        let Some(target) = next_token(cur, &mut self.reporter) else { return };
        match target.kind {
            TokenKind::Int(_) => {
                let addr = parse_immediate(target);
                self.emit(Op::Jext, Operand::MaskImm16);
                self.byte(mask);
                self.word(addr);
            }
            TokenKind::LabelRef => {
                self.emit(Op::Jext, Operand::MaskImm16);
                self.byte(mask);
                self.label_ref(target, 0);
            }
            _ => self.reporter.token(DiagKind::UnexpectedToken, target),
        }
    }

    fn push(&mut self, cur: &mut TokenCursor) {
        const REGS: &[Operand] = &[
            Operand::Acc,
            Operand::R0,
            Operand::R1,
            Operand::L,
            Operand::H,
            Operand::Bp,
            Operand::Flags,
        ];
        let Some(token) = next_token(cur, &mut self.reporter) else { return };
        match token.kind {
            TokenKind::Register(r) => self.reg_case(Op::Push, r, REGS, token),
            TokenKind::Int(_) => {
                let val = self.imm8_checked(token);
                self.emit(Op::Push, Operand::Imm8);
                self.byte(val);
            }
            _ => self.reporter.token(DiagKind::UnexpectedToken, token),
        }
    }

    fn pop(&mut self, cur: &mut TokenCursor) {
        const REGS: &[Operand] = &[
            Operand::Acc,
            Operand::R0,
            Operand::R1,
            Operand::L,
            Operand::H,
            Operand::Bp,
            Operand::Flags,
        ];
        let Some(token) = next_token(cur, &mut self.reporter) else { return };
        match token.kind {
            TokenKind::Register(r) => self.reg_case(Op::Pop, r, REGS, token),
            _ => self.reporter.token(DiagKind::UnexpectedToken, token),
        }
    }

    fn call(&mut self, cur: &mut TokenCursor) {
        let Some(token) = next_token(cur, &mut self.reporter) else { return };
        match token.kind {
            TokenKind::LabelRef => {
                self.emit(Op::Call, Operand::Imm16);
                self.label_ref(token, 0);
            }
            _ => self.reporter.token(DiagKind::UnexpectedToken, token),
        }
    }

    fn enter(&mut self, cur: &mut TokenCursor) {
        let Some(token) = next_token(cur, &mut self.reporter) else { return };
        if token.kind.is_immediate() {
            let val = self.imm8_checked(token);
            self.emit(Op::Enter, Operand::Imm8);
            self.byte(val);
        } else {
            self.reporter.token(DiagKind::UnexpectedToken, token);
        }
    }

    /// Parenthesized memory expression. `has_abs` marks families with a
    /// dedicated absolute-address opcode; the others route an absolute
    /// address through HL first.
    fn paren_operand(&mut self, op: Op, cur: &mut TokenCursor, has_abs: bool) {
        let expr = parse_mem_expr(cur, TokenKind::RParen, &mut self.reporter);
        match expr.mode {
            AddrMode::Invalid => {}
            AddrMode::Imm => {
                if has_abs {
                    self.emit(op, Operand::MemAbs);
                    self.word(expr.offset);
                } else {
                    self.emit(Op::LoadHl, Operand::Imm16);
                    self.word(expr.offset);
                    self.emit(op, Operand::MemHl);
                }
            }
            AddrMode::Hl => {
                if expr.offset != 0 {
                    self.emit(Op::AddHl, Operand::Imm16);
                    self.word(expr.offset);
                }
                self.emit(op, Operand::MemHl);
            }
            AddrMode::L => {
                if expr.offset != 0 {
                    self.emit(Op::AddL, Operand::Imm8);
                    self.byte(expr.offset as u8);
                }
                self.emit(op, Operand::MemL);
            }
            AddrMode::Bp => {
                // Stack slots are reached with brace syntax, not parens.
                if let Some(base) = expr.base {
                    self.reporter.token(DiagKind::UnexpectedToken, base);
                }
            }
        }
    }

    /// `name[...]` indexed label: the placeholder carries the bracket
    /// expression's offset as a base the resolved address is added to.
    fn indexed_operand(&mut self, op: Op, label: &Token, cur: &mut TokenCursor, has_abs: bool) {
        let Some(open) = next_token(cur, &mut self.reporter) else { return };
        if open.kind != TokenKind::LSquare {
            self.reporter.token(DiagKind::UnexpectedToken, open);
            return;
        }
        let expr = parse_mem_expr(cur, TokenKind::RSquare, &mut self.reporter);
        match expr.mode {
            AddrMode::Invalid => {}
            AddrMode::Imm => {
                if has_abs {
                    self.emit(op, Operand::MemAbs);
                    self.label_ref(label, expr.offset);
                } else {
                    self.emit(Op::LoadHl, Operand::Imm16);
                    self.label_ref(label, expr.offset);
                    self.emit(op, Operand::MemHl);
                }
            }
            AddrMode::Hl => {
                self.emit(Op::AddHl, Operand::Imm16);
                self.label_ref(label, expr.offset);
                self.emit(op, Operand::MemHl);
            }
            AddrMode::L | AddrMode::Bp => {
                if let Some(base) = expr.base {
                    self.reporter.token(DiagKind::InvalidMemoryIndex, base);
                }
            }
        }
    }

    /// `{BP±n}` stack-frame slot: one operand byte holding offset+1.
    fn frame_operand(&mut self, op: Op, cur: &mut TokenCursor) {
        let expr = parse_mem_expr(cur, TokenKind::RCurly, &mut self.reporter);
        match expr.mode {
            AddrMode::Invalid => {}
            AddrMode::Bp => {
                self.emit(op, Operand::Frame);
                self.byte((expr.offset as u8).wrapping_add(1));
            }
            _ => {
                let at = expr.base.or(cur.last());
                if let Some(token) = at {
                    self.reporter.token(DiagKind::InvalidStackIndex, token);
                }
            }
        }
    }

    /// Raw data: the leading literal and every immediately following
    /// literal on the line become successive bytes.
    fn data_bytes(&mut self, first: &Token, cur: &mut TokenCursor) {
        let mut token = first;
        loop {
            let val = self.imm8_checked(token);
            self.byte(val);
            match cur.next() {
                Some(t) if t.kind.is_immediate() => token = t,
                _ => break,
            }
        }
    }

    /// `name:` binds the label to the current output offset.
    fn define_label(&mut self, token: &Token) {
        let name = token.text.strip_suffix(':').unwrap_or(&token.text);
        if self.labels.contains_key(name) {
            self.reporter.token(DiagKind::DuplicateLabel, token);
            return;
        }
        self.labels.insert(name.to_string(), self.out.len() as u16);
    }

    /// `.name = value` binds a constant alias, sharing the label
    /// namespace with address labels.
    fn define_constant(&mut self, token: &Token, cur: &mut TokenCursor) {
        let Some(eq) = next_token(cur, &mut self.reporter) else { return };
        if eq.kind != TokenKind::Equals {
            self.reporter.token(DiagKind::UnexpectedToken, eq);
            return;
        }
        let Some(val) = next_token(cur, &mut self.reporter) else { return };
        if !val.kind.is_immediate() {
            self.reporter.token(DiagKind::UnexpectedToken, val);
            return;
        }
        let name = token.text.strip_prefix('.').unwrap_or(&token.text);
        if self.labels.contains_key(name) {
            self.reporter.token(DiagKind::DuplicateLabel, token);
            return;
        }
        self.labels.insert(name.to_string(), parse_immediate(val));
    }

    /// Pass 2: the resolved address is added byte-wise onto whatever the
    /// placeholder already holds, high and low independently with no
    /// carry between them.
    fn resolve(&mut self) {
        let refs = std::mem::take(&mut self.refs);
        for r in refs {
            match self.labels.get(&r.name) {
                None => {
                    self.reporter
                        .report_at(DiagKind::UndefinedLabel, &r.text, r.col, r.line, r.line_nr);
                }
                Some(&addr) => {
                    self.out[r.idx] = self.out[r.idx].wrapping_add((addr >> 8) as u8);
                    self.out[r.idx + 1] = self.out[r.idx + 1].wrapping_add(addr as u8);
                }
            }
        }
    }
}

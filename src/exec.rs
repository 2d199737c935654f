//! Instruction semantics: one generic handler per family, parameterized
//! by the operand variant from the decode table.
//!
//! Every operation is total over wrapping fixed-width arithmetic; there
//! is no runtime error path.

use crate::cpu::Cpu;
use crate::flags::Flags;
use crate::instructions::{InstrDesc, Op, Operand};

/// Immediate byte following the opcode at PC.
fn imm8(cpu: &Cpu) -> u8 {
    cpu.mem.read(cpu.pc.wrapping_add(1))
}

/// Big-endian immediate word following the opcode at PC.
fn imm16(cpu: &Cpu) -> u16 {
    cpu.mem.read_wide(cpu.pc.wrapping_add(1))
}

/// Reads a byte-wide operand source. Wide variants never reach here;
/// the table pairs them only with families that handle them directly.
fn read_u8(cpu: &Cpu, operand: Operand) -> u8 {
    match operand {
        Operand::Acc => cpu.acc,
        Operand::R0 => cpu.r0,
        Operand::R1 => cpu.r1,
        Operand::L => cpu.l,
        Operand::H => cpu.h,
        Operand::Bp => cpu.bp,
        Operand::Flags => cpu.flags.bits(),
        Operand::Imm8 => imm8(cpu),
        Operand::MemAbs => cpu.mem.read(imm16(cpu)),
        Operand::MemL => cpu.mem.read(cpu.l as u16),
        Operand::MemHl => cpu.mem.read(cpu.hl()),
        Operand::Frame => cpu.stack[cpu.frame_slot(imm8(cpu))],
        Operand::None | Operand::Hl | Operand::Imm16 | Operand::MaskImm16 => {
            unreachable!("byte read of {operand:?}")
        }
    }
}

/// Writes a byte-wide operand destination.
fn write_u8(cpu: &mut Cpu, operand: Operand, val: u8) {
    match operand {
        Operand::Acc => cpu.acc = val,
        Operand::R0 => cpu.r0 = val,
        Operand::R1 => cpu.r1 = val,
        Operand::L => cpu.l = val,
        Operand::H => cpu.h = val,
        Operand::Bp => cpu.bp = val,
        Operand::Flags => cpu.flags = Flags::from_bits_retain(val),
        Operand::MemAbs => {
            let addr = imm16(cpu);
            cpu.mem.write(addr, val);
        }
        Operand::MemL => cpu.mem.write(cpu.l as u16, val),
        Operand::MemHl => cpu.mem.write(cpu.hl(), val),
        Operand::Frame => {
            let slot = cpu.frame_slot(imm8(cpu));
            cpu.stack[slot] = val;
        }
        Operand::None | Operand::Hl | Operand::Imm8 | Operand::Imm16 | Operand::MaskImm16 => {
            unreachable!("byte write of {operand:?}")
        }
    }
}

/// 16-bit source for the wide-arithmetic family.
fn read_u16(cpu: &Cpu, operand: Operand) -> u16 {
    match operand {
        Operand::Imm16 => imm16(cpu),
        Operand::Acc => cpu.acc as u16,
        Operand::R0 => cpu.r0 as u16,
        Operand::R1 => cpu.r1 as u16,
        _ => unreachable!("wide read of {operand:?}"),
    }
}

fn set_zs(cpu: &mut Cpu, val: u8) {
    cpu.flags.set(Flags::Z, val == 0);
    cpu.flags.set(Flags::S, val & 0x80 != 0);
}

fn set_zs_wide(cpu: &mut Cpu, val: u16) {
    cpu.flags.set(Flags::Z, val == 0);
    cpu.flags.set(Flags::S, val & 0x8000 != 0);
}

fn carry_in(cpu: &Cpu) -> u8 {
    cpu.flags.contains(Flags::C) as u8
}

pub(crate) fn execute(cpu: &mut Cpu, d: &InstrDesc) {
    let next = cpu.pc.wrapping_add(d.len());
    match d.op {
        Op::Noop => cpu.pc = next,
        // The run loop stops on HALT; the instruction itself is inert.
        Op::Halt => {}
        Op::Ei => {
            cpu.flags.insert(Flags::I);
            cpu.pc = next;
        }
        Op::Di => {
            cpu.flags.remove(Flags::I);
            cpu.pc = next;
        }
        Op::Et => {
            cpu.flags.insert(Flags::T);
            cpu.pc = next;
        }
        Op::Dt => {
            cpu.flags.remove(Flags::T);
            cpu.pc = next;
        }
        Op::Clra => {
            cpu.acc = 0;
            cpu.pc = next;
        }
        Op::Reset => cpu.reset(),

        Op::Load => {
            cpu.acc = read_u8(cpu, d.operand);
            set_zs(cpu, cpu.acc);
            cpu.pc = next;
        }
        Op::Store => {
            let val = cpu.acc;
            write_u8(cpu, d.operand, val);
            set_zs(cpu, val);
            cpu.pc = next;
        }
        Op::Xch => {
            let old = cpu.acc;
            cpu.acc = read_u8(cpu, d.operand);
            write_u8(cpu, d.operand, old);
            set_zs(cpu, cpu.acc);
            cpu.pc = next;
        }
        Op::LoadL => {
            cpu.l = imm8(cpu);
            cpu.pc = next;
        }
        Op::LoadHl => {
            let val = imm16(cpu);
            cpu.set_hl(val);
            cpu.pc = next;
        }
        Op::AddL => {
            cpu.l = cpu.l.wrapping_add(imm8(cpu));
            cpu.pc = next;
        }
        Op::AddHl => {
            let val = cpu.hl().wrapping_add(imm16(cpu));
            cpu.set_hl(val);
            cpu.pc = next;
        }

        Op::Add => {
            let src = read_u8(cpu, d.operand);
            let (res, carry) = cpu.acc.overflowing_add(src);
            cpu.acc = res;
            set_zs(cpu, res);
            cpu.flags.set(Flags::C, carry);
            cpu.pc = next;
        }
        Op::Adc => {
            let src = read_u8(cpu, d.operand);
            let sum = cpu.acc as u16 + src as u16 + carry_in(cpu) as u16;
            cpu.acc = sum as u8;
            set_zs(cpu, cpu.acc);
            cpu.flags.set(Flags::C, sum > 0xFF);
            cpu.pc = next;
        }
        Op::Sub => {
            let src = read_u8(cpu, d.operand);
            let (res, borrow) = cpu.acc.overflowing_sub(src);
            cpu.acc = res;
            set_zs(cpu, res);
            cpu.flags.set(Flags::C, borrow);
            cpu.pc = next;
        }
        Op::Sbc => {
            let src = read_u8(cpu, d.operand);
            let diff = cpu.acc as i16 - src as i16 - carry_in(cpu) as i16;
            cpu.acc = diff as u8;
            set_zs(cpu, cpu.acc);
            cpu.flags.set(Flags::C, diff < 0);
            cpu.pc = next;
        }

        Op::Inc => {
            if d.operand == Operand::Hl {
                let res = cpu.hl().wrapping_add(1);
                cpu.set_hl(res);
                set_zs_wide(cpu, res);
                cpu.flags.set(Flags::C, res == 0);
            } else {
                let res = read_u8(cpu, d.operand).wrapping_add(1);
                write_u8(cpu, d.operand, res);
                set_zs(cpu, res);
                cpu.flags.set(Flags::C, res == 0);
            }
            cpu.pc = next;
        }
        Op::Dec => {
            if d.operand == Operand::Hl {
                let res = cpu.hl().wrapping_sub(1);
                cpu.set_hl(res);
                set_zs_wide(cpu, res);
                cpu.flags.set(Flags::C, res == u16::MAX);
            } else {
                let res = read_u8(cpu, d.operand).wrapping_sub(1);
                write_u8(cpu, d.operand, res);
                set_zs(cpu, res);
                cpu.flags.set(Flags::C, res == u8::MAX);
            }
            cpu.pc = next;
        }
        Op::Neg => {
            if d.operand == Operand::Hl {
                let res = cpu.hl().wrapping_neg();
                cpu.set_hl(res);
                set_zs_wide(cpu, res);
            } else {
                let res = read_u8(cpu, d.operand).wrapping_neg();
                write_u8(cpu, d.operand, res);
                set_zs(cpu, res);
            }
            cpu.pc = next;
        }
        Op::Not => {
            if d.operand == Operand::Hl {
                let res = !cpu.hl();
                cpu.set_hl(res);
                set_zs_wide(cpu, res);
            } else {
                let res = !read_u8(cpu, d.operand);
                write_u8(cpu, d.operand, res);
                set_zs(cpu, res);
            }
            cpu.pc = next;
        }

        Op::And => {
            cpu.acc &= read_u8(cpu, d.operand);
            set_zs(cpu, cpu.acc);
            cpu.pc = next;
        }
        Op::Or => {
            cpu.acc |= read_u8(cpu, d.operand);
            set_zs(cpu, cpu.acc);
            cpu.pc = next;
        }
        Op::Xor => {
            cpu.acc ^= read_u8(cpu, d.operand);
            set_zs(cpu, cpu.acc);
            cpu.pc = next;
        }

        // Shift and rotate amounts use the source's low 3 bits.
        Op::Shl => {
            let amount = read_u8(cpu, d.operand) as u32;
            cpu.acc = cpu.acc.wrapping_shl(amount);
            set_zs(cpu, cpu.acc);
            cpu.pc = next;
        }
        Op::Shr => {
            let amount = read_u8(cpu, d.operand) as u32;
            cpu.acc = cpu.acc.wrapping_shr(amount);
            set_zs(cpu, cpu.acc);
            cpu.pc = next;
        }
        Op::Rol => {
            let amount = read_u8(cpu, d.operand) as u32;
            cpu.acc = cpu.acc.rotate_left(amount);
            set_zs(cpu, cpu.acc);
            cpu.pc = next;
        }
        Op::Ror => {
            let amount = read_u8(cpu, d.operand) as u32;
            cpu.acc = cpu.acc.rotate_right(amount);
            set_zs(cpu, cpu.acc);
            cpu.pc = next;
        }

        Op::Addw => {
            let res = cpu.hl().wrapping_add(read_u16(cpu, d.operand));
            cpu.set_hl(res);
            set_zs_wide(cpu, res);
            cpu.pc = next;
        }
        Op::Subw => {
            let res = cpu.hl().wrapping_sub(read_u16(cpu, d.operand));
            cpu.set_hl(res);
            set_zs_wide(cpu, res);
            cpu.pc = next;
        }
        Op::Mulw => {
            let res = cpu.hl().wrapping_mul(read_u16(cpu, d.operand));
            cpu.set_hl(res);
            set_zs_wide(cpu, res);
            cpu.pc = next;
        }
        Op::Divw => {
            let src = read_u16(cpu, d.operand);
            if src == 0 {
                // Division by zero: HL saturates, Zero clear, Sign set.
                cpu.set_hl(u16::MAX);
                cpu.flags.remove(Flags::Z);
                cpu.flags.insert(Flags::S);
            } else {
                let res = cpu.hl() / src;
                cpu.set_hl(res);
                set_zs_wide(cpu, res);
            }
            cpu.pc = next;
        }

        Op::Cmp => {
            let val = cpu.acc.wrapping_sub(read_u8(cpu, d.operand));
            set_zs(cpu, val);
            cpu.pc = next;
        }
        Op::Min => {
            let src = read_u8(cpu, d.operand);
            if src < cpu.acc {
                cpu.acc = src;
            }
            set_zs(cpu, cpu.acc);
            cpu.pc = next;
        }
        Op::Max => {
            let src = read_u8(cpu, d.operand);
            if src > cpu.acc {
                cpu.acc = src;
            }
            set_zs(cpu, cpu.acc);
            cpu.pc = next;
        }

        Op::Jmp => cpu.pc = imm16(cpu),
        Op::Js => branch(cpu, next, cpu.flags.contains(Flags::S)),
        Op::Jns => branch(cpu, next, !cpu.flags.contains(Flags::S)),
        Op::Jz => branch(cpu, next, cpu.flags.contains(Flags::Z)),
        Op::Jnz => branch(cpu, next, !cpu.flags.contains(Flags::Z)),
        Op::Jc => branch(cpu, next, cpu.flags.contains(Flags::C)),
        Op::Jnc => branch(cpu, next, !cpu.flags.contains(Flags::C)),
        Op::Jext => {
            let mask = imm8(cpu);
            let target = cpu.mem.read_wide(cpu.pc.wrapping_add(2));
            let flags = cpu.flags.bits() & Flags::JEXT_MASK;
            let sel = mask & Flags::JEXT_MASK;
            let taken = match mask >> 6 {
                0 => flags & sel != 0,
                1 => flags & sel == sel,
                2 => flags & sel == 0,
                _ => flags & sel != sel,
            };
            // A not-taken JEXT still skips all 3 operand bytes.
            cpu.pc = if taken { target } else { next };
        }

        Op::Push => {
            let val = read_u8(cpu, d.operand);
            cpu.push8(val);
            set_zs(cpu, val);
            cpu.pc = next;
        }
        Op::Pop => {
            let val = cpu.pop8();
            write_u8(cpu, d.operand, val);
            set_zs(cpu, val);
            cpu.pc = next;
        }

        Op::Call => {
            let target = imm16(cpu);
            cpu.push8((next >> 8) as u8);
            cpu.push8(next as u8);
            cpu.pc = target;
        }
        Op::Ret => {
            // With the Imm8 form the discard byte is read before the
            // return address moves PC away from the operand.
            let discard = if d.operand == Operand::Imm8 {
                imm8(cpu)
            } else {
                0
            };
            let low = cpu.pop8() as u16;
            let high = cpu.pop8() as u16;
            cpu.sp = cpu.sp.wrapping_sub(discard);
            cpu.pc = (high << 8) | low;
        }
        Op::Enter => {
            let locals = imm8(cpu);
            let old_bp = cpu.bp;
            cpu.push8(old_bp);
            cpu.bp = cpu.sp;
            cpu.sp = cpu.sp.wrapping_add(locals);
            cpu.pc = next;
        }
        Op::Leave => {
            cpu.sp = cpu.bp;
            cpu.bp = cpu.pop8();
            cpu.pc = next;
        }
    }
}

fn branch(cpu: &mut Cpu, next: u16, taken: bool) {
    cpu.pc = if taken { imm16(cpu) } else { next };
}

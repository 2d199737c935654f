//! Opcode-byte dispatch table for the execution engine.

use crate::instructions::{InstrDesc, TABLE};

/// 256-entry decode table built from the instruction rows. Undefined
/// opcodes decode to `None` and execute as NOOP.
pub struct OpTable {
    entries: [Option<&'static InstrDesc>; 256],
}

impl OpTable {
    pub const fn new() -> Self {
        let mut entries: [Option<&'static InstrDesc>; 256] = [None; 256];
        let mut i = 0;
        while i < TABLE.len() {
            entries[TABLE[i].code as usize] = Some(&TABLE[i]);
            i += 1;
        }
        Self { entries }
    }

    pub fn decode(&self, code: u8) -> Option<&'static InstrDesc> {
        self.entries[code as usize]
    }
}

impl Default for OpTable {
    fn default() -> Self {
        Self::new()
    }
}

pub const OPS: OpTable = OpTable::new();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_row_decodes_to_itself() {
        for desc in TABLE {
            let decoded = OPS.decode(desc.code).expect("row missing from table");
            assert_eq!(decoded.code, desc.code);
        }
    }

    #[test]
    fn holes_stay_undefined() {
        for code in [0x79u8, 0x81, 0x89, 0x91, 0xC0, 0xD1, 0xD9, 0xF4, 0xFF] {
            assert!(OPS.decode(code).is_none(), "{code:#04x} should be a hole");
        }
    }
}

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Flags: u8 {
const C = 1 << 0; // Carry / borrow
const A = 1 << 1; // Auxiliary carry (reserved, no instruction computes it)
const Z = 1 << 2; // Zero
const S = 1 << 3; // Sign (bit 7 of the result)
const T = 1 << 4; // Trap (single-step affordance for the run loop driver)
const O = 1 << 5; // Overflow (reserved, no instruction computes it)
const I = 1 << 6; // Interrupt enable (toggled by EI/DI, never consumed)
}
}

impl Flags {
    /// The six low bits JEXT predicates range over (everything below I).
    pub const JEXT_MASK: u8 = 0b11_1111;
}

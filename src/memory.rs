//! The 64K byte-addressed memory.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const MEMORY_SIZE: usize = 0x1_0000;

/// Full 16-bit address space. Addresses are `u16`, so every access is
/// in bounds by construction; 16-bit reads wrap around the top of the
/// space like the address arithmetic they serve.
#[derive(Clone, Serialize, Deserialize)]
pub struct Memory {
    bytes: Vec<u8>,
}

impl Memory {
    pub fn new() -> Self {
        Self {
            bytes: vec![0; MEMORY_SIZE],
        }
    }

    pub fn read(&self, addr: u16) -> u8 {
        self.bytes[addr as usize]
    }

    pub fn write(&mut self, addr: u16, val: u8) {
        self.bytes[addr as usize] = val;
    }

    /// Big-endian 16-bit read: high byte at `addr`, low at `addr + 1`.
    pub fn read_wide(&self, addr: u16) -> u16 {
        let high = self.read(addr) as u16;
        let low = self.read(addr.wrapping_add(1)) as u16;
        (high << 8) | low
    }

    /// Copies an image to address 0, truncating anything past 64K.
    pub fn load(&mut self, image: &[u8]) {
        let len = image.len().min(MEMORY_SIZE);
        self.bytes[..len].copy_from_slice(&image[..len]);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Memory({} bytes)", self.bytes.len())
    }
}

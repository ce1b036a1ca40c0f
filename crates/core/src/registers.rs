//! Volatile register file: the in-memory mirror of the 256 device registers.
//!
//! | Address   | Role                                        |
//! |-----------|---------------------------------------------|
//! | 0x00      | Control register (see [`crate::control`])   |
//! | 0x01      | Alternate slave address                     |
//! | 0x02      | Default fill value for program control      |
//! | 0x03      | Program-control offset (reserved, inert)    |
//! | 0x04–0xFF | Program control storage                     |
//!
//! Bus writes land here first; the control register's side effects are
//! dispatched by the device write path, not by this module.

use crate::control::RETAIN_MASK;
use crate::eeprom::Eeprom;
use crate::{CONTROL_REG, NUM_REGISTERS};

/// The 256-byte register array. Addresses are `u8`, so access wraps by
/// construction and can never fail.
pub struct RegisterFile {
    pub data: [u8; NUM_REGISTERS],
}

impl RegisterFile {
    pub fn new() -> Self {
        RegisterFile { data: [0; NUM_REGISTERS] }
    }

    #[inline(always)]
    pub fn get(&self, addr: u8) -> u8 {
        self.data[addr as usize]
    }

    #[inline(always)]
    pub fn set(&mut self, addr: u8, value: u8) {
        self.data[addr as usize] = value;
    }

    /// Bulk copy EEPROM → register file (all 256 cells).
    pub fn load_from(&mut self, eeprom: &dyn Eeprom) {
        for i in 0..NUM_REGISTERS {
            self.data[i] = eeprom.read(i as u8);
        }
    }

    /// Bulk copy register file → EEPROM (all 256 cells).
    ///
    /// The control cell is written from the incoming control byte with the
    /// retain mask applied, not from the register file; trigger bits must
    /// never be persisted as 1.
    pub fn store_to(&self, eeprom: &mut dyn Eeprom, control_byte: u8) {
        for i in 0..NUM_REGISTERS {
            let addr = i as u8;
            if addr == CONTROL_REG {
                eeprom.update(addr, control_byte & RETAIN_MASK);
            } else {
                eeprom.update(addr, self.data[i]);
            }
        }
    }

    /// Copy of registers `[start, end)`. Empty when `start >= end`.
    pub fn range(&self, start: u8, end: u8) -> Vec<u8> {
        if start >= end {
            return Vec::new();
        }
        self.data[start as usize..end as usize].to_vec()
    }

    /// Full 256-byte snapshot.
    pub fn snapshot(&self) -> [u8; NUM_REGISTERS] {
        self.data
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

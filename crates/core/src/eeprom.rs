//! EEPROM backing store for the register file.
//!
//! The emulated device persists its 256 registers in the MCU's EEPROM. The
//! core only needs byte-level access, so the storage is consumed through the
//! [`Eeprom`] trait; hosts can plug in whatever medium they have. The
//! in-memory [`BufferEeprom`] is the implementation used by the CLI frontend
//! and the tests, with its content carried across runs via
//! [`crate::image`].

use crate::{
    CONTROL_REG, DEFAULT_SLAVE_ADDRESS, I2C_ADDR_REG, NUM_REGISTERS, REGISTERS_DEFAULT_VAL,
};
use crate::control::{CONTROL_DEFAULT, RETAIN_MASK};

/// Byte-addressable non-volatile storage covering the 256-cell register space.
///
/// Addresses are `u8`, so out-of-range access is unrepresentable.
pub trait Eeprom {
    /// Read one cell.
    fn read(&self, addr: u8) -> u8;

    /// Write one cell, skipping the write if the value already matches.
    ///
    /// Mirrors Arduino's `EEPROM.update`: identical values cost no erase
    /// cycle on real hardware.
    fn update(&mut self, addr: u8, value: u8);
}

/// In-memory EEPROM with dirty tracking.
pub struct BufferEeprom {
    pub cells: [u8; NUM_REGISTERS],
    /// True if modified since the host last saved the image
    pub dirty: bool,
    /// Cells actually rewritten (skipped updates don't count)
    pub write_count: u64,
}

impl BufferEeprom {
    /// Factory-default content, as a storage-reset control write leaves it:
    /// control cell holds the retained default, address cell the default
    /// slave address, everything else the default fill value.
    pub fn new() -> Self {
        let mut cells = [REGISTERS_DEFAULT_VAL; NUM_REGISTERS];
        cells[CONTROL_REG as usize] = CONTROL_DEFAULT & RETAIN_MASK;
        cells[I2C_ADDR_REG as usize] = DEFAULT_SLAVE_ADDRESS;
        BufferEeprom { cells, dirty: false, write_count: 0 }
    }

    /// Fully erased EEPROM (all cells 0xFF), as an AVR part reads before
    /// first programming.
    pub fn erased() -> Self {
        BufferEeprom { cells: [0xFF; NUM_REGISTERS], dirty: false, write_count: 0 }
    }

    /// Build from a saved image. Short input leaves the tail erased (0xFF).
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut cells = [0xFF; NUM_REGISTERS];
        let len = bytes.len().min(NUM_REGISTERS);
        cells[..len].copy_from_slice(&bytes[..len]);
        BufferEeprom { cells, dirty: false, write_count: 0 }
    }
}

impl Default for BufferEeprom {
    fn default() -> Self {
        Self::new()
    }
}

impl Eeprom for BufferEeprom {
    fn read(&self, addr: u8) -> u8 {
        self.cells[addr as usize]
    }

    fn update(&mut self, addr: u8, value: u8) {
        let cell = &mut self.cells[addr as usize];
        if *cell != value {
            *cell = value;
            self.dirty = true;
            self.write_count += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_skips_identical_value() {
        let mut ee = BufferEeprom::new();
        ee.update(0x10, REGISTERS_DEFAULT_VAL);
        assert!(!ee.dirty);
        assert_eq!(ee.write_count, 0);

        ee.update(0x10, 0xAB);
        assert!(ee.dirty);
        assert_eq!(ee.write_count, 1);
        assert_eq!(ee.read(0x10), 0xAB);
    }

    #[test]
    fn test_factory_defaults() {
        let ee = BufferEeprom::new();
        assert_eq!(ee.read(CONTROL_REG), CONTROL_DEFAULT & RETAIN_MASK);
        assert_eq!(ee.read(I2C_ADDR_REG), DEFAULT_SLAVE_ADDRESS);
        assert_eq!(ee.read(0x04), REGISTERS_DEFAULT_VAL);
        assert_eq!(ee.read(0xFF), REGISTERS_DEFAULT_VAL);
    }

    #[test]
    fn test_from_bytes_pads_with_erased() {
        let ee = BufferEeprom::from_bytes(&[1, 2, 3]);
        assert_eq!(ee.read(0), 1);
        assert_eq!(ee.read(2), 3);
        assert_eq!(ee.read(3), 0xFF);
        assert_eq!(ee.read(0xFF), 0xFF);
    }
}

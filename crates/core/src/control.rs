//! Control-register interpretation.
//!
//! Every bus write that lands on register 0x00 is decoded bit by bit. The
//! bits are independent commands, not an enum, and a single write may carry
//! several of them:
//!
//! | bit  | name                 | effect                                      |
//! |------|----------------------|---------------------------------------------|
//! | 0x01 | LOCAL_PRESERVE       | suppress the 0x04 reload in this write       |
//! | 0x02 | SLAVE_ALT            | use register 1 as bus address (next startup) |
//! | 0x04 | LOAD_EEPROM_TO_LOCAL | bulk copy EEPROM → register file             |
//! | 0x08 | READ_FROM_EEPROM     | serve subsequent reads from EEPROM           |
//! | 0x10 | READ_LOCATION        | read-only status bit, ignored on write       |
//! | 0x20 | EEPROM_RESET         | reset EEPROM to factory defaults             |
//! | 0x40 | LOAD_LOCAL_TO_EEPROM | bulk copy register file → EEPROM             |
//! | 0x80 | DEVICE_RESET         | arm the pending device reset                 |
//!
//! Bits are evaluated in fixed ascending order, so LOCAL_PRESERVE is seen
//! before the reload bit fires. The reload's conflict check against
//! LOAD_LOCAL_TO_EEPROM inspects the raw incoming byte because bit 6 has not
//! been reached yet when bit 2 is processed: a write with both 0x04 and 0x40
//! set skips the reload and persists local state instead.
//!
//! Only the bits in [`RETAIN_MASK`] are ever stored back into the register
//! file or the EEPROM; the rest are one-shot triggers and read back as 0.

use crate::eeprom::Eeprom;
use crate::registers::RegisterFile;
use crate::{
    CONTROL_REG, DEFAULT_SLAVE_ADDRESS, DEFAULT_VAL_REG, I2C_ADDR_REG, PC_START_REG,
    REGISTERS_DEFAULT_VAL,
};

pub const LOCAL_PRESERVE: u8 = 0x01;
pub const SLAVE_ALT: u8 = 0x02;
pub const LOAD_EEPROM_TO_LOCAL: u8 = 0x04;
pub const READ_FROM_EEPROM: u8 = 0x08;
pub const READ_LOCATION: u8 = 0x10;
pub const EEPROM_RESET: u8 = 0x20;
pub const LOAD_LOCAL_TO_EEPROM: u8 = 0x40;
pub const DEVICE_RESET: u8 = 0x80;

/// Control bits that survive a write: SLAVE_ALT | LOAD_EEPROM_TO_LOCAL |
/// READ_FROM_EEPROM. Everything else is a trigger.
pub const RETAIN_MASK: u8 = 0x0E;

/// Control value written by an EEPROM reset: load-from-EEPROM on next boot.
pub const CONTROL_DEFAULT: u8 = LOAD_EEPROM_TO_LOCAL;

/// Mode flags produced by control writes and consumed by the read path and
/// the startup address resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeFlags {
    /// Reads are served from EEPROM instead of the register file
    pub read_from_eeprom: bool,
    /// Use the alternate slave address at next startup
    pub use_alt_address: bool,
    /// Device reset armed; consumed by [`crate::Device::poll_and_reset`]
    pub device_reset: bool,
}

/// Summary of what a control write did, for the change-notification hook.
#[derive(Debug, Clone, Copy, Default)]
pub struct Applied {
    /// The EEPROM → register file bulk copy ran
    pub reloaded: bool,
}

/// Decode and execute one control-register write.
///
/// Any byte value is valid; there is no error path. `read_from_eeprom` and
/// `use_alt_address` are re-derived from scratch on every call — flags do
/// not carry across writes. Only `device_reset` is sticky once armed.
///
/// After all bits are processed the register file's control cell is set to
/// `raw & RETAIN_MASK` unconditionally, overwriting whatever the reload may
/// have just loaded there.
pub fn apply(
    raw: u8,
    regs: &mut RegisterFile,
    eeprom: &mut dyn Eeprom,
    modes: &mut ModeFlags,
) -> Applied {
    let mut applied = Applied::default();
    let mut local_preserve = false;
    modes.read_from_eeprom = false;
    modes.use_alt_address = false;

    // u16 so the shift walks off the top bit and terminates
    let mut mask: u16 = 0x01;
    while mask <= DEVICE_RESET as u16 {
        match (mask as u8) & raw {
            0 => {}
            LOCAL_PRESERVE => local_preserve = true,
            SLAVE_ALT => modes.use_alt_address = true,
            LOAD_EEPROM_TO_LOCAL => {
                if !local_preserve && raw & LOAD_LOCAL_TO_EEPROM == 0 {
                    regs.load_from(eeprom);
                    applied.reloaded = true;
                }
            }
            READ_FROM_EEPROM => modes.read_from_eeprom = true,
            READ_LOCATION => {} // never honored on write
            EEPROM_RESET => {
                eeprom.update(CONTROL_REG, CONTROL_DEFAULT & RETAIN_MASK);
                eeprom.update(I2C_ADDR_REG, DEFAULT_SLAVE_ADDRESS);
                eeprom.update(DEFAULT_VAL_REG, REGISTERS_DEFAULT_VAL);
                let fill = eeprom.read(DEFAULT_VAL_REG);
                for addr in PC_START_REG..=0xFF {
                    eeprom.update(addr, fill);
                }
            }
            LOAD_LOCAL_TO_EEPROM => regs.store_to(eeprom, raw),
            DEVICE_RESET => modes.device_reset = true,
            _ => {}
        }
        mask <<= 1;
    }

    regs.set(CONTROL_REG, raw & RETAIN_MASK);
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eeprom::BufferEeprom;
    use crate::PC_OFFSET_REG;

    fn setup() -> (RegisterFile, BufferEeprom, ModeFlags) {
        (RegisterFile::new(), BufferEeprom::new(), ModeFlags::default())
    }

    #[test]
    fn test_control_cell_readback_is_masked() {
        let (mut regs, mut ee, mut modes) = setup();
        apply(0xFF, &mut regs, &mut ee, &mut modes);
        assert_eq!(regs.get(CONTROL_REG), RETAIN_MASK);

        apply(0x08, &mut regs, &mut ee, &mut modes);
        assert_eq!(regs.get(CONTROL_REG), 0x08);
    }

    #[test]
    fn test_load_eeprom_to_local() {
        let (mut regs, mut ee, mut modes) = setup();
        ee.update(0x30, 0x99);
        let applied = apply(LOAD_EEPROM_TO_LOCAL, &mut regs, &mut ee, &mut modes);
        assert!(applied.reloaded);
        assert_eq!(regs.get(0x30), 0x99);
        // Retain-mask write lands after the bulk copy
        assert_eq!(regs.get(CONTROL_REG), LOAD_EEPROM_TO_LOCAL);
    }

    #[test]
    fn test_reload_suppressed_by_local_preserve() {
        let (mut regs, mut ee, mut modes) = setup();
        ee.update(0x30, 0x99);
        regs.set(0x30, 0x11);
        let applied = apply(
            LOCAL_PRESERVE | LOAD_EEPROM_TO_LOCAL,
            &mut regs,
            &mut ee,
            &mut modes,
        );
        assert!(!applied.reloaded);
        assert_eq!(regs.get(0x30), 0x11);
    }

    #[test]
    fn test_reload_suppressed_by_store_in_same_write() {
        let (mut regs, mut ee, mut modes) = setup();
        ee.update(0x30, 0x99);
        regs.set(0x30, 0x11);
        // 0x04 and 0x40 together: local wins, EEPROM receives local content
        let applied = apply(
            LOAD_EEPROM_TO_LOCAL | LOAD_LOCAL_TO_EEPROM,
            &mut regs,
            &mut ee,
            &mut modes,
        );
        assert!(!applied.reloaded);
        assert_eq!(regs.get(0x30), 0x11);
        assert_eq!(ee.read(0x30), 0x11);
        assert_eq!(ee.read(CONTROL_REG), (LOAD_EEPROM_TO_LOCAL | LOAD_LOCAL_TO_EEPROM) & RETAIN_MASK);
    }

    #[test]
    fn test_eeprom_reset_restores_factory_defaults() {
        let (mut regs, mut ee, mut modes) = setup();
        for addr in 0..=0xFFu8 {
            ee.update(addr, 0xAA);
        }
        apply(EEPROM_RESET, &mut regs, &mut ee, &mut modes);
        assert_eq!(ee.read(CONTROL_REG), CONTROL_DEFAULT & RETAIN_MASK);
        assert_eq!(ee.read(I2C_ADDR_REG), DEFAULT_SLAVE_ADDRESS);
        assert_eq!(ee.read(DEFAULT_VAL_REG), REGISTERS_DEFAULT_VAL);
        for addr in PC_START_REG..=0xFF {
            assert_eq!(ee.read(addr), REGISTERS_DEFAULT_VAL);
        }
        // The reserved offset register is not part of the reset sequence
        assert_eq!(ee.read(PC_OFFSET_REG), 0xAA);
    }

    #[test]
    fn test_store_local_to_eeprom_masks_control_cell() {
        let (mut regs, mut ee, mut modes) = setup();
        regs.set(0x80, 0x5A);
        apply(LOAD_LOCAL_TO_EEPROM | DEVICE_RESET, &mut regs, &mut ee, &mut modes);
        assert_eq!(ee.read(0x80), 0x5A);
        assert_eq!(ee.read(CONTROL_REG), 0x00);
        assert!(modes.device_reset);
    }

    #[test]
    fn test_read_location_bit_is_ignored_on_write() {
        let (mut regs, mut ee, mut modes) = setup();
        apply(READ_LOCATION, &mut regs, &mut ee, &mut modes);
        assert_eq!(regs.get(CONTROL_REG), 0);
        assert_eq!(ee.read(CONTROL_REG), CONTROL_DEFAULT & RETAIN_MASK);
        assert!(!modes.read_from_eeprom);
    }

    #[test]
    fn test_mode_flags_do_not_carry_across_writes() {
        let (mut regs, mut ee, mut modes) = setup();
        apply(READ_FROM_EEPROM | SLAVE_ALT, &mut regs, &mut ee, &mut modes);
        assert!(modes.read_from_eeprom);
        assert!(modes.use_alt_address);

        apply(0x00, &mut regs, &mut ee, &mut modes);
        assert!(!modes.read_from_eeprom);
        assert!(!modes.use_alt_address);
    }

    #[test]
    fn test_trigger_flags_do_not_carry_across_writes() {
        let (mut regs, mut ee, mut modes) = setup();
        // Write 1: reset storage. Write 2: persist local state. Storage must
        // end up as dictated by the second write only.
        apply(EEPROM_RESET, &mut regs, &mut ee, &mut modes);
        regs.set(0x50, 0xC3);
        apply(LOAD_LOCAL_TO_EEPROM, &mut regs, &mut ee, &mut modes);
        assert_eq!(ee.read(0x50), 0xC3);
        assert_eq!(ee.read(CONTROL_REG), 0x00);
    }

    #[test]
    fn test_device_reset_is_sticky() {
        let (mut regs, mut ee, mut modes) = setup();
        apply(DEVICE_RESET, &mut regs, &mut ee, &mut modes);
        assert!(modes.device_reset);
        apply(0x00, &mut regs, &mut ee, &mut modes);
        assert!(modes.device_reset);
    }

    #[test]
    fn test_eeprom_reset_uses_fill_value_already_in_storage() {
        let (mut regs, mut ee, mut modes) = setup();
        // DEFAULT_VAL_REG is rewritten to the compiled-in default before the
        // fill loop reads it back, so a previously customized fill value does
        // not survive a reset.
        ee.update(DEFAULT_VAL_REG, 0x55);
        ee.update(0x40, 0x12);
        apply(EEPROM_RESET, &mut regs, &mut ee, &mut modes);
        assert_eq!(ee.read(0x40), REGISTERS_DEFAULT_VAL);
    }
}

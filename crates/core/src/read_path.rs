//! Read-path selection between the register file and EEPROM.
//!
//! When READ_FROM_EEPROM mode is active the master is served straight from
//! storage; a read of the control register on that path additionally carries
//! the READ_LOCATION status bit so the master can tell which source it is
//! talking to. The bit exists only in-band: it is synthesized here and never
//! written anywhere.

use crate::control::READ_LOCATION;
use crate::eeprom::Eeprom;
use crate::registers::RegisterFile;
use crate::CONTROL_REG;

/// Pick the byte returned for a master read of `addr`. Pure; no side effects.
pub fn select(regs: &RegisterFile, eeprom: &dyn Eeprom, from_eeprom: bool, addr: u8) -> u8 {
    if !from_eeprom {
        return regs.get(addr);
    }
    let value = eeprom.read(addr);
    if addr == CONTROL_REG {
        value | READ_LOCATION
    } else {
        value
    }
}

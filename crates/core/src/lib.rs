//! # regslave-core
//!
//! Emulation core for a byte-addressable, 256-register I2C slave device of
//! the kind small MCU boards expose to a bus master. Register 0x00 is a
//! control register whose bits trigger device behaviors: synchronizing the
//! volatile register file with EEPROM, switching the read source, changing
//! the slave address, or requesting a board reset.
//!
//! ## Architecture
//!
//! - [`Device`] — Top-level device that wires together register file,
//!   EEPROM, mode flags, and the bus callbacks
//! - [`RegisterFile`] — Volatile in-memory mirror of the 256 registers
//! - [`Eeprom`] / [`BufferEeprom`] — Non-volatile backing store boundary
//! - [`control`] — Control-register bit decode and side effects
//! - [`read_path`] — Per-read selection between register file and EEPROM
//! - [`transport`] — Wire backend contract and service pumps
//! - [`reset`] — Reset line output driven by the pending device reset
//! - [`image`] — Device/EEPROM image persistence across host runs
//! - [`dump`] — Hex dump helper for host inspection commands
//!
//! ## Execution model
//!
//! Single-threaded and callback-driven: the transport delivers a completed
//! inbound byte sequence to [`Device::on_bytes_received`] and requests read
//! bytes via [`Device::on_read_requested`]; the host's main loop calls
//! [`Device::poll_and_reset`]. Neither callback blocks — EEPROM bulk copies
//! run synchronously inside the receive callback and complete before control
//! returns to the transport. No operation on the bus surface can fail: every
//! byte is a valid input and addresses wrap modulo 256.

pub mod control;
pub mod dump;
pub mod eeprom;
pub mod image;
pub mod read_path;
pub mod registers;
pub mod reset;
pub mod transport;

pub use eeprom::{BufferEeprom, Eeprom};
pub use registers::RegisterFile;
pub use reset::ResetLine;
pub use transport::{ScriptedTransport, Transport};

use crate::control::ModeFlags;
use crate::image::DeviceImage;

/// Size of the register space.
pub const NUM_REGISTERS: usize = 256;

// Register roles
/// Control register: interpreted bit-by-bit on every write.
pub const CONTROL_REG: u8 = 0x00;
/// Alternate slave address, honored at startup when SLAVE_ALT is persisted.
pub const I2C_ADDR_REG: u8 = 0x01;
/// Default fill value for program control registers.
pub const DEFAULT_VAL_REG: u8 = 0x02;
/// Program-control offset (reserved; unimplemented upstream, kept inert).
pub const PC_OFFSET_REG: u8 = 0x03;
/// First free-form program control register.
pub const PC_START_REG: u8 = 0x04;

/// Compiled-in slave address.
pub const DEFAULT_SLAVE_ADDRESS: u8 = 0x08;
/// Default content when filling program control registers.
pub const REGISTERS_DEFAULT_VAL: u8 = 0x00;
/// Lowest assignable 7-bit I2C address.
pub const I2C_ADDR_MIN: u8 = 0x03;
/// Highest assignable 7-bit I2C address.
pub const I2C_ADDR_MAX: u8 = 0x77;

/// A register mutation reported to the change-notification hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// One register was written by the bus.
    Register(u8),
    /// A control write bulk-copied EEPROM into the register file.
    /// Reported once per bulk operation, not once per cell.
    BulkReload,
}

/// The emulated slave device.
///
/// Generic over the EEPROM medium; defaults to the in-memory
/// [`BufferEeprom`] used by tests and the CLI frontend.
pub struct Device<E: Eeprom = BufferEeprom> {
    regs: RegisterFile,
    pub eeprom: E,
    modes: ModeFlags,
    /// Address latch: the most recent one-byte write, consumed by reads
    latch: u8,
    /// Bus address fixed at startup
    resolved_address: u8,
    change_hook: Option<Box<dyn FnMut(Change)>>,
    /// Enable eprintln diagnostics (interferes with bus timing on real
    /// hardware; harmless here)
    pub debug: bool,
}

impl Device<BufferEeprom> {
    /// Device on factory-default EEPROM at the compiled-in address.
    pub fn new() -> Self {
        Self::with_eeprom(BufferEeprom::new(), DEFAULT_SLAVE_ADDRESS)
    }

    /// Device on factory-default EEPROM with a different compiled-in address.
    pub fn with_address(default_address: u8) -> Self {
        Self::with_eeprom(BufferEeprom::new(), default_address)
    }

    /// Restore a device from a saved image.
    ///
    /// Volatile state (registers, mode flags, latch) comes back exactly as
    /// saved; the bus address is re-resolved because it is fixed per process
    /// lifetime, and the pending reset flag starts clear.
    pub fn from_image(img: &DeviceImage, default_address: u8) -> Self {
        let mut dev = Device {
            regs: RegisterFile::new(),
            eeprom: BufferEeprom::from_bytes(&img.eeprom),
            modes: ModeFlags {
                read_from_eeprom: img.read_from_eeprom,
                use_alt_address: img.use_alt_address,
                device_reset: false,
            },
            latch: img.latch,
            resolved_address: default_address,
            change_hook: None,
            debug: false,
        };
        let len = img.registers.len().min(NUM_REGISTERS);
        dev.regs.data[..len].copy_from_slice(&img.registers[..len]);
        dev.resolved_address = dev.resolve_address(default_address);
        dev
    }
}

impl Default for Device<BufferEeprom> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Eeprom> Device<E> {
    /// Device on the given EEPROM medium.
    ///
    /// Startup runs the persisted control byte through the interpreter
    /// (populating the register file unless suppressed) and then resolves
    /// the bus address, honoring the alternate address only when it lies in
    /// the assignable 7-bit range; otherwise the compiled-in default is
    /// kept. A misconfigured device still boots and responds.
    pub fn with_eeprom(eeprom: E, default_address: u8) -> Self {
        let mut dev = Device {
            regs: RegisterFile::new(),
            eeprom,
            modes: ModeFlags::default(),
            latch: 0,
            resolved_address: default_address,
            change_hook: None,
            debug: false,
        };
        let cr = dev.eeprom.read(CONTROL_REG);
        control::apply(cr, &mut dev.regs, &mut dev.eeprom, &mut dev.modes);
        dev.resolved_address = dev.resolve_address(default_address);
        dev
    }

    fn resolve_address(&self, default_address: u8) -> u8 {
        if self.modes.use_alt_address {
            let alt = self.eeprom.read(I2C_ADDR_REG);
            if (I2C_ADDR_MIN..=I2C_ADDR_MAX).contains(&alt) {
                return alt;
            }
        }
        default_address
    }

    // ─── Bus callbacks ──────────────────────────────────────────────────────

    /// Inbound transaction complete.
    ///
    /// One byte latches the read address. Two or more bytes are a register
    /// write: the first byte is the start address, the rest land
    /// sequentially with modulo-256 wrap, and every byte hitting the control
    /// register triggers its side effects individually. A multi-byte write
    /// resets the latch to 0.
    pub fn on_bytes_received(&mut self, frame: &[u8]) {
        match frame {
            [] => {}
            [addr] => {
                self.latch = *addr;
                if self.debug {
                    eprintln!("[regslave] latch = 0x{:02X}", addr);
                }
            }
            [start, data @ ..] => {
                self.latch = 0;
                let mut reg = *start;
                for &byte in data {
                    self.write_register(reg, byte);
                    reg = reg.wrapping_add(1);
                }
            }
        }
    }

    /// Master read request: one byte at the latched address.
    ///
    /// The latch is not advanced; repeated reads re-resolve the same
    /// address. In EEPROM read mode the byte comes from storage, with the
    /// READ_LOCATION status bit synthesized for the control register.
    pub fn on_read_requested(&mut self) -> u8 {
        let byte = read_path::select(
            &self.regs,
            &self.eeprom,
            self.modes.read_from_eeprom,
            self.latch,
        );
        if self.debug {
            eprintln!(
                "[regslave] read 0x{:02X} -> 0x{:02X} ({})",
                self.latch,
                byte,
                if self.modes.read_from_eeprom { "eeprom" } else { "local" }
            );
        }
        byte
    }

    fn write_register(&mut self, addr: u8, value: u8) {
        if self.debug {
            eprintln!("[regslave] write 0x{:02X} = 0x{:02X}", addr, value);
        }
        self.regs.set(addr, value);
        let mut reloaded = false;
        if addr == CONTROL_REG {
            let applied = control::apply(value, &mut self.regs, &mut self.eeprom, &mut self.modes);
            reloaded = applied.reloaded;
        }
        if let Some(hook) = self.change_hook.as_mut() {
            if reloaded {
                hook(Change::BulkReload);
            }
            hook(Change::Register(addr));
        }
    }

    // ─── Host surface ───────────────────────────────────────────────────────

    /// Register value from the volatile register file.
    pub fn get_register(&self, addr: u8) -> u8 {
        self.regs.get(addr)
    }

    /// Registers `[start, end)` from the volatile register file.
    pub fn get_range(&self, start: u8, end: u8) -> Vec<u8> {
        self.regs.range(start, end)
    }

    /// Full 256-byte register snapshot.
    pub fn get_buffer(&self) -> [u8; NUM_REGISTERS] {
        self.regs.snapshot()
    }

    /// Bus address resolved at startup, fixed for the process lifetime.
    pub fn resolved_address(&self) -> u8 {
        self.resolved_address
    }

    /// Current address latch.
    pub fn latch(&self) -> u8 {
        self.latch
    }

    /// True while reads are served from EEPROM.
    pub fn read_from_eeprom(&self) -> bool {
        self.modes.read_from_eeprom
    }

    /// True once a DEVICE_RESET control write has armed the reset.
    pub fn reset_pending(&self) -> bool {
        self.modes.device_reset
    }

    /// Drive the reset line if a reset is armed. Call once per host
    /// main-loop iteration.
    ///
    /// The armed flag is never self-cleared: once requested, every poll
    /// holds the line low until external power-cycle or host intervention.
    pub fn poll_and_reset(&self, line: &mut dyn ResetLine) {
        if self.modes.device_reset {
            line.set_low();
        }
    }

    /// Register the change-notification hook, invoked with the mutated
    /// address after every successful write. Bulk reloads report a single
    /// [`Change::BulkReload`] before the triggering register event.
    pub fn set_change_hook(&mut self, hook: impl FnMut(Change) + 'static) {
        self.change_hook = Some(Box::new(hook));
    }

    /// Capture the device for persistence.
    pub fn to_image(&self) -> DeviceImage {
        let eeprom: Vec<u8> = (0..NUM_REGISTERS).map(|i| self.eeprom.read(i as u8)).collect();
        DeviceImage {
            registers: self.regs.snapshot().to_vec(),
            eeprom,
            read_from_eeprom: self.modes.read_from_eeprom,
            use_alt_address: self.modes.use_alt_address,
            latch: self.latch,
        }
    }
}

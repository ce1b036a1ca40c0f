//! Device image persistence.
//!
//! The emulated EEPROM only earns its "survives power cycles" lifetime if
//! the host can carry it across runs. An image file captures the EEPROM
//! together with the volatile side (register file, mode flags, address
//! latch) using bincode serialization with deflate compression.
//!
//! ## File format
//!
//! ```text
//! +------------------+
//! | Magic "RSLV"     |  4 bytes
//! +------------------+
//! | Format version   |  u32 little-endian (currently 1)
//! +------------------+
//! | Compressed data  |  deflate-compressed bincode payload
//! +------------------+
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Magic bytes identifying a regslave device image file.
const MAGIC: &[u8; 4] = b"RSLV";
/// Current image format version.
const FORMAT_VERSION: u32 = 1;

/// Serializable device state.
///
/// The pending device-reset flag is deliberately absent: a reset request is
/// a statement about the wired pin, which does not exist across host runs.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeviceImage {
    /// Register file content (256 bytes)
    pub registers: Vec<u8>,
    /// EEPROM content (256 bytes)
    pub eeprom: Vec<u8>,
    pub read_from_eeprom: bool,
    pub use_alt_address: bool,
    /// Address latch selecting the next read
    pub latch: u8,
}

/// Encode an image to the on-disk byte format.
pub fn encode(image: &DeviceImage) -> Result<Vec<u8>, String> {
    let payload = bincode::serialize(image)
        .map_err(|e| format!("Serialize error: {}", e))?;

    let compressed = miniz_oxide::deflate::compress_to_vec(&payload, 6);

    let mut out = Vec::with_capacity(8 + compressed.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&compressed);
    Ok(out)
}

/// Decode the on-disk byte format, verifying magic and version.
pub fn decode(data: &[u8]) -> Result<DeviceImage, String> {
    if data.len() < 8 {
        return Err("File too small".into());
    }
    if &data[0..4] != MAGIC {
        return Err("Invalid device image file (bad magic)".into());
    }
    let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    if version != FORMAT_VERSION {
        return Err(format!(
            "Unsupported device image version {} (expected {})",
            version, FORMAT_VERSION
        ));
    }

    let decompressed = miniz_oxide::inflate::decompress_to_vec(&data[8..])
        .map_err(|e| format!("Decompress error: {:?}", e))?;

    bincode::deserialize(&decompressed)
        .map_err(|e| format!("Deserialize error: {}", e))
}

/// Save an image to a file.
pub fn save_to_file(image: &DeviceImage, path: &Path) -> Result<(), String> {
    let bytes = encode(image)?;
    std::fs::write(path, &bytes).map_err(|e| format!("Write error: {}", e))
}

/// Load an image from a file.
pub fn load_from_file(path: &Path) -> Result<DeviceImage, String> {
    let data = std::fs::read(path).map_err(|e| format!("Read error: {}", e))?;
    decode(&data)
}

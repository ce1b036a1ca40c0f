//! Hex + ASCII dump of register or EEPROM content, for the host's
//! inspection commands.

/// Dump `length` bytes starting at `start` as 16-per-line hex with an ASCII
/// gutter. Clamped to the slice.
pub fn dump_hex(data: &[u8], start: usize, length: usize) -> String {
    let mut s = String::new();
    let end = (start + length).min(data.len());
    let mut addr = start;
    while addr < end {
        let line_end = (addr + 16).min(end);
        s.push_str(&format!("{:02X}: ", addr));
        for i in addr..addr + 16 {
            if i < line_end {
                s.push_str(&format!("{:02X} ", data[i]));
            } else {
                s.push_str("   ");
            }
            if i == addr + 7 {
                s.push(' ');
            }
        }
        s.push(' ');
        for i in addr..line_end {
            let c = data[i];
            if (0x20..0x7F).contains(&c) {
                s.push(c as char);
            } else {
                s.push('.');
            }
        }
        s.push('\n');
        addr += 16;
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dump_line_layout() {
        let mut data = [0u8; 32];
        data[0] = 0x41; // 'A'
        data[1] = 0x00;
        let out = dump_hex(&data, 0, 16);
        assert!(out.starts_with("00: 41 00"));
        assert!(out.trim_end().ends_with("A..............."));
        assert_eq!(out.lines().count(), 1);
    }

    #[test]
    fn test_dump_clamps_to_slice() {
        let data = [0xFFu8; 8];
        let out = dump_hex(&data, 4, 100);
        assert_eq!(out.lines().count(), 1);
        assert!(out.starts_with("04: FF FF FF FF"));
    }
}

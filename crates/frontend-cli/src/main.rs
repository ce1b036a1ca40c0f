//! regslave host frontend.
//!
//! Hosts the emulated I2C slave device and plays the bus master against it
//! from the command line. Two execution modes:
//!
//! - **Interactive mode** (default): REPL on stdin, one bus transaction or
//!   host command per line.
//! - **Script mode** (`--script`): runs a command file for automated
//!   exercising; `#` lines are comments.
//!
//! With `--eeprom <file>` the device image is loaded at start and saved on
//! exit, giving the emulated EEPROM its power-cycle-surviving lifetime.
//!
//! ## Commands
//!
//! ```text
//! w <addr> <byte...>   master write transaction (single byte = latch only)
//! r [addr]             master read (optionally latch addr first)
//! latch [addr]         show or set the address latch
//! dump                 hex dump of the register file
//! eeprom               hex dump of the EEPROM
//! regs                 device status summary
//! addr                 resolved bus address
//! poll                 one main-loop iteration (drives the reset line)
//! save <file>          save device image
//! load <file>          load device image
//! help                 command list
//! quit                 exit (saves --eeprom image)
//! ```

use regslave_core::image;
use regslave_core::reset::RecordingResetLine;
use regslave_core::transport::{self, ScriptedTransport, Transport};
use regslave_core::{dump, BufferEeprom, Change, Device, DEFAULT_SLAVE_ADDRESS};
use std::env;
use std::io::{self, BufRead, Write};
use std::path::Path;

const PROMPT: &str = "regslave> ";

struct Host {
    dev: Device<BufferEeprom>,
    bus: ScriptedTransport,
    reset_line: RecordingResetLine,
    default_address: u8,
}

fn main() {
    let mut eeprom_path: Option<String> = None;
    let mut script_path: Option<String> = None;
    let mut default_address = DEFAULT_SLAVE_ADDRESS;
    let mut debug = false;

    let args: Vec<String> = env::args().skip(1).collect();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--eeprom" => {
                i += 1;
                eeprom_path = args.get(i).cloned();
                if eeprom_path.is_none() {
                    eprintln!("--eeprom requires a file argument");
                    std::process::exit(1);
                }
            }
            "--script" => {
                i += 1;
                script_path = args.get(i).cloned();
                if script_path.is_none() {
                    eprintln!("--script requires a file argument");
                    std::process::exit(1);
                }
            }
            "--address" => {
                i += 1;
                match args.get(i).map(|s| parse_byte(s)) {
                    Some(Ok(a)) => default_address = a,
                    _ => {
                        eprintln!("--address requires a hex byte argument");
                        std::process::exit(1);
                    }
                }
            }
            "--debug" => debug = true,
            "--help" | "-h" => {
                print_usage();
                return;
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let mut dev = match &eeprom_path {
        Some(p) if Path::new(p).exists() => match image::load_from_file(Path::new(p)) {
            Ok(img) => {
                eprintln!("Loaded device image from {}", p);
                Device::from_image(&img, default_address)
            }
            Err(e) => {
                eprintln!("Error loading {}: {}", p, e);
                std::process::exit(1);
            }
        },
        _ => Device::with_address(default_address),
    };
    dev.debug = debug;
    if debug {
        dev.set_change_hook(|change| match change {
            Change::Register(addr) => eprintln!("[change] register 0x{:02X}", addr),
            Change::BulkReload => eprintln!("[change] bulk reload from eeprom"),
        });
    }

    let mut host = Host {
        dev,
        bus: ScriptedTransport::new(),
        reset_line: RecordingResetLine::new(),
        default_address,
    };
    host.bus.begin(host.dev.resolved_address());
    println!("regslave device on bus address 0x{:02X}", host.dev.resolved_address());

    if let Some(path) = &script_path {
        run_script(&mut host, path);
    } else {
        run_repl(&mut host);
    }

    if let Some(p) = &eeprom_path {
        match image::save_to_file(&host.dev.to_image(), Path::new(p)) {
            Ok(()) => eprintln!("Saved device image to {}", p),
            Err(e) => eprintln!("Error saving {}: {}", p, e),
        }
    }
}

fn print_usage() {
    println!("Usage: regslave-emu [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --eeprom <file>    device image loaded at start, saved on exit");
    println!("  --script <file>    run commands from file instead of stdin");
    println!("  --address <hex>    compiled-in slave address (default 08)");
    println!("  --debug            trace bus traffic and register changes");
    println!("  --help             show this help");
}

fn run_script(host: &mut Host, path: &str) {
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error reading {}: {}", path, e);
            std::process::exit(1);
        }
    };
    for (num, line) in text.lines().enumerate() {
        match run_command(host, line) {
            Ok(true) => break,
            Ok(false) => {}
            Err(e) => eprintln!("{}:{}: {}", path, num + 1, e),
        }
    }
}

fn run_repl(host: &mut Host) {
    let stdin = io::stdin();
    loop {
        print!("{}", PROMPT);
        let _ = io::stdout().flush();
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("stdin error: {}", e);
                break;
            }
        }
        match run_command(host, &line) {
            Ok(true) => break,
            Ok(false) => {}
            Err(e) => eprintln!("Error: {}", e),
        }
    }
}

/// Execute one command line. Returns `Ok(true)` to quit.
fn run_command(host: &mut Host, line: &str) -> Result<bool, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(false);
    }
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts[0] {
        "w" | "write" => {
            if parts.len() < 2 {
                return Err("usage: w <addr> <byte...>".into());
            }
            let frame = parse_bytes(&parts[1..])?;
            host.bus.queue(&frame);
            transport::service_receive(&mut host.dev, &mut host.bus);
        }
        "r" | "read" => {
            if parts.len() > 1 {
                let addr = parse_byte(parts[1])?;
                host.bus.queue(&[addr]);
                transport::service_receive(&mut host.dev, &mut host.bus);
            }
            transport::service_request(&mut host.dev, &mut host.bus);
            let byte = host.bus.take_outbound()[0];
            println!("0x{:02X}: 0x{:02X}", host.dev.latch(), byte);
        }
        "latch" => {
            if parts.len() > 1 {
                let addr = parse_byte(parts[1])?;
                host.dev.on_bytes_received(&[addr]);
            }
            println!("latch = 0x{:02X}", host.dev.latch());
        }
        "dump" => print!("{}", dump::dump_hex(&host.dev.get_buffer(), 0, 256)),
        "eeprom" => print!("{}", dump::dump_hex(&host.dev.eeprom.cells, 0, 256)),
        "regs" => {
            println!("address:       0x{:02X}", host.dev.resolved_address());
            println!("latch:         0x{:02X}", host.dev.latch());
            println!(
                "read source:   {}",
                if host.dev.read_from_eeprom() { "eeprom" } else { "local" }
            );
            println!("reset pending: {}", host.dev.reset_pending());
            println!(
                "eeprom:        {} ({} writes)",
                if host.dev.eeprom.dirty { "dirty" } else { "clean" },
                host.dev.eeprom.write_count
            );
        }
        "addr" => println!("0x{:02X}", host.dev.resolved_address()),
        "poll" => {
            host.dev.poll_and_reset(&mut host.reset_line);
            println!(
                "reset line {} ({} pulls)",
                if host.reset_line.low { "LOW" } else { "high" },
                host.reset_line.pulls
            );
        }
        "save" => {
            let path = parts.get(1).ok_or("usage: save <file>")?;
            image::save_to_file(&host.dev.to_image(), Path::new(path))?;
            println!("saved {}", path);
        }
        "load" => {
            let path = parts.get(1).ok_or("usage: load <file>")?;
            let img = image::load_from_file(Path::new(path))?;
            let debug = host.dev.debug;
            host.dev = Device::from_image(&img, host.default_address);
            host.dev.debug = debug;
            println!("loaded {} (address 0x{:02X})", path, host.dev.resolved_address());
        }
        "help" | "?" => {
            println!("w <addr> <byte...>   master write (single byte = latch only)");
            println!("r [addr]             master read, optionally latching addr first");
            println!("latch [addr]         show or set the address latch");
            println!("dump | eeprom        hex dump of registers / EEPROM");
            println!("regs | addr | poll   status / bus address / main-loop poll");
            println!("save <f> | load <f>  device image persistence");
            println!("quit                 exit");
        }
        "quit" | "q" | "exit" => return Ok(true),
        other => return Err(format!("unknown command '{}' (try help)", other)),
    }
    Ok(false)
}

/// Parse a hex byte, with or without a 0x prefix.
fn parse_byte(s: &str) -> Result<u8, String> {
    let t = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    u8::from_str_radix(t, 16).map_err(|_| format!("not a hex byte: '{}'", s))
}

fn parse_bytes(parts: &[&str]) -> Result<Vec<u8>, String> {
    parts.iter().map(|p| parse_byte(p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> Host {
        Host {
            dev: Device::new(),
            bus: ScriptedTransport::new(),
            reset_line: RecordingResetLine::new(),
            default_address: DEFAULT_SLAVE_ADDRESS,
        }
    }

    #[test]
    fn test_parse_byte_accepts_prefixed_and_bare_hex() {
        assert_eq!(parse_byte("0x2A").unwrap(), 0x2A);
        assert_eq!(parse_byte("ff").unwrap(), 0xFF);
        assert!(parse_byte("zz").is_err());
        assert!(parse_byte("100").is_err());
    }

    #[test]
    fn test_write_command_reaches_device() {
        let mut h = host();
        run_command(&mut h, "w 10 de ad").unwrap();
        assert_eq!(h.dev.get_register(0x10), 0xDE);
        assert_eq!(h.dev.get_register(0x11), 0xAD);
    }

    #[test]
    fn test_comments_and_blank_lines_are_skipped() {
        let mut h = host();
        assert!(!run_command(&mut h, "# a comment").unwrap());
        assert!(!run_command(&mut h, "   ").unwrap());
    }

    #[test]
    fn test_quit_command() {
        let mut h = host();
        assert!(run_command(&mut h, "quit").unwrap());
    }

    #[test]
    fn test_unknown_command_is_an_error() {
        let mut h = host();
        assert!(run_command(&mut h, "frobnicate").is_err());
    }
}

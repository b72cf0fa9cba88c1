//! CLI argument parsing

use crate::programmers;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse a chip size in KiB, hex or decimal
fn parse_size_kib(s: &str) -> Result<u32, String> {
    let kib = parse_hex_u32(s)?;
    if kib == 0 {
        return Err("Chip size must not be zero".to_string());
    }
    if kib > u32::MAX / 1024 {
        return Err(format!("Chip size too large: {} KiB", kib));
    }
    Ok(kib)
}

/// Generate dynamic help text for the programmer argument
fn programmer_help() -> String {
    format!(
        "Programmer to use [available: {}]",
        programmers::programmer_names_short()
    )
}

#[derive(Parser)]
#[command(name = "spibang")]
#[command(author, version, about = "Bit-banged SPI flash programmer", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read flash contents to file
    Read {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        /// Chip size in KiB (hex or decimal)
        #[arg(short, long, value_parser = parse_size_kib)]
        size: u32,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Start address (hex, e.g., 0x10000)
        #[arg(long, value_parser = parse_hex_u32)]
        start: Option<u32>,

        /// Number of bytes to read (hex or decimal), defaults to the rest of the chip
        #[arg(long, value_parser = parse_hex_u32)]
        length: Option<u32>,
    },

    /// Write file to flash
    Write {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        /// Chip size in KiB (hex or decimal)
        #[arg(short, long, value_parser = parse_size_kib)]
        size: u32,

        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Verify after writing
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        verify: bool,

        /// Don't erase before writing
        #[arg(long)]
        no_erase: bool,
    },

    /// Erase the whole flash chip
    Erase {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,
    },

    /// Verify flash contents against file
    Verify {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        /// Chip size in KiB (hex or decimal)
        #[arg(short, long, value_parser = parse_size_kib)]
        size: u32,

        /// Input file path to verify against
        #[arg(short, long)]
        input: PathBuf,
    },

    /// List supported programmers
    ListProgrammers,
}

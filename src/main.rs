//! spibang - A bit-banged SPI flash programmer
//!
//! Reads, writes, erases and verifies SPI NOR flash chips through a software
//! SPI master that toggles four GPIO-like signals.
//!
//! # Architecture
//!
//! The programmer string picks a backend (`linux_gpio_spi` for real GPIO
//! lines, `sim` for a simulated chip); the backend is wrapped in the core
//! bitbang master and handed to the commands as a boxed `SpiMaster`. The bus
//! master does not identify chips, so the chip size comes from `--size`.

mod cli;
mod commands;
mod programmers;

use clap::Parser;
use cli::{Cli, Commands};
use spibang_core::chip::FlashChip;

fn declared_chip(size_kib: u32) -> Result<FlashChip, Box<dyn std::error::Error>> {
    FlashChip::from_kib(size_kib).ok_or_else(|| {
        format!("Chip size {} KiB does not fit a 32-bit address space", size_kib).into()
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logger, -v and -vv raise the default level
    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match cli.command {
        Commands::Read {
            programmer,
            size,
            output,
            start,
            length,
        } => {
            let chip = declared_chip(size)?;
            let mut master = programmers::open_programmer(&programmer)?;
            commands::run_read(&mut master, &chip, &output, start, length)
        }
        Commands::Write {
            programmer,
            size,
            input,
            verify,
            no_erase,
        } => {
            let chip = declared_chip(size)?;
            let mut master = programmers::open_programmer(&programmer)?;
            commands::run_write(&mut master, &chip, &input, verify, no_erase)
        }
        Commands::Erase { programmer } => {
            let mut master = programmers::open_programmer(&programmer)?;
            commands::run_erase(&mut master)
        }
        Commands::Verify {
            programmer,
            size,
            input,
        } => {
            let chip = declared_chip(size)?;
            let mut master = programmers::open_programmer(&programmer)?;
            commands::run_verify(&mut master, &chip, &input)
        }
        Commands::ListProgrammers => {
            commands::list_programmers();
            Ok(())
        }
    }
}

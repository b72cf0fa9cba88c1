//! spibang-sim - Pin-level SPI flash simulator
//!
//! This crate provides [`SimFlash`], a [`BitbangBackend`] that behaves like an
//! SPI NOR flash chip wired to the four bus signals. It samples data-in on the
//! rising clock edge, shifts its answer out on data-out and acts on a command
//! when chip select is released. Wrapped in a [`BitbangSpi`] it runs the whole
//! programming stack without hardware.
//!
//! Supported commands: RDID, RDSR, WREN, WRDI, READ, READ_4B, PP, PP_4B,
//! SE_20, SE_21, CE_60 and CE_C7. Anything else is ignored and reads back as
//! `0xFF`.
//!
//! # Usage with the spibang CLI
//!
//! ```bash
//! spibang read -p sim:size=1024 --size 1024 -o flash.bin
//! spibang write -p sim:size=64,busy=5 --size 64 -i image.bin
//! ```

use spibang_core::chip::PAGE_SIZE;
use spibang_core::error::{Error, Result};
use spibang_core::programmer::{BitbangBackend, BitbangConfig, BitbangSpi, SpiMaster};
use spibang_core::spi::opcodes;

/// Smallest erase unit
const SECTOR_SIZE: usize = 4096;

/// Configuration for the simulated flash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// JEDEC manufacturer ID
    pub manufacturer_id: u8,
    /// JEDEC device ID
    pub device_id: u16,
    /// Flash size in bytes
    pub size: usize,
    /// Number of status reads that report busy after a program or erase
    pub busy_polls: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            manufacturer_id: 0xEF, // Winbond
            device_id: 0x4014,     // W25Q80
            size: 1024 * 1024,
            busy_polls: 2,
        }
    }
}

/// Simulated flash chip on the far side of the bus
pub struct SimFlash {
    config: SimConfig,
    data: Vec<u8>,
    write_enabled: bool,
    busy_remaining: usize,

    // Pin state
    cs_active: bool,
    sck: bool,
    mosi: bool,
    miso: bool,

    // Current transaction
    rx: Vec<u8>,
    shift_in: u8,
    bits_in: u8,
    tx_byte: u8,
    tx_next: u8,
    bits_out: u8,

    clocks_until_fault: Option<usize>,
    transactions: usize,
    longest_transaction: usize,
    status_reads: usize,
}

impl SimFlash {
    /// Create an erased chip with the given configuration
    pub fn new(config: SimConfig) -> Self {
        let data = vec![0xFF; config.size];
        Self {
            config,
            data,
            write_enabled: false,
            busy_remaining: 0,
            cs_active: false,
            sck: false,
            mosi: false,
            miso: true,
            rx: Vec::new(),
            shift_in: 0,
            bits_in: 0,
            tx_byte: 0xFF,
            tx_next: 0xFF,
            bits_out: 0,
            clocks_until_fault: None,
            transactions: 0,
            longest_transaction: 0,
            status_reads: 0,
        }
    }

    /// Create a chip with pre-filled contents
    pub fn with_data(config: SimConfig, initial_data: &[u8]) -> Self {
        let mut flash = Self::new(config);
        let len = initial_data.len().min(flash.data.len());
        flash.data[..len].copy_from_slice(&initial_data[..len]);
        flash
    }

    /// Get a reference to the flash contents
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get a mutable reference to the flash contents
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Get the configuration
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Whether chip select is currently asserted
    pub fn is_selected(&self) -> bool {
        self.cs_active
    }

    /// Number of chip-select assertions seen so far
    pub fn transactions(&self) -> usize {
        self.transactions
    }

    /// Largest number of whole bytes clocked in one transaction
    pub fn longest_transaction(&self) -> usize {
        self.longest_transaction
    }

    /// Number of completed status register reads
    pub fn status_reads(&self) -> usize {
        self.status_reads
    }

    /// Make the clock line fail after `clocks` more rising edges
    pub fn fail_after_clocks(&mut self, clocks: usize) {
        self.clocks_until_fault = Some(clocks);
    }

    fn status(&self) -> u8 {
        let mut status = 0;
        if self.busy_remaining > 0 {
            status |= opcodes::SR1_WIP;
        }
        if self.write_enabled {
            status |= opcodes::SR1_WEL;
        }
        status
    }

    /// Address carried in bytes 1..=addr_len of the current command
    fn address(&self, addr_len: usize) -> usize {
        self.rx[1..=addr_len]
            .iter()
            .fold(0, |addr, &b| (addr << 8) | b as usize)
    }

    fn byte_at(&self, addr: usize) -> u8 {
        if self.data.is_empty() {
            return 0xFF;
        }
        self.data[addr % self.data.len()]
    }

    fn begin_transaction(&mut self) {
        self.rx.clear();
        self.shift_in = 0;
        self.bits_in = 0;
        self.tx_byte = 0xFF;
        self.tx_next = 0xFF;
        self.bits_out = 0;
        self.miso = true;
        self.transactions += 1;
    }

    fn end_transaction(&mut self) {
        self.longest_transaction = self.longest_transaction.max(self.rx.len());
        if self.bits_in != 0 {
            log::debug!("sim: chip select released mid-byte, command dropped");
            return;
        }
        self.complete_command();
    }

    /// Answer for the byte slot following the last received byte
    fn next_output(&self) -> u8 {
        let opcode = self.rx[0];
        let n = self.rx.len();

        if self.busy_remaining > 0 && opcode != opcodes::RDSR {
            return 0xFF;
        }

        match opcode {
            opcodes::RDID => {
                let id = [
                    self.config.manufacturer_id,
                    (self.config.device_id >> 8) as u8,
                    self.config.device_id as u8,
                ];
                id.get(n - 1).copied().unwrap_or(0xFF)
            }
            opcodes::RDSR => self.status(),
            opcodes::READ => self.read_output(n, 3),
            opcodes::READ_4B => self.read_output(n, 4),
            _ => 0xFF,
        }
    }

    fn read_output(&self, n: usize, addr_len: usize) -> u8 {
        let header_len = 1 + addr_len;
        if n < header_len {
            return 0xFF;
        }
        self.byte_at(self.address(addr_len) + (n - header_len))
    }

    fn complete_command(&mut self) {
        let Some(&opcode) = self.rx.first() else {
            return;
        };

        if self.busy_remaining > 0 {
            if opcode == opcodes::RDSR {
                self.status_reads += 1;
                self.busy_remaining -= 1;
            } else {
                log::warn!("sim: command 0x{:02X} ignored while busy", opcode);
            }
            return;
        }

        match opcode {
            opcodes::RDSR => self.status_reads += 1,
            opcodes::WREN => self.write_enabled = true,
            opcodes::WRDI => self.write_enabled = false,
            opcodes::PP => self.page_program(3),
            opcodes::PP_4B => self.page_program(4),
            opcodes::SE_20 => self.sector_erase(3),
            opcodes::SE_21 => self.sector_erase(4),
            opcodes::CE_60 | opcodes::CE_C7 => self.chip_erase(),
            _ => {}
        }
    }

    fn page_program(&mut self, addr_len: usize) {
        let header_len = 1 + addr_len;
        if self.rx.len() < header_len {
            return;
        }
        if !self.write_enabled {
            log::warn!("sim: page program without write enable");
            return;
        }

        let addr = self.address(addr_len);
        let page_base = addr - addr % PAGE_SIZE;
        let payload = &self.rx[header_len..];
        // Only the last page worth of data is kept, like real parts
        let skip = payload.len().saturating_sub(PAGE_SIZE);
        log::trace!("sim: program {} bytes at 0x{:06X}", payload.len() - skip, addr);

        let len = self.data.len();
        for (i, &byte) in payload.iter().enumerate().skip(skip) {
            // Programming wraps within the page
            let target = page_base + (addr % PAGE_SIZE + i) % PAGE_SIZE;
            if len > 0 {
                // Flash programming can only change 1 -> 0
                self.data[target % len] &= byte;
            }
        }

        self.finish_write_cycle();
    }

    fn sector_erase(&mut self, addr_len: usize) {
        if self.rx.len() < 1 + addr_len || !self.write_enabled {
            return;
        }

        let start = self.address(addr_len) & !(SECTOR_SIZE - 1);
        let end = (start + SECTOR_SIZE).min(self.data.len());
        if start < end {
            self.data[start..end].fill(0xFF);
        }
        log::trace!("sim: erased sector at 0x{:06X}", start);

        self.finish_write_cycle();
    }

    fn chip_erase(&mut self) {
        if !self.write_enabled {
            return;
        }

        self.data.fill(0xFF);
        log::trace!("sim: chip erased");

        self.finish_write_cycle();
    }

    fn finish_write_cycle(&mut self) {
        self.write_enabled = false;
        self.busy_remaining = self.config.busy_polls;
    }

    fn rising_edge(&mut self) {
        self.shift_in = (self.shift_in << 1) | self.mosi as u8;
        self.bits_in += 1;
        self.bits_out += 1;

        if self.bits_in == 8 {
            self.rx.push(self.shift_in);
            self.shift_in = 0;
            self.bits_in = 0;
            self.tx_next = self.next_output();
        }
    }

    fn falling_edge(&mut self) {
        if self.bits_out == 8 {
            self.tx_byte = self.tx_next;
            self.bits_out = 0;
        }
        self.miso = self.tx_byte & (0x80 >> self.bits_out) != 0;
    }
}

impl BitbangBackend for SimFlash {
    fn set_cs(&mut self, active: bool) -> Result<()> {
        if active && !self.cs_active {
            self.begin_transaction();
        } else if !active && self.cs_active {
            self.end_transaction();
        }
        self.cs_active = active;
        Ok(())
    }

    fn set_sck(&mut self, high: bool) -> Result<()> {
        let rising = high && !self.sck;
        let falling = !high && self.sck;

        if rising {
            if let Some(remaining) = self.clocks_until_fault.as_mut() {
                if *remaining == 0 {
                    log::error!("sim: injected clock line fault");
                    return Err(Error::BackendFault);
                }
                *remaining -= 1;
            }
        }
        self.sck = high;

        if self.cs_active {
            if rising {
                self.rising_edge();
            } else if falling {
                self.falling_edge();
            }
        }
        Ok(())
    }

    fn set_mosi(&mut self, high: bool) -> Result<()> {
        self.mosi = high;
        Ok(())
    }

    fn get_miso(&mut self) -> Result<bool> {
        // Undriven data-in is pulled high
        Ok(!self.cs_active || self.miso)
    }

    fn delay_us(&mut self, _us: u32) {
        // Simulated time does not pass
    }
}

/// Bus master wired to a simulated chip
pub type SimSpi = BitbangSpi<SimFlash>;

/// Parse simulator options from programmer string parameters
///
/// Recognized options:
/// - `size=<KiB>` - flash size in KiB, decimal or `0x` hex (default 1024)
/// - `busy=<polls>` - busy status reads after each program or erase (default 2)
pub fn parse_options(options: &[(&str, &str)]) -> std::result::Result<SimConfig, String> {
    let mut config = SimConfig::default();

    for &(key, value) in options {
        match key {
            "size" => {
                let kib = parse_number(value)
                    .ok_or_else(|| format!("Invalid size: {}", value))?;
                if kib == 0 {
                    return Err("Flash size must not be zero".into());
                }
                config.size = kib
                    .checked_mul(1024)
                    .ok_or_else(|| format!("Flash size too large: {}", value))?;
            }
            "busy" => {
                config.busy_polls =
                    parse_number(value).ok_or_else(|| format!("Invalid busy count: {}", value))?;
            }
            _ => {
                log::warn!("sim: Unknown option: {}={}", key, value);
            }
        }
    }

    Ok(config)
}

fn parse_number(s: &str) -> Option<usize> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

/// Open a simulated chip and return a boxed SpiMaster
///
/// This is a convenience function for use in the CLI programmer dispatch.
pub fn open_sim(
    options: &[(&str, &str)],
) -> std::result::Result<Box<dyn SpiMaster + Send>, Box<dyn std::error::Error>> {
    let config = parse_options(options)?;
    log::info!(
        "sim: {} KiB chip, JEDEC ID {:02X} {:04X}, {} busy polls per write",
        config.size / 1024,
        config.manufacturer_id,
        config.device_id,
        config.busy_polls
    );
    let spi = BitbangSpi::new(SimFlash::new(config), BitbangConfig::default())?;
    Ok(Box::new(spi))
}

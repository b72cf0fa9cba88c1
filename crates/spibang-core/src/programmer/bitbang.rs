//! Bitbang SPI master
//!
//! This module implements an SPI controller in software on top of four
//! GPIO-like signals. A [`BitbangBackend`] provides the signals; the
//! [`BitbangSpi`] bus master clocks bits, bytes and whole command exchanges
//! through it and implements [`SpiMaster`] so the flash routines can run on
//! top of it.
//!
//! ## Bus convention
//!
//! The bus is fixed to SPI mode 0, most significant bit first:
//!
//! - clock idles low
//! - data-out is set up while the clock is low
//! - data-in is sampled right after the rising edge
//! - each clock phase lasts one half-period, so one bit takes two
//!
//! ## Transactions
//!
//! A command exchange is `write` bytes followed by `read` bytes under a single
//! chip-select assertion. While reading, the master shifts out `0x00`. The
//! exchange runs out of a scratch buffer pair owned by the master; the pair is
//! sized to `max(write + read, 260)` and only ever grows.

use alloc::vec::Vec;

use super::{SpiFeatures, SpiMaster};
use crate::error::{Error, Result};
use crate::spi::SpiCommand;

/// Largest write phase and largest read phase accepted in one transaction
pub const MAX_TRANSFER_LEN: usize = 64 * 1024;

/// Minimum scratch buffer size, covers a page program with a 4-byte address
const MIN_BUFFER_SIZE: usize = 260;

/// Byte driven on data-out during the read phase
const FILLER_BYTE: u8 = 0x00;

/// Value of response bytes that were never clocked in
const SENTINEL_BYTE: u8 = 0xFF;

/// Longest command header: opcode + 4-byte address
const MAX_HEADER_LEN: usize = 5;

/// Low-level signal access for a bitbang SPI master
///
/// Implementations drive real pins (GPIO character device, memory-mapped
/// registers, ...) or simulate a device. Every call may fail; the bus master
/// stops at the first failure and reports it as the result of the
/// transaction.
pub trait BitbangBackend {
    /// Set chip select (CS is active low, so `active=true` means CS=0)
    fn set_cs(&mut self, active: bool) -> Result<()>;

    /// Set clock line value
    fn set_sck(&mut self, high: bool) -> Result<()>;

    /// Set MOSI line value
    fn set_mosi(&mut self, high: bool) -> Result<()>;

    /// Get MISO line value
    fn get_miso(&mut self) -> Result<bool>;

    /// Busy-wait for the given number of microseconds
    fn delay_us(&mut self, us: u32);
}

impl<B: BitbangBackend + ?Sized> BitbangBackend for &mut B {
    fn set_cs(&mut self, active: bool) -> Result<()> {
        (**self).set_cs(active)
    }

    fn set_sck(&mut self, high: bool) -> Result<()> {
        (**self).set_sck(high)
    }

    fn set_mosi(&mut self, high: bool) -> Result<()> {
        (**self).set_mosi(high)
    }

    fn get_miso(&mut self) -> Result<bool> {
        (**self).get_miso()
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}

/// Bus timing configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BitbangConfig {
    /// Length of half a clock period in microseconds
    pub half_period_us: u32,
}

impl BitbangConfig {
    /// Create a configuration with the given half period
    pub fn new(half_period_us: u32) -> Self {
        Self { half_period_us }
    }

    /// Set SPI speed in Hz (approximate, via half-period calculation)
    ///
    /// Speeds above 500 kHz round down to a zero delay, leaving the bit rate
    /// to the backend.
    pub fn with_speed_hz(mut self, hz: u32) -> Self {
        // half_period = 1_000_000 / (2 * frequency) in microseconds
        if hz > 0 {
            self.half_period_us = 500_000 / hz;
        }
        self
    }
}

/// Software SPI master
///
/// Owns the backend and the transaction scratch buffers. All operations take
/// `&mut self`, so there is exactly one user of the bus at a time.
pub struct BitbangSpi<B> {
    backend: B,
    half_period_us: u32,
    bufout: Vec<u8>,
    bufin: Vec<u8>,
}

impl<B: BitbangBackend> BitbangSpi<B> {
    /// Create a bus master and put the bus into its idle state
    pub fn new(backend: B, config: BitbangConfig) -> Result<Self> {
        let mut spi = Self {
            backend,
            half_period_us: config.half_period_us,
            bufout: Vec::new(),
            bufin: Vec::new(),
        };
        spi.initialize_bus()?;
        Ok(spi)
    }

    /// Deselect the chip and park the clock low
    pub fn initialize_bus(&mut self) -> Result<()> {
        self.backend.set_cs(false)?;
        self.backend.set_sck(false)?;
        log::debug!(
            "bitbang: bus initialized, half period {} us",
            self.half_period_us
        );
        Ok(())
    }

    /// Borrow the backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutably borrow the backend
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Current size of each scratch buffer
    pub fn scratch_len(&self) -> usize {
        self.bufout.len()
    }

    fn half_period_delay(&mut self) {
        self.backend.delay_us(self.half_period_us);
    }

    /// Clock one bit out on MOSI and one bit in from MISO
    pub fn transfer_bit(&mut self, out: bool) -> Result<bool> {
        self.backend.set_mosi(out)?;
        self.half_period_delay();
        self.backend.set_sck(true)?;
        let bit = self.backend.get_miso()?;
        self.half_period_delay();
        self.backend.set_sck(false)?;
        Ok(bit)
    }

    /// Exchange one byte, most significant bit first
    pub fn transfer_byte(&mut self, out: u8) -> Result<u8> {
        let mut ret = 0u8;
        for i in (0..8).rev() {
            let bit = self.transfer_bit((out >> i) & 1 != 0)?;
            ret = (ret << 1) | bit as u8;
        }
        Ok(ret)
    }

    /// Write `write`, then read `read.len()` bytes, under one chip select
    ///
    /// Returns [`Error::InvalidLength`] without touching the bus if either
    /// phase is longer than [`MAX_TRANSFER_LEN`]. On a backend fault the chip
    /// is deselected, `read` is left unmodified and the fault is returned.
    pub fn send_command(&mut self, write: &[u8], read: &mut [u8]) -> Result<()> {
        self.transact(&[write], read)
    }

    /// Like `send_command`, with the write phase given in pieces
    fn transact(&mut self, write: &[&[u8]], read: &mut [u8]) -> Result<()> {
        let writecnt: usize = write.iter().map(|part| part.len()).sum();
        let readcnt = read.len();

        // Arbitrary size limitation, we're only constrained by memory.
        if writecnt > MAX_TRANSFER_LEN || readcnt > MAX_TRANSFER_LEN {
            log::warn!(
                "bitbang: transfer of {} + {} bytes exceeds the {} byte limit",
                writecnt,
                readcnt,
                MAX_TRANSFER_LEN
            );
            return Err(Error::InvalidLength);
        }

        let total = writecnt + readcnt;
        self.reserve_scratch(total);

        let mut pos = 0;
        for part in write {
            self.bufout[pos..pos + part.len()].copy_from_slice(part);
            pos += part.len();
        }
        self.bufout[writecnt..total].fill(FILLER_BYTE);
        self.bufin[writecnt..total].fill(SENTINEL_BYTE);

        log::trace!("bitbang: transfer {} bytes out, {} bytes in", writecnt, readcnt);

        self.backend.set_cs(true)?;
        if let Err(e) = self.exchange(total) {
            // Deselect so the chip drops the aborted command; report the first fault.
            let _ = self.backend.set_sck(false);
            let _ = self.backend.set_cs(false);
            log::error!("bitbang: transfer aborted: {}", e);
            return Err(e);
        }
        self.half_period_delay();
        self.backend.set_cs(false)?;
        self.half_period_delay();

        read.copy_from_slice(&self.bufin[writecnt..total]);
        Ok(())
    }

    fn exchange(&mut self, len: usize) -> Result<()> {
        for i in 0..len {
            let out = self.bufout[i];
            self.bufin[i] = self.transfer_byte(out)?;
        }
        Ok(())
    }

    /// Grow both scratch buffers to hold `len` bytes; never shrinks them
    fn reserve_scratch(&mut self, len: usize) {
        let size = len.max(MIN_BUFFER_SIZE);
        if size > self.bufout.len() {
            log::debug!(
                "bitbang: growing scratch buffers {} -> {} bytes",
                self.bufout.len(),
                size
            );
            // Allocation failure aborts through the global OOM handler.
            self.bufout.resize(size, 0);
            self.bufin.resize(size, 0);
        }
    }
}

impl<B: BitbangBackend> SpiMaster for BitbangSpi<B> {
    fn features(&self) -> SpiFeatures {
        // 4-byte addressing is plain software framing
        SpiFeatures::FOUR_BYTE_ADDR
    }

    fn max_read_len(&self) -> usize {
        MAX_TRANSFER_LEN
    }

    fn max_write_len(&self) -> usize {
        MAX_TRANSFER_LEN
    }

    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
        let mut header = [0u8; MAX_HEADER_LEN];
        let header_len = cmd.header_len();
        cmd.encode_header(&mut header[..header_len]);

        self.transact(&[&header[..header_len], cmd.write_data], cmd.read_buf)
    }

    fn delay_us(&mut self, us: u32) {
        self.backend.delay_us(us);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spi::{opcodes, AddressWidth};
    use alloc::collections::VecDeque;
    use alloc::vec;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Event {
        Cs(bool),
        Sck(bool),
        Mosi(bool),
        Miso(bool),
        Delay(u32),
    }

    /// Backend that records every pin operation
    ///
    /// MISO comes from `miso_bits` while it lasts, then from `idle_miso`. In
    /// loopback mode MISO returns the MOSI level latched on the last rising
    /// clock edge.
    #[derive(Default)]
    struct Recorder {
        events: Vec<Event>,
        miso_bits: VecDeque<bool>,
        idle_miso: bool,
        loopback: bool,
        mosi: bool,
        latched: bool,
        reads: usize,
        fail_on_read: Option<usize>,
    }

    impl Recorder {
        fn loopback() -> Self {
            Self {
                loopback: true,
                ..Default::default()
            }
        }

        fn responding(bytes: &[u8]) -> Self {
            let mut rec = Self::default();
            for &byte in bytes {
                for i in (0..8).rev() {
                    rec.miso_bits.push_back((byte >> i) & 1 != 0);
                }
            }
            rec
        }

        fn count(&self, event: Event) -> usize {
            self.events.iter().filter(|&&e| e == event).count()
        }

        /// Bytes shifted out on MOSI, sampled at each rising clock edge
        fn mosi_bytes(&self) -> Vec<u8> {
            let mut mosi = false;
            let mut bits = Vec::new();
            for event in &self.events {
                match *event {
                    Event::Mosi(v) => mosi = v,
                    Event::Sck(true) => bits.push(mosi),
                    _ => {}
                }
            }
            bits.chunks(8)
                .map(|c| c.iter().fold(0u8, |acc, &b| (acc << 1) | b as u8))
                .collect()
        }
    }

    impl BitbangBackend for Recorder {
        fn set_cs(&mut self, active: bool) -> Result<()> {
            self.events.push(Event::Cs(active));
            Ok(())
        }

        fn set_sck(&mut self, high: bool) -> Result<()> {
            if high {
                self.latched = self.mosi;
            }
            self.events.push(Event::Sck(high));
            Ok(())
        }

        fn set_mosi(&mut self, high: bool) -> Result<()> {
            self.mosi = high;
            self.events.push(Event::Mosi(high));
            Ok(())
        }

        fn get_miso(&mut self) -> Result<bool> {
            if self.fail_on_read == Some(self.reads) {
                return Err(Error::BackendFault);
            }
            self.reads += 1;
            let bit = if self.loopback {
                self.latched
            } else {
                self.miso_bits.pop_front().unwrap_or(self.idle_miso)
            };
            self.events.push(Event::Miso(bit));
            Ok(bit)
        }

        fn delay_us(&mut self, us: u32) {
            self.events.push(Event::Delay(us));
        }
    }

    fn master(backend: Recorder, half_period_us: u32) -> BitbangSpi<Recorder> {
        let mut spi = BitbangSpi::new(backend, BitbangConfig::new(half_period_us)).unwrap();
        spi.backend_mut().events.clear();
        spi
    }

    #[test]
    fn test_initialize_bus() {
        let spi = BitbangSpi::new(Recorder::default(), BitbangConfig::default()).unwrap();
        assert_eq!(spi.backend().events, vec![Event::Cs(false), Event::Sck(false)]);
        assert_eq!(spi.scratch_len(), 0);
    }

    #[test]
    fn test_transfer_bit_sequence() {
        let mut spi = master(Recorder::responding(&[0x80]), 7);
        assert!(spi.transfer_bit(true).unwrap());
        assert_eq!(
            spi.backend().events,
            vec![
                Event::Mosi(true),
                Event::Delay(7),
                Event::Sck(true),
                Event::Miso(true),
                Event::Delay(7),
                Event::Sck(false),
            ]
        );
    }

    #[test]
    fn test_transfer_byte_loopback() {
        let mut spi = master(Recorder::loopback(), 0);
        for v in 0..=255u8 {
            assert_eq!(spi.transfer_byte(v).unwrap(), v);
        }
    }

    #[test]
    fn test_transfer_byte_msb_first() {
        let mut spi = master(Recorder::responding(&[0b1010_0001]), 0);
        assert_eq!(spi.transfer_byte(0b1100_0000).unwrap(), 0b1010_0001);

        let mosi: Vec<bool> = spi
            .backend()
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Mosi(v) => Some(*v),
                _ => None,
            })
            .collect();
        assert_eq!(mosi, vec![true, true, false, false, false, false, false, false]);
    }

    #[test]
    fn test_command_framing() {
        // Device answers the opcode byte with 0x00, then sends an ID
        let mut spi = master(Recorder::responding(&[0x00, 0xEF, 0x40, 0x18]), 0);
        let mut id = [0u8; 3];
        spi.send_command(&[opcodes::RDID], &mut id).unwrap();

        assert_eq!(id, [0xEF, 0x40, 0x18]);
        assert_eq!(spi.backend().mosi_bytes(), vec![opcodes::RDID, 0x00, 0x00, 0x00]);

        let events = &spi.backend().events;
        assert_eq!(spi.backend().count(Event::Cs(true)), 1);
        assert_eq!(spi.backend().count(Event::Cs(false)), 1);
        assert_eq!(events[0], Event::Cs(true));
        assert_eq!(
            &events[events.len() - 3..],
            &[Event::Delay(0), Event::Cs(false), Event::Delay(0)]
        );
    }

    #[test]
    fn test_delays_per_transaction() {
        let mut spi = master(Recorder::default(), 5);
        let mut status = [0u8; 1];
        spi.send_command(&[opcodes::RDSR], &mut status).unwrap();

        // Two per bit, plus one on each side of the chip select release
        assert_eq!(spi.backend().count(Event::Delay(5)), 2 * 16 + 2);
    }

    #[test]
    fn test_invalid_length() {
        let mut spi = master(Recorder::default(), 0);
        let big = vec![0u8; MAX_TRANSFER_LEN + 1];
        let mut small = [0u8; 1];
        assert_eq!(spi.send_command(&big, &mut small), Err(Error::InvalidLength));

        let mut big_read = vec![0u8; MAX_TRANSFER_LEN + 1];
        assert_eq!(spi.send_command(&[opcodes::READ], &mut big_read), Err(Error::InvalidLength));

        assert!(spi.backend().events.is_empty());
        assert_eq!(spi.scratch_len(), 0);
    }

    #[test]
    fn test_scratch_buffers_only_grow() {
        let mut spi = master(Recorder::default(), 0);
        let mut buf = [0u8; 3];
        spi.send_command(&[opcodes::RDID], &mut buf).unwrap();
        assert_eq!(spi.scratch_len(), 260);

        // Same or smaller exchanges keep the floor-sized buffers
        let write = [0u8; 4];
        let mut read = [0u8; 256];
        spi.send_command(&write, &mut read).unwrap();
        assert_eq!(spi.scratch_len(), 260);
        spi.send_command(&[opcodes::RDSR], &mut buf[..1]).unwrap();
        assert_eq!(spi.scratch_len(), 260);

        let mut read = [0u8; 296];
        spi.send_command(&write, &mut read).unwrap();
        assert_eq!(spi.scratch_len(), 300);

        spi.send_command(&[opcodes::RDSR], &mut buf[..1]).unwrap();
        assert_eq!(spi.scratch_len(), 300);
    }

    #[test]
    fn test_undriven_miso_reads_ff() {
        let mut spi = master(
            Recorder {
                idle_miso: true,
                ..Default::default()
            },
            0,
        );
        let mut buf = [0u8; 16];
        spi.send_command(&[opcodes::READ, 0, 0, 0], &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_fault_aborts_transaction() {
        let mut spi = master(
            Recorder {
                fail_on_read: Some(12),
                ..Default::default()
            },
            0,
        );
        let mut buf = [0x55u8; 4];
        assert_eq!(
            spi.send_command(&[opcodes::RDID], &mut buf),
            Err(Error::BackendFault)
        );
        assert_eq!(buf, [0x55; 4]);

        // Stopped at the failing bit and released the bus
        let backend = spi.backend();
        assert_eq!(backend.reads, 12);
        assert_eq!(backend.events.last(), Some(&Event::Cs(false)));
        assert_eq!(backend.count(Event::Cs(true)), 1);
    }

    #[test]
    fn test_execute_encodes_header() {
        let mut spi = master(Recorder::default(), 0);
        let data = [0xA5, 0x5A];
        let mut cmd = SpiCommand::write(opcodes::PP_4B, AddressWidth::FourByte, 0x0102_0304, &data);
        spi.execute(&mut cmd).unwrap();

        assert_eq!(
            spi.backend().mosi_bytes(),
            vec![opcodes::PP_4B, 0x01, 0x02, 0x03, 0x04, 0xA5, 0x5A]
        );
        assert_eq!(spi.backend().count(Event::Cs(true)), 1);
    }

    #[test]
    fn test_execute_read_has_no_dummy_cycles() {
        let mut spi = master(Recorder::responding(&[0xFF, 0xFF, 0xFF, 0xFF, 0x12, 0x34]), 0);
        let mut buf = [0u8; 2];
        let mut cmd = SpiCommand::read(opcodes::READ, AddressWidth::ThreeByte, 0x01_0203, &mut buf);
        spi.execute(&mut cmd).unwrap();

        // Data follows the address directly, clocked with filler zeros
        assert_eq!(
            spi.backend().mosi_bytes(),
            vec![opcodes::READ, 0x01, 0x02, 0x03, 0x00, 0x00]
        );
        assert_eq!(buf, [0x12, 0x34]);
        assert_eq!(spi.features(), SpiFeatures::FOUR_BYTE_ADDR);
        assert_eq!(spi.max_write_len(), MAX_TRANSFER_LEN);
    }

    #[test]
    fn test_speed_to_half_period() {
        assert_eq!(BitbangConfig::default().with_speed_hz(100_000).half_period_us, 5);
        assert_eq!(BitbangConfig::default().with_speed_hz(1_000_000).half_period_us, 0);
        assert_eq!(BitbangConfig::new(3).with_speed_hz(0).half_period_us, 3);
    }
}

//! SPI25 protocol implementation
//!
//! This module implements the common SPI flash command sequences
//! as defined by JEDEC, on top of any [`SpiMaster`].

use crate::error::{Error, Result};
use crate::programmer::SpiMaster;
use crate::spi::{opcodes, AddressWidth, SpiCommand};

/// Read the status register 1
pub fn read_status1<M: SpiMaster + ?Sized>(master: &mut M) -> Result<u8> {
    let mut buf = [0u8; 1];
    let mut cmd = SpiCommand::read_reg(opcodes::RDSR, &mut buf);
    master.execute(&mut cmd)?;
    Ok(buf[0])
}

/// Send the Write Enable command
pub fn write_enable<M: SpiMaster + ?Sized>(master: &mut M) -> Result<()> {
    let mut cmd = SpiCommand::simple(opcodes::WREN);
    master.execute(&mut cmd)
}

/// Check if a write or erase operation is in progress
pub fn is_busy<M: SpiMaster + ?Sized>(master: &mut M) -> Result<bool> {
    let status = read_status1(master)?;
    Ok(status & opcodes::SR1_WIP != 0)
}

/// Wait for the WIP (Write In Progress) bit to clear
///
/// Polls the status register until the Write In Progress bit clears.
///
/// # Arguments
/// * `poll_delay_us` - Delay in microseconds between status register polls
/// * `timeout_us` - Maximum time to wait before returning Error::Timeout
///
/// A zero poll delay waits for one poll only; use [`wait_ready_polls`] to
/// read the status register back to back.
pub fn wait_ready<M: SpiMaster + ?Sized>(
    master: &mut M,
    poll_delay_us: u32,
    timeout_us: u32,
) -> Result<()> {
    let max_polls = match timeout_us.checked_div(poll_delay_us) {
        Some(polls) => polls.max(1),
        None => 1,
    };
    poll_ready(master, poll_delay_us, max_polls)
}

/// Wait for the WIP bit to clear, reading the status register back to back
///
/// Gives up with [`Error::Timeout`] after `max_polls` reads that all report
/// busy.
pub fn wait_ready_polls<M: SpiMaster + ?Sized>(master: &mut M, max_polls: u32) -> Result<()> {
    poll_ready(master, 0, max_polls)
}

fn poll_ready<M: SpiMaster + ?Sized>(
    master: &mut M,
    poll_delay_us: u32,
    max_polls: u32,
) -> Result<()> {
    for _ in 0..max_polls {
        if !is_busy(master)? {
            return Ok(());
        }
        if poll_delay_us > 0 {
            master.delay_us(poll_delay_us);
        }
    }

    log::warn!("spi25: chip still busy after {} status polls", max_polls);
    Err(Error::Timeout)
}

/// Program up to one page of data at `addr`
///
/// Sends WREN followed by PP (or PP_4B). Does not wait for the program
/// cycle to finish; the data must not cross a page boundary.
///
/// Data longer than the master's `max_write_len()` is rejected with
/// [`Error::InvalidLength`] before anything is sent.
pub fn program_bytes<M: SpiMaster + ?Sized>(
    master: &mut M,
    addr: u32,
    data: &[u8],
    width: AddressWidth,
) -> Result<()> {
    if data.len() > master.max_write_len() {
        log::warn!(
            "spi25: {} byte program exceeds the programmer limit of {}",
            data.len(),
            master.max_write_len()
        );
        return Err(Error::InvalidLength);
    }

    write_enable(master)?;

    let opcode = match width {
        AddressWidth::FourByte => opcodes::PP_4B,
        _ => opcodes::PP,
    };
    let mut cmd = SpiCommand::write(opcode, width, addr, data);
    master.execute(&mut cmd)
}

/// Read `buf.len()` bytes starting at `addr`, split into bounded transfers
///
/// Every READ (or READ_4B) command, header included, stays within
/// `max_chunk` bytes and within the master's `max_read_len()`.
pub fn read_chunked<M: SpiMaster + ?Sized>(
    master: &mut M,
    addr: u32,
    buf: &mut [u8],
    width: AddressWidth,
    max_chunk: usize,
) -> Result<()> {
    let opcode = match width {
        AddressWidth::FourByte => opcodes::READ_4B,
        _ => opcodes::READ,
    };
    let header_len = 1 + width.bytes();
    let chunk_limit = max_chunk
        .saturating_sub(header_len)
        .min(master.max_read_len());
    if chunk_limit == 0 {
        return Err(Error::BufferTooSmall);
    }

    for (i, chunk) in buf.chunks_mut(chunk_limit).enumerate() {
        let chunk_addr = addr + (i * chunk_limit) as u32;
        let mut cmd = SpiCommand::read(opcode, width, chunk_addr, chunk);
        master.execute(&mut cmd)?;
    }

    Ok(())
}

/// Erase the entire chip
///
/// Chip erase typically takes 25-100s for large chips.
/// We poll every 1s with a 200s timeout.
pub fn chip_erase<M: SpiMaster + ?Sized>(master: &mut M) -> Result<()> {
    write_enable(master)?;

    let mut cmd = SpiCommand::simple(opcodes::CE_C7);
    master.execute(&mut cmd)?;

    wait_ready(master, 1_000_000, 200_000_000)
}

#[cfg(all(test, feature = "alloc"))]
mod tests {
    use super::*;
    use crate::programmer::mock::MockMaster;
    use alloc::vec;

    #[test]
    fn test_wait_ready_polls_until_clear() {
        let mut master = MockMaster::new();
        master.busy_polls = 3;
        program_bytes(&mut master, 0, &[0u8; 4], AddressWidth::ThreeByte).unwrap();
        wait_ready_polls(&mut master, 10).unwrap();
        assert_eq!(master.with_opcode(opcodes::RDSR).len(), 4);
    }

    #[test]
    fn test_wait_ready_timeout() {
        let mut master = MockMaster::new();
        master.busy_polls = 100;
        program_bytes(&mut master, 0, &[0u8; 4], AddressWidth::ThreeByte).unwrap();
        assert_eq!(wait_ready_polls(&mut master, 10), Err(Error::Timeout));
        assert_eq!(master.with_opcode(opcodes::RDSR).len(), 10);

        let mut master = MockMaster::new();
        master.busy_polls = 1000;
        assert_eq!(chip_erase(&mut master), Err(Error::Timeout));
        assert_eq!(master.with_opcode(opcodes::RDSR).len(), 200);
    }

    #[test]
    fn test_wait_ready_time_budget() {
        let mut master = MockMaster::new();
        master.busy_polls = 100;
        program_bytes(&mut master, 0, &[0u8; 4], AddressWidth::ThreeByte).unwrap();
        assert_eq!(wait_ready(&mut master, 50, 1_000), Err(Error::Timeout));
        assert_eq!(master.with_opcode(opcodes::RDSR).len(), 20);

        // Without a poll delay the time budget does not turn into a poll count
        let mut master = MockMaster::new();
        master.busy_polls = 100;
        program_bytes(&mut master, 0, &[0u8; 4], AddressWidth::ThreeByte).unwrap();
        assert_eq!(wait_ready(&mut master, 0, 1_000), Err(Error::Timeout));
        assert_eq!(master.with_opcode(opcodes::RDSR).len(), 1);
    }

    #[test]
    fn test_program_bytes_respects_master_write_limit() {
        let mut master = MockMaster::new();
        master.max_write_len = 16;
        assert_eq!(
            program_bytes(&mut master, 0, &[0u8; 17], AddressWidth::ThreeByte),
            Err(Error::InvalidLength)
        );
        assert!(master.log.is_empty());

        program_bytes(&mut master, 0, &[0u8; 16], AddressWidth::ThreeByte).unwrap();
        assert_eq!(master.opcodes(), vec![opcodes::WREN, opcodes::PP]);
        assert_eq!(master.log[1].write_len, 16);
    }

    #[test]
    fn test_program_bytes_sends_wren_first() {
        let mut master = MockMaster::new();
        program_bytes(&mut master, 0x100, &[1, 2, 3], AddressWidth::ThreeByte).unwrap();
        program_bytes(&mut master, 0x200, &[4], AddressWidth::FourByte).unwrap();
        assert_eq!(
            master.opcodes(),
            vec![opcodes::WREN, opcodes::PP, opcodes::WREN, opcodes::PP_4B]
        );
        assert_eq!(master.log[1].address, Some(0x100));
        assert_eq!(master.log[1].write_len, 3);
        assert_eq!(master.log[3].header_len, 5);
    }

    #[test]
    fn test_read_chunked_bounds_each_transfer() {
        let mut master = MockMaster::new();
        let mut buf = vec![0u8; 70_000];
        read_chunked(&mut master, 0, &mut buf, AddressWidth::ThreeByte, 64 * 1024).unwrap();

        assert!(master.log.len() >= 2);
        assert!(master.log.iter().all(|t| t.total_len() <= 64 * 1024));
        let total: usize = master.log.iter().map(|t| t.read_len).sum();
        assert_eq!(total, 70_000);
        assert_eq!(master.log[0].address, Some(0));
        assert_eq!(master.log[1].address, Some(64 * 1024 - 4));
        assert!(buf.iter().enumerate().all(|(i, &b)| b == i as u8));
    }

    #[test]
    fn test_read_chunked_respects_master_limit() {
        let mut master = MockMaster::new();
        master.max_read_len = 100;
        let mut buf = [0u8; 250];
        read_chunked(&mut master, 0x1000, &mut buf, AddressWidth::FourByte, 64 * 1024).unwrap();

        let lens: alloc::vec::Vec<usize> = master.log.iter().map(|t| t.read_len).collect();
        assert_eq!(lens, vec![100, 100, 50]);
        assert!(master.log.iter().all(|t| t.opcode == opcodes::READ_4B));
        assert_eq!(master.log[2].address, Some(0x1000 + 200));
    }

    #[test]
    fn test_read_chunked_empty() {
        let mut master = MockMaster::new();
        read_chunked(&mut master, 0, &mut [], AddressWidth::ThreeByte, 64 * 1024).unwrap();
        assert!(master.log.is_empty());
    }
}

//! Flash operations implementation

use crate::chip::{FlashChip, PAGE_SIZE};
use crate::error::{Error, Result};
use crate::programmer::{SpiFeatures, SpiMaster};
use crate::protocol;
use crate::spi::AddressWidth;

/// Largest single read transfer, header included
pub const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Status register polls allowed per page before giving up
///
/// A page program takes 0.7-5ms on typical parts; each poll is a full
/// two-byte transaction on the bus, so this is far above any real device.
pub const PROGRAM_POLL_LIMIT: u32 = 10_000;

/// Size of the read-back buffer used by [`verify_range`]
const VERIFY_CHUNK_SIZE: usize = 4096;

/// Progress reporting for [`program_chip_with_progress`]
pub trait ProgramProgress {
    /// Called once before the first page with the number of bytes to program
    fn programming(&mut self, total_bytes: usize);

    /// Called after each page has been programmed and the chip is ready again
    fn page_done(&mut self, bytes_written: usize);
}

/// A no-op progress reporter
pub struct NoProgress;

impl ProgramProgress for NoProgress {
    fn programming(&mut self, _total_bytes: usize) {}
    fn page_done(&mut self, _bytes_written: usize) {}
}

/// Address width for `chip`, checked against what the master can send
fn address_width_for<M: SpiMaster + ?Sized>(
    master: &M,
    chip: &FlashChip,
) -> Result<AddressWidth> {
    let width = chip.address_width();
    if width == AddressWidth::FourByte && !master.features().contains(SpiFeatures::FOUR_BYTE_ADDR)
    {
        log::error!(
            "Chip size {} needs 4-byte addressing, which the programmer does not support",
            chip.total_size()
        );
        return Err(Error::AddressModeNotSupported);
    }
    Ok(width)
}

/// Read flash contents starting at `start` into `buf`
///
/// The read is split into transfers of at most [`READ_CHUNK_SIZE`] bytes.
pub fn read_range<M: SpiMaster + ?Sized>(
    master: &mut M,
    chip: &FlashChip,
    start: u32,
    buf: &mut [u8],
) -> Result<()> {
    if !chip.is_valid_range(start, buf.len()) {
        return Err(Error::AddressOutOfBounds);
    }
    let width = address_width_for(master, chip)?;

    protocol::read_chunked(master, start, buf, width, READ_CHUNK_SIZE)
}

/// Program the whole chip with `data`
///
/// See [`program_chip_with_progress`].
pub fn program_chip<M: SpiMaster + ?Sized>(
    master: &mut M,
    chip: &FlashChip,
    data: &[u8],
) -> Result<()> {
    program_chip_with_progress(master, chip, data, &mut NoProgress)
}

/// Program the whole chip with `data`, one page at a time
///
/// Pages are programmed in increasing address order. After each page the
/// status register is polled until the chip is no longer busy. The chip must
/// have been erased beforehand.
///
/// A failed page program aborts immediately with [`Error::WriteError`], or
/// with [`Error::BackendFault`] if the bus itself failed; pages already
/// written stay written. A chip that stays busy for more than
/// [`PROGRAM_POLL_LIMIT`] polls aborts with [`Error::Timeout`].
pub fn program_chip_with_progress<M: SpiMaster + ?Sized, P: ProgramProgress + ?Sized>(
    master: &mut M,
    chip: &FlashChip,
    data: &[u8],
    progress: &mut P,
) -> Result<()> {
    let total_size = chip.total_size();
    if data.len() < total_size {
        return Err(Error::BufferTooSmall);
    }

    let width = address_width_for(master, chip)?;
    log::debug!("total_size is {}", total_size);
    progress.programming(total_size);

    for offset in (0..total_size).step_by(PAGE_SIZE) {
        let len = PAGE_SIZE.min(total_size - offset);
        let page = &data[offset..offset + len];

        match protocol::program_bytes(master, offset as u32, page, width) {
            Ok(()) => {}
            Err(Error::BackendFault) => return Err(Error::BackendFault),
            Err(e) => {
                log::error!("program_chip: write fail at 0x{:06X}: {}", offset, e);
                return Err(Error::WriteError);
            }
        }

        protocol::wait_ready_polls(master, PROGRAM_POLL_LIMIT)?;
        progress.page_done(offset + len);
    }

    Ok(())
}

/// Compare flash contents starting at `start` with `expected`
pub fn verify_range<M: SpiMaster + ?Sized>(
    master: &mut M,
    chip: &FlashChip,
    start: u32,
    expected: &[u8],
) -> Result<()> {
    if !chip.is_valid_range(start, expected.len()) {
        return Err(Error::AddressOutOfBounds);
    }

    let mut buf = [0u8; VERIFY_CHUNK_SIZE];
    for (i, want) in expected.chunks(VERIFY_CHUNK_SIZE).enumerate() {
        let addr = start + (i * VERIFY_CHUNK_SIZE) as u32;
        let have = &mut buf[..want.len()];
        read_range(master, chip, addr, have)?;

        if let Some(pos) = have.iter().zip(want).position(|(a, b)| a != b) {
            log::error!(
                "verify: mismatch at 0x{:06X}: expected 0x{:02X}, found 0x{:02X}",
                addr as usize + pos,
                want[pos],
                have[pos]
            );
            return Err(Error::VerifyError);
        }
    }

    Ok(())
}

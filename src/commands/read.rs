//! Read command implementation

use spibang_core::chip::FlashChip;
use spibang_core::flash;
use spibang_core::programmer::SpiMaster;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use super::progress_bar;

/// Bytes read between progress bar updates
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Run the read command
///
/// Reads `length` bytes from `start` (defaults: the whole chip) into `output`.
pub fn run_read<M: SpiMaster + ?Sized>(
    master: &mut M,
    chip: &FlashChip,
    output: &Path,
    start: Option<u32>,
    length: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let start = start.unwrap_or(0);
    let length = match length {
        Some(len) => len as usize,
        None => chip.total_size().saturating_sub(start as usize),
    };
    if !chip.is_valid_range(start, length) {
        return Err(format!(
            "Range 0x{:08X}+0x{:X} exceeds chip size ({} bytes)",
            start,
            length,
            chip.total_size()
        )
        .into());
    }

    let data = read_flash_with_progress(master, chip, start, length)?;

    let mut file = File::create(output)?;
    file.write_all(&data)?;

    println!("Wrote {} bytes to {:?}", data.len(), output);

    Ok(())
}

/// Read a flash range with a progress bar
fn read_flash_with_progress<M: SpiMaster + ?Sized>(
    master: &mut M,
    chip: &FlashChip,
    start: u32,
    length: usize,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut data = vec![0u8; length];
    let pb = progress_bar(length as u64, "Reading");

    let mut done = 0usize;
    for chunk in data.chunks_mut(READ_CHUNK_SIZE) {
        if let Err(e) = flash::read_range(master, chip, start + done as u32, chunk) {
            pb.abandon_with_message("Read failed");
            return Err(e.into());
        }
        done += chunk.len();
        pb.set_position(done as u64);
    }

    pb.finish_with_message("Read complete");
    Ok(data)
}

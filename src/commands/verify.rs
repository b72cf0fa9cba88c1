//! Verify command implementation

use spibang_core::chip::FlashChip;
use spibang_core::flash;
use spibang_core::programmer::SpiMaster;
use std::path::Path;

use super::{progress_bar, read_image};

/// Bytes compared between progress bar updates
const VERIFY_CHUNK_SIZE: usize = 4096;

/// Run the verify command
///
/// Compares the start of the chip against the contents of `input`.
pub fn run_verify<M: SpiMaster + ?Sized>(
    master: &mut M,
    chip: &FlashChip,
    input: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let expected = read_image(input, chip.total_size())?;
    verify_flash_with_progress(master, chip, &expected)?;
    println!("Verification passed");
    Ok(())
}

/// Verify flash contents against expected data with progress bar
pub fn verify_flash_with_progress<M: SpiMaster + ?Sized>(
    master: &mut M,
    chip: &FlashChip,
    expected: &[u8],
) -> Result<(), Box<dyn std::error::Error>> {
    let pb = progress_bar(expected.len() as u64, "Verifying");

    let mut offset = 0usize;
    for chunk in expected.chunks(VERIFY_CHUNK_SIZE) {
        if let Err(e) = flash::verify_range(master, chip, offset as u32, chunk) {
            pb.abandon_with_message("Verification failed!");
            return Err(e.into());
        }
        offset += chunk.len();
        pb.set_position(offset as u64);
    }

    pb.finish_with_message("Verification passed");
    Ok(())
}

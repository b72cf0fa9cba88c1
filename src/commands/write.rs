//! Write command implementation

use indicatif::ProgressBar;
use spibang_core::chip::FlashChip;
use spibang_core::flash::{self, ProgramProgress};
use spibang_core::programmer::SpiMaster;
use std::path::Path;

use super::erase::chip_erase_with_progress;
use super::verify::verify_flash_with_progress;
use super::{progress_bar, read_image};

/// Progress reporter using an indicatif progress bar
struct IndicatifProgress {
    bar: Option<ProgressBar>,
}

impl ProgramProgress for IndicatifProgress {
    fn programming(&mut self, total_bytes: usize) {
        self.bar = Some(progress_bar(total_bytes as u64, "Writing"));
    }

    fn page_done(&mut self, bytes_written: usize) {
        if let Some(pb) = &self.bar {
            pb.set_position(bytes_written as u64);
        }
    }
}

/// Run the write command
///
/// Images shorter than the chip are padded with 0xFF.
pub fn run_write<M: SpiMaster + ?Sized>(
    master: &mut M,
    chip: &FlashChip,
    input: &Path,
    do_verify: bool,
    no_erase: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut data = read_image(input, chip.total_size())?;

    if data.len() < chip.total_size() {
        println!(
            "Padding file from {} to {} bytes with 0xFF",
            data.len(),
            chip.total_size()
        );
        data.resize(chip.total_size(), 0xFF);
    }

    if !no_erase {
        chip_erase_with_progress(master)?;
    }

    let mut progress = IndicatifProgress { bar: None };
    let result = flash::program_chip_with_progress(master, chip, &data, &mut progress);
    if let Some(pb) = progress.bar.take() {
        if result.is_ok() {
            pb.finish_with_message("Write complete");
        } else {
            pb.abandon_with_message("Write failed");
        }
    }
    result?;

    if do_verify {
        verify_flash_with_progress(master, chip, &data)?;
    }

    println!("Write complete!");

    Ok(())
}

//! Erase command implementation

use spibang_core::programmer::SpiMaster;
use spibang_core::protocol;

use super::spinner;

/// Run the erase command
pub fn run_erase<M: SpiMaster + ?Sized>(master: &mut M) -> Result<(), Box<dyn std::error::Error>> {
    chip_erase_with_progress(master)?;
    println!("Chip erase complete");
    Ok(())
}

/// Erase entire chip with progress spinner
pub fn chip_erase_with_progress<M: SpiMaster + ?Sized>(
    master: &mut M,
) -> Result<(), Box<dyn std::error::Error>> {
    let pb = spinner("Erasing chip (this may take a while)...".to_string());

    if let Err(e) = protocol::chip_erase(master) {
        pb.abandon_with_message("Erase failed");
        return Err(e.into());
    }

    pb.finish_with_message("Erase complete");
    Ok(())
}

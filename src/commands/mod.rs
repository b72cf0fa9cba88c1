//! CLI command implementations
//!
//! Every command takes an opened [`SpiMaster`](spibang_core::programmer::SpiMaster)
//! and the declared chip geometry; the programmer is opened by the caller.

mod erase;
mod list;
mod read;
mod verify;
mod write;

pub use erase::run_erase;
pub use list::list_programmers;
pub use read::run_read;
pub use verify::run_verify;
pub use write::run_write;

use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// Byte-count progress bar with a trailing phase label
fn progress_bar(total: u64, phase: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{bytes}}/{{total_bytes}} ({{bytes_per_sec}}, {{eta}}) {}",
                phase
            ))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

/// Spinner for operations without byte progress
fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Read an image file that must fit into `chip_size` bytes
fn read_image(input: &Path, chip_size: usize) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut file = File::open(input)?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;

    println!("Read {} bytes from {:?}", data.len(), input);

    if data.len() > chip_size {
        return Err(format!(
            "File size ({} bytes) exceeds chip size ({} bytes)",
            data.len(),
            chip_size
        )
        .into());
    }
    Ok(data)
}

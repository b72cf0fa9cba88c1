//! spibang-linux-gpio - Linux GPIO bitbang backend
//!
//! This crate drives an SPI flash chip from four regular GPIO lines using the
//! Linux character device GPIO interface (gpiocdev). It provides the signal
//! layer only; clocking, framing and the flash routines come from
//! `spibang-core`.
//!
//! # Example
//!
//! ```no_run
//! use spibang_linux_gpio::{LinuxGpioBackend, LinuxGpioConfig};
//! use spibang_core::programmer::BitbangSpi;
//! use spibang_core::spi::opcodes;
//!
//! // Configure GPIO pins for SPI
//! let config = LinuxGpioConfig::new("/dev/gpiochip0", 25, 11, 10, 9);
//! //                                device          CS  SCK MOSI MISO
//!
//! let backend = LinuxGpioBackend::open(&config)?;
//! let mut spi = BitbangSpi::new(backend, config.bitbang_config())?;
//!
//! // Read JEDEC ID
//! let mut id = [0u8; 3];
//! spi.send_command(&[opcodes::RDID], &mut id)?;
//! println!("JEDEC ID: {:02X} {:02X} {:02X}", id[0], id[1], id[2]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Usage with the spibang CLI
//!
//! ```bash
//! # GPIO chip device path and pin numbers
//! spibang read -p linux_gpio_spi:dev=/dev/gpiochip0,cs=25,sck=11,mosi=10,miso=9 --size 4096 -o flash.bin
//!
//! # gpiochip number and a slower clock (kHz, approximate)
//! spibang read -p linux_gpio_spi:gpiochip=0,cs=25,sck=11,mosi=10,miso=9,spispeed=50 --size 4096 -o flash.bin
//! ```
//!
//! # GPIO Pin Wiring
//!
//! | Flash Pin | GPIO Function | Description |
//! |-----------|---------------|-------------|
//! | CS#       | CS (output)   | Chip Select |
//! | CLK       | SCK (output)  | Serial Clock |
//! | DI        | MOSI (output) | Master Out Slave In |
//! | DO        | MISO (input)  | Master In Slave Out |
//! | WP#       | 3.3V          | Write Protect (tie high to disable) |
//! | HOLD#     | 3.3V          | Hold (tie high to disable) |
//!
//! Access to `/dev/gpiochipN` may require root or udev rules.

pub mod device;
pub mod error;

// Re-exports
pub use device::{parse_options, LinuxGpioBackend, LinuxGpioConfig, DEFAULT_HALF_PERIOD_US};
pub use error::{LinuxGpioError, Result};

use spibang_core::programmer::{BitbangSpi, SpiMaster};

/// Open the GPIO lines and return a boxed SpiMaster
///
/// This is a convenience function for use in the CLI programmer dispatch.
///
/// # Arguments
///
/// * `options` - Slice of (key, value) pairs from programmer string parsing
pub fn open_linux_gpio_spi(
    options: &[(&str, &str)],
) -> std::result::Result<Box<dyn SpiMaster + Send>, Box<dyn std::error::Error>> {
    let config = parse_options(options)?;
    let backend = LinuxGpioBackend::open(&config)?;
    let spi = BitbangSpi::new(backend, config.bitbang_config())?;
    Ok(Box::new(spi))
}

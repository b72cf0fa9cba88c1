//! spibang-core - Bit-banged SPI master and flash programming core
//!
//! This crate provides a software SPI controller that drives chip-select,
//! clock and data lines through a pluggable GPIO backend, plus the SPI25
//! command layer and the flash read/program routines built on top of it.
//! It is `no_std` compatible; the bus master itself needs `alloc` for its
//! scratch buffers.
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc`)
//! - `alloc` - Enable the bitbang bus master (enabled by default)
//!
//! # Example
//!
//! ```ignore
//! use spibang_core::chip::FlashChip;
//! use spibang_core::flash;
//! use spibang_core::programmer::{BitbangConfig, BitbangSpi};
//!
//! fn dump<B: spibang_core::programmer::BitbangBackend>(backend: B) -> spibang_core::Result<()> {
//!     let mut spi = BitbangSpi::new(backend, BitbangConfig::default())?;
//!     let chip = FlashChip::new(1024 * 1024);
//!     let mut buf = [0u8; 4096];
//!     flash::read_range(&mut spi, &chip, 0, &mut buf)
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod chip;
pub mod error;
pub mod flash;
pub mod programmer;
pub mod protocol;
pub mod spi;

pub use error::{Error, Result};

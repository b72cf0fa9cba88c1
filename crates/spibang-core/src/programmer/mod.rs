//! Programmer traits and the bitbang bus master
//!
//! [`SpiMaster`] is the transport the flash routines run against;
//! [`BitbangSpi`] implements it in software on top of a [`BitbangBackend`].

#[cfg(feature = "alloc")]
pub mod bitbang;
#[cfg(all(test, feature = "alloc"))]
pub(crate) mod mock;
mod traits;

#[cfg(feature = "alloc")]
pub use bitbang::{BitbangBackend, BitbangConfig, BitbangSpi, MAX_TRANSFER_LEN};
pub use traits::*;

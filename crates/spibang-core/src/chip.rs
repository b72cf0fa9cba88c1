//! Flash chip description
//!
//! The bitbang programmer does not identify chips; the caller declares the
//! capacity of the attached part and everything else is derived from it.

use crate::spi::AddressWidth;

/// Page size used for programming, in bytes
pub const PAGE_SIZE: usize = 256;

/// Declared geometry of the attached flash chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashChip {
    /// Total size in bytes
    pub total_size: u32,
}

impl FlashChip {
    /// Create a chip description from a size in bytes
    pub const fn new(total_size: u32) -> Self {
        Self { total_size }
    }

    /// Create a chip description from a size in KiB
    ///
    /// Returns `None` if the size in bytes does not fit in 32 bits.
    pub const fn from_kib(kib: u32) -> Option<Self> {
        match kib.checked_mul(1024) {
            Some(bytes) => Some(Self::new(bytes)),
            None => None,
        }
    }

    /// Get the total size of this chip in bytes
    pub fn total_size(&self) -> usize {
        self.total_size as usize
    }

    /// Address width needed to reach the whole chip
    pub fn address_width(&self) -> AddressWidth {
        AddressWidth::for_size(self.total_size)
    }

    /// Check if an address range is valid for this chip
    pub fn is_valid_range(&self, addr: u32, len: usize) -> bool {
        let end = addr as u64 + len as u64;
        end <= self.total_size as u64
    }
}

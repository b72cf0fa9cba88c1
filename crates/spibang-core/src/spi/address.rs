//! Address width types

/// Address width for SPI commands
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AddressWidth {
    /// No address phase
    #[default]
    None,
    /// 3-byte (24-bit) address - supports up to 16 MiB
    ThreeByte,
    /// 4-byte (32-bit) address - supports up to 4 GiB
    FourByte,
}

impl AddressWidth {
    /// Returns the number of address bytes
    pub const fn bytes(&self) -> usize {
        match self {
            Self::None => 0,
            Self::ThreeByte => 3,
            Self::FourByte => 4,
        }
    }

    /// Smallest address width able to reach every byte of a chip
    pub const fn for_size(total_size: u32) -> Self {
        if total_size > 16 * 1024 * 1024 {
            Self::FourByte
        } else {
            Self::ThreeByte
        }
    }

    /// Encode an address into bytes, most significant byte first
    pub fn encode(&self, address: u32, buf: &mut [u8]) {
        let be = address.to_be_bytes();
        match self {
            Self::None => {}
            Self::ThreeByte => buf[..3].copy_from_slice(&be[1..]),
            Self::FourByte => buf[..4].copy_from_slice(&be),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        let mut buf = [0u8; 4];
        AddressWidth::ThreeByte.encode(0x12_3456, &mut buf);
        assert_eq!(&buf[..3], &[0x12, 0x34, 0x56]);

        AddressWidth::FourByte.encode(0x0123_4567, &mut buf);
        assert_eq!(buf, [0x01, 0x23, 0x45, 0x67]);
    }

    #[test]
    fn test_for_size() {
        assert_eq!(AddressWidth::for_size(1024), AddressWidth::ThreeByte);
        assert_eq!(AddressWidth::for_size(16 * 1024 * 1024), AddressWidth::ThreeByte);
        assert_eq!(AddressWidth::for_size(32 * 1024 * 1024), AddressWidth::FourByte);
    }
}

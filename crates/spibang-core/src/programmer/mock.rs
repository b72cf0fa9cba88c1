//! Command-level mock programmer for unit tests

use alloc::vec::Vec;

use super::{SpiFeatures, SpiMaster};
use crate::error::{Error, Result};
use crate::spi::{opcodes, SpiCommand};

/// One executed command as seen on the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub opcode: u8,
    pub address: Option<u32>,
    pub header_len: usize,
    pub write_len: usize,
    pub read_len: usize,
}

impl Transaction {
    pub fn total_len(&self) -> usize {
        self.header_len + self.write_len + self.read_len
    }
}

/// Mock SPI master emulating just enough of a flash chip
///
/// Reads return the low byte of the address of every byte, the status
/// register reports busy for `busy_polls` reads after each program or erase,
/// and program command number `fail_program_at` (0-based) fails with
/// `program_error`.
pub struct MockMaster {
    pub log: Vec<Transaction>,
    pub features: SpiFeatures,
    pub max_read_len: usize,
    pub max_write_len: usize,
    pub busy_polls: usize,
    pub fail_program_at: Option<usize>,
    pub program_error: Error,
    busy_remaining: usize,
    programs: usize,
}

impl MockMaster {
    pub fn new() -> Self {
        Self {
            log: Vec::new(),
            features: SpiFeatures::FOUR_BYTE_ADDR,
            max_read_len: 64 * 1024,
            max_write_len: 64 * 1024,
            busy_polls: 0,
            fail_program_at: None,
            program_error: Error::BackendFault,
            busy_remaining: 0,
            programs: 0,
        }
    }

    pub fn opcodes(&self) -> Vec<u8> {
        self.log.iter().map(|t| t.opcode).collect()
    }

    pub fn with_opcode(&self, opcode: u8) -> Vec<&Transaction> {
        self.log.iter().filter(|t| t.opcode == opcode).collect()
    }
}

impl SpiMaster for MockMaster {
    fn features(&self) -> SpiFeatures {
        self.features
    }

    fn max_read_len(&self) -> usize {
        self.max_read_len
    }

    fn max_write_len(&self) -> usize {
        self.max_write_len
    }

    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
        self.log.push(Transaction {
            opcode: cmd.opcode,
            address: cmd.address,
            header_len: cmd.header_len(),
            write_len: cmd.write_data.len(),
            read_len: cmd.read_buf.len(),
        });

        match cmd.opcode {
            opcodes::RDSR => {
                let busy = self.busy_remaining > 0;
                if busy {
                    self.busy_remaining -= 1;
                }
                cmd.read_buf[0] = if busy { opcodes::SR1_WIP } else { 0 };
            }
            opcodes::READ | opcodes::READ_4B => {
                let base = cmd.address.unwrap_or(0);
                for (i, byte) in cmd.read_buf.iter_mut().enumerate() {
                    *byte = base.wrapping_add(i as u32) as u8;
                }
            }
            opcodes::PP | opcodes::PP_4B => {
                let index = self.programs;
                self.programs += 1;
                if self.fail_program_at == Some(index) {
                    return Err(self.program_error);
                }
                self.busy_remaining = self.busy_polls;
            }
            opcodes::CE_C7 | opcodes::CE_60 => {
                self.busy_remaining = self.busy_polls;
            }
            _ => {}
        }
        Ok(())
    }

    fn delay_us(&mut self, _us: u32) {}
}

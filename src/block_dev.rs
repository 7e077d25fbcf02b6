use alloc::vec;
use alloc::vec::Vec;

use crate::error::{FsError, Result};

pub trait BlockDevice {
    /// Returns the number of blocks in the block device.
    fn num_blocks(&self) -> usize;

    /// Returns the size of each block in bytes.
    fn block_size(&self) -> usize;

    /// Reads a block of data from the block device.
    /// buf.len() must be equal to block_size().
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<()>;

    /// Writes a block of data to the block device.
    /// buf.len() must be equal to block_size().
    fn write_block(&mut self, block_id: usize, buf: &[u8]) -> Result<()>;
}

/// Zero-initialized block device backed by one contiguous buffer.
#[derive(Debug, Clone)]
pub struct MemDisk {
    data: Vec<u8>,
    block_size: usize,
    num_blocks: usize,
}

impl MemDisk {
    pub fn new(block_size: usize, num_blocks: usize) -> Self {
        Self {
            data: vec![0u8; block_size * num_blocks],
            block_size,
            num_blocks,
        }
    }

    fn range(&self, block_id: usize, len: usize) -> Result<core::ops::Range<usize>> {
        if block_id >= self.num_blocks {
            return Err(FsError::InvalidBlockId(block_id));
        }
        if len != self.block_size {
            return Err(FsError::InvalidArgument(alloc::format!(
                "buffer of {} bytes for block of {} bytes",
                len, self.block_size
            )));
        }
        let start = block_id * self.block_size;
        Ok(start..start + self.block_size)
    }
}

impl BlockDevice for MemDisk {
    fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<()> {
        let range = self.range(block_id, buf.len())?;
        buf.copy_from_slice(&self.data[range]);
        Ok(())
    }

    fn write_block(&mut self, block_id: usize, buf: &[u8]) -> Result<()> {
        let range = self.range(block_id, buf.len())?;
        self.data[range].copy_from_slice(buf);
        Ok(())
    }
}

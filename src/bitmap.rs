//! Block allocation.
//! The bitmap tracks which blocks of the device are owned by some descriptor,
//! the block store pairs it with the device and moves bytes in and out of single blocks.

use alloc::vec;
use alloc::vec::Vec;

use log::{debug, trace};

use crate::block_dev::BlockDevice;
use crate::error::{FsError, Result};

const BITS_PER_WORD: usize = 64;

#[derive(Debug, Clone)]
pub struct Bitmap {
    words: Vec<u64>,
    total_items: usize,
}

impl Bitmap {
    pub fn new(total_items: usize) -> Self {
        Self {
            words: vec![0; total_items.div_ceil(BITS_PER_WORD)],
            total_items,
        }
    }

    /// Sets the first clear bit.
    /// Returns the item ID of the bit that was set, or None when every bit is taken.
    pub fn set_first_fit_bit(&mut self) -> Option<usize> {
        for (i, word) in self.words.iter_mut().enumerate() {
            if *word == u64::MAX {
                continue;
            }
            let k = word.trailing_ones() as usize;
            let item_id = i * BITS_PER_WORD + k;
            if item_id >= self.total_items {
                return None;
            }
            *word |= 1 << k;
            return Some(item_id);
        }
        None
    }

    /// Sets a specific bit to `set_value`.
    /// Returns previously set value of the bit.
    pub fn set_bit_at(&mut self, item_id: usize, set_value: bool) -> Result<bool> {
        if item_id >= self.total_items {
            return Err(FsError::InvalidBlockId(item_id));
        }
        let word = &mut self.words[item_id / BITS_PER_WORD];
        let mask = 1u64 << (item_id % BITS_PER_WORD);
        let pre_value = *word & mask != 0;
        if set_value {
            *word |= mask;
        } else {
            *word &= !mask;
        }
        Ok(pre_value)
    }

    pub fn is_set(&self, item_id: usize) -> bool {
        item_id < self.total_items
            && self.words[item_id / BITS_PER_WORD] & (1 << (item_id % BITS_PER_WORD)) != 0
    }

    pub fn count_set(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn len(&self) -> usize {
        self.total_items
    }
}

/// Fixed pool of fixed-size blocks plus free/allocated tracking.
#[derive(Debug)]
pub struct BlockStore<D: BlockDevice> {
    device: D,
    bitmap: Bitmap,
    block_size: usize,
}

impl<D: BlockDevice> BlockStore<D> {
    pub fn new(device: D) -> Self {
        let bitmap = Bitmap::new(device.num_blocks());
        let block_size = device.block_size();
        Self { device, bitmap, block_size }
    }

    /// Forgets every allocation. Block contents are left as is,
    /// `alloc_block` zeroes a block before handing it out.
    pub fn reset(&mut self) {
        self.bitmap = Bitmap::new(self.device.num_blocks());
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn num_blocks(&self) -> usize {
        self.bitmap.len()
    }

    pub fn free_blocks(&self) -> usize {
        self.bitmap.len() - self.bitmap.count_set()
    }

    pub fn is_allocated(&self, block_id: usize) -> bool {
        self.bitmap.is_set(block_id)
    }

    /// Allocates a zero-filled block.
    pub fn alloc_block(&mut self) -> Result<usize> {
        let block_id = self.bitmap.set_first_fit_bit().ok_or(FsError::NoFreeBlocks)?;
        let zero_block = vec![0u8; self.block_size];
        self.device.write_block(block_id, &zero_block)?;
        trace!("[block_store] allocated block {}", block_id);
        Ok(block_id)
    }

    /// Returns a block to the free set. Freeing a block twice is an error.
    pub fn free_block(&mut self, block_id: usize) -> Result<()> {
        if !self.bitmap.set_bit_at(block_id, false)? {
            return Err(FsError::BlockNotAllocated(block_id));
        }
        trace!("[block_store] freed block {}", block_id);
        Ok(())
    }

    /// Copies `buf.len()` bytes starting at `offset` inside the block into `buf`.
    pub fn read(&self, block_id: usize, offset: usize, buf: &mut [u8]) -> Result<()> {
        self.check_span(block_id, offset, buf.len())?;
        let mut block_buf = vec![0u8; self.block_size];
        self.device.read_block(block_id, &mut block_buf)?;
        buf.copy_from_slice(&block_buf[offset..offset + buf.len()]);
        Ok(())
    }

    /// Copies `bytes` into the block starting at `offset`, leaving the rest of it untouched.
    pub fn write(&mut self, block_id: usize, offset: usize, bytes: &[u8]) -> Result<()> {
        self.check_span(block_id, offset, bytes.len())?;
        let mut block_buf = vec![0u8; self.block_size];
        self.device.read_block(block_id, &mut block_buf)?;
        block_buf[offset..offset + bytes.len()].copy_from_slice(bytes);
        self.device.write_block(block_id, &block_buf)
    }

    fn check_span(&self, block_id: usize, offset: usize, len: usize) -> Result<()> {
        if !self.bitmap.is_set(block_id) {
            debug!("[block_store] access to unallocated block {}", block_id);
            return Err(FsError::BlockNotAllocated(block_id));
        }
        if offset + len > self.block_size {
            return Err(FsError::InvalidArgument(alloc::format!(
                "span {}..{} exceeds block of {} bytes",
                offset,
                offset + len,
                self.block_size
            )));
        }
        Ok(())
    }
}

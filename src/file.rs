//! Open-file handles and byte-level transfer between descriptors and blocks.

use alloc::vec;
use alloc::vec::Vec;

use log::trace;

use crate::bitmap::BlockStore;
use crate::block_dev::BlockDevice;
use crate::error::{FsError, Result};
use crate::inode::Descriptor;
use crate::structs::Slot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFile {
    pub desc_id: usize,
    pub cursor: u64,
}

#[derive(Debug, Default)]
pub struct OpenFileTable {
    slots: Vec<Slot<OpenFile>>,
}

impl OpenFileTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out the lowest free handle, growing the table only when none is free.
    pub fn open(&mut self, desc_id: usize) -> usize {
        let file = Slot::Occupied(OpenFile { desc_id, cursor: 0 });
        match self.slots.iter().position(Slot::is_empty) {
            Some(handle) => {
                self.slots[handle] = file;
                handle
            }
            None => {
                self.slots.push(file);
                self.slots.len() - 1
            }
        }
    }

    pub fn close(&mut self, handle: usize) -> Result<OpenFile> {
        self.slots
            .get_mut(handle)
            .and_then(Slot::take)
            .ok_or(FsError::InvalidDescriptor(handle))
    }

    pub fn get(&self, handle: usize) -> Result<&OpenFile> {
        self.slots
            .get(handle)
            .and_then(Slot::as_ref)
            .ok_or(FsError::InvalidDescriptor(handle))
    }

    pub fn get_mut(&mut self, handle: usize) -> Result<&mut OpenFile> {
        self.slots
            .get_mut(handle)
            .and_then(Slot::as_mut)
            .ok_or(FsError::InvalidDescriptor(handle))
    }

    pub fn live(&self) -> usize {
        self.slots.iter().filter(|s| !s.is_empty()).count()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

/// Reads up to `len` bytes starting at `offset`, stopping at the logical size.
/// Holes read as zeros.
pub fn fread<D: BlockDevice>(
    store: &BlockStore<D>,
    desc: &Descriptor,
    offset: u64,
    len: usize,
) -> Result<Vec<u8>> {
    if offset >= desc.size {
        return Ok(Vec::new());
    }
    let block_size = store.block_size() as u64;
    let end = desc.size.min(offset.saturating_add(len as u64));
    let mut buffer = vec![0u8; (end - offset) as usize];

    let mut current_offset = offset;
    while current_offset < end {
        let block_index = (current_offset / block_size) as usize;
        let start_offset = (current_offset % block_size) as usize;
        let bytes_to_read = (block_size - start_offset as u64).min(end - current_offset) as usize;
        let done = (current_offset - offset) as usize;
        if let Some(Some(block_id)) = desc.block_map.get(block_index) {
            store.read(*block_id, start_offset, &mut buffer[done..done + bytes_to_read])?;
        }
        current_offset += bytes_to_read as u64;
    }

    Ok(buffer)
}

/// Writes `buffer` at `offset`, allocating blocks only where bytes land.
/// Skipped-over ranges stay holes.
///
/// When the store runs dry midway the bytes already copied stay written and the
/// size grows to cover them before the error is returned. A write that copied
/// nothing leaves the size alone.
pub fn fwrite<D: BlockDevice>(
    store: &mut BlockStore<D>,
    desc: &mut Descriptor,
    offset: u64,
    buffer: &[u8],
    max_size: u64,
) -> Result<usize> {
    if buffer.is_empty() {
        return Ok(0);
    }
    let end = offset + buffer.len() as u64;
    if end > max_size {
        return Err(FsError::FileTooLarge(end));
    }
    let block_size = store.block_size();

    let mut current_offset = offset;
    while current_offset < end {
        let block_index = (current_offset / block_size as u64) as usize;
        let start_offset = (current_offset % block_size as u64) as usize;
        let bytes_to_write = (block_size - start_offset).min((end - current_offset) as usize);
        if desc.block_map.len() <= block_index {
            desc.block_map.resize(block_index + 1, None);
        }
        let block_id = match desc.block_map[block_index] {
            Some(block_id) => block_id,
            None => match store.alloc_block() {
                Ok(block_id) => {
                    desc.block_map[block_index] = Some(block_id);
                    block_id
                }
                Err(e) => {
                    if current_offset > offset {
                        desc.size = desc.size.max(current_offset);
                    }
                    desc.fit_block_map(block_size);
                    return Err(e);
                }
            },
        };
        let done = (current_offset - offset) as usize;
        store.write(block_id, start_offset, &buffer[done..done + bytes_to_write])?;
        trace!("[fwrite] {} bytes into block {} at {}", bytes_to_write, block_id, start_offset);
        current_offset += bytes_to_write as u64;
    }

    desc.size = desc.size.max(end);
    desc.fit_block_map(block_size);
    Ok(buffer.len())
}

/// Sets the logical size. Shrinking frees every block past `ceil(new_size / block_size)`
/// and zeroes the cut-off tail of the last kept block, growing leaves a hole.
pub fn ftruncate<D: BlockDevice>(
    store: &mut BlockStore<D>,
    desc: &mut Descriptor,
    new_size: u64,
) -> Result<()> {
    let block_size = store.block_size();
    if new_size < desc.size {
        let keep = new_size.div_ceil(block_size as u64) as usize;
        for block_id in desc.block_map.drain(keep..).flatten() {
            store.free_block(block_id)?;
        }
        let tail = (new_size % block_size as u64) as usize;
        if tail != 0 {
            if let Some(Some(block_id)) = desc.block_map.last() {
                store.write(*block_id, tail, &vec![0u8; block_size - tail])?;
            }
        }
    }
    desc.size = new_size;
    desc.fit_block_map(block_size);
    Ok(())
}

//! Descriptors (the inode analogue) and the slot table that owns them.

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use log::debug;

use crate::bitmap::BlockStore;
use crate::block_dev::BlockDevice;
use crate::config::*;
use crate::error::{FsError, Result};
use crate::structs::{DirEntry, FileType, Slot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contents {
    /// Data lives in the blocks of the block map.
    Regular,
    Directory(Vec<DirEntry>),
    Symlink(String),
}

#[derive(Debug, Clone)]
pub struct Descriptor {
    pub id: usize,
    pub links_cnt: u32,
    pub open_cnt: u32,
    pub size: u64,
    /// Entry `i` backs bytes `i * block_size..(i + 1) * block_size`, `None` is a hole.
    /// Always `ceil(size / block_size)` entries long for regular files.
    pub block_map: Vec<Option<usize>>,
    pub contents: Contents,
}

impl Descriptor {
    pub fn ftype(&self) -> FileType {
        match self.contents {
            Contents::Regular => FileType::Regular,
            Contents::Directory(_) => FileType::Directory,
            Contents::Symlink(_) => FileType::Symlink,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.contents, Contents::Directory(_))
    }

    pub fn entries(&self) -> Option<&Vec<DirEntry>> {
        match &self.contents {
            Contents::Directory(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn entries_mut(&mut self) -> Option<&mut Vec<DirEntry>> {
        match &mut self.contents {
            Contents::Directory(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn target(&self) -> Option<&str> {
        match &self.contents {
            Contents::Symlink(target) => Some(target),
            _ => None,
        }
    }

    /// Number of allocated blocks, holes excluded.
    pub fn blocks(&self) -> usize {
        self.block_map.iter().filter(|b| b.is_some()).count()
    }

    /// Resizes the block map to cover exactly `size` bytes.
    /// Only ever drops trailing holes, callers free dropped blocks beforehand.
    pub(crate) fn fit_block_map(&mut self, block_size: usize) {
        let needed = self.size.div_ceil(block_size as u64) as usize;
        debug_assert!(self.block_map[needed.min(self.block_map.len())..].iter().all(Option::is_none));
        self.block_map.resize(needed, None);
    }

    pub(crate) fn is_unreferenced(&self) -> bool {
        self.links_cnt == 0 && self.open_cnt == 0
    }
}

/// What `DescriptorTable::allocate` should install.
#[derive(Debug, Clone, Copy)]
pub enum NewDescriptor<'a> {
    Regular,
    Directory { parent: usize },
    Symlink { target: &'a str },
}

#[derive(Debug)]
pub struct DescriptorTable {
    slots: Vec<Slot<Descriptor>>,
}

impl DescriptorTable {
    /// Creates a table with `num_descriptors` free slots after the root directory in slot 0.
    pub fn with_root(num_descriptors: usize) -> Self {
        let mut slots = vec![Slot::Empty; num_descriptors + 1];
        slots[ROOT_DESC_ID] = Slot::Occupied(Descriptor {
            id: ROOT_DESC_ID,
            links_cnt: 2, // '.' and '..' both point back to root
            open_cnt: 0,
            size: 0,
            block_map: Vec::new(),
            contents: Contents::Directory(vec![
                DirEntry::new(DOT_NAME, ROOT_DESC_ID),
                DirEntry::new(DOTDOT_NAME, ROOT_DESC_ID),
            ]),
        });
        Self { slots }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn free_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.is_empty()).count()
    }

    /// Installs a new descriptor in the lowest tombstoned slot.
    /// Directories start with '.' and '..' and two links, everything else with one.
    pub fn allocate(&mut self, kind: NewDescriptor<'_>) -> Result<usize> {
        let id = self
            .slots
            .iter()
            .position(Slot::is_empty)
            .ok_or(FsError::NoFreeDescriptors)?;
        let (links_cnt, size, contents) = match kind {
            NewDescriptor::Regular => (1, 0, Contents::Regular),
            NewDescriptor::Directory { parent } => (
                2,
                0,
                Contents::Directory(vec![
                    DirEntry::new(DOT_NAME, id),
                    DirEntry::new(DOTDOT_NAME, parent),
                ]),
            ),
            NewDescriptor::Symlink { target } => {
                (1, target.len() as u64, Contents::Symlink(target.into()))
            }
        };
        self.slots[id] = Slot::Occupied(Descriptor {
            id,
            links_cnt,
            open_cnt: 0,
            size,
            block_map: Vec::new(),
            contents,
        });
        debug!("[descriptors] allocated slot {} ({:?})", id, kind);
        Ok(id)
    }

    /// Tombstones the slot and returns its blocks to the store.
    pub fn reclaim<D: BlockDevice>(&mut self, id: usize, store: &mut BlockStore<D>) -> Result<()> {
        let desc = self
            .slots
            .get_mut(id)
            .and_then(Slot::take)
            .ok_or_else(|| FsError::NotFound(alloc::format!("descriptor {}", id)))?;
        for block_id in desc.block_map.into_iter().flatten() {
            store.free_block(block_id)?;
        }
        debug!("[descriptors] reclaimed slot {}", id);
        Ok(())
    }

    pub fn get(&self, id: usize) -> Result<&Descriptor> {
        self.slots
            .get(id)
            .and_then(Slot::as_ref)
            .ok_or_else(|| FsError::NotFound(alloc::format!("descriptor {}", id)))
    }

    pub fn get_mut(&mut self, id: usize) -> Result<&mut Descriptor> {
        self.slots
            .get_mut(id)
            .and_then(Slot::as_mut)
            .ok_or_else(|| FsError::NotFound(alloc::format!("descriptor {}", id)))
    }
}

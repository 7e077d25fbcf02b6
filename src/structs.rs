use alloc::string::String;
use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Regular,
    Directory,
    Symlink,
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FileType::Regular => "reg",
            FileType::Directory => "dir",
            FileType::Symlink => "sym",
        };
        f.write_str(s)
    }
}

/// A table slot: either tombstoned or holding exactly one value.
#[derive(Debug, Clone)]
pub enum Slot<T> {
    Empty,
    Occupied(T),
}

impl<T> Slot<T> {
    pub fn is_empty(&self) -> bool {
        matches!(self, Slot::Empty)
    }

    pub fn as_ref(&self) -> Option<&T> {
        match self {
            Slot::Occupied(v) => Some(v),
            Slot::Empty => None,
        }
    }

    pub fn as_mut(&mut self) -> Option<&mut T> {
        match self {
            Slot::Occupied(v) => Some(v),
            Slot::Empty => None,
        }
    }

    /// Tombstones the slot, returning what it held.
    pub fn take(&mut self) -> Option<T> {
        match core::mem::replace(self, Slot::Empty) {
            Slot::Occupied(v) => Some(v),
            Slot::Empty => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub desc_id: usize,
}

impl DirEntry {
    pub fn new(name: &str, desc_id: usize) -> Self {
        Self {
            name: name.into(),
            desc_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat {
    pub id: usize,
    pub ftype: FileType,
    pub links_cnt: u32,
    pub size: u64,
    pub blocks: usize,
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id={} type={} nlink={} size={} nblock={}",
            self.id, self.ftype, self.links_cnt, self.size, self.blocks
        )
    }
}

/// One line of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirListing {
    pub name: String,
    pub ftype: FileType,
    pub id: usize,
    pub target: Option<String>,
}

impl fmt::Display for DirListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.name, self.ftype, self.id)?;
        if let Some(target) = &self.target {
            write!(f, " -> {}", target)?;
        }
        Ok(())
    }
}

//! A single exclusive lock around the whole engine.
//! Every operation runs end to end under it, so no two callers ever interleave
//! block allocation or writes to the same descriptor.

use alloc::sync::Arc;

use spin::Mutex;

use crate::block_dev::{BlockDevice, MemDisk};
use crate::fs::FileSystem;

pub type SharedFileSystem<D = MemDisk> = Arc<Mutex<FileSystem<D>>>;

impl<D: BlockDevice> FileSystem<D> {
    pub fn into_shared(self) -> SharedFileSystem<D> {
        Arc::new(Mutex::new(self))
    }
}

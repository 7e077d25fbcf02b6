//! Memfs is a self-contained, in-memory Unix-style file system.
//! No support for permissions, timestamps, persistence or journaling.
//!
//! Memfs's layers (from bottom to top):
//! 1. Block Device: fixed pool of fixed-size blocks.              | `MemDisk`, or user implemented
//! 2. Block Store: bitmap allocator over the device.              | Fs implemented
//! 3. Descriptor: inode analogue, slot table with tombstones.     | Fs implemented
//! 4. Directory/Path: entries, path walking, symlink chasing.     | Fs implemented
//! 5. File: open-file handles, cursors, block-level transfer.     | Fs implemented
//! 6. FileSystem: the engine users drive, one owner at a time.    | Wrap in `SharedFileSystem` to share
//!
//! Every operation reports a status line through the `log` facade, install any logger to see them.

extern crate alloc;

mod config;
mod block_dev;
mod structs;
mod bitmap;
mod inode;
mod directory;
mod path;
mod file;
mod fs;
mod sync;
mod error;

pub use block_dev::{BlockDevice, MemDisk};
pub use config::*;
pub use structs::*;
pub use bitmap::{Bitmap, BlockStore};
pub use inode::{Contents, Descriptor, DescriptorTable, NewDescriptor};
pub use path::{split, Located, Resolver};
pub use file::{OpenFile, OpenFileTable};
pub use fs::*;
pub use sync::SharedFileSystem;
pub use error::FsError as Error;
pub use error::Result;

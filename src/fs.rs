//! The engine: every public file system operation, run against one owned state.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt::Display;

use log::{info, warn};

use crate::bitmap::BlockStore;
use crate::block_dev::{BlockDevice, MemDisk};
use crate::config::*;
use crate::directory::{check_name, dir_add_entry, dir_is_empty, dir_lookup, dir_name_of, dir_rm_entry, is_dot_or_dotdot};
use crate::error::{FsError, Result};
use crate::file::{fread, ftruncate, fwrite, OpenFileTable};
use crate::inode::{DescriptorTable, NewDescriptor};
use crate::path::{Located, Resolver};
use crate::structs::{DirEntry, DirListing, FileType, Stat};

/// Logs a failed operation and hands the result back untouched.
fn report<T>(op: &str, target: impl Display, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        warn!("{} {}: {}", op, target, e);
    }
    result
}

#[derive(Debug)]
pub struct FileSystem<D: BlockDevice = MemDisk> {
    config: FsConfig,
    store: BlockStore<D>,
    descriptors: DescriptorTable,
    open_files: OpenFileTable,
    cwd: usize,
}

impl FileSystem<MemDisk> {
    /// Builds an in-memory engine and runs `mkfs(num_descriptors)` on it.
    pub fn format(config: FsConfig, num_descriptors: usize) -> Result<Self> {
        config.validate()?;
        let device = MemDisk::new(config.block_size, config.num_blocks);
        Self::format_device(device, config, num_descriptors)
    }
}

impl<D: BlockDevice> FileSystem<D> {
    /// Builds an engine over `device`, whose geometry must match `config`.
    pub fn format_device(device: D, config: FsConfig, num_descriptors: usize) -> Result<Self> {
        config.validate()?;
        if device.block_size() != config.block_size || device.num_blocks() != config.num_blocks {
            return Err(FsError::InvalidArgument(alloc::format!(
                "device has {} blocks of {} bytes, config wants {} of {}",
                device.num_blocks(),
                device.block_size(),
                config.num_blocks,
                config.block_size
            )));
        }
        let mut fs = Self {
            config,
            store: BlockStore::new(device),
            descriptors: DescriptorTable::with_root(0),
            open_files: OpenFileTable::new(),
            cwd: ROOT_DESC_ID,
        };
        fs.mkfs(num_descriptors);
        Ok(fs)
    }

    // Following methods directly operate on the fs instance, wrap a lock around it if needed.

    /// Drops every descriptor, block and handle, then recreates the root directory
    /// with room for `num_descriptors` more descriptors.
    pub fn mkfs(&mut self, num_descriptors: usize) {
        self.descriptors = DescriptorTable::with_root(num_descriptors);
        self.store.reset();
        self.open_files.clear();
        self.cwd = ROOT_DESC_ID;
        info!(
            "mkfs: {} descriptors, {} blocks of {} bytes",
            num_descriptors, self.config.num_blocks, self.config.block_size
        );
    }

    pub fn mkdir(&mut self, path: &str) -> Result<usize> {
        report("mkdir", path, self.do_mkdir(path))
    }

    fn do_mkdir(&mut self, path: &str) -> Result<usize> {
        let Located { parent, name, desc_id } = self.locate(path, false)?;
        if desc_id.is_some() {
            return Err(FsError::AlreadyExists(path.into()));
        }
        check_name(&name)?;
        let id = self.descriptors.allocate(NewDescriptor::Directory { parent })?;
        let parent_desc = self.descriptors.get_mut(parent)?;
        dir_add_entry(entries_of(parent_desc.entries_mut(), path)?, &name, id)?;
        parent_desc.links_cnt += 1; // the new '..'
        info!("mkdir: '{}' -> descriptor {}", path, id);
        Ok(id)
    }

    pub fn rmdir(&mut self, path: &str) -> Result<()> {
        report("rmdir", path, self.do_rmdir(path))
    }

    fn do_rmdir(&mut self, path: &str) -> Result<()> {
        let Located { parent, name, desc_id } = self.locate(path, false)?;
        let id = desc_id.ok_or_else(|| FsError::NotFound(path.into()))?;
        if id == ROOT_DESC_ID || is_dot_or_dotdot(&name) {
            return Err(FsError::InvalidArgument(alloc::format!("cannot remove '{}'", path)));
        }
        let desc = self.descriptors.get(id)?;
        let entries = desc.entries().ok_or_else(|| FsError::NotADirectory(path.into()))?;
        if !dir_is_empty(entries) {
            return Err(FsError::NotEmpty(path.into()));
        }

        let parent_desc = self.descriptors.get_mut(parent)?;
        dir_rm_entry(entries_of(parent_desc.entries_mut(), path)?, &name)?;
        parent_desc.links_cnt -= 1;
        // Both the parent's entry and its own '.' are gone.
        self.descriptors.get_mut(id)?.links_cnt = 0;
        if self.cwd == id {
            warn!("rmdir: removed the working directory, falling back to '/'");
            self.cwd = ROOT_DESC_ID;
        }
        self.release_if_unreferenced(id)?;
        info!("rmdir: '{}'", path);
        Ok(())
    }

    pub fn create(&mut self, path: &str) -> Result<usize> {
        report("create", path, self.do_create(path))
    }

    fn do_create(&mut self, path: &str) -> Result<usize> {
        let Located { parent, name, desc_id } = self.locate(path, true)?;
        if desc_id.is_some() {
            return Err(FsError::AlreadyExists(path.into()));
        }
        check_name(&name)?;
        let id = self.descriptors.allocate(NewDescriptor::Regular)?;
        let parent_desc = self.descriptors.get_mut(parent)?;
        dir_add_entry(entries_of(parent_desc.entries_mut(), path)?, &name, id)?;
        info!("create: '{}' -> descriptor {}", path, id);
        Ok(id)
    }

    pub fn symlink(&mut self, target: &str, link_path: &str) -> Result<usize> {
        report("symlink", link_path, self.do_symlink(target, link_path))
    }

    fn do_symlink(&mut self, target: &str, link_path: &str) -> Result<usize> {
        if target.is_empty() {
            return Err(FsError::InvalidArgument("empty symlink target".into()));
        }
        let Located { parent, name, desc_id } = self.locate(link_path, false)?;
        if desc_id.is_some() {
            return Err(FsError::AlreadyExists(link_path.into()));
        }
        check_name(&name)?;
        let id = self.descriptors.allocate(NewDescriptor::Symlink { target })?;
        let parent_desc = self.descriptors.get_mut(parent)?;
        dir_add_entry(entries_of(parent_desc.entries_mut(), link_path)?, &name, id)?;
        info!("symlink: '{}' -> '{}' (descriptor {})", link_path, target, id);
        Ok(id)
    }

    pub fn cd(&mut self, path: &str) -> Result<()> {
        report("cd", path, self.do_cd(path))
    }

    fn do_cd(&mut self, path: &str) -> Result<()> {
        let id = self.lookup(path, true)?;
        if !self.descriptors.get(id)?.is_dir() {
            return Err(FsError::NotADirectory(path.into()));
        }
        self.cwd = id;
        info!("cd: '{}' (descriptor {})", path, id);
        Ok(())
    }

    /// Absolute path of the working directory.
    pub fn pwd(&self) -> Result<String> {
        let mut names = Vec::new();
        let mut cur = self.cwd;
        // Every step climbs one level, so the walk ends within the table's capacity.
        for _ in 0..self.descriptors.capacity() {
            if cur == ROOT_DESC_ID {
                break;
            }
            let parent = self
                .descriptors
                .get(cur)?
                .entries()
                .and_then(|entries| dir_lookup(entries, DOTDOT_NAME))
                .ok_or_else(|| FsError::NotFound(DOTDOT_NAME.into()))?;
            let name = self
                .descriptors
                .get(parent)?
                .entries()
                .and_then(|entries| dir_name_of(entries, cur))
                .ok_or_else(|| FsError::NotFound(alloc::format!("descriptor {}", cur)))?;
            names.push(name);
            cur = parent;
        }
        names.reverse();
        Ok(alloc::format!("/{}", names.join("/")))
    }

    pub fn open(&mut self, path: &str) -> Result<usize> {
        report("open", path, self.do_open(path))
    }

    fn do_open(&mut self, path: &str) -> Result<usize> {
        let id = self.lookup(path, true)?;
        self.descriptors.get_mut(id)?.open_cnt += 1;
        let handle = self.open_files.open(id);
        info!("open: '{}' -> fd {} (descriptor {})", path, handle, id);
        Ok(handle)
    }

    pub fn close(&mut self, handle: usize) -> Result<()> {
        report("close", handle, self.do_close(handle))
    }

    fn do_close(&mut self, handle: usize) -> Result<()> {
        let file = self.open_files.close(handle)?;
        self.descriptors.get_mut(file.desc_id)?.open_cnt -= 1;
        self.release_if_unreferenced(file.desc_id)?;
        info!("close: fd {}", handle);
        Ok(())
    }

    /// Moves the cursor. Seeking past the end is allowed, a later write extends the file.
    pub fn seek(&mut self, handle: usize, offset: i64) -> Result<()> {
        report("seek", handle, self.do_seek(handle, offset))
    }

    fn do_seek(&mut self, handle: usize, offset: i64) -> Result<()> {
        let file = self.open_files.get_mut(handle)?;
        let offset = u64::try_from(offset)
            .map_err(|_| FsError::InvalidArgument(alloc::format!("negative offset {}", offset)))?;
        file.cursor = offset;
        info!("seek: fd {} -> {}", handle, offset);
        Ok(())
    }

    pub fn read(&mut self, handle: usize, len: usize) -> Result<Vec<u8>> {
        report("read", handle, self.do_read(handle, len))
    }

    fn do_read(&mut self, handle: usize, len: usize) -> Result<Vec<u8>> {
        let file = self.open_files.get_mut(handle)?;
        let desc = self.descriptors.get(file.desc_id)?;
        if desc.ftype() != FileType::Regular {
            return Err(FsError::NotARegularFile(alloc::format!("fd {}", handle)));
        }
        let data = fread(&self.store, desc, file.cursor, len)?;
        file.cursor += data.len() as u64;
        info!("read: fd {} got {} of {} bytes, cursor {}", handle, data.len(), len, file.cursor);
        Ok(data)
    }

    pub fn write(&mut self, handle: usize, data: &[u8]) -> Result<usize> {
        report("write", handle, self.do_write(handle, data))
    }

    fn do_write(&mut self, handle: usize, data: &[u8]) -> Result<usize> {
        let file = self.open_files.get_mut(handle)?;
        let desc = self.descriptors.get_mut(file.desc_id)?;
        if desc.ftype() != FileType::Regular {
            return Err(FsError::NotARegularFile(alloc::format!("fd {}", handle)));
        }
        let written = fwrite(&mut self.store, desc, file.cursor, data, self.config.max_file_size())?;
        file.cursor += written as u64;
        info!(
            "write: fd {} put {} bytes, cursor {}, size {}, {} blocks",
            handle,
            written,
            file.cursor,
            desc.size,
            desc.blocks()
        );
        Ok(written)
    }

    /// Adds `new_path` as another name for the object at `old_path`.
    /// A symlink at `old_path` is linked itself, not its target.
    pub fn link(&mut self, old_path: &str, new_path: &str) -> Result<()> {
        report("link", old_path, self.do_link(old_path, new_path))
    }

    fn do_link(&mut self, old_path: &str, new_path: &str) -> Result<()> {
        let id = self.lookup(old_path, false)?;
        if self.descriptors.get(id)?.is_dir() {
            return Err(FsError::IsADirectory(old_path.into()));
        }
        let Located { parent, name, desc_id } = self.locate(new_path, false)?;
        if desc_id.is_some() {
            return Err(FsError::AlreadyExists(new_path.into()));
        }
        check_name(&name)?;
        let parent_desc = self.descriptors.get_mut(parent)?;
        dir_add_entry(entries_of(parent_desc.entries_mut(), new_path)?, &name, id)?;
        let desc = self.descriptors.get_mut(id)?;
        desc.links_cnt += 1;
        info!("link: '{}' -> '{}' (descriptor {}, nlink {})", new_path, old_path, id, desc.links_cnt);
        Ok(())
    }

    /// Removes a name. The object goes away once it has neither names nor open handles.
    pub fn unlink(&mut self, path: &str) -> Result<()> {
        report("unlink", path, self.do_unlink(path))
    }

    fn do_unlink(&mut self, path: &str) -> Result<()> {
        let Located { parent, name, desc_id } = self.locate(path, false)?;
        let id = desc_id.ok_or_else(|| FsError::NotFound(path.into()))?;
        if self.descriptors.get(id)?.is_dir() {
            return Err(FsError::CannotUnlinkDirectory(path.into()));
        }
        let parent_desc = self.descriptors.get_mut(parent)?;
        dir_rm_entry(entries_of(parent_desc.entries_mut(), path)?, &name)?;
        let desc = self.descriptors.get_mut(id)?;
        desc.links_cnt -= 1;
        let (links_cnt, open_cnt) = (desc.links_cnt, desc.open_cnt);
        let reclaimed = self.release_if_unreferenced(id)?;
        if links_cnt == 0 && !reclaimed {
            info!("unlink: '{}' (descriptor {} kept until {} handles close)", path, id, open_cnt);
        } else {
            info!("unlink: '{}' (descriptor {}, nlink {})", path, id, links_cnt);
        }
        Ok(())
    }

    pub fn truncate(&mut self, path: &str, size: i64) -> Result<()> {
        report("truncate", path, self.do_truncate(path, size))
    }

    fn do_truncate(&mut self, path: &str, size: i64) -> Result<()> {
        let size = u64::try_from(size)
            .map_err(|_| FsError::InvalidArgument(alloc::format!("negative size {}", size)))?;
        let id = self.lookup(path, true)?;
        let desc = self.descriptors.get_mut(id)?;
        if desc.ftype() != FileType::Regular {
            return Err(FsError::NotARegularFile(path.into()));
        }
        if size > self.config.max_file_size() {
            return Err(FsError::FileTooLarge(size));
        }
        ftruncate(&mut self.store, desc, size)?;
        info!("truncate: '{}' -> {} bytes, {} blocks", path, size, desc.blocks());
        Ok(())
    }

    /// Stats the object a path ends at, following a final symlink.
    pub fn stat(&self, path: &str) -> Result<Stat> {
        report("stat", path, self.do_stat(path, true))
    }

    /// Stats a symlink itself rather than its target.
    pub fn lstat(&self, path: &str) -> Result<Stat> {
        report("lstat", path, self.do_stat(path, false))
    }

    fn do_stat(&self, path: &str, follow_last: bool) -> Result<Stat> {
        let id = self.lookup(path, follow_last)?;
        let stat = self.stat_of(id)?;
        info!("stat: '{}' {}", path, stat);
        Ok(stat)
    }

    /// Stats through an open handle, which keeps working after the last unlink.
    pub fn fstat(&self, handle: usize) -> Result<Stat> {
        report("fstat", handle, self.open_files.get(handle).and_then(|f| self.stat_of(f.desc_id)))
    }

    pub fn readlink(&self, path: &str) -> Result<String> {
        report("readlink", path, self.do_readlink(path))
    }

    fn do_readlink(&self, path: &str) -> Result<String> {
        let id = self.lookup(path, false)?;
        let target = self
            .descriptors
            .get(id)?
            .target()
            .ok_or_else(|| FsError::InvalidArgument(alloc::format!("'{}' is not a symlink", path)))?;
        Ok(target.to_string())
    }

    /// Lists a directory, the working directory when `path` is `None`.
    pub fn ls(&self, path: Option<&str>) -> Result<Vec<DirListing>> {
        report("ls", path.unwrap_or("."), self.do_ls(path))
    }

    fn do_ls(&self, path: Option<&str>) -> Result<Vec<DirListing>> {
        let id = match path {
            Some(path) => self.lookup(path, true)?,
            None => self.cwd,
        };
        let shown = path.unwrap_or(DOT_NAME);
        let entries = self
            .descriptors
            .get(id)?
            .entries()
            .ok_or_else(|| FsError::NotADirectory(shown.into()))?;
        let mut listing = Vec::with_capacity(entries.len());
        for entry in entries {
            let desc = self.descriptors.get(entry.desc_id)?;
            listing.push(DirListing {
                name: entry.name.clone(),
                ftype: desc.ftype(),
                id: desc.id,
                target: desc.target().map(str::to_string),
            });
        }
        info!("ls: '{}' ({} entries)", shown, listing.len());
        for line in &listing {
            info!("  {}", line);
        }
        Ok(listing)
    }

    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    pub fn free_blocks(&self) -> usize {
        self.store.free_blocks()
    }

    pub fn free_descriptors(&self) -> usize {
        self.descriptors.free_slots()
    }

    pub fn open_handles(&self) -> usize {
        self.open_files.live()
    }

    pub fn cwd_id(&self) -> usize {
        self.cwd
    }

    /// Path resolver bound to the current table and working directory.
    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.descriptors, self.cwd, self.config.max_symlink_depth)
    }

    fn locate(&self, path: &str, follow_last: bool) -> Result<Located> {
        self.resolver().resolve_symlink(path, follow_last)
    }

    /// Descriptor id of an existing object.
    fn lookup(&self, path: &str, follow_last: bool) -> Result<usize> {
        self.locate(path, follow_last)?
            .desc_id
            .ok_or_else(|| FsError::NotFound(path.into()))
    }

    fn stat_of(&self, id: usize) -> Result<Stat> {
        let desc = self.descriptors.get(id)?;
        Ok(Stat {
            id: desc.id,
            ftype: desc.ftype(),
            links_cnt: desc.links_cnt,
            size: desc.size,
            blocks: desc.blocks(),
        })
    }

    /// Reclaims the descriptor once no name and no handle refer to it.
    /// Returns whether it was reclaimed.
    fn release_if_unreferenced(&mut self, id: usize) -> Result<bool> {
        if !self.descriptors.get(id)?.is_unreferenced() {
            return Ok(false);
        }
        self.descriptors.reclaim(id, &mut self.store)?;
        Ok(true)
    }
}

fn entries_of<'a>(entries: Option<&'a mut Vec<DirEntry>>, path: &str) -> Result<&'a mut Vec<DirEntry>> {
    entries.ok_or_else(|| FsError::NotADirectory(path.into()))
}

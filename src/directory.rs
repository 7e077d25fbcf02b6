//! Directory entry manipulation.
//! These helpers only touch entry lists, link counts stay the caller's responsibility.

use alloc::vec::Vec;

use crate::config::*;
use crate::error::{FsError, Result};
use crate::structs::DirEntry;

pub fn is_dot_or_dotdot(name: &str) -> bool {
    name == DOT_NAME || name == DOTDOT_NAME
}

/// Checks that `name` can become a new directory entry.
pub fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') || is_dot_or_dotdot(name) {
        return Err(FsError::InvalidArgument(alloc::format!("bad entry name '{}'", name)));
    }
    Ok(())
}

/// Query descriptor id of an entry by name.
pub fn dir_lookup(entries: &[DirEntry], name: &str) -> Option<usize> {
    entries.iter().find(|e| e.name == name).map(|e| e.desc_id)
}

/// Appends a new entry. Fails if the name is taken.
pub fn dir_add_entry(entries: &mut Vec<DirEntry>, name: &str, desc_id: usize) -> Result<()> {
    if dir_lookup(entries, name).is_some() {
        return Err(FsError::AlreadyExists(name.into()));
    }
    entries.push(DirEntry::new(name, desc_id));
    Ok(())
}

/// Removes an entry, keeping the order of the remaining ones.
/// Returns the descriptor id the entry referenced.
pub fn dir_rm_entry(entries: &mut Vec<DirEntry>, name: &str) -> Result<usize> {
    if is_dot_or_dotdot(name) {
        return Err(FsError::InvalidArgument(alloc::format!("cannot remove '{}'", name)));
    }
    let pos = entries
        .iter()
        .position(|e| e.name == name)
        .ok_or_else(|| FsError::NotFound(name.into()))?;
    Ok(entries.remove(pos).desc_id)
}

/// Anything beyond '.' and '..' makes a directory non-empty.
pub fn dir_is_empty(entries: &[DirEntry]) -> bool {
    entries.len() <= 2
}

/// Name under which `child` is linked in `entries`, '.' and '..' aside.
pub fn dir_name_of(entries: &[DirEntry], child: usize) -> Option<&str> {
    entries
        .iter()
        .find(|e| e.desc_id == child && !is_dot_or_dotdot(&e.name))
        .map(|e| e.name.as_str())
}

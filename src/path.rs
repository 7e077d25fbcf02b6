//! Path resolution and manipulation utilities.

use alloc::string::{String, ToString};

use log::trace;

use crate::config::*;
use crate::directory::dir_lookup;
use crate::error::{FsError, Result};
use crate::inode::{Contents, DescriptorTable};

/// Splits a path into its directory part and final component.
/// Trailing slashes are ignored, "/" yields an empty final component.
pub fn split(path: &str) -> (&str, &str) {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return (if path.starts_with('/') { "/" } else { "" }, "");
    }
    match trimmed.rfind('/') {
        Some(0) => ("/", &trimmed[1..]),
        Some(i) => (&trimmed[..i], &trimmed[i + 1..]),
        None => ("", trimmed),
    }
}

pub fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Where a path lands: the directory holding the final component and its name.
/// `desc_id` is `None` when no such entry exists yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub parent: usize,
    pub name: String,
    pub desc_id: Option<usize>,
}

/// Walks paths over a descriptor table, starting relative paths at `cwd`.
pub struct Resolver<'a> {
    table: &'a DescriptorTable,
    cwd: usize,
    max_depth: usize,
}

impl<'a> Resolver<'a> {
    pub fn new(table: &'a DescriptorTable, cwd: usize, max_depth: usize) -> Self {
        Self { table, cwd, max_depth }
    }

    /// Walks every component but the last one.
    /// Returns the containing directory and the unresolved final component.
    pub fn resolve<'p>(&self, path: &'p str) -> Result<(usize, &'p str)> {
        let mut depth = 0;
        self.resolve_at(self.cwd, path, path, &mut depth)
    }

    /// Like `resolve`, then looks the final component up.
    /// Symlinks found there are followed when `follow_last` is set.
    /// A trailing slash always follows them and demands a directory.
    pub fn resolve_symlink(&self, path: &str, follow_last: bool) -> Result<Located> {
        let must_be_dir = path.len() > 1 && path.ends_with('/');
        let located = self.chase(path, follow_last || must_be_dir)?;
        if must_be_dir {
            if let Some(desc_id) = located.desc_id {
                if !self.table.get(desc_id)?.is_dir() {
                    return Err(FsError::NotADirectory(path.into()));
                }
            }
        }
        Ok(located)
    }

    fn chase(&self, path: &str, follow_last: bool) -> Result<Located> {
        let mut depth = 0;
        let (mut parent, mut name) = self.resolve_at(self.cwd, path, path, &mut depth)?;
        loop {
            let Some(desc_id) = self.lookup(parent, name) else {
                return Ok(Located { parent, name: name.to_string(), desc_id: None });
            };
            let target = match &self.table.get(desc_id)?.contents {
                Contents::Symlink(target) if follow_last => target.as_str(),
                _ => return Ok(Located { parent, name: name.to_string(), desc_id: Some(desc_id) }),
            };
            depth += 1;
            if depth > self.max_depth {
                return Err(FsError::TooManySymlinkLevels(path.into()));
            }
            trace!("[resolve] '{}' follows link {} -> '{}'", path, desc_id, target);
            // Relative targets start from the directory holding the link.
            (parent, name) = self.resolve_at(parent, target, path, &mut depth)?;
        }
    }

    fn resolve_at<'p>(
        &self,
        base: usize,
        path: &'p str,
        origin: &str,
        depth: &mut usize,
    ) -> Result<(usize, &'p str)> {
        if path.is_empty() {
            return Err(FsError::NotFound(origin.into()));
        }
        let mut cur = if path.starts_with('/') { ROOT_DESC_ID } else { base };
        let (dir_part, leaf) = split(path);
        for component in components(dir_part) {
            let child = self
                .lookup(cur, component)
                .ok_or_else(|| FsError::NotFound(origin.into()))?;
            cur = self.enter_dir(cur, child, origin, depth)?;
        }
        Ok((cur, leaf))
    }

    /// Steps from directory `parent` into its entry `child`, following symlinks
    /// until a directory turns up.
    fn enter_dir(&self, parent: usize, child: usize, origin: &str, depth: &mut usize) -> Result<usize> {
        let (mut parent, mut child) = (parent, child);
        loop {
            match &self.table.get(child)?.contents {
                Contents::Directory(_) => return Ok(child),
                Contents::Regular => return Err(FsError::NotADirectory(origin.into())),
                Contents::Symlink(target) => {
                    *depth += 1;
                    if *depth > self.max_depth {
                        return Err(FsError::TooManySymlinkLevels(origin.into()));
                    }
                    let (dir, leaf) = self.resolve_at(parent, target, origin, depth)?;
                    child = self
                        .lookup(dir, leaf)
                        .ok_or_else(|| FsError::NotFound(origin.into()))?;
                    parent = dir;
                }
            }
        }
    }

    /// An empty name stands for the directory itself.
    fn lookup(&self, dir: usize, name: &str) -> Option<usize> {
        if name.is_empty() {
            return Some(dir);
        }
        self.table
            .get(dir)
            .ok()
            .and_then(|d| d.entries())
            .and_then(|entries| dir_lookup(entries, name))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::directory::dir_add_entry;
    use crate::inode::NewDescriptor;

    #[test]
    fn test_split() {
        assert_eq!(split("/"), ("/", ""));
        assert_eq!(split(""), ("", ""));
        assert_eq!(split("a"), ("", "a"));
        assert_eq!(split("/a"), ("/", "a"));
        assert_eq!(split("/a/b/"), ("/a", "b"));
        assert_eq!(split("a/b/c"), ("a/b", "c"));
        assert_eq!(split("//"), ("/", ""));
    }

    fn link(table: &mut DescriptorTable, dir: usize, name: &str, kind: NewDescriptor<'_>) -> usize {
        let id = table.allocate(kind).unwrap();
        let entries = table.get_mut(dir).unwrap().entries_mut().unwrap();
        dir_add_entry(entries, name, id).unwrap();
        id
    }

    // /a (dir), /a/f (file), /la -> /a, /lf -> a/f, /loop -> /loop
    fn sample() -> (DescriptorTable, usize, usize) {
        let mut table = DescriptorTable::with_root(8);
        let a = link(&mut table, ROOT_DESC_ID, "a", NewDescriptor::Directory { parent: ROOT_DESC_ID });
        let f = link(&mut table, a, "f", NewDescriptor::Regular);
        link(&mut table, ROOT_DESC_ID, "la", NewDescriptor::Symlink { target: "/a" });
        link(&mut table, ROOT_DESC_ID, "lf", NewDescriptor::Symlink { target: "a/f" });
        link(&mut table, ROOT_DESC_ID, "loop", NewDescriptor::Symlink { target: "/loop" });
        (table, a, f)
    }

    #[test]
    fn test_resolve_parent_and_leaf() {
        let (table, a, _) = sample();
        let resolver = Resolver::new(&table, ROOT_DESC_ID, MAX_SYMLINK_DEPTH);
        assert_eq!(resolver.resolve("/a/f").unwrap(), (a, "f"));
        assert_eq!(resolver.resolve("/a/missing").unwrap(), (a, "missing"));
        assert_eq!(resolver.resolve("/").unwrap(), (ROOT_DESC_ID, ""));
        assert_eq!(resolver.resolve("/x/f"), Err(FsError::NotFound("/x/f".into())));
        assert_eq!(resolver.resolve("/a/f/g"), Err(FsError::NotADirectory("/a/f/g".into())));
        let from_a = Resolver::new(&table, a, MAX_SYMLINK_DEPTH);
        assert_eq!(from_a.resolve("f").unwrap(), (a, "f"));
        assert_eq!(from_a.resolve("../a/f").unwrap(), (a, "f"));
    }

    #[test]
    fn test_intermediate_symlink() {
        let (table, a, _) = sample();
        let resolver = Resolver::new(&table, ROOT_DESC_ID, MAX_SYMLINK_DEPTH);
        assert_eq!(resolver.resolve("/la/f").unwrap(), (a, "f"));
    }

    #[test]
    fn test_follow_last() {
        let (table, a, f) = sample();
        let resolver = Resolver::new(&table, ROOT_DESC_ID, MAX_SYMLINK_DEPTH);
        let located = resolver.resolve_symlink("/lf", true).unwrap();
        assert_eq!(located, Located { parent: a, name: "f".into(), desc_id: Some(f) });
        let located = resolver.resolve_symlink("/lf", false).unwrap();
        assert_eq!(located.parent, ROOT_DESC_ID);
        assert_eq!(located.name, "lf");
        assert_ne!(located.desc_id, Some(f));
        assert_eq!(resolver.resolve_symlink("/la", true).unwrap().desc_id, Some(a));
    }

    #[test]
    fn test_trailing_slash_needs_directory() {
        let (table, a, _) = sample();
        let resolver = Resolver::new(&table, ROOT_DESC_ID, MAX_SYMLINK_DEPTH);
        assert_eq!(resolver.resolve_symlink("/a/", false).unwrap().desc_id, Some(a));
        assert_eq!(
            resolver.resolve_symlink("/a/f/", true),
            Err(FsError::NotADirectory("/a/f/".into()))
        );
        // The link itself is skipped over, its target is what gets checked.
        assert_eq!(resolver.resolve_symlink("/la/", false).unwrap().desc_id, Some(a));
        assert_eq!(resolver.resolve_symlink("/new/", false).unwrap().desc_id, None);
    }

    #[test]
    fn test_symlink_loop() {
        let (table, _, _) = sample();
        let resolver = Resolver::new(&table, ROOT_DESC_ID, MAX_SYMLINK_DEPTH);
        assert_eq!(
            resolver.resolve_symlink("/loop", true),
            Err(FsError::TooManySymlinkLevels("/loop".into()))
        );
        assert!(resolver.resolve_symlink("/loop", false).is_ok());
        assert_eq!(
            resolver.resolve("/loop/x"),
            Err(FsError::TooManySymlinkLevels("/loop/x".into()))
        );
    }
}

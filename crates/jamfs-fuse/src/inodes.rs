//! Inode ↔ path table for the FUSE binding.
//!
//! The kernel is path-based; the FUSE protocol speaks inodes. Inodes are
//! handed out on first sight of a path and never reused.
#![cfg_attr(not(feature = "fuse"), allow(dead_code))]

use std::collections::HashMap;

pub const ROOT_INODE: u64 = 1;

#[derive(Debug)]
pub struct InodeTable {
    by_inode: HashMap<u64, String>,
    by_path: HashMap<String, u64>,
    next_inode: u64,
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InodeTable {
    /// Table holding only the root.
    pub fn new() -> Self {
        let mut table = Self {
            by_inode: HashMap::new(),
            by_path: HashMap::new(),
            next_inode: ROOT_INODE + 1,
        };
        table.by_inode.insert(ROOT_INODE, "/".to_string());
        table.by_path.insert("/".to_string(), ROOT_INODE);
        table
    }

    /// Inode for `path`, allocated if unseen.
    pub fn insert(&mut self, path: &str) -> u64 {
        if let Some(inode) = self.by_path.get(path) {
            return *inode;
        }
        let inode = self.next_inode;
        self.next_inode = self.next_inode.saturating_add(1);
        self.by_inode.insert(inode, path.to_string());
        self.by_path.insert(path.to_string(), inode);
        inode
    }

    pub fn path(&self, inode: u64) -> Option<&str> {
        self.by_inode.get(&inode).map(String::as_str)
    }

    pub fn inode(&self, path: &str) -> Option<u64> {
        self.by_path.get(path).copied()
    }

    /// Inode of the directory containing `inode`. The root is its own parent.
    pub fn parent(&self, inode: u64) -> Option<u64> {
        let path = self.path(inode)?;
        let parent = match path.rfind('/') {
            Some(0) | None => "/",
            Some(i) => &path[..i],
        };
        self.inode(parent)
    }

    pub fn len(&self) -> usize {
        self.by_inode.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_inode.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_is_preallocated() {
        let table = InodeTable::new();
        assert_eq!(table.path(ROOT_INODE), Some("/"));
        assert_eq!(table.inode("/"), Some(ROOT_INODE));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_insert_is_stable() {
        let mut table = InodeTable::new();
        let artist = table.insert("/Test Artist");
        let album = table.insert("/Test Artist/first_light");
        assert_eq!(artist, 2);
        assert_eq!(album, 3);
        assert_eq!(table.insert("/Test Artist"), artist);
        assert_eq!(table.insert("/"), ROOT_INODE);
        assert_eq!(table.path(album), Some("/Test Artist/first_light"));
    }

    #[test]
    fn test_parent() {
        let mut table = InodeTable::new();
        let artist = table.insert("/Test Artist");
        let album = table.insert("/Test Artist/first_light");
        assert_eq!(table.parent(album), Some(artist));
        assert_eq!(table.parent(artist), Some(ROOT_INODE));
        assert_eq!(table.parent(ROOT_INODE), Some(ROOT_INODE));
        assert_eq!(table.parent(99), None);
    }
}

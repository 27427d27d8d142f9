//! Namespace cache: absolute virtual path → populated directory.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{Directory, Entry};
use crate::vfs::{VfsError, VfsResult};

/// Owns every discovered [`Directory`] for the process lifetime.
///
/// Directories are inserted whole and never removed. The only in-place
/// update is a link-count patch on an already returned entry. Handed-out
/// `Arc`s are snapshots for the duration of one operation.
#[derive(Debug, Default)]
pub struct NamespaceCache {
    dirs: RwLock<BTreeMap<String, Arc<Directory>>>,
}

impl NamespaceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact-match lookup.
    pub fn get(&self, path: &str) -> Option<Arc<Directory>> {
        self.dirs.read().get(path).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.dirs.read().contains_key(path)
    }

    /// Clone of one child entry.
    pub fn entry(&self, dir: &str, name: &str) -> Option<Entry> {
        self.dirs.read().get(dir)?.get(name).cloned()
    }

    /// Insert a fully populated directory.
    ///
    /// Inserting a path twice is a bug in the caller.
    pub fn insert(&self, dir: Directory) -> VfsResult<()> {
        let mut dirs = self.dirs.write();
        if dirs.contains_key(&dir.path) {
            return Err(VfsError::already_exists(dir.path));
        }
        dirs.insert(dir.path.clone(), Arc::new(dir));
        Ok(())
    }

    /// Set the link count of `parent`'s child `name`.
    ///
    /// Returns false if either is absent.
    pub fn patch_link_count(&self, parent: &str, name: &str, count: u32) -> bool {
        let mut dirs = self.dirs.write();
        let Some(dir) = dirs.get_mut(parent) else {
            return false;
        };
        if dir.get(name).is_none() {
            return false;
        }
        match Arc::make_mut(dir).get_mut(name) {
            Some(entry) => {
                entry.link_count = count;
                true
            }
            None => false,
        }
    }

    /// Number of cached directories.
    pub fn len(&self) -> usize {
        self.dirs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SearchEntity;
    use crate::namespace::DirectoryKind;

    fn root() -> Directory {
        let mut dir = Directory::new("/", DirectoryKind::ArtistList, SearchEntity::Artists);
        dir.insert(Entry::directory("Test Artist", "Test Artist", 2).with_remote_id(Some("123".into())));
        dir
    }

    #[test]
    fn test_get_is_exact() {
        let cache = NamespaceCache::new();
        cache.insert(root()).unwrap();
        assert!(cache.get("/").is_some());
        assert!(cache.get("/Test Artist").is_none());
        assert!(cache.get("").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_insert_twice_fails() {
        let cache = NamespaceCache::new();
        cache.insert(root()).unwrap();
        let err = cache.insert(root()).unwrap_err();
        assert!(matches!(err, VfsError::AlreadyExists(_)));
    }

    #[test]
    fn test_patch_link_count() {
        let cache = NamespaceCache::new();
        cache.insert(root()).unwrap();

        let before = cache.get("/").unwrap();
        assert!(cache.patch_link_count("/", "Test Artist", 5));
        assert_eq!(cache.entry("/", "Test Artist").unwrap().link_count, 5);
        // A snapshot taken before the patch is unaffected.
        assert_eq!(before.get("Test Artist").unwrap().link_count, 2);

        assert!(!cache.patch_link_count("/", "Nobody", 5));
        assert!(!cache.patch_link_count("/missing", "Test Artist", 5));
    }
}

//! The read side a host binding drives.

use async_trait::async_trait;
use std::path::Path;

use super::VfsResult;
use super::types::{DirEntry, FileAttr, StatFs};

/// Path-addressed, read-only filesystem operations.
///
/// Paths are absolute within the mount. Bindings answer every mutating
/// request themselves without reaching the implementation.
#[async_trait]
pub trait VfsOps: Send + Sync {
    async fn getattr(&self, path: &Path) -> VfsResult<FileAttr>;

    /// `.` and `..`, then every child in listing order. Never recurses.
    async fn readdir(&self, path: &Path) -> VfsResult<Vec<DirEntry>>;

    /// Up to `size` bytes at `offset`. A short result is not an error and
    /// an empty one means end of file.
    async fn read(&self, path: &Path, offset: u64, size: u32) -> VfsResult<Vec<u8>>;

    fn read_only(&self) -> bool;

    async fn statfs(&self) -> VfsResult<StatFs>;
}

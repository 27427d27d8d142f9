//! Attributes and listings as the binding sees them.

use std::time::SystemTime;

pub const DIR_PERM: u32 = 0o755;
pub const FILE_PERM: u32 = 0o644;

/// Unit of `FileAttr::blocks`.
pub const BLOCK_SIZE: u64 = 512;

/// The tree only has directories and regular files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    File,
    Directory,
}

impl FileType {
    pub fn is_file(&self) -> bool {
        *self == FileType::File
    }

    pub fn is_dir(&self) -> bool {
        *self == FileType::Directory
    }

    /// Mode bits; nothing in the tree is writable.
    pub fn perm(&self) -> u32 {
        match self {
            FileType::File => FILE_PERM,
            FileType::Directory => DIR_PERM,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileAttr {
    pub kind: FileType,
    pub perm: u32,
    /// Bytes; 0 for directories.
    pub size: u64,
    /// `size` in 512-byte blocks, rounded up.
    pub blocks: u64,
    /// Directories: `.`, `..` and one per subdirectory. Files: 1.
    pub nlink: u32,
    pub mtime: SystemTime,
    pub atime: SystemTime,
}

impl FileAttr {
    /// Track of `size` bytes, stamped now until [`with_time`](Self::with_time).
    pub fn file(size: u64) -> Self {
        Self::stamped(FileType::File, size, 1)
    }

    /// Directory with `nlink` links, stamped now.
    pub fn directory(nlink: u32) -> Self {
        Self::stamped(FileType::Directory, 0, nlink)
    }

    fn stamped(kind: FileType, size: u64, nlink: u32) -> Self {
        let now = SystemTime::now();
        Self {
            kind,
            perm: kind.perm(),
            size,
            blocks: blocks_for(size),
            nlink,
            mtime: now,
            atime: now,
        }
    }

    /// Report `time` as both modification and access time.
    pub fn with_time(self, time: SystemTime) -> Self {
        Self {
            mtime: time,
            atime: time,
            ..self
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}

pub fn blocks_for(size: u64) -> u64 {
    size.div_ceil(BLOCK_SIZE)
}

/// One line of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: FileType,
    pub perm: u32,
}

impl DirEntry {
    pub fn new(name: impl Into<String>, kind: FileType) -> Self {
        Self {
            name: name.into(),
            kind,
            perm: kind.perm(),
        }
    }

    pub fn file(name: impl Into<String>) -> Self {
        Self::new(name, FileType::File)
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self::new(name, FileType::Directory)
    }
}

/// Synthetic `statfs` answer. The catalog has no meaningful capacity, so
/// everything but the geometry is zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatFs {
    pub blocks: u64,
    pub bfree: u64,
    pub bavail: u64,
    pub files: u64,
    pub ffree: u64,
    pub bsize: u32,
    pub namelen: u32,
    pub frsize: u32,
}

impl Default for StatFs {
    fn default() -> Self {
        Self {
            blocks: 0,
            bfree: 0,
            bavail: 0,
            files: 0,
            ffree: 0,
            bsize: BLOCK_SIZE as u32,
            namelen: 255,
            frsize: BLOCK_SIZE as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn test_modes_by_kind() {
        assert_eq!(FileType::Directory.perm(), 0o755);
        assert_eq!(FileType::File.perm(), 0o644);
        assert!(FileType::File.is_file() && !FileType::File.is_dir());
    }

    #[test]
    fn test_track_and_directory_attrs() {
        let track = FileAttr::file(4_000_000);
        assert!(track.is_file());
        assert_eq!(track.blocks, 7813);
        assert_eq!(track.nlink, 1);
        assert_eq!(track.perm, FILE_PERM);

        let album = FileAttr::directory(6);
        assert!(album.is_dir());
        assert_eq!(album.size, 0);
        assert_eq!(album.nlink, 6);
    }

    #[test]
    fn test_blocks_round_up() {
        assert_eq!(blocks_for(0), 0);
        assert_eq!(blocks_for(1), 1);
        assert_eq!(blocks_for(512), 1);
        assert_eq!(blocks_for(513), 2);
    }

    #[test]
    fn test_release_time_override() {
        let released = UNIX_EPOCH + Duration::from_secs(1_560_556_800);
        let attr = FileAttr::directory(2).with_time(released);
        assert_eq!(attr.mtime, released);
        assert_eq!(attr.atime, released);
    }

    #[test]
    fn test_listing_entries() {
        let track = DirEntry::file("01_-_intro.flac");
        assert_eq!(track.perm, FILE_PERM);
        assert_eq!(DirEntry::directory("flac").perm, DIR_PERM);
    }

    #[test]
    fn test_statfs_is_empty() {
        let stats = StatFs::default();
        assert_eq!(stats.blocks, 0);
        assert_eq!(stats.bsize, 512);
    }
}

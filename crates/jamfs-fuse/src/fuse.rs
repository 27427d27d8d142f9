//! FUSE binding over the catalog filesystem.
//!
//! fuser calls in on its own session thread. Every request that may touch
//! the network is spawned onto the tokio runtime and replied to from the
//! task, so a slow catalog query never blocks other requests.

use fuser::{
    FileAttr as FuseAttr, FileType as FuseFileType, Filesystem, KernelConfig, MountOption,
    ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyOpen,
    ReplyStatfs, ReplyWrite, Request,
};
use parking_lot::Mutex;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use jamfs_kernel::namespace::name::join;
use jamfs_kernel::{CatalogFs, FileAttr, FileType, VfsOps};

use crate::inodes::InodeTable;

/// Attribute and entry cache lifetime handed to the kernel. Nothing in
/// the tree changes after it is listed, so this can be generous.
const TTL: Duration = Duration::from_secs(60);

/// Owner reported for every node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner {
    pub uid: u32,
    pub gid: u32,
}

impl Owner {
    /// The user running the mount.
    pub fn current() -> Self {
        // SAFETY: getuid and getgid cannot fail and touch no memory.
        unsafe {
            Self {
                uid: libc::getuid(),
                gid: libc::getgid(),
            }
        }
    }
}

pub struct JamFuse {
    fs: Arc<CatalogFs>,
    runtime: Handle,
    inodes: Arc<Mutex<InodeTable>>,
    owner: Owner,
}

impl JamFuse {
    pub fn new(fs: Arc<CatalogFs>, runtime: Handle, owner: Owner) -> Self {
        Self {
            fs,
            runtime,
            inodes: Arc::new(Mutex::new(InodeTable::new())),
            owner,
        }
    }

    fn path_of(&self, ino: u64) -> Option<String> {
        self.inodes.lock().path(ino).map(str::to_string)
    }
}

/// Mount `fs` at `mountpoint` and serve until unmounted.
pub fn mount(
    fs: Arc<CatalogFs>,
    runtime: Handle,
    mountpoint: &Path,
    allow_other: bool,
) -> anyhow::Result<()> {
    let owner = Owner::current();

    let mut options = vec![
        MountOption::FSName("jamfs".to_owned()),
        MountOption::Subtype("jamfs".to_owned()),
        MountOption::RO,
        MountOption::NoExec,
        MountOption::AutoUnmount,
    ];
    if allow_other {
        options.push(MountOption::AllowOther);
    }

    info!(mountpoint = %mountpoint.display(), "mounting");
    fuser::mount2(JamFuse::new(fs, runtime, owner), mountpoint, &options)?;
    info!("unmounted");
    Ok(())
}

fn fuse_attr(ino: u64, attr: &FileAttr, owner: Owner) -> FuseAttr {
    FuseAttr {
        ino,
        size: attr.size,
        blocks: attr.blocks,
        atime: attr.atime,
        mtime: attr.mtime,
        ctime: attr.mtime,
        crtime: attr.mtime,
        kind: fuse_kind(attr.kind),
        perm: attr.perm as u16,
        nlink: attr.nlink,
        uid: owner.uid,
        gid: owner.gid,
        rdev: 0,
        flags: 0,
        blksize: jamfs_kernel::vfs::BLOCK_SIZE as u32,
    }
}

fn fuse_kind(kind: FileType) -> FuseFileType {
    match kind {
        FileType::File => FuseFileType::RegularFile,
        FileType::Directory => FuseFileType::Directory,
    }
}

impl Filesystem for JamFuse {
    fn init(&mut self, _req: &Request<'_>, _config: &mut KernelConfig) -> Result<(), libc::c_int> {
        debug!("fuse session initialized");
        Ok(())
    }

    fn destroy(&mut self) {
        self.fs.shutdown();
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let Some(parent_path) = self.path_of(parent) else {
            reply.error(libc::ENOENT);
            return;
        };
        let Some(name) = name.to_str() else {
            reply.error(libc::ENOENT);
            return;
        };
        let path = join(&parent_path, name);

        let fs = self.fs.clone();
        let inodes = self.inodes.clone();
        let owner = self.owner;
        self.runtime.spawn(async move {
            match fs.getattr(Path::new(&path)).await {
                Ok(attr) => {
                    let ino = inodes.lock().insert(&path);
                    reply.entry(&TTL, &fuse_attr(ino, &attr, owner), 0);
                }
                Err(e) => reply.error(e.errno()),
            }
        });
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        let Some(path) = self.path_of(ino) else {
            reply.error(libc::ENOENT);
            return;
        };

        let fs = self.fs.clone();
        let owner = self.owner;
        self.runtime.spawn(async move {
            match fs.getattr(Path::new(&path)).await {
                Ok(attr) => reply.attr(&TTL, &fuse_attr(ino, &attr, owner)),
                Err(e) => reply.error(e.errno()),
            }
        });
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let Some(path) = self.path_of(ino) else {
            reply.error(libc::ENOENT);
            return;
        };

        let fs = self.fs.clone();
        let inodes = self.inodes.clone();
        self.runtime.spawn(async move {
            let entries = match fs.readdir(Path::new(&path)).await {
                Ok(entries) => entries,
                Err(e) => {
                    reply.error(e.errno());
                    return;
                }
            };

            let skip = usize::try_from(offset).unwrap_or(0);
            let mut inodes = inodes.lock();
            for (i, entry) in entries.iter().enumerate().skip(skip) {
                let entry_ino = match entry.name.as_str() {
                    "." => ino,
                    ".." => inodes.parent(ino).unwrap_or(ino),
                    name => inodes.insert(&join(&path, name)),
                };
                if reply.add(entry_ino, (i + 1) as i64, fuse_kind(entry.kind), &entry.name) {
                    break;
                }
            }
            reply.ok();
        });
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        if flags & libc::O_ACCMODE != libc::O_RDONLY {
            reply.error(libc::EROFS);
            return;
        }
        if self.path_of(ino).is_none() {
            reply.error(libc::ENOENT);
            return;
        }
        reply.opened(0, 0);
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let Some(path) = self.path_of(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        let Ok(offset) = u64::try_from(offset) else {
            reply.error(libc::EINVAL);
            return;
        };

        let fs = self.fs.clone();
        self.runtime.spawn(async move {
            match fs.read(Path::new(&path), offset, size).await {
                Ok(data) => reply.data(&data),
                Err(e) => {
                    warn!(path = %path, offset, size, error = %e, "read failed");
                    reply.error(e.errno());
                }
            }
        });
    }

    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyStatfs) {
        let fs = self.fs.clone();
        self.runtime.spawn(async move {
            match fs.statfs().await {
                Ok(s) => reply.statfs(
                    s.blocks, s.bfree, s.bavail, s.files, s.ffree, s.bsize, s.namelen, s.frsize,
                ),
                Err(e) => reply.error(e.errno()),
            }
        });
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _offset: i64,
        _data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        reply.error(libc::EROFS);
    }

    fn create(
        &mut self,
        _req: &Request<'_>,
        _parent: u64,
        _name: &OsStr,
        _mode: u32,
        _umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        reply.error(libc::EROFS);
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        _parent: u64,
        _name: &OsStr,
        _mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        reply.error(libc::EROFS);
    }

    fn unlink(&mut self, _req: &Request<'_>, _parent: u64, _name: &OsStr, reply: ReplyEmpty) {
        reply.error(libc::EROFS);
    }

    fn rmdir(&mut self, _req: &Request<'_>, _parent: u64, _name: &OsStr, reply: ReplyEmpty) {
        reply.error(libc::EROFS);
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        _parent: u64,
        _name: &OsStr,
        _newparent: u64,
        _newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        reply.error(libc::EROFS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::MetadataExt;

    #[test]
    fn test_owner_is_mounting_user() {
        let dir = tempfile::tempdir().unwrap();
        let meta = std::fs::metadata(dir.path()).unwrap();
        assert_eq!(Owner::current().uid, meta.uid());
    }

    #[test]
    fn test_attr_carries_owner() {
        let owner = Owner { uid: 1000, gid: 100 };
        let attr = fuse_attr(7, &FileAttr::file(1024), owner);
        assert_eq!((attr.ino, attr.uid, attr.gid), (7, 1000, 100));
        assert_eq!(attr.blocks, 2);
        assert_eq!(attr.kind, FuseFileType::RegularFile);
    }
}

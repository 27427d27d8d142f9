//! Errors surfaced to the filesystem binding.

use std::io;
use thiserror::Error;

use crate::catalog::UpstreamError;

#[derive(Debug, Error)]
pub enum VfsError {
    /// Ancestors never visited, or no such child after population.
    #[error("no such entry: {0}")]
    NotFound(String),

    /// A directory was populated twice.
    #[error("directory already cached: {0}")]
    AlreadyExists(String),

    #[error("read-only catalog filesystem")]
    ReadOnly,

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// Not UTF-8, or climbs with `..`.
    #[error("bad virtual path: {0}")]
    InvalidPath(String),

    /// Catalog or media host failed while serving a read.
    #[error("upstream unavailable: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Other(String),
}

// Shorthand constructors for the path-carrying variants.
impl VfsError {
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::NotADirectory(path.into())
    }

    pub fn is_a_directory(path: impl Into<String>) -> Self {
        Self::IsADirectory(path.into())
    }

    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

impl VfsError {
    /// Errno handed back to the kernel.
    pub fn errno(&self) -> i32 {
        match self {
            VfsError::NotFound(_) => libc::ENOENT,
            VfsError::AlreadyExists(_) => libc::EEXIST,
            VfsError::ReadOnly => libc::EROFS,
            VfsError::NotADirectory(_) => libc::ENOTDIR,
            VfsError::IsADirectory(_) => libc::EISDIR,
            VfsError::InvalidPath(_) => libc::EINVAL,
            VfsError::Upstream(_) | VfsError::Other(_) => libc::EIO,
            VfsError::Io(e) => e.raw_os_error().unwrap_or(libc::EIO),
        }
    }

    /// Closest `std::io` classification.
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            VfsError::NotFound(_) => io::ErrorKind::NotFound,
            VfsError::AlreadyExists(_) => io::ErrorKind::AlreadyExists,
            VfsError::ReadOnly => io::ErrorKind::ReadOnlyFilesystem,
            VfsError::NotADirectory(_) => io::ErrorKind::NotADirectory,
            VfsError::IsADirectory(_) => io::ErrorKind::IsADirectory,
            VfsError::InvalidPath(_) => io::ErrorKind::InvalidInput,
            VfsError::Io(e) => e.kind(),
            VfsError::Upstream(_) | VfsError::Other(_) => io::ErrorKind::Other,
        }
    }
}

impl From<VfsError> for io::Error {
    fn from(e: VfsError) -> Self {
        match e {
            VfsError::Io(inner) => inner,
            other => io::Error::new(other.kind(), other),
        }
    }
}

pub type VfsResult<T> = Result<T, VfsError>;

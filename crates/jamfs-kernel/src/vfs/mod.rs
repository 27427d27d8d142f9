//! Virtual filesystem surface.
//!
//! - [`VfsOps`] - path-based read-only operations a host binding calls
//! - [`CatalogBackend`] - serves the catalog tree through the resolver
//!
//! Paths, not inodes: bindings keep their own inode ↔ path table.
//! Reads carry an explicit offset and size, with no handle state.

pub mod backends;
mod error;
mod ops;
mod types;

pub use backends::CatalogBackend;
pub use error::{VfsError, VfsResult};
pub use ops::VfsOps;
pub use types::{BLOCK_SIZE, DIR_PERM, DirEntry, FILE_PERM, FileAttr, FileType, StatFs, blocks_for};

//! VFS backends.
//!
//! Backends implement [`VfsOps`](super::VfsOps) over a concrete source.

mod catalog;

pub use catalog::CatalogBackend;
